//! Request extractors that reject with the `ApiResponse` error body

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use shared::error::AppError;

/// JSON request body
///
/// Same as `axum::Json`, but a missing content type is `InvalidRequest` and an
/// undecodable body is `ValidationFailed` (400), keyed by the offending field
/// when serde reports one.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> AppError {
    let text = rejection.body_text();
    match rejection {
        JsonRejection::MissingJsonContentType(_) => AppError::invalid_request(text),
        JsonRejection::JsonDataError(_) => match field_error(&text) {
            Some((field, message)) => AppError::validation("Invalid request body")
                .with_detail(field, vec![message.to_string()]),
            None => AppError::validation("Invalid request body").with_detail("body", text),
        },
        _ => AppError::validation("Malformed JSON body").with_detail("body", text),
    }
}

/// Split "...target type: shipping_address: missing field `city`" into the
/// field path and serde's message.
fn field_error(text: &str) -> Option<(&str, &str)> {
    let (_, cause) = text.split_once("target type: ")?;
    let (field, message) = cause.split_once(": ")?;
    if field.is_empty() || field.contains(' ') {
        return None;
    }
    Some((field, message))
}
