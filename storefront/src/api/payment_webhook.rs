//! Payment gateway webhook handler
//!
//! POST /api/payments/webhook (raw body for signature verification)
//!
//! Anything the gateway should not retry is acknowledged with 200: processed
//! payments, replays, unknown orders and verified bodies we cannot parse.
//! Only an unauthenticated request (400) or a failed reconciliation (500)
//! gets another status.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use shared::error::{AppError, ErrorCode};

use crate::gateway::event::WebhookEvent;
use crate::gateway::{self, EVENT_ID_HEADER, SIGNATURE_HEADER};
use crate::orders;
use crate::state::AppState;

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // 1. Signature header
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Missing webhook signature header");
        return signature_rejected("Missing signature header");
    };

    // 2. Verify against the raw body
    if let Err(e) = gateway::verify_webhook_signature(
        &body,
        signature,
        &state.gateway_config.webhook_secret,
    ) {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return signature_rejected(e);
    }

    // 3. Parse
    let event = match WebhookEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(%e, "Verified webhook body could not be parsed");
            return ack(StatusCode::OK, "ignored");
        }
    };
    let event_id = headers
        .get(EVENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty());
    tracing::info!(
        event_type = %event.event_type,
        event_id = event_id.unwrap_or(""),
        "Received payment webhook"
    );

    // 4. Reconcile
    match orders::reconcile_event(state.store.as_ref(), &event, event_id).await {
        Ok(outcome) => ack(StatusCode::OK, outcome.ack()),
        Err(e) => {
            tracing::error!(error = %e, "Webhook reconciliation failed");
            ack(StatusCode::INTERNAL_SERVER_ERROR, "error")
        }
    }
}

fn ack(status: StatusCode, ack: &str) -> Response {
    (status, Json(json!({ "status": ack }))).into_response()
}

fn signature_rejected(reason: &str) -> Response {
    AppError::new(ErrorCode::WebhookSignatureInvalid)
        .with_detail("reason", reason)
        .into_response()
}
