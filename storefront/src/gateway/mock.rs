//! Scripted gateway for tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use super::{CreateGatewayOrder, GatewayError, GatewayOrder, PaymentGateway};

#[derive(Default)]
pub struct MockGateway {
    fail: AtomicBool,
    counter: AtomicU64,
    calls: Mutex<Vec<CreateGatewayOrder>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if the gateway were down
    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.fail.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn calls(&self) -> Vec<CreateGatewayOrder> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        request: &CreateGatewayOrder,
    ) -> Result<GatewayOrder, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 502,
                body: "mock gateway outage".into(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_mock_{n}"),
            amount: request.amount,
            currency: request.currency.clone(),
        })
    }
}
