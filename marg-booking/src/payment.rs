use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use marg_core::payment::{PaymentAdapter, PaymentReceipt};
use marg_core::BoxedError;
use marg_shared::models::PaymentMethod;

/// Simulated payment provider. The product this engine backs never charges a
/// real gateway; the adapter seam is where one would go.
pub struct MockPaymentAdapter {
    decline: bool,
}

impl MockPaymentAdapter {
    pub fn new() -> Self {
        Self { decline: false }
    }

    /// An adapter that declines every charge, for rollback tests.
    pub fn declining() -> Self {
        Self { decline: true }
    }
}

impl Default for MockPaymentAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn charge(
        &self,
        booking_id: Uuid,
        amount: i64,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt, BoxedError> {
        if self.decline {
            return Err("Simulated payment gateway decline".into());
        }
        Ok(PaymentReceipt {
            reference: format!("mock_pay_{}", booking_id.simple()),
            booking_id,
            amount,
            method,
            processed_at: Utc::now(),
        })
    }
}
