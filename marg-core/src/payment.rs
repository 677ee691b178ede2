use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BoxedError;
use marg_shared::models::PaymentMethod;

/// Provider-side record of a completed charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub booking_id: Uuid,
    pub amount: i64,
    pub method: PaymentMethod,
    pub processed_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Charge the passenger for one booking. Payment here is synchronous
    /// and single-shot; retry policy belongs to the caller.
    async fn charge(
        &self,
        booking_id: Uuid,
        amount: i64,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt, BoxedError>;
}
