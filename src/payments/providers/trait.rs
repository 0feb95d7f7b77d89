use async_trait::async_trait;

use crate::core::AppResult;
use crate::payments::types::{NewIntent, PaymentIntent, ProcessorRefund};

/// A payment processor able to take and return money for a booking.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn create_intent(&self, intent: NewIntent) -> AppResult<PaymentIntent>;

    async fn retrieve_intent(&self, intent_id: &str) -> AppResult<PaymentIntent>;

    /// Refund `amount` cents of a captured intent; `None` refunds the rest.
    async fn refund(
        &self,
        intent_id: &str,
        amount: Option<i64>,
        reason: Option<&str>,
    ) -> AppResult<ProcessorRefund>;
}
