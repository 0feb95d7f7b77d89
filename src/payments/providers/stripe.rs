//! Stripe REST client (form-encoded requests, bearer secret key)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use super::r#trait::PaymentProvider;
use crate::core::{AppError, AppResult};
use crate::payments::types::{NewIntent, PaymentIntent, ProcessorRefund};

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

pub struct StripeProvider {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl StripeProvider {
    pub fn new(api_url: &str, secret_key: &str, timeout_secs: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let detail = response.json::<StripeErrorBody>().await.ok().map(|b| b.error);
        if status.is_client_error() {
            let message = detail
                .as_ref()
                .and_then(|d| d.message.clone())
                .unwrap_or_else(|| "Payment request was rejected".to_string());
            warn!(
                status = status.as_u16(),
                kind = detail.and_then(|d| d.kind).unwrap_or_default(),
                "stripe rejected request"
            );
            return Err(AppError::Payment(message));
        }
        Err(AppError::Upstream(format!("stripe returned {status}")))
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create_intent(&self, intent: NewIntent) -> AppResult<PaymentIntent> {
        let mut form = vec![
            ("amount".to_string(), intent.amount.to_string()),
            ("currency".to_string(), intent.currency.to_lowercase()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        form.extend(
            intent
                .metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
        );

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;
        let created: PaymentIntent = Self::read(response).await?;
        info!(intent_id = %created.id, amount = created.amount, "stripe payment intent created");
        Ok(created)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> AppResult<PaymentIntent> {
        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.api_url, intent_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn refund(
        &self,
        intent_id: &str,
        amount: Option<i64>,
        reason: Option<&str>,
    ) -> AppResult<ProcessorRefund> {
        let mut form = vec![("payment_intent".to_string(), intent_id.to_string())];
        if let Some(amount) = amount {
            form.push(("amount".to_string(), amount.to_string()));
        }
        if let Some(reason) = reason {
            form.push(("metadata[reason]".to_string(), reason.to_string()));
        }

        let response = self
            .client
            .post(format!("{}/v1/refunds", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;
        let refund: ProcessorRefund = Self::read(response).await?;
        info!(refund_id = %refund.id, intent_id, "stripe refund created");
        Ok(refund)
    }
}
