//! Payment request / response bodies and processor objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::booking::{PaymentInfo, RefundRecord};
use crate::models::{BookingStatus, Currency, PaymentStatus};

/// A payment intent as the processor reports it. `amount` is in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.metadata.get("bookingId").map(String::as_str)
    }

    pub fn amount_major(&self) -> f64 {
        self.amount as f64 / 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIntent {
    pub amount: i64,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorRefund {
    pub id: String,
    pub amount: i64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub booking_id: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
    pub booking_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundRequest {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCreated {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    pub amount: f64,
    pub currency: String,
}

/// Payment view of one booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub booking_id: String,
    pub booking_reference: String,
    pub hotel: String,
    pub booking_status: BookingStatus,
    pub total: f64,
    pub paid_amount: f64,
    pub remaining_amount: f64,
    pub refunded_amount: f64,
    pub currency: Currency,
    pub payment: PaymentInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOutcome {
    pub refund: RefundRecord,
    pub payment_status: PaymentStatus,
    pub refunded_amount: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub total_revenue: f64,
    pub total_refunded: f64,
    pub net_revenue: f64,
    pub completed_payments: u64,
    pub average_payment: f64,
    pub by_status: BTreeMap<String, u64>,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Envelope of a processor webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
    pub object: serde_json::Value,
}
