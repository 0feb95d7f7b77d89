//! Payments and the processor webhook over HTTP, against an in-process processor.

mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use common::{bearer, test_app, test_app_with, TestApp};
use serde_json::{json, Value};
use smartlodge::core::{AppConfig, AppResult};
use smartlodge::payments::types::{NewIntent, PaymentIntent, ProcessorRefund};
use smartlodge::payments::{PaymentProvider, SignatureVerifier};
use std::sync::{Arc, Mutex};

const WEBHOOK_SECRET: &str = "whsec_integration";

/// Intents succeed as soon as they are created.
#[derive(Default)]
struct InstantProcessor {
    intents: Mutex<Vec<PaymentIntent>>,
}

#[async_trait]
impl PaymentProvider for InstantProcessor {
    fn name(&self) -> &str {
        "instant"
    }

    async fn create_intent(&self, intent: NewIntent) -> AppResult<PaymentIntent> {
        let mut intents = self.intents.lock().unwrap();
        let created = PaymentIntent {
            id: format!("pi_{}", intents.len() + 1),
            amount: intent.amount,
            currency: intent.currency,
            status: "succeeded".into(),
            client_secret: Some("pi_secret".into()),
            metadata: intent.metadata,
        };
        intents.push(created.clone());
        Ok(created)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> AppResult<PaymentIntent> {
        let intents = self.intents.lock().unwrap();
        Ok(intents.iter().find(|i| i.id == intent_id).cloned().unwrap())
    }

    async fn refund(
        &self,
        intent_id: &str,
        amount: Option<i64>,
        _reason: Option<&str>,
    ) -> AppResult<ProcessorRefund> {
        let intents = self.intents.lock().unwrap();
        let intent = intents.iter().find(|i| i.id == intent_id).unwrap();
        Ok(ProcessorRefund {
            id: format!("re_{intent_id}"),
            amount: amount.unwrap_or(intent.amount),
            status: "succeeded".into(),
        })
    }
}

fn payments_app() -> TestApp {
    let mut config = AppConfig::for_test();
    config.payments.stripe_webhook_secret = Some(WEBHOOK_SECRET.to_string());
    test_app_with(config, Some(Arc::new(InstantProcessor::default())))
}

#[tokio::test]
async fn test_intent_confirm_and_refund() {
    let app = payments_app();
    let hotel = app.seed_hotel().await;
    let guest = app.register("payer@example.com").await;
    let booking = app.book(&guest, &hotel, 30, 2).await;
    let booking_id = booking["id"].as_str().unwrap().to_string();
    let total = booking["pricing"]["total"].as_f64().unwrap();

    let intent = app
        .server
        .post("/api/payments/create-intent")
        .add_header("Authorization", bearer(&guest.token))
        .json(&json!({ "bookingId": booking_id }))
        .await;
    assert_eq!(intent.status_code(), StatusCode::OK);
    let body: Value = intent.json();
    assert_eq!(body["data"]["amount"].as_f64().unwrap(), total);
    assert_eq!(body["data"]["currency"], "usd");
    let intent_id = body["data"]["paymentIntentId"].as_str().unwrap().to_string();

    let too_much = app
        .server
        .post("/api/payments/create-intent")
        .add_header("Authorization", bearer(&guest.token))
        .json(&json!({ "bookingId": booking_id, "amount": total + 1.0 }))
        .await;
    assert_eq!(too_much.status_code(), StatusCode::BAD_REQUEST);

    let confirmed = app
        .server
        .post("/api/payments/confirm")
        .add_header("Authorization", bearer(&guest.token))
        .json(&json!({ "paymentIntentId": intent_id, "bookingId": booking_id }))
        .await;
    assert_eq!(confirmed.status_code(), StatusCode::OK);
    let body: Value = confirmed.json();
    assert_eq!(body["data"]["booking"]["status"], "confirmed");
    assert_eq!(body["data"]["booking"]["payment"]["status"], "completed");

    let details = app
        .server
        .get(&format!("/api/payments/{booking_id}"))
        .add_header("Authorization", bearer(&guest.token))
        .await;
    let body: Value = details.json();
    assert_eq!(body["data"]["payment"]["remainingAmount"], 0.0);

    let refund = app
        .server
        .post(&format!("/api/payments/{booking_id}/refund"))
        .add_header("Authorization", bearer(&guest.token))
        .json(&json!({ "amount": 50.0, "reason": "requested_by_customer" }))
        .await;
    assert_eq!(refund.status_code(), StatusCode::OK);
    let body: Value = refund.json();
    assert_eq!(body["data"]["paymentStatus"], "partially-refunded");
    assert_eq!(body["data"]["refundedAmount"], 50.0);

    let refunds = app
        .server
        .get(&format!("/api/payments/{booking_id}/refunds"))
        .add_header("Authorization", bearer(&guest.token))
        .await;
    let body: Value = refunds.json();
    assert_eq!(body["data"]["refunds"].as_array().unwrap().len(), 1);

    let history = app
        .server
        .get("/api/payments/history")
        .add_header("Authorization", bearer(&guest.token))
        .await;
    let body: Value = history.json();
    assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_payments_unavailable_without_processor() {
    let app = test_app();
    let hotel = app.seed_hotel().await;
    let guest = app.register("payer@example.com").await;
    let booking = app.book(&guest, &hotel, 30, 2).await;

    let intent = app
        .server
        .post("/api/payments/create-intent")
        .add_header("Authorization", bearer(&guest.token))
        .json(&json!({ "bookingId": booking["id"] }))
        .await;
    assert_eq!(intent.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let webhook = app
        .server
        .post("/api/payments/stripe/webhook")
        .text("{}")
        .add_header("stripe-signature", "t=1,v1=00")
        .await;
    assert_eq!(webhook.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_signed_webhook_settles_booking() {
    let app = payments_app();
    let hotel = app.seed_hotel().await;
    let guest = app.register("payer@example.com").await;
    let booking = app.book(&guest, &hotel, 30, 2).await;
    let booking_id = booking["id"].as_str().unwrap().to_string();
    let cents = (booking["pricing"]["total"].as_f64().unwrap() * 100.0).round() as i64;

    let payload = serde_json::to_vec(&json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_hook",
            "amount": cents,
            "currency": "usd",
            "status": "succeeded",
            "metadata": { "bookingId": booking_id }
        }}
    }))
    .unwrap();

    let forged = app
        .server
        .post("/api/payments/stripe/webhook")
        .bytes(payload.clone().into())
        .add_header("stripe-signature", format!("t={},v1=deadbeef", Utc::now().timestamp()))
        .await;
    assert_eq!(forged.status_code(), StatusCode::BAD_REQUEST);

    let now = Utc::now().timestamp();
    let signature = SignatureVerifier::new(WEBHOOK_SECRET).sign(now, &payload).unwrap();
    let accepted = app
        .server
        .post("/api/payments/stripe/webhook")
        .bytes(payload.into())
        .add_header("stripe-signature", format!("t={now},v1={signature}"))
        .await;
    assert_eq!(accepted.status_code(), StatusCode::OK);
    let body: Value = accepted.json();
    assert_eq!(body["received"], true);

    let stored = app.state.db.bookings.get(&booking_id).await.unwrap().unwrap();
    assert_eq!(stored.status, smartlodge::models::BookingStatus::Confirmed);
    assert_eq!(stored.pricing.remaining_amount, 0.0);
}
