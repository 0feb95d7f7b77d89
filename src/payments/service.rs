//! Booking payments on top of a [`PaymentProvider`].

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::providers::PaymentProvider;
use super::signature::SignatureVerifier;
use super::types::*;
use crate::core::{AppError, AppResult};
use crate::models::booking::RefundRecord;
use crate::models::{round_cents, Booking, BookingStatus, PaymentStatus, User};
use crate::services::access;
use crate::storage::{Database, Page};

/// Payment states that mean money changed hands.
const SETTLED: [PaymentStatus; 3] = [
    PaymentStatus::Completed,
    PaymentStatus::Refunded,
    PaymentStatus::PartiallyRefunded,
];

pub struct PaymentService {
    db: Database,
    provider: Option<Arc<dyn PaymentProvider>>,
    webhook: Option<SignatureVerifier>,
}

impl PaymentService {
    pub fn new(
        db: Database,
        provider: Option<Arc<dyn PaymentProvider>>,
        webhook_secret: Option<&str>,
    ) -> Self {
        Self {
            db,
            provider,
            webhook: webhook_secret.filter(|s| !s.is_empty()).map(SignatureVerifier::new),
        }
    }

    fn provider(&self) -> AppResult<&dyn PaymentProvider> {
        self.provider
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("Payment processing is not configured".to_string()))
    }

    async fn booking(&self, booking_id: &str) -> AppResult<Booking> {
        self.db
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found("Booking"))
    }

    pub async fn create_intent(
        &self,
        user: &User,
        req: CreateIntentRequest,
    ) -> AppResult<IntentCreated> {
        let mut booking = self.booking(&req.booking_id).await?;
        if booking.user != user.id {
            return Err(AppError::forbidden("Access denied"));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::BadRequest("Cannot pay for a cancelled booking".to_string()));
        }

        let remaining = booking.pricing.remaining_amount;
        if remaining <= 0.0 {
            return Err(AppError::BadRequest("Booking is already paid".to_string()));
        }
        let amount = round_cents(req.amount.unwrap_or(remaining));
        if amount <= 0.0 {
            return Err(AppError::validation("Amount must be greater than zero"));
        }
        if amount > remaining {
            return Err(AppError::validation(format!(
                "Amount cannot exceed the remaining balance of {remaining:.2}"
            )));
        }

        let currency = req
            .currency
            .unwrap_or_else(|| booking.pricing.currency.code().to_string())
            .to_lowercase();
        let intent = self
            .provider()?
            .create_intent(NewIntent {
                amount: (amount * 100.0).round() as i64,
                currency: currency.clone(),
                metadata: BTreeMap::from([
                    ("bookingId".to_string(), booking.id.clone()),
                    ("userId".to_string(), user.id.clone()),
                    ("bookingReference".to_string(), booking.booking_reference.clone()),
                ]),
            })
            .await?;

        booking.payment.payment_intent_id = Some(intent.id.clone());
        if booking.pricing.paid_amount <= 0.0 {
            booking.payment.status = PaymentStatus::Processing;
        }
        booking.touch();
        self.db.bookings.replace(&booking).await?;

        info!(intent_id = %intent.id, booking_id = %booking.id, "payment intent created");
        Ok(IntentCreated {
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
            amount,
            currency,
        })
    }

    pub async fn confirm(&self, user: &User, req: ConfirmPaymentRequest) -> AppResult<Booking> {
        let intent = self.provider()?.retrieve_intent(&req.payment_intent_id).await?;
        if !intent.succeeded() {
            return Err(AppError::Payment("Payment not completed".to_string()));
        }

        let booking = self.booking(&req.booking_id).await?;
        if booking.user != user.id {
            return Err(AppError::forbidden("Access denied"));
        }
        if intent.booking_id().is_some_and(|id| id != booking.id) {
            return Err(AppError::BadRequest(
                "Payment intent does not belong to this booking".to_string(),
            ));
        }

        let booking = self.settle(booking, &intent).await?;
        info!(booking_id = %booking.id, intent_id = %intent.id, "payment confirmed");
        Ok(booking)
    }

    /// Record a succeeded intent on its booking. Applying the same intent twice is a no-op.
    async fn settle(&self, mut booking: Booking, intent: &PaymentIntent) -> AppResult<Booking> {
        if booking.payment.is_settled(&intent.id) {
            return Ok(booking);
        }

        booking.payment.status = PaymentStatus::Completed;
        booking.payment.payment_date = Some(Utc::now());
        booking.payment.transaction_id = Some(intent.id.clone());
        booking.payment.payment_intent_id = Some(intent.id.clone());
        booking.payment.settled_intents.push(intent.id.clone());
        booking.pricing.paid_amount =
            round_cents(booking.pricing.paid_amount + intent.amount_major());
        if booking.status == BookingStatus::Pending {
            booking.transition(BookingStatus::Confirmed)?;
            booking.confirmation.is_confirmed = true;
            booking.confirmation.confirmed_at = Some(Utc::now());
        }
        booking.refresh_amounts();
        booking.touch();
        self.db.bookings.replace(&booking).await?;
        Ok(booking)
    }

    pub async fn history(&self, user: &User, page: u64, limit: u64) -> AppResult<Page<Booking>> {
        let user_id = user.id.clone();
        Ok(self
            .db
            .bookings
            .paginate(
                move |b| b.user == user_id && SETTLED.contains(&b.payment.status),
                |a, b| b.payment.payment_date.cmp(&a.payment.payment_date),
                page,
                limit,
            )
            .await?)
    }

    pub async fn details(&self, user: &User, booking_id: &str) -> AppResult<PaymentDetails> {
        let booking = self.booking(booking_id).await?;
        access::ensure_owner(user, &booking.user)?;
        Ok(details_of(booking))
    }

    pub async fn refunds(&self, user: &User, booking_id: &str) -> AppResult<Vec<RefundRecord>> {
        let booking = self.booking(booking_id).await?;
        access::ensure_owner(user, &booking.user)?;
        Ok(booking.payment.refunds)
    }

    /// Refund part or all of what was paid. Owners and admins only.
    pub async fn refund(
        &self,
        user: &User,
        booking_id: &str,
        req: RefundRequest,
    ) -> AppResult<RefundOutcome> {
        let booking = self.booking(booking_id).await?;
        access::ensure_owner(user, &booking.user)?;
        self.refund_booking(booking, req.amount, req.reason, &user.id).await
    }

    pub(crate) async fn refund_booking(
        &self,
        mut booking: Booking,
        amount: Option<f64>,
        reason: Option<String>,
        requested_by: &str,
    ) -> AppResult<RefundOutcome> {
        if !matches!(
            booking.payment.status,
            PaymentStatus::Completed | PaymentStatus::PartiallyRefunded
        ) {
            return Err(AppError::BadRequest("No completed payment to refund".to_string()));
        }
        let intent_id = booking
            .payment
            .payment_intent_id
            .clone()
            .or_else(|| booking.payment.transaction_id.clone())
            .ok_or_else(|| AppError::BadRequest("Booking has no payment reference".to_string()))?;

        let refundable = round_cents(booking.pricing.paid_amount - booking.payment.refunded_total());
        let amount = round_cents(amount.unwrap_or(refundable));
        if amount <= 0.0 {
            return Err(AppError::validation("Refund amount must be greater than zero"));
        }
        if amount > refundable {
            return Err(AppError::validation(format!(
                "Refund amount cannot exceed {refundable:.2}"
            )));
        }

        let reason = reason.unwrap_or_else(|| "requested_by_customer".to_string());
        let processed = self
            .provider()?
            .refund(&intent_id, Some((amount * 100.0).round() as i64), Some(&reason))
            .await?;

        let record = RefundRecord {
            amount,
            reason,
            processed_date: Utc::now(),
            transaction_id: Some(processed.id),
        };
        booking.payment.refunds.push(record.clone());
        let refunded = booking.payment.refunded_total();
        booking.payment.status = if refunded >= booking.pricing.paid_amount {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        booking.touch();
        self.db.bookings.replace(&booking).await?;

        info!(booking_id = %booking.id, amount, requested_by, "refund processed");
        Ok(RefundOutcome {
            refund: record,
            payment_status: booking.payment.status,
            refunded_amount: refunded,
        })
    }

    pub async fn admin_refund(
        &self,
        booking_id: &str,
        req: RefundRequest,
        admin: &User,
    ) -> AppResult<RefundOutcome> {
        let booking = self.booking(booking_id).await?;
        self.refund_booking(booking, req.amount, req.reason, &admin.id).await
    }

    /// Every booking that has entered the payment flow.
    pub async fn list_all(
        &self,
        status: Option<PaymentStatus>,
        page: u64,
        limit: u64,
    ) -> AppResult<Page<PaymentDetails>> {
        let page = self
            .db
            .bookings
            .paginate(
                move |b| {
                    let in_flow = b.payment.payment_intent_id.is_some()
                        || b.payment.status != PaymentStatus::Pending;
                    in_flow && status.map_or(true, |s| b.payment.status == s)
                },
                |a, b| b.updated_at.cmp(&a.updated_at),
                page,
                limit,
            )
            .await?;
        Ok(page.map(details_of))
    }

    pub async fn stats(&self) -> AppResult<PaymentStats> {
        let bookings = self.db.bookings.list().await?;
        let mut stats = PaymentStats::default();
        for booking in &bookings {
            let key = serde_json::to_value(booking.payment.status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            *stats.by_status.entry(key).or_default() += 1;

            if SETTLED.contains(&booking.payment.status) {
                stats.completed_payments += 1;
                stats.total_revenue += booking.pricing.paid_amount;
                stats.total_refunded += booking.payment.refunded_total();
            }
        }
        stats.total_revenue = round_cents(stats.total_revenue);
        stats.total_refunded = round_cents(stats.total_refunded);
        stats.net_revenue = round_cents(stats.total_revenue - stats.total_refunded);
        if stats.completed_payments > 0 {
            stats.average_payment =
                round_cents(stats.total_revenue / stats.completed_payments as f64);
        }
        stats.generated_at = Some(Utc::now());
        Ok(stats)
    }

    /// Verify and apply a processor webhook.
    pub async fn handle_webhook(
        &self,
        signature: Option<&str>,
        payload: &[u8],
        now: i64,
    ) -> AppResult<()> {
        let verifier = self
            .webhook
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Payment webhooks are not configured".to_string()))?;
        let signature = signature
            .ok_or_else(|| AppError::BadRequest("Webhook Error: missing signature".to_string()))?;
        if let Err(err) = verifier.verify(signature, payload, now) {
            error!("webhook signature verification failed: {}", err);
            return Err(err);
        }

        let event: PaymentEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Webhook Error: {e}")))?;
        match event.kind.as_str() {
            "payment_intent.succeeded" => {
                let intent = parse_intent(event.data.object)?;
                let Some(booking_id) = intent.booking_id() else {
                    return Ok(());
                };
                match self.db.bookings.get(booking_id).await? {
                    Some(booking) => {
                        self.settle(booking, &intent).await?;
                        info!(booking_id, "payment succeeded via webhook");
                    }
                    None => warn!(booking_id, "webhook references unknown booking"),
                }
            }
            "payment_intent.payment_failed" => {
                let intent = parse_intent(event.data.object)?;
                let Some(booking_id) = intent.booking_id() else {
                    return Ok(());
                };
                if let Some(mut booking) = self.db.bookings.get(booking_id).await? {
                    let awaiting = matches!(
                        booking.payment.status,
                        PaymentStatus::Pending | PaymentStatus::Processing
                    );
                    let current =
                        booking.payment.payment_intent_id.as_deref() == Some(intent.id.as_str());
                    if !(awaiting && current) {
                        warn!(booking_id, intent_id = %intent.id, "ignoring failure for a stale intent");
                        return Ok(());
                    }
                    booking.payment.status = PaymentStatus::Failed;
                    booking.touch();
                    self.db.bookings.replace(&booking).await?;
                    error!(booking_id, "payment failed via webhook");
                }
            }
            other => info!(event = other, id = %event.id, "unhandled payment event"),
        }
        Ok(())
    }
}

fn parse_intent(object: serde_json::Value) -> AppResult<PaymentIntent> {
    serde_json::from_value(object).map_err(|e| AppError::BadRequest(format!("Webhook Error: {e}")))
}

fn details_of(booking: Booking) -> PaymentDetails {
    PaymentDetails {
        refunded_amount: booking.payment.refunded_total(),
        booking_id: booking.id,
        booking_reference: booking.booking_reference,
        hotel: booking.hotel,
        booking_status: booking.status,
        total: booking.pricing.total,
        paid_amount: booking.pricing.paid_amount,
        remaining_amount: booking.pricing.remaining_amount,
        currency: booking.pricing.currency,
        payment: booking.payment,
    }
}
