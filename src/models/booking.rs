use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::common::{new_id, round_cents, Currency};
use crate::core::validation;
use crate::core::{AppError, AppResult};
use crate::storage::Document;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::CheckedIn,
        Self::CheckedOut,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked-in",
            Self::CheckedOut => "checked-out",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no-show",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Pending => "Pending Confirmation",
            Self::Confirmed => "Confirmed",
            Self::CheckedIn => "Checked In",
            Self::CheckedOut => "Completed",
            Self::Cancelled => "Cancelled",
            Self::NoShow => "No Show",
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, CheckedIn)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (CheckedIn, CheckedOut)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    ApplePay,
    GooglePay,
    BankTransfer,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedRoomType {
    pub room_type_id: String,
    pub name: String,
    pub max_occupancy: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayDates {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guests {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
}

impl Guests {
    /// Adults and children; infants do not take a bed.
    pub fn party_size(&self) -> u32 {
        self.adults + self.children
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.adults < 1 {
            return Err(AppError::validation("At least 1 adult is required"));
        }
        if self.adults > 20 {
            return Err(AppError::validation("Maximum 20 guests allowed"));
        }
        if self.children > 10 {
            return Err(AppError::validation("Maximum 10 children allowed"));
        }
        if self.infants > 5 {
            return Err(AppError::validation("Maximum 5 infants allowed"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryGuest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Spouse,
    Child,
    Parent,
    Sibling,
    Friend,
    Colleague,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalGuest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default)]
    pub relationship: Relationship,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestDetails {
    pub primary_guest: PrimaryGuest,
    #[serde(default)]
    pub additional_guests: Vec<AdditionalGuest>,
}

impl GuestDetails {
    pub fn validate(&self) -> AppResult<()> {
        let guest = &self.primary_guest;
        validation::require("Primary guest first name", &guest.first_name)?;
        validation::require("Primary guest last name", &guest.last_name)?;
        validation::require("Primary guest phone", &guest.phone)?;
        validation::normalize_email(&guest.email)?;
        if !validation::is_valid_phone(&guest.phone) {
            return Err(AppError::validation("Please enter a valid phone number"));
        }
        for extra in &self.additional_guests {
            if let Some(age) = extra.age {
                validation::in_range("Guest age", age, 0, 120)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxes {
    pub amount: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub name: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Percentage,
    #[default]
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub name: String,
    pub amount: f64,
    #[serde(rename = "type", default)]
    pub kind: DiscountKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPricing {
    /// Nightly seasonal price at check-in.
    pub base_price: f64,
    /// Nightly price including the room-type adjustment.
    pub room_price: f64,
    pub subtotal: f64,
    pub taxes: Taxes,
    #[serde(default)]
    pub fees: Vec<Fee>,
    #[serde(default)]
    pub discounts: Vec<Discount>,
    pub total: f64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub paid_amount: f64,
    #[serde(default)]
    pub remaining_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRecord {
    pub amount: f64,
    pub reason: String,
    pub processed_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refunds: Vec<RefundRecord>,
    /// Every processor intent already counted towards `paid_amount`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settled_intents: Vec<String>,
}

impl PaymentInfo {
    pub fn refunded_total(&self) -> f64 {
        round_cents(self.refunds.iter().map(|r| r.amount).sum())
    }

    pub fn is_settled(&self, intent_id: &str) -> bool {
        self.settled_intents.iter().any(|id| id == intent_id)
            || self.transaction_id.as_deref() == Some(intent_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmationMethod {
    Email,
    Sms,
    Phone,
    InPerson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    #[serde(default)]
    pub is_confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_method: Option<ConfirmationMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_member: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_cards: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damage {
    pub description: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_member: Option<String>,
    #[serde(default)]
    pub damages: Vec<Damage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minibar_charges: Option<f64>,
    #[serde(default)]
    pub additional_charges: Vec<Charge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialRequestType {
    Accessibility,
    Dietary,
    RoomPreference,
    Celebration,
    Transportation,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Fulfilled,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialRequest {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SpecialRequestType,
    pub description: String,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancellationReason {
    GuestRequest,
    HotelIssue,
    PaymentFailed,
    ForceMajeure,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<CancellationReason>,
    #[serde(default)]
    pub refund_amount: f64,
    #[serde(default)]
    pub cancellation_fee: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommunicationType {
    Email,
    Sms,
    Phone,
    InApp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    #[serde(rename = "type")]
    pub kind: CommunicationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub sent_by: String,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingLoyalty {
    #[serde(default)]
    pub points_earned: u64,
    #[serde(default)]
    pub points_redeemed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BookingSource {
    #[default]
    Website,
    MobileApp,
    Phone,
    WalkIn,
    ThirdParty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingMetadata {
    #[serde(default)]
    pub source: BookingSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// A reservation of one room of one room type for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub booking_reference: String,
    pub user: String,
    pub hotel: String,
    pub room_type: BookedRoomType,
    pub dates: StayDates,
    pub guests: Guests,
    pub guest_details: GuestDetails,
    pub pricing: BookingPricing,
    #[serde(default)]
    pub payment: PaymentInfo,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub confirmation: Confirmation,
    #[serde(default)]
    pub checkin: CheckinRecord,
    #[serde(default)]
    pub checkout: CheckoutRecord,
    #[serde(default)]
    pub special_requests: Vec<SpecialRequest>,
    #[serde(default)]
    pub cancellation: Cancellation,
    #[serde(default)]
    pub communication: Vec<Communication>,
    #[serde(default)]
    pub loyalty_program: BookingLoyalty,
    #[serde(default)]
    pub metadata: BookingMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// `SL` + base36 millisecond timestamp + three random base36 characters.
    pub fn generate_reference() -> String {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let mut rng = rand::thread_rng();
        let suffix: String = (0..3)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        format!("SL{}{}", to_base36(millis), suffix)
    }

    /// Whole days between check-in and check-out.
    pub fn calculate_nights(check_in: NaiveDate, check_out: NaiveDate) -> u32 {
        (check_out - check_in).num_days().unsigned_abs() as u32
    }

    pub fn total_guests(&self) -> u32 {
        self.guests.adults + self.guests.children + self.guests.infants
    }

    pub fn status_display(&self) -> &'static str {
        self.status.display()
    }

    /// Check-in instant: the check-in date at midnight UTC.
    pub fn check_in_at(&self) -> DateTime<Utc> {
        self.dates.check_in.and_time(NaiveTime::MIN).and_utc()
    }

    fn hours_until_check_in(&self, now: DateTime<Utc>) -> f64 {
        (self.check_in_at() - now).num_seconds() as f64 / 3600.0
    }

    /// Days until check-in, rounded up.
    pub fn days_until_check_in(&self, now: DateTime<Utc>) -> i64 {
        (self.hours_until_check_in(now) / 24.0).ceil() as i64
    }

    /// Recompute the outstanding balance after price or payment changes.
    pub fn refresh_amounts(&mut self) {
        let pricing = &mut self.pricing;
        pricing.remaining_amount = round_cents((pricing.total - pricing.paid_amount).max(0.0));
        self.dates.nights = Self::calculate_nights(self.dates.check_in, self.dates.check_out);
    }

    /// Guests may cancel until 24 hours before check-in.
    pub fn can_cancel(&self, now: DateTime<Utc>) -> bool {
        self.hours_until_check_in(now) > 24.0
            && !self.cancellation.is_cancelled
            && self.status != BookingStatus::Cancelled
    }

    pub fn cancellation_fee(&self, now: DateTime<Utc>) -> f64 {
        let hours = self.hours_until_check_in(now);
        let rate = if hours <= 24.0 {
            1.0
        } else if hours <= 72.0 {
            0.5
        } else if hours <= 168.0 {
            0.25
        } else {
            0.0
        };
        round_cents(self.pricing.total * rate)
    }

    pub fn add_communication(
        &mut self,
        kind: CommunicationType,
        subject: Option<String>,
        message: String,
        sent_by: Option<String>,
    ) {
        self.communication.push(Communication {
            kind,
            subject,
            message,
            sent_at: Utc::now(),
            sent_by: sent_by.unwrap_or_else(|| "System".to_string()),
            read: false,
        });
    }

    /// Stay intersects the half-open range `[start, end)`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.dates.check_in < end && self.dates.check_out > start
    }

    /// Holds a room: pending, confirmed or checked in.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::CheckedIn
        )
    }

    pub fn transition(&mut self, next: BookingStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "Cannot change booking status from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn add_special_request(&mut self, mut request: SpecialRequest) -> AppResult<&SpecialRequest> {
        validation::require("Request description", &request.description)?;
        validation::non_negative("Cost", request.cost)?;
        request.id = new_id();
        request.status = RequestStatus::Pending;
        self.special_requests.push(request);
        Ok(&self.special_requests[self.special_requests.len() - 1])
    }

    /// Field checks for a new stay. `today` bounds the check-in date.
    pub fn validate_new(&self, today: NaiveDate) -> AppResult<()> {
        if self.dates.check_in < today {
            return Err(AppError::validation("Check-in date cannot be in the past"));
        }
        self.validate()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.dates.check_out <= self.dates.check_in {
            return Err(AppError::validation(
                "Check-out date must be after check-in date",
            ));
        }
        if self.dates.nights < 1 {
            return Err(AppError::validation("Minimum 1 night stay required"));
        }
        self.guests.validate()?;
        self.guest_details.validate()?;
        let pricing = &self.pricing;
        for (field, value) in [
            ("Base price", pricing.base_price),
            ("Room price", pricing.room_price),
            ("Subtotal", pricing.subtotal),
            ("Tax amount", pricing.taxes.amount),
            ("Total amount", pricing.total),
            ("Paid amount", pricing.paid_amount),
        ] {
            validation::non_negative(field, value)?;
        }
        validation::in_range("Tax rate", pricing.taxes.rate, 0.0, 1.0)?;
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Document for Booking {
    const COLLECTION: &'static str = "bookings";

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("bookingReference", self.booking_reference.clone())]
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
