//! Reservations: creation, guest changes, cancellation and the front-desk lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use super::access;
use crate::core::{validation, AppError, AppResult};
use crate::models::booking::*;
use crate::models::hotel::RoomType;
use crate::models::{round_cents, Hotel, User};
use crate::storage::{page_limit, Database, Page, StorageError};

/// Reference collisions tolerated before giving up on an insert.
const REFERENCE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub hotel_id: String,
    pub room_type_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: Guests,
    pub guest_details: GuestDetails,
    #[serde(default)]
    pub special_requests: Vec<SpecialRequest>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub source: Option<BookingSource>,
}

/// Request context recorded on a new booking.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<Guests>,
    pub guest_details: Option<GuestDetails>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<CancellationReason>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub method: Option<ConfirmationMethod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub room_number: Option<String>,
    pub key_cards: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub notes: Option<String>,
    #[serde(default)]
    pub damages: Vec<Damage>,
    pub minibar_charges: Option<f64>,
    #[serde(default)]
    pub additional_charges: Vec<Charge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecialRequestUpdate {
    pub status: RequestStatus,
    #[serde(default)]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommunicationRequest {
    #[serde(rename = "type", default = "in_app")]
    pub kind: CommunicationType,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

fn in_app() -> CommunicationType {
    CommunicationType::InApp
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<BookingStatus>,
    pub hotel: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub hotel: Option<String>,
}

/// Front-desk view of one day at a hotel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBookings {
    pub date: NaiveDate,
    pub arrivals: Vec<Booking>,
    pub departures: Vec<Booking>,
    pub in_house: Vec<Booking>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStats {
    pub total_bookings: u64,
    pub active_bookings: u64,
    pub by_status: BTreeMap<String, u64>,
    pub total_revenue: f64,
    pub average_booking_value: f64,
    pub average_nights: f64,
    pub cancellation_rate: f64,
    pub upcoming_check_ins: u64,
}

impl BookingStats {
    fn from_bookings<'a>(bookings: impl IntoIterator<Item = &'a Booking>, now: DateTime<Utc>) -> Self {
        let mut stats = Self::default();
        let mut value = 0.0;
        let mut nights = 0u64;
        let mut cancelled = 0u64;
        let week_ahead = now.date_naive() + chrono::Duration::days(7);

        for booking in bookings {
            stats.total_bookings += 1;
            *stats.by_status.entry(booking.status.as_str().to_string()).or_default() += 1;
            value += booking.pricing.total;
            nights += u64::from(booking.dates.nights);
            stats.total_revenue += booking.pricing.paid_amount - booking.payment.refunded_total();
            if booking.is_active() {
                stats.active_bookings += 1;
            }
            if booking.status == BookingStatus::Cancelled {
                cancelled += 1;
            }
            if matches!(booking.status, BookingStatus::Pending | BookingStatus::Confirmed)
                && booking.dates.check_in >= now.date_naive()
                && booking.dates.check_in <= week_ahead
            {
                stats.upcoming_check_ins += 1;
            }
        }

        stats.total_revenue = round_cents(stats.total_revenue);
        if stats.total_bookings > 0 {
            let count = stats.total_bookings as f64;
            stats.average_booking_value = round_cents(value / count);
            stats.average_nights = round_cents(nights as f64 / count);
            stats.cancellation_rate = round_cents(cancelled as f64 / count);
        }
        stats
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSummary {
    pub hotel: String,
    pub bookings: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReport {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub summary: BookingStats,
    pub by_hotel: Vec<HotelSummary>,
    pub generated_at: DateTime<Utc>,
}

/// Price a stay for `room` with the guest's loyalty discount applied to the subtotal.
pub fn price_stay(
    hotel: &Hotel,
    room: &RoomType,
    check_in: NaiveDate,
    nights: u32,
    guest: &User,
) -> BookingPricing {
    let quote = hotel.calculate_total_price(nights, Some(&room.id), check_in);

    let mut fees = Vec::new();
    if quote.service_charge > 0.0 {
        fees.push(Fee {
            name: "Service charge".to_string(),
            amount: quote.service_charge,
            description: None,
        });
    }

    let mut discounts = Vec::new();
    let percentage = guest.discount_percentage();
    let discount = round_cents(quote.subtotal * f64::from(percentage) / 100.0);
    if discount > 0.0 {
        discounts.push(Discount {
            name: format!(
                "{:?} member discount ({percentage}%)",
                guest.loyalty_program.membership_level
            ),
            amount: discount,
            kind: DiscountKind::Percentage,
            code: None,
        });
    }

    BookingPricing {
        base_price: quote.seasonal_price,
        room_price: quote.base_price,
        subtotal: quote.subtotal,
        taxes: Taxes { amount: quote.tax, rate: quote.tax_rate },
        fees,
        discounts,
        total: round_cents((quote.total - discount).max(0.0)),
        currency: hotel.pricing.currency,
        paid_amount: 0.0,
        remaining_amount: 0.0,
    }
}

pub struct BookingService {
    db: Database,
}

impl BookingService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn load(&self, booking_id: &str) -> AppResult<Booking> {
        self.db
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found("Booking"))
    }

    async fn hotel(&self, hotel_id: &str) -> AppResult<Hotel> {
        self.db
            .hotels
            .get(hotel_id)
            .await?
            .ok_or_else(|| AppError::not_found("Hotel"))
    }

    /// Load a booking for the staff of its hotel.
    async fn load_for_staff(&self, user: &User, booking_id: &str) -> AppResult<Booking> {
        let booking = self.load(booking_id).await?;
        if !user.is_admin() {
            let hotel = self.hotel(&booking.hotel).await?;
            access::ensure_staff(user, &hotel)?;
        }
        Ok(booking)
    }

    async fn load_for_owner(&self, user: &User, booking_id: &str) -> AppResult<Booking> {
        let booking = self.load(booking_id).await?;
        access::ensure_owner(user, &booking.user)?;
        Ok(booking)
    }

    async fn save(&self, booking: &mut Booking) -> AppResult<()> {
        booking.refresh_amounts();
        booking.validate()?;
        booking.touch();
        self.db.bookings.replace(booking).await?;
        Ok(())
    }

    /// Rooms of `room` free over the range, ignoring `except` (the booking being changed).
    async fn free_rooms(
        &self,
        hotel: &Hotel,
        room: &RoomType,
        check_in: NaiveDate,
        check_out: NaiveDate,
        except: Option<&str>,
    ) -> AppResult<u32> {
        let bookings = self
            .db
            .bookings
            .find(|b| b.hotel == hotel.id && b.is_active() && Some(b.id.as_str()) != except)
            .await?;
        Ok(hotel.free_rooms(room, check_in, check_out, &bookings))
    }

    pub async fn create(
        &self,
        user: &User,
        req: CreateBookingRequest,
        meta: RequestMeta,
    ) -> AppResult<Booking> {
        let hotel = self.hotel(&req.hotel_id).await?;
        if !hotel.is_active() {
            return Err(AppError::BadRequest(
                "Hotel is not accepting bookings".to_string(),
            ));
        }
        let room = hotel
            .room_type(&req.room_type_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Room type"))?;

        if req.check_out <= req.check_in {
            return Err(AppError::validation(
                "Check-out date must be after check-in date",
            ));
        }
        req.guests.validate()?;
        if req.guests.party_size() > room.max_occupancy {
            return Err(AppError::validation(format!(
                "{} accommodates at most {} guests",
                room.name, room.max_occupancy
            )));
        }
        if self.free_rooms(&hotel, &room, req.check_in, req.check_out, None).await? == 0 {
            return Err(AppError::Conflict(
                "No rooms of this type are available for the selected dates".to_string(),
            ));
        }

        let nights = Booking::calculate_nights(req.check_in, req.check_out);
        let now = Utc::now();
        let mut booking = Booking {
            id: crate::models::common::new_id(),
            booking_reference: Booking::generate_reference(),
            user: user.id.clone(),
            hotel: hotel.id.clone(),
            room_type: BookedRoomType {
                room_type_id: room.id.clone(),
                name: room.name.clone(),
                max_occupancy: room.max_occupancy,
            },
            dates: StayDates { check_in: req.check_in, check_out: req.check_out, nights },
            guests: req.guests,
            guest_details: req.guest_details,
            pricing: price_stay(&hotel, &room, req.check_in, nights, user),
            payment: PaymentInfo { method: req.payment_method, ..Default::default() },
            status: BookingStatus::Pending,
            confirmation: Confirmation::default(),
            checkin: CheckinRecord::default(),
            checkout: CheckoutRecord::default(),
            special_requests: Vec::new(),
            cancellation: Cancellation::default(),
            communication: Vec::new(),
            loyalty_program: BookingLoyalty::default(),
            metadata: BookingMetadata {
                source: req.source.unwrap_or_default(),
                user_agent: meta.user_agent,
                ip_address: meta.ip_address,
                referrer: meta.referrer,
            },
            created_at: now,
            updated_at: now,
        };
        for request in req.special_requests {
            booking.add_special_request(request)?;
        }
        booking.refresh_amounts();
        booking.validate_new(now.date_naive())?;
        booking.add_communication(
            CommunicationType::InApp,
            Some("Booking received".to_string()),
            format!("Booking {} has been received.", booking.booking_reference),
            None,
        );

        let mut attempts = 0;
        loop {
            match self.db.bookings.insert(&booking).await {
                Ok(()) => break,
                Err(StorageError::Duplicate { .. }) if attempts + 1 < REFERENCE_ATTEMPTS => {
                    attempts += 1;
                    warn!(reference = %booking.booking_reference, "booking reference collision");
                    booking.booking_reference = Booking::generate_reference();
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            reference = %booking.booking_reference,
            hotel_id = %hotel.id,
            by = %user.email,
            total = booking.pricing.total,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<BookingStatus>,
        page: u64,
        limit: u64,
    ) -> AppResult<Page<Booking>> {
        let user_id = user_id.to_string();
        Ok(self
            .db
            .bookings
            .paginate(
                move |b| b.user == user_id && status.map_or(true, |s| b.status == s),
                |a, b| b.created_at.cmp(&a.created_at),
                page,
                limit,
            )
            .await?)
    }

    pub async fn get(&self, user: &User, booking_id: &str) -> AppResult<Booking> {
        self.load_for_owner(user, booking_id).await
    }

    /// Guests may change dates, party and contact details while the stay is still ahead.
    pub async fn update(
        &self,
        user: &User,
        booking_id: &str,
        req: UpdateBookingRequest,
    ) -> AppResult<Booking> {
        let mut booking = self.load_for_owner(user, booking_id).await?;
        if !matches!(booking.status, BookingStatus::Pending | BookingStatus::Confirmed) {
            return Err(AppError::BadRequest(format!(
                "A {} booking cannot be modified",
                booking.status.as_str()
            )));
        }

        let hotel = self.hotel(&booking.hotel).await?;
        let room = hotel
            .room_type(&booking.room_type.room_type_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Room type"))?;

        if let Some(details) = req.guest_details {
            details.validate()?;
            booking.guest_details = details;
        }
        if let Some(guests) = req.guests {
            guests.validate()?;
            if guests.party_size() > room.max_occupancy {
                return Err(AppError::validation(format!(
                    "{} accommodates at most {} guests",
                    room.name, room.max_occupancy
                )));
            }
            booking.guests = guests;
        }
        if let Some(method) = req.payment_method {
            booking.payment.method = Some(method);
        }

        let check_in = req.check_in.unwrap_or(booking.dates.check_in);
        let check_out = req.check_out.unwrap_or(booking.dates.check_out);
        if (check_in, check_out) != (booking.dates.check_in, booking.dates.check_out) {
            if check_out <= check_in {
                return Err(AppError::validation(
                    "Check-out date must be after check-in date",
                ));
            }
            if check_in < Utc::now().date_naive() {
                return Err(AppError::validation("Check-in date cannot be in the past"));
            }
            if self
                .free_rooms(&hotel, &room, check_in, check_out, Some(&booking.id))
                .await?
                == 0
            {
                return Err(AppError::Conflict(
                    "No rooms of this type are available for the selected dates".to_string(),
                ));
            }

            let owner = self.db.users.get(&booking.user).await?.unwrap_or_else(|| user.clone());
            let nights = Booking::calculate_nights(check_in, check_out);
            let paid = booking.pricing.paid_amount;
            booking.pricing = BookingPricing {
                paid_amount: paid,
                ..price_stay(&hotel, &room, check_in, nights, &owner)
            };
            booking.dates = StayDates { check_in, check_out, nights };
            booking.add_communication(
                CommunicationType::InApp,
                Some("Dates changed".to_string()),
                format!("Stay moved to {check_in} - {check_out}."),
                None,
            );
        }

        self.save(&mut booking).await?;
        info!(reference = %booking.booking_reference, by = %user.email, "booking updated");
        Ok(booking)
    }

    /// Cancel at `now`. Guests must cancel more than 24 hours ahead; admins may cancel any time.
    pub async fn cancel(
        &self,
        user: &User,
        booking_id: &str,
        req: CancelRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let mut booking = self.load_for_owner(user, booking_id).await?;
        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(AppError::BadRequest(format!(
                "A {} booking cannot be cancelled",
                booking.status.as_str()
            )));
        }
        if !user.is_admin() && !booking.can_cancel(now) {
            return Err(AppError::BadRequest(
                "Bookings can only be cancelled more than 24 hours before check-in".to_string(),
            ));
        }

        let fee = booking.cancellation_fee(now);
        let refund = round_cents((booking.pricing.paid_amount - fee).max(0.0));
        booking.transition(BookingStatus::Cancelled)?;
        booking.cancellation = Cancellation {
            is_cancelled: true,
            cancelled_at: Some(now),
            reason: Some(req.reason.unwrap_or(CancellationReason::GuestRequest)),
            refund_amount: refund,
            cancellation_fee: fee,
        };
        booking.add_communication(
            CommunicationType::Email,
            Some("Booking cancelled".to_string()),
            format!(
                "Booking {} was cancelled. Cancellation fee {fee:.2}, refund due {refund:.2}.",
                booking.booking_reference
            ),
            None,
        );
        self.save(&mut booking).await?;

        info!(reference = %booking.booking_reference, fee, refund, by = %user.email, "booking cancelled");
        Ok(booking)
    }

    pub async fn add_special_request(
        &self,
        user: &User,
        booking_id: &str,
        request: SpecialRequest,
    ) -> AppResult<SpecialRequest> {
        let mut booking = self.load_for_owner(user, booking_id).await?;
        if !booking.is_active() {
            return Err(AppError::BadRequest(
                "Special requests can only be added to active bookings".to_string(),
            ));
        }
        let added = booking.add_special_request(request)?.clone();
        self.save(&mut booking).await?;
        Ok(added)
    }

    pub async fn update_special_request(
        &self,
        user: &User,
        booking_id: &str,
        request_id: &str,
        update: SpecialRequestUpdate,
    ) -> AppResult<SpecialRequest> {
        let mut booking = self.load_for_staff(user, booking_id).await?;
        let request = booking
            .special_requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| AppError::not_found("Special request"))?;
        if let Some(cost) = update.cost {
            validation::non_negative("Cost", cost)?;
            request.cost = cost;
        }
        request.status = update.status;
        let updated = request.clone();
        self.save(&mut booking).await?;
        Ok(updated)
    }

    pub async fn confirm(
        &self,
        user: &User,
        booking_id: &str,
        req: ConfirmRequest,
    ) -> AppResult<Booking> {
        let mut booking = self.load_for_staff(user, booking_id).await?;
        booking.transition(BookingStatus::Confirmed)?;
        booking.confirmation = Confirmation {
            is_confirmed: true,
            confirmed_at: Some(Utc::now()),
            confirmation_method: Some(req.method.unwrap_or(ConfirmationMethod::Email)),
        };
        booking.add_communication(
            CommunicationType::Email,
            Some("Booking confirmed".to_string()),
            format!("Booking {} is confirmed.", booking.booking_reference),
            Some(user.id.clone()),
        );
        self.save(&mut booking).await?;
        info!(reference = %booking.booking_reference, by = %user.email, "booking confirmed");
        Ok(booking)
    }

    pub async fn check_in(
        &self,
        user: &User,
        booking_id: &str,
        req: CheckinRequest,
    ) -> AppResult<Booking> {
        let mut booking = self.load_for_staff(user, booking_id).await?;
        booking.transition(BookingStatus::CheckedIn)?;
        booking.checkin = CheckinRecord {
            actual_time: Some(Utc::now()),
            notes: req.notes,
            staff_member: Some(user.id.clone()),
            room_number: req.room_number,
            key_cards: req.key_cards,
        };
        self.save(&mut booking).await?;
        info!(reference = %booking.booking_reference, by = %user.email, "guest checked in");
        Ok(booking)
    }

    /// Close the stay, bill extras and award loyalty points for the final total.
    pub async fn check_out(
        &self,
        user: &User,
        booking_id: &str,
        req: CheckoutRequest,
    ) -> AppResult<Booking> {
        if let Some(minibar) = req.minibar_charges {
            validation::non_negative("Minibar charges", minibar)?;
        }
        for charge in &req.additional_charges {
            validation::non_negative("Charge amount", charge.amount)?;
        }
        for damage in &req.damages {
            validation::non_negative("Damage cost", damage.cost)?;
        }

        let mut booking = self.load_for_staff(user, booking_id).await?;
        booking.transition(BookingStatus::CheckedOut)?;

        let mut extras = req.minibar_charges.unwrap_or(0.0);
        extras += req.additional_charges.iter().map(|c| c.amount).sum::<f64>();
        extras += req.damages.iter().filter(|d| !d.resolved).map(|d| d.cost).sum::<f64>();
        if extras > 0.0 {
            booking.pricing.fees.push(Fee {
                name: "Check-out charges".to_string(),
                amount: round_cents(extras),
                description: None,
            });
            booking.pricing.total = round_cents(booking.pricing.total + extras);
        }
        booking.checkout = CheckoutRecord {
            actual_time: Some(Utc::now()),
            notes: req.notes,
            staff_member: Some(user.id.clone()),
            damages: req.damages,
            minibar_charges: req.minibar_charges,
            additional_charges: req.additional_charges,
        };

        let points = booking.pricing.total.max(0.0).floor() as u64;
        booking.loyalty_program.points_earned = points;
        self.save(&mut booking).await?;

        if let Err(err) = self.award_points(&booking.user, points).await {
            error!(
                reference = %booking.booking_reference,
                user_id = %booking.user,
                points,
                "failed to award loyalty points: {}",
                err
            );
        }
        info!(reference = %booking.booking_reference, points, by = %user.email, "guest checked out");
        Ok(booking)
    }

    async fn award_points(&self, user_id: &str, points: u64) -> AppResult<()> {
        match self.db.users.get(user_id).await? {
            Some(mut guest) => {
                guest.add_loyalty_points(points);
                guest.touch();
                self.db.users.replace(&guest).await?;
            }
            None => warn!(user_id, points, "loyalty points for a missing guest"),
        }
        Ok(())
    }

    pub async fn add_communication(
        &self,
        user: &User,
        booking_id: &str,
        req: CommunicationRequest,
    ) -> AppResult<Booking> {
        validation::require("Message", &req.message)?;
        let mut booking = self.load_for_staff(user, booking_id).await?;
        booking.add_communication(req.kind, req.subject, req.message, Some(user.id.clone()));
        self.save(&mut booking).await?;
        Ok(booking)
    }

    pub async fn list_for_hotel(
        &self,
        user: &User,
        hotel_id: &str,
        query: BookingListQuery,
    ) -> AppResult<Page<Booking>> {
        let hotel = self.hotel(hotel_id).await?;
        access::ensure_staff(user, &hotel)?;
        let status = query.status;
        Ok(self
            .db
            .bookings
            .paginate(
                move |b| b.hotel == hotel.id && status.map_or(true, |s| b.status == s),
                |a, b| a.dates.check_in.cmp(&b.dates.check_in),
                query.page.unwrap_or(1),
                page_limit(query.limit, 20),
            )
            .await?)
    }

    pub async fn list_for_date(
        &self,
        user: &User,
        hotel_id: &str,
        date: NaiveDate,
    ) -> AppResult<DailyBookings> {
        let hotel = self.hotel(hotel_id).await?;
        access::ensure_staff(user, &hotel)?;
        let mut bookings = self
            .db
            .bookings
            .find(|b| {
                b.hotel == hotel.id
                    && b.status != BookingStatus::Cancelled
                    && b.dates.check_in <= date
                    && b.dates.check_out >= date
            })
            .await?;
        bookings.sort_by(|a, b| a.booking_reference.cmp(&b.booking_reference));

        let mut day = DailyBookings {
            date,
            arrivals: Vec::new(),
            departures: Vec::new(),
            in_house: Vec::new(),
        };
        for booking in bookings {
            if booking.dates.check_in == date {
                day.arrivals.push(booking);
            } else if booking.dates.check_out == date {
                day.departures.push(booking);
            } else {
                day.in_house.push(booking);
            }
        }
        Ok(day)
    }

    pub async fn list_all(&self, query: BookingListQuery) -> AppResult<Page<Booking>> {
        let BookingListQuery { page, limit, status, hotel } = query;
        Ok(self
            .db
            .bookings
            .paginate(
                move |b| {
                    status.map_or(true, |s| b.status == s)
                        && hotel.as_deref().map_or(true, |h| b.hotel == h)
                },
                |a, b| b.created_at.cmp(&a.created_at),
                page.unwrap_or(1),
                page_limit(limit, 20),
            )
            .await?)
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> AppResult<BookingStats> {
        let bookings = self.db.bookings.list().await?;
        Ok(BookingStats::from_bookings(&bookings, now))
    }

    /// Bookings created within `[from, to]`, summarised overall and per hotel.
    pub async fn report(&self, query: ReportQuery, now: DateTime<Utc>) -> AppResult<BookingReport> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if to < from {
                return Err(AppError::validation("Report end date precedes its start date"));
            }
        }
        let bookings = self
            .db
            .bookings
            .find(|b| {
                let created = b.created_at.date_naive();
                query.from.map_or(true, |from| created >= from)
                    && query.to.map_or(true, |to| created <= to)
                    && query.hotel.as_deref().map_or(true, |h| b.hotel == h)
            })
            .await?;

        let mut per_hotel: BTreeMap<String, HotelSummary> = BTreeMap::new();
        for booking in &bookings {
            let entry = per_hotel
                .entry(booking.hotel.clone())
                .or_insert_with(|| HotelSummary {
                    hotel: booking.hotel.clone(),
                    bookings: 0,
                    revenue: 0.0,
                });
            entry.bookings += 1;
            entry.revenue = round_cents(
                entry.revenue + booking.pricing.paid_amount - booking.payment.refunded_total(),
            );
        }
        let mut by_hotel: Vec<HotelSummary> = per_hotel.into_values().collect();
        by_hotel.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

        Ok(BookingReport {
            from: query.from,
            to: query.to,
            summary: BookingStats::from_bookings(&bookings, now),
            by_hotel,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::hotel::tests::sample_hotel;
    use crate::models::hotel::{StaffMember, StaffRole};
    use crate::models::{MembershipLevel, UserRole};
    use chrono::Duration;

    struct Fixture {
        service: BookingService,
        db: Database,
        guest: User,
        staff: User,
        hotel: Hotel,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory();
        let guest = User::new("guest@example.com", "Gail", "Guest");
        let staff = User::new("desk@example.com", "Dee", "Desk");
        let mut hotel = sample_hotel();
        hotel.pricing.seasonal_rates.clear();
        hotel.staff.push(StaffMember {
            user_id: staff.id.clone(),
            role: StaffRole::Reception,
            permissions: vec![],
        });
        db.users.insert(&guest).await.unwrap();
        db.users.insert(&staff).await.unwrap();
        db.hotels.insert(&hotel).await.unwrap();
        Fixture { service: BookingService::new(db.clone()), db, guest, staff, hotel }
    }

    fn request(check_in: NaiveDate, nights: i64) -> CreateBookingRequest {
        serde_json::from_value(serde_json::json!({
            "hotelId": "hotel-1",
            "roomTypeId": "std",
            "checkIn": check_in,
            "checkOut": check_in + Duration::days(nights),
            "guests": { "adults": 2 },
            "guestDetails": { "primaryGuest": {
                "firstName": "Gail", "lastName": "Guest",
                "email": "guest@example.com", "phone": "+1 555 0100"
            }},
            "specialRequests": [{ "type": "celebration", "description": "Anniversary cake" }]
        }))
        .unwrap()
    }

    fn in_days(days: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(days)
    }

    #[tokio::test]
    async fn test_create_prices_the_stay() {
        let f = fixture().await;
        let booking = f
            .service
            .create(&f.guest, request(in_days(10), 3), RequestMeta::default())
            .await
            .unwrap();

        assert!(booking.booking_reference.starts_with("SL"));
        assert_eq!(booking.dates.nights, 3);
        assert_eq!(booking.pricing.subtotal, 600.0);
        assert_eq!(booking.pricing.taxes.amount, 60.0);
        assert_eq!(booking.pricing.total, 685.0);
        assert_eq!(booking.pricing.remaining_amount, 685.0);
        assert_eq!(booking.pricing.fees.len(), 1);
        assert_eq!(booking.special_requests.len(), 1);
        assert!(!booking.special_requests[0].id.is_empty());
    }

    #[tokio::test]
    async fn test_loyalty_discount_applied() {
        let f = fixture().await;
        let mut gold = f.guest.clone();
        gold.loyalty_program.membership_level = MembershipLevel::Gold;
        let booking = f
            .service
            .create(&gold, request(in_days(10), 3), RequestMeta::default())
            .await
            .unwrap();
        assert_eq!(booking.pricing.discounts[0].amount, 60.0);
        assert_eq!(booking.pricing.total, 625.0);
    }

    #[tokio::test]
    async fn test_sold_out_and_invalid_requests() {
        let f = fixture().await;
        for _ in 0..2 {
            f.service
                .create(&f.guest, request(in_days(10), 2), RequestMeta::default())
                .await
                .unwrap();
        }
        let sold_out = f
            .service
            .create(&f.guest, request(in_days(11), 2), RequestMeta::default())
            .await;
        assert!(matches!(sold_out, Err(AppError::Conflict(_))));

        // a stay starting on the previous check-out day does not overlap
        assert!(f
            .service
            .create(&f.guest, request(in_days(12), 1), RequestMeta::default())
            .await
            .is_ok());

        let mut crowd = request(in_days(20), 1);
        crowd.guests.adults = 3;
        assert!(matches!(
            f.service.create(&f.guest, crowd, RequestMeta::default()).await,
            Err(AppError::Validation(_))
        ));

        let past = request(in_days(-2), 1);
        assert!(f.service.create(&f.guest, past, RequestMeta::default()).await.is_err());

        let mut unknown_room = request(in_days(20), 1);
        unknown_room.room_type_id = "missing".into();
        assert!(matches!(
            f.service.create(&f.guest, unknown_room, RequestMeta::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_access_only() {
        let f = fixture().await;
        let booking = f
            .service
            .create(&f.guest, request(in_days(10), 1), RequestMeta::default())
            .await
            .unwrap();
        let stranger = User::new("x@example.com", "Xan", "Other");
        assert!(matches!(
            f.service.get(&stranger, &booking.id).await,
            Err(AppError::Forbidden(_))
        ));
        let mut admin = stranger.clone();
        admin.role = UserRole::Admin;
        assert!(f.service.get(&admin, &booking.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancellation_fee_tiers() {
        let f = fixture().await;
        let mut booking = f
            .service
            .create(&f.guest, request(in_days(10), 1), RequestMeta::default())
            .await
            .unwrap();
        booking.pricing.paid_amount = booking.pricing.total;
        f.db.bookings.replace(&booking).await.unwrap();

        // two days before check-in: half the total is kept
        let now = booking.check_in_at() - Duration::hours(48);
        let cancelled = f
            .service
            .cancel(&f.guest, &booking.id, CancelRequest::default(), now)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancellation.cancellation_fee, round_cents(booking.pricing.total * 0.5));
        assert_eq!(
            cancelled.cancellation.refund_amount,
            round_cents(booking.pricing.total * 0.5)
        );

        let again = f
            .service
            .cancel(&f.guest, &booking.id, CancelRequest::default(), now)
            .await;
        assert!(matches!(again, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_late_cancellation_rejected_for_guests() {
        let f = fixture().await;
        let booking = f
            .service
            .create(&f.guest, request(in_days(1), 1), RequestMeta::default())
            .await
            .unwrap();
        let now = booking.check_in_at() - Duration::hours(12);
        assert!(f
            .service
            .cancel(&f.guest, &booking.id, CancelRequest::default(), now)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_front_desk_lifecycle_awards_points() {
        let f = fixture().await;
        let booking = f
            .service
            .create(&f.guest, request(in_days(5), 2), RequestMeta::default())
            .await
            .unwrap();

        assert!(matches!(
            f.service.confirm(&f.guest, &booking.id, ConfirmRequest::default()).await,
            Err(AppError::Forbidden(_))
        ));
        // skipping confirmation is rejected
        assert!(matches!(
            f.service.check_in(&f.staff, &booking.id, CheckinRequest::default()).await,
            Err(AppError::BadRequest(_))
        ));

        f.service.confirm(&f.staff, &booking.id, ConfirmRequest::default()).await.unwrap();
        f.service
            .check_in(
                &f.staff,
                &booking.id,
                CheckinRequest { room_number: Some("204".into()), ..Default::default() },
            )
            .await
            .unwrap();
        let done = f
            .service
            .check_out(
                &f.staff,
                &booking.id,
                CheckoutRequest { minibar_charges: Some(15.5), ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(done.status, BookingStatus::CheckedOut);
        assert_eq!(done.pricing.total, booking.pricing.total + 15.5);
        let points = done.pricing.total.floor() as u64;
        assert_eq!(done.loyalty_program.points_earned, points);
        let guest = f.db.users.get(&f.guest.id).await.unwrap().unwrap();
        assert_eq!(guest.loyalty_program.points, points);
    }

    #[tokio::test]
    async fn test_checkout_rejects_any_negative_charge() {
        let f = fixture().await;
        let booking = f
            .service
            .create(&f.guest, request(in_days(5), 2), RequestMeta::default())
            .await
            .unwrap();
        f.service.confirm(&f.staff, &booking.id, ConfirmRequest::default()).await.unwrap();
        f.service.check_in(&f.staff, &booking.id, CheckinRequest::default()).await.unwrap();

        // a credit on the minibar must not hide a damage charge
        let offset = CheckoutRequest {
            minibar_charges: Some(-50.0),
            damages: vec![Damage { description: "Broken lamp".into(), cost: 50.0, resolved: false }],
            ..Default::default()
        };
        let result = f.service.check_out(&f.staff, &booking.id, offset).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let refund_line = CheckoutRequest {
            additional_charges: vec![Charge { description: "Credit".into(), amount: -10.0 }],
            ..Default::default()
        };
        let result = f.service.check_out(&f.staff, &booking.id, refund_line).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let stored = f.db.bookings.get(&booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::CheckedIn);
    }

    #[tokio::test]
    async fn test_update_dates_reprices() {
        let f = fixture().await;
        let booking = f
            .service
            .create(&f.guest, request(in_days(10), 1), RequestMeta::default())
            .await
            .unwrap();
        let updated = f
            .service
            .update(
                &f.guest,
                &booking.id,
                UpdateBookingRequest { check_out: Some(in_days(13)), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.dates.nights, 3);
        assert_eq!(updated.pricing.subtotal, 600.0);
    }

    #[tokio::test]
    async fn test_daily_view_and_stats() {
        let f = fixture().await;
        let arriving = f
            .service
            .create(&f.guest, request(in_days(10), 2), RequestMeta::default())
            .await
            .unwrap();
        let day = f
            .service
            .list_for_date(&f.staff, &f.hotel.id, in_days(10))
            .await
            .unwrap();
        assert_eq!(day.arrivals.len(), 1);
        assert_eq!(day.arrivals[0].id, arriving.id);

        let departing = f
            .service
            .list_for_date(&f.staff, &f.hotel.id, in_days(12))
            .await
            .unwrap();
        assert_eq!(departing.departures.len(), 1);

        let stats = f.service.stats(Utc::now()).await.unwrap();
        assert_eq!(stats.total_bookings, 1);
        assert_eq!(stats.by_status.get("pending"), Some(&1));

        let report = f.service.report(ReportQuery::default(), Utc::now()).await.unwrap();
        assert_eq!(report.by_hotel.len(), 1);
    }
}
