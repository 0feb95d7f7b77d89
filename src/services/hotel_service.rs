//! Hotel catalogue, availability and inventory management.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::info;

use super::access;
use crate::core::{AppError, AppResult};
use crate::models::hotel::{contains_ci, Amenity, HotelImage, HotelRating, PriceQuote};
use crate::models::{apply_patch, Booking, Hotel, HotelStatus, Review, RoomType, User};
use crate::storage::{page_limit, Database, Page};

pub const DEFAULT_FEATURED_LIMIT: usize = 6;
pub const DEFAULT_LOCATION_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotelListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Field name, `-` prefixed for descending. Defaults to `-rating.overall`.
    pub sort: Option<String>,
    pub status: Option<HotelStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSearchQuery {
    pub q: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<u32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Comma separated amenity names; any match qualifies.
    pub amenities: Option<String>,
    pub rating: Option<f64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "one")]
    pub guests: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub available: bool,
    pub room_types: Vec<RoomType>,
    pub total_available_rooms: u32,
    pub pricing: PriceQuote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdate {
    pub room_type_id: String,
    #[serde(default)]
    pub total_rooms: Option<u32>,
    pub available_rooms: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AvailabilityUpdate {
    Many { updates: Vec<InventoryUpdate> },
    One(InventoryUpdate),
}

impl AvailabilityUpdate {
    fn into_vec(self) -> Vec<InventoryUpdate> {
        match self {
            Self::Many { updates } => updates,
            Self::One(update) => vec![update],
        }
    }
}

/// Build a new, validated hotel from client JSON. Ids and timestamps are assigned here.
pub fn hotel_from_input(body: Value) -> AppResult<Hotel> {
    let Value::Object(mut fields) = body else {
        return Err(AppError::validation("Request body must be a JSON object"));
    };
    let now = serde_json::to_value(Utc::now()).map_err(|e| AppError::Internal(e.to_string()))?;
    fields.insert("id".into(), Value::String(crate::models::common::new_id()));
    fields.insert("createdAt".into(), now.clone());
    fields.insert("updatedAt".into(), now);

    let mut hotel: Hotel = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::validation(e.to_string()))?;
    hotel.normalize();
    hotel.validate()?;
    Ok(hotel)
}

pub struct HotelService {
    db: Database,
}

fn by_rating(a: &Hotel, b: &Hotel) -> Ordering {
    b.rating.overall.total_cmp(&a.rating.overall)
}

fn hotel_order(sort: &str) -> impl FnMut(&Hotel, &Hotel) -> Ordering {
    let (descending, field) = match sort.strip_prefix('-') {
        Some(field) => (true, field.to_string()),
        None => (false, sort.to_string()),
    };
    move |a, b| {
        let ord = match field.as_str() {
            "name" => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            "pricing.basePrice" | "price" => a.pricing.base_price.total_cmp(&b.pricing.base_price),
            "createdAt" => a.created_at.cmp(&b.created_at),
            "rating.reviewCount" => a.rating.review_count.cmp(&b.rating.review_count),
            _ => a.rating.overall.total_cmp(&b.rating.overall),
        };
        if descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

impl HotelService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, hotel_id: &str) -> AppResult<Hotel> {
        self.db
            .hotels
            .get(hotel_id)
            .await?
            .ok_or_else(|| AppError::not_found("Hotel"))
    }

    pub async fn list(&self, query: HotelListQuery) -> AppResult<Page<Hotel>> {
        let status = query.status.unwrap_or_default();
        let sort = query.sort.as_deref().unwrap_or("-rating.overall");
        Ok(self
            .db
            .hotels
            .paginate(
                move |h| h.status == status,
                hotel_order(sort),
                query.page.unwrap_or(1),
                page_limit(query.limit, 10),
            )
            .await?)
    }

    pub async fn search(&self, query: HotelSearchQuery) -> AppResult<Page<Hotel>> {
        let wanted_amenities: Vec<String> = query
            .amenities
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();

        let candidates = self
            .db
            .hotels
            .find(|h| {
                h.is_active()
                    && query.q.as_deref().map_or(true, |q| {
                        contains_ci(&h.name, q)
                            || contains_ci(&h.description, q)
                            || contains_ci(&h.location.city, q)
                    })
                    && query.city.as_deref().map_or(true, |c| contains_ci(&h.location.city, c))
                    && query
                        .country
                        .as_deref()
                        .map_or(true, |c| contains_ci(&h.location.country, c))
                    && query.min_price.map_or(true, |min| h.pricing.base_price >= min)
                    && query.max_price.map_or(true, |max| h.pricing.base_price <= max)
                    && query.rating.map_or(true, |r| h.rating.overall >= r)
                    && (wanted_amenities.is_empty()
                        || h.amenities
                            .iter()
                            .any(|a| wanted_amenities.contains(&a.name.to_lowercase())))
            })
            .await?;

        let mut matching = match (query.check_in, query.check_out) {
            (Some(check_in), Some(check_out)) if check_out > check_in => {
                let guests = query.guests.unwrap_or(1);
                let bookings = self.db.bookings.find(|b| b.is_active()).await?;
                candidates
                    .into_iter()
                    .filter(|h| {
                        h.check_availability(check_in, check_out, guests, &bookings)
                            .available
                    })
                    .collect()
            }
            _ => candidates,
        };
        matching.sort_by(by_rating);
        Ok(Page::from_vec(
            matching,
            query.page.unwrap_or(1),
            page_limit(query.limit, 10),
        ))
    }

    pub async fn featured(&self, limit: Option<usize>) -> AppResult<Vec<Hotel>> {
        let mut hotels = self.db.hotels.find(|h| h.featured && h.is_active()).await?;
        hotels.sort_by(by_rating);
        hotels.truncate(limit.unwrap_or(DEFAULT_FEATURED_LIMIT));
        Ok(hotels)
    }

    pub async fn by_location(
        &self,
        city: &str,
        country: Option<&str>,
        limit: Option<usize>,
    ) -> AppResult<Vec<Hotel>> {
        let mut hotels = self
            .db
            .hotels
            .find(|h| h.is_active() && h.matches_location(city, country))
            .await?;
        hotels.sort_by(by_rating);
        hotels.truncate(limit.unwrap_or(DEFAULT_LOCATION_LIMIT));
        Ok(hotels)
    }

    pub async fn amenities(&self, hotel_id: &str) -> AppResult<Vec<Amenity>> {
        Ok(self.get(hotel_id).await?.amenities)
    }

    pub async fn room_types(&self, hotel_id: &str) -> AppResult<Vec<RoomType>> {
        Ok(self.get(hotel_id).await?.room_types)
    }

    /// Approved reviews, newest first, with the hotel's aggregate rating.
    pub async fn reviews(
        &self,
        hotel_id: &str,
        page: u64,
        limit: u64,
    ) -> AppResult<(Page<Review>, HotelRating)> {
        let hotel = self.get(hotel_id).await?;
        let id = hotel.id.clone();
        let reviews = self
            .db
            .reviews
            .paginate(
                move |r| r.hotel == id && r.is_approved(),
                |a, b| b.created_at.cmp(&a.created_at),
                page,
                limit,
            )
            .await?;
        Ok((reviews, hotel.rating))
    }

    async fn active_bookings(&self, hotel_id: &str) -> AppResult<Vec<Booking>> {
        Ok(self
            .db
            .bookings
            .find(|b| b.hotel == hotel_id && b.is_active())
            .await?)
    }

    pub async fn check_availability(
        &self,
        hotel_id: &str,
        req: AvailabilityRequest,
    ) -> AppResult<AvailabilityReport> {
        if req.check_out <= req.check_in {
            return Err(AppError::validation("Check-out date must be after check-in date"));
        }
        if req.guests < 1 {
            return Err(AppError::validation("At least 1 guest is required"));
        }
        let hotel = self.get(hotel_id).await?;
        let bookings = self.active_bookings(&hotel.id).await?;
        let availability = hotel.check_availability(req.check_in, req.check_out, req.guests, &bookings);
        let nights = Booking::calculate_nights(req.check_in, req.check_out);

        Ok(AvailabilityReport {
            available: availability.available,
            room_types: availability.room_types,
            total_available_rooms: availability.total_available_rooms,
            pricing: hotel.calculate_total_price(nights, None, req.check_in),
        })
    }

    async fn save(&self, mut hotel: Hotel) -> AppResult<Hotel> {
        hotel.normalize();
        hotel.validate()?;
        hotel.touch();
        self.db.hotels.replace(&hotel).await?;
        Ok(hotel)
    }

    pub async fn create(&self, admin: &User, body: Value) -> AppResult<Hotel> {
        let hotel = hotel_from_input(body)?;
        self.db.hotels.insert(&hotel).await?;

        info!(hotel_id = %hotel.id, name = %hotel.name, by = %admin.email, "hotel created");
        Ok(hotel)
    }

    pub async fn update(&self, hotel_id: &str, changes: Value, admin: &User) -> AppResult<Hotel> {
        let current = self.get(hotel_id).await?;
        let hotel = self.save(apply_patch(&current, changes, None)?).await?;
        info!(hotel_id, by = %admin.email, "hotel updated");
        Ok(hotel)
    }

    pub async fn delete(&self, hotel_id: &str, admin: &User) -> AppResult<()> {
        let hotel = self.get(hotel_id).await?;
        if !self.active_bookings(&hotel.id).await?.is_empty() {
            return Err(AppError::Conflict(
                "Hotel has active bookings and cannot be deleted".to_string(),
            ));
        }
        self.db.hotels.delete(&hotel.id).await?;
        info!(hotel_id, name = %hotel.name, by = %admin.email, "hotel deleted");
        Ok(())
    }

    pub async fn add_images(&self, hotel_id: &str, images: Vec<HotelImage>) -> AppResult<Hotel> {
        if images.is_empty() {
            return Err(AppError::validation("At least one image is required"));
        }
        let mut hotel = self.get(hotel_id).await?;
        if images.iter().any(|img| img.is_primary) {
            for existing in &mut hotel.images {
                existing.is_primary = false;
            }
        }
        hotel.images.extend(images);
        self.save(hotel).await
    }

    pub async fn update_status(
        &self,
        hotel_id: &str,
        status: HotelStatus,
        admin: &User,
    ) -> AppResult<Hotel> {
        let mut hotel = self.get(hotel_id).await?;
        hotel.status = status;
        let hotel = self.save(hotel).await?;
        info!(hotel_id, status = ?status, by = %admin.email, "hotel status updated");
        Ok(hotel)
    }

    pub async fn add_room_type(
        &self,
        user: &User,
        hotel_id: &str,
        mut room: RoomType,
    ) -> AppResult<RoomType> {
        let mut hotel = self.get(hotel_id).await?;
        access::ensure_staff(user, &hotel)?;
        if !room.id.is_empty() && hotel.room_type(&room.id).is_some() {
            return Err(AppError::Conflict("Room type id already exists".to_string()));
        }
        room.id = if room.id.is_empty() { crate::models::common::new_id() } else { room.id };
        room.validate()?;
        let room_id = room.id.clone();
        hotel.room_types.push(room);

        let hotel = self.save(hotel).await?;
        info!(hotel_id, room_type_id = %room_id, "room type added");
        hotel
            .room_type(&room_id)
            .cloned()
            .ok_or_else(|| AppError::Internal("room type vanished after save".to_string()))
    }

    pub async fn update_room_type(
        &self,
        user: &User,
        hotel_id: &str,
        room_type_id: &str,
        changes: Value,
    ) -> AppResult<RoomType> {
        let mut hotel = self.get(hotel_id).await?;
        access::ensure_staff(user, &hotel)?;
        let current = hotel
            .room_type(room_type_id)
            .ok_or_else(|| AppError::not_found("Room type"))?;
        let mut updated: RoomType = apply_patch(current, changes, None)?;
        updated.id = room_type_id.to_string();
        updated.validate()?;
        if let Some(slot) = hotel.room_type_mut(room_type_id) {
            *slot = updated;
        }

        let hotel = self.save(hotel).await?;
        info!(hotel_id, room_type_id, "room type updated");
        hotel
            .room_type(room_type_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Room type"))
    }

    pub async fn delete_room_type(
        &self,
        user: &User,
        hotel_id: &str,
        room_type_id: &str,
    ) -> AppResult<()> {
        let mut hotel = self.get(hotel_id).await?;
        access::ensure_staff(user, &hotel)?;
        if hotel.room_type(room_type_id).is_none() {
            return Err(AppError::not_found("Room type"));
        }
        let held = self
            .active_bookings(&hotel.id)
            .await?
            .iter()
            .any(|b| b.room_type.room_type_id == room_type_id);
        if held {
            return Err(AppError::Conflict(
                "Room type has active bookings and cannot be deleted".to_string(),
            ));
        }
        hotel.room_types.retain(|room| room.id != room_type_id);
        self.save(hotel).await?;
        info!(hotel_id, room_type_id, "room type deleted");
        Ok(())
    }

    /// Set room inventory counts. `availableRooms` may not exceed `totalRooms`.
    pub async fn update_availability(
        &self,
        user: &User,
        hotel_id: &str,
        update: AvailabilityUpdate,
    ) -> AppResult<Vec<RoomType>> {
        let mut hotel = self.get(hotel_id).await?;
        access::ensure_staff(user, &hotel)?;
        for change in update.into_vec() {
            let room = hotel
                .room_type_mut(&change.room_type_id)
                .ok_or_else(|| AppError::not_found("Room type"))?;
            if let Some(total) = change.total_rooms {
                room.total_rooms = total;
            }
            if change.available_rooms > room.total_rooms {
                return Err(AppError::validation(format!(
                    "Available rooms cannot exceed total rooms ({})",
                    room.total_rooms
                )));
            }
            room.available_rooms = change.available_rooms;
        }
        let hotel = self.save(hotel).await?;
        info!(hotel_id, by = %user.email, "room availability updated");
        Ok(hotel.room_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::tests::sample_booking;
    use crate::models::hotel::tests::sample_hotel;
    use crate::models::UserRole;
    use chrono::Duration;
    use serde_json::json;

    fn admin() -> User {
        let mut user = User::new("admin@example.com", "Ada", "Admin");
        user.role = UserRole::Admin;
        user
    }

    async fn service_with_hotel() -> (HotelService, Hotel) {
        let db = Database::in_memory();
        let hotel = sample_hotel();
        db.hotels.insert(&hotel).await.unwrap();
        (HotelService::new(db), hotel)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_defaults() {
        let service = HotelService::new(Database::in_memory());
        let mut body = serde_json::to_value(sample_hotel()).unwrap();
        body.as_object_mut().unwrap().remove("id");
        let created = service.create(&admin(), body).await.unwrap();
        assert_ne!(created.id, "hotel-1");
        assert_eq!(service.get(&created.id).await.unwrap().name, "Grand Palace Hotel");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let service = HotelService::new(Database::in_memory());
        let mut body = serde_json::to_value(sample_hotel()).unwrap();
        body["contact"]["email"] = json!("not-an-email");
        assert!(matches!(
            service.create(&admin(), body).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_search_filters() {
        let (service, _) = service_with_hotel().await;
        let found = service
            .search(HotelSearchQuery { city: Some("new york".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(found.total, 1);

        let none = service
            .search(HotelSearchQuery { max_price: Some(50.0), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(none.total, 0);
    }

    #[tokio::test]
    async fn test_availability_counts_active_bookings() {
        let (service, hotel) = service_with_hotel().await;
        let check_in = Utc::now().date_naive() + Duration::days(30);
        for _ in 0..2 {
            service.db.bookings.insert(&sample_booking(check_in, 2)).await.unwrap();
        }

        let report = service
            .check_availability(
                &hotel.id,
                AvailabilityRequest { check_in, check_out: check_in + Duration::days(2), guests: 2 },
            )
            .await
            .unwrap();
        assert!(report.available);
        assert!(report.room_types.iter().all(|room| room.id != "std"));
        assert_eq!(report.pricing.nights, 2);

        let bad = service
            .check_availability(
                &hotel.id,
                AvailabilityRequest { check_in, check_out: check_in, guests: 1 },
            )
            .await;
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn test_room_type_management_requires_staff() {
        let (service, hotel) = service_with_hotel().await;
        let guest = User::new("guest@example.com", "Gus", "Guest");
        let room: RoomType = serde_json::from_value(json!({
            "name": "Penthouse",
            "maxOccupancy": 4,
            "bedConfiguration": "1 King Bed",
            "totalRooms": 1,
            "availableRooms": 1
        }))
        .unwrap();

        let denied = service.add_room_type(&guest, &hotel.id, room.clone()).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let added = service.add_room_type(&admin(), &hotel.id, room).await.unwrap();
        assert!(!added.id.is_empty());

        let updated = service
            .update_room_type(&admin(), &hotel.id, &added.id, json!({ "priceAdjustment": 250.0 }))
            .await
            .unwrap();
        assert_eq!(updated.price_adjustment, 250.0);

        service.delete_room_type(&admin(), &hotel.id, &added.id).await.unwrap();
        assert_eq!(service.room_types(&hotel.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_availability_bounds() {
        let (service, hotel) = service_with_hotel().await;
        let too_many = AvailabilityUpdate::One(InventoryUpdate {
            room_type_id: "std".into(),
            total_rooms: None,
            available_rooms: 5,
        });
        assert!(service.update_availability(&admin(), &hotel.id, too_many).await.is_err());

        let ok = AvailabilityUpdate::One(InventoryUpdate {
            room_type_id: "std".into(),
            total_rooms: Some(6),
            available_rooms: 5,
        });
        let rooms = service.update_availability(&admin(), &hotel.id, ok).await.unwrap();
        assert_eq!(rooms[0].available_rooms, 5);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_active_booking() {
        let (service, hotel) = service_with_hotel().await;
        let booking = sample_booking(Utc::now().date_naive() + Duration::days(3), 1);
        service.db.bookings.insert(&booking).await.unwrap();
        assert!(matches!(
            service.delete(&hotel.id, &admin()).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_status_change_hides_from_listing() {
        let (service, hotel) = service_with_hotel().await;
        service
            .update_status(&hotel.id, HotelStatus::Maintenance, &admin())
            .await
            .unwrap();
        let listed = service.list(HotelListQuery::default()).await.unwrap();
        assert_eq!(listed.total, 0);
    }
}
