use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::booking::Booking;
use super::common::{new_id, round_cents, Currency};
use crate::core::validation;
use crate::core::{AppError, AppResult};
use crate::storage::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HotelStatus {
    #[default]
    Active,
    Inactive,
    Maintenance,
    ComingSoon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageCategory {
    Exterior,
    Lobby,
    Room,
    Amenity,
    Dining,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelImage {
    pub url: String,
    #[serde(default = "default_alt")]
    pub alt: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub category: ImageCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingBreakdown {
    #[serde(default = "default_rating")]
    pub cleanliness: f64,
    #[serde(default = "default_rating")]
    pub service: f64,
    #[serde(default = "default_rating")]
    pub location: f64,
    #[serde(default = "default_rating")]
    pub value: f64,
    #[serde(default = "default_rating")]
    pub amenities: f64,
}

impl Default for RatingBreakdown {
    fn default() -> Self {
        Self {
            cleanliness: 4.0,
            service: 4.0,
            location: 4.0,
            value: 4.0,
            amenities: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelRating {
    #[serde(default = "default_rating")]
    pub overall: f64,
    #[serde(default)]
    pub breakdown: RatingBreakdown,
    #[serde(default)]
    pub review_count: u64,
}

impl Default for HotelRating {
    fn default() -> Self {
        Self {
            overall: 4.0,
            breakdown: RatingBreakdown::default(),
            review_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalRate {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl SeasonalRate {
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub base_price: f64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default)]
    pub service_charge: f64,
    #[serde(default)]
    pub seasonal_rates: Vec<SeasonalRate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AmenityCategory {
    #[default]
    General,
    Wellness,
    Business,
    Dining,
    Entertainment,
    Transportation,
    Accessibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amenity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category: AmenityCategory,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub additional_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomSize {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_meters: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoomImage {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub max_occupancy: u32,
    pub bed_configuration: String,
    #[serde(default)]
    pub size: RoomSize,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<RoomImage>,
    #[serde(default)]
    pub price_adjustment: f64,
    pub total_rooms: u32,
    pub available_rooms: u32,
}

impl RoomType {
    pub fn validate(&self) -> AppResult<()> {
        validation::require("Room type name", &self.name)?;
        validation::require("Bed configuration", &self.bed_configuration)?;
        validation::in_range("Maximum occupancy", self.max_occupancy, 1, 20)?;
        validation::in_range("Total rooms", self.total_rooms, 1, 1000)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TimePolicy {
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CancellationPolicy {
    Flexible,
    #[default]
    Moderate,
    Strict,
    SuperStrict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenPolicy {
    #[serde(default = "default_true")]
    pub allowed: bool,
    #[serde(default = "default_age_limit")]
    pub age_limit: u32,
    #[serde(default)]
    pub additional_charge: f64,
}

impl Default for ChildrenPolicy {
    fn default() -> Self {
        Self { allowed: true, age_limit: 18, additional_charge: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PetPolicy {
    #[serde(default)]
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<String>,
    #[serde(default)]
    pub additional_charge: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SmokingPolicy {
    #[default]
    NoSmoking,
    DesignatedAreas,
    AllAreas,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policies {
    #[serde(default = "default_check_in_policy")]
    pub check_in: TimePolicy,
    #[serde(default = "default_check_out_policy")]
    pub check_out: TimePolicy,
    #[serde(default)]
    pub cancellation: CancellationPolicy,
    #[serde(default)]
    pub children: ChildrenPolicy,
    #[serde(default)]
    pub pets: PetPolicy,
    #[serde(default)]
    pub smoking: SmokingPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            check_in: default_check_in_policy(),
            check_out: default_check_out_policy(),
            cancellation: CancellationPolicy::default(),
            children: ChildrenPolicy::default(),
            pets: PetPolicy::default(),
            smoking: SmokingPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonFootprint {
    #[serde(default = "default_carbon_rating")]
    pub rating: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for CarbonFootprint {
    fn default() -> Self {
        Self { rating: default_carbon_rating(), last_updated: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Sustainability {
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub practices: Vec<String>,
    #[serde(default)]
    pub carbon_footprint: CarbonFootprint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OwnerContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Owner {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact: OwnerContact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Manager,
    Reception,
    Housekeeping,
    Maintenance,
    Security,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub user_id: String,
    pub role: StaffRole,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A bookable property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    pub location: Location,
    pub contact: Contact,
    #[serde(default)]
    pub images: Vec<HotelImage>,
    #[serde(default)]
    pub rating: HotelRating,
    pub pricing: Pricing,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub room_types: Vec<RoomType>,
    #[serde(default)]
    pub policies: Policies,
    #[serde(default)]
    pub sustainability: Sustainability,
    #[serde(default)]
    pub status: HotelStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub owner: Owner,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Nightly price breakdown for a stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// Seasonal price before the room-type adjustment.
    pub seasonal_price: f64,
    /// Nightly price including the room-type adjustment.
    pub base_price: f64,
    pub nights: u32,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax: f64,
    pub service_charge: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    /// Room types that can host the party; `availableRooms` is the free count for the range.
    pub room_types: Vec<RoomType>,
    pub total_available_rooms: u32,
}

impl Hotel {
    /// Apply the pre-save rules: a primary image, clamped inventory and room type ids.
    pub fn normalize(&mut self) {
        if !self.images.is_empty() && !self.images.iter().any(|img| img.is_primary) {
            self.images[0].is_primary = true;
        }
        for room in &mut self.room_types {
            if room.available_rooms > room.total_rooms {
                room.available_rooms = room.total_rooms;
            }
            if room.id.is_empty() {
                room.id = new_id();
            }
        }
        self.contact.email = self.contact.email.trim().to_lowercase();
    }

    pub fn validate(&self) -> AppResult<()> {
        validation::require("Hotel name", &self.name)?;
        validation::max_len("Hotel name", &self.name, 100)?;
        validation::require("Hotel description", &self.description)?;
        validation::max_len("Description", &self.description, 2000)?;
        if let Some(short) = &self.short_description {
            validation::max_len("Short description", short, 200)?;
        }

        validation::require("Address", &self.location.address)?;
        validation::require("City", &self.location.city)?;
        validation::require("Country", &self.location.country)?;
        if let Some(lat) = self.location.coordinates.latitude {
            validation::in_range("Latitude", lat, -90.0, 90.0)?;
        }
        if let Some(lon) = self.location.coordinates.longitude {
            validation::in_range("Longitude", lon, -180.0, 180.0)?;
        }

        validation::require("Phone number", &self.contact.phone)?;
        if !validation::is_valid_phone(&self.contact.phone) {
            return Err(AppError::validation("Please enter a valid phone number"));
        }
        validation::normalize_email(&self.contact.email)?;
        if let Some(website) = self.contact.website.as_deref().filter(|w| !w.is_empty()) {
            if !validation::is_valid_website(website) {
                return Err(AppError::validation("Please enter a valid website URL"));
            }
        }

        for image in &self.images {
            validation::require("Image url", &image.url)?;
        }

        validation::in_range("Rating", self.rating.overall, 1.0, 5.0)?;

        validation::non_negative("Base price", self.pricing.base_price)?;
        validation::in_range("Tax rate", self.pricing.tax_rate, 0.0, 1.0)?;
        validation::non_negative("Service charge", self.pricing.service_charge)?;
        for rate in &self.pricing.seasonal_rates {
            validation::require("Seasonal rate name", &rate.name)?;
            validation::in_range("Seasonal multiplier", rate.multiplier, 0.1, 5.0)?;
            if rate.end_date < rate.start_date {
                return Err(AppError::validation(
                    "Seasonal rate end date must not precede its start date",
                ));
            }
        }

        for amenity in &self.amenities {
            validation::require("Amenity name", &amenity.name)?;
            validation::non_negative("Additional cost", amenity.additional_cost)?;
        }
        for room in &self.room_types {
            room.validate()?;
        }

        for policy in [&self.policies.check_in, &self.policies.check_out] {
            if !validation::is_valid_time(&policy.time) {
                return Err(AppError::validation("Policy times must use HH:MM"));
            }
        }

        validation::require("Owner name", &self.owner.name)?;
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
            .map(|img| img.url.as_str())
    }

    pub fn total_available_rooms(&self) -> u32 {
        self.room_types.iter().map(|room| room.available_rooms).sum()
    }

    pub fn room_type(&self, room_type_id: &str) -> Option<&RoomType> {
        self.room_types.iter().find(|room| room.id == room_type_id)
    }

    pub fn room_type_mut(&mut self, room_type_id: &str) -> Option<&mut RoomType> {
        self.room_types.iter_mut().find(|room| room.id == room_type_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == HotelStatus::Active
    }

    pub fn is_staff(&self, user_id: &str) -> bool {
        self.staff.iter().any(|member| member.user_id == user_id)
    }

    /// Nightly price on `date`: the first covering seasonal rate wins.
    pub fn price_on(&self, date: NaiveDate) -> f64 {
        let base = self.pricing.base_price;
        match self.pricing.seasonal_rates.iter().find(|rate| rate.covers(date)) {
            Some(rate) => base * rate.multiplier,
            None => base,
        }
    }

    pub fn current_price(&self, now: DateTime<Utc>) -> f64 {
        self.price_on(now.date_naive())
    }

    /// Room types able to host `guests` with at least one room free over `[check_in, check_out)`.
    ///
    /// `bookings` are this hotel's bookings; only active ones consume inventory.
    pub fn check_availability(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
        bookings: &[Booking],
    ) -> Availability {
        if !self.is_active() {
            return Availability {
                available: false,
                room_types: Vec::new(),
                total_available_rooms: 0,
            };
        }

        let room_types: Vec<RoomType> = self
            .room_types
            .iter()
            .filter(|room| room.max_occupancy >= guests)
            .filter_map(|room| {
                let free = self.free_rooms(room, check_in, check_out, bookings);
                (free > 0).then(|| RoomType {
                    available_rooms: free,
                    ..room.clone()
                })
            })
            .collect();

        let total_available_rooms = room_types.iter().map(|room| room.available_rooms).sum();
        Availability {
            available: !room_types.is_empty(),
            room_types,
            total_available_rooms,
        }
    }

    /// Rooms of `room` not held by an active booking overlapping the range.
    pub fn free_rooms(
        &self,
        room: &RoomType,
        check_in: NaiveDate,
        check_out: NaiveDate,
        bookings: &[Booking],
    ) -> u32 {
        let held = bookings
            .iter()
            .filter(|b| b.hotel == self.id && b.room_type.room_type_id == room.id)
            .filter(|b| b.is_active() && b.overlaps(check_in, check_out))
            .count() as u32;
        room.available_rooms.saturating_sub(held)
    }

    pub fn calculate_total_price(
        &self,
        nights: u32,
        room_type_id: Option<&str>,
        on: NaiveDate,
    ) -> PriceQuote {
        let seasonal_price = self.price_on(on);
        let adjustment = room_type_id
            .and_then(|id| self.room_type(id))
            .map(|room| room.price_adjustment)
            .unwrap_or(0.0);
        let base_price = seasonal_price + adjustment;
        let subtotal = base_price * f64::from(nights);
        let tax = subtotal * self.pricing.tax_rate;
        let service_charge = self.pricing.service_charge;

        PriceQuote {
            seasonal_price: round_cents(seasonal_price),
            base_price: round_cents(base_price),
            nights,
            subtotal: round_cents(subtotal),
            tax_rate: self.pricing.tax_rate,
            tax: round_cents(tax),
            service_charge: round_cents(service_charge),
            total: round_cents(subtotal + tax + service_charge),
        }
    }

    /// Case-insensitive substring match on city and, when given, country.
    pub fn matches_location(&self, city: &str, country: Option<&str>) -> bool {
        contains_ci(&self.location.city, city)
            && country.map_or(true, |c| contains_ci(&self.location.country, c))
    }
}

impl Document for Hotel {
    const COLLECTION: &'static str = "hotels";

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_alt() -> String {
    "Hotel image".to_string()
}

fn default_rating() -> f64 {
    4.0
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_tax_rate() -> f64 {
    0.12
}

fn default_age_limit() -> u32 {
    18
}

fn default_carbon_rating() -> String {
    "C".to_string()
}

fn default_check_in_policy() -> TimePolicy {
    TimePolicy { time: "15:00".to_string(), instructions: None }
}

fn default_check_out_policy() -> TimePolicy {
    TimePolicy { time: "11:00".to_string(), instructions: None }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn sample_hotel() -> Hotel {
        let now = Utc::now();
        let mut hotel: Hotel = serde_json::from_value(json!({
            "id": "hotel-1",
            "name": "Grand Palace Hotel",
            "description": "Luxury in the heart of the city",
            "location": {
                "address": "123 Main Street",
                "city": "New York",
                "country": "United States"
            },
            "contact": {
                "phone": "+1-212-555-0123",
                "email": "Info@GrandPalace.com",
                "website": "https://grandpalace.example"
            },
            "images": [
                { "url": "https://img.example/1.jpg" },
                { "url": "https://img.example/2.jpg" }
            ],
            "pricing": {
                "basePrice": 200.0,
                "taxRate": 0.1,
                "serviceCharge": 25.0,
                "seasonalRates": [{
                    "name": "Summer",
                    "startDate": "2030-06-01",
                    "endDate": "2030-08-31",
                    "multiplier": 1.5
                }]
            },
            "roomTypes": [
                {
                    "id": "std",
                    "name": "Standard Queen",
                    "maxOccupancy": 2,
                    "bedConfiguration": "1 Queen Bed",
                    "priceAdjustment": 0.0,
                    "totalRooms": 2,
                    "availableRooms": 2
                },
                {
                    "name": "Family Suite",
                    "maxOccupancy": 5,
                    "bedConfiguration": "2 Queen Beds",
                    "priceAdjustment": 100.0,
                    "totalRooms": 3,
                    "availableRooms": 10
                }
            ],
            "owner": { "name": "Grand Hotels Group" },
            "createdAt": now,
            "updatedAt": now
        }))
        .unwrap();
        hotel.normalize();
        hotel
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_normalize_rules() {
        let hotel = sample_hotel();
        assert!(hotel.images[0].is_primary);
        assert_eq!(hotel.primary_image(), Some("https://img.example/1.jpg"));
        assert_eq!(hotel.room_types[1].available_rooms, 3);
        assert!(!hotel.room_types[1].id.is_empty());
        assert_eq!(hotel.contact.email, "info@grandpalace.com");
        assert_eq!(hotel.total_available_rooms(), 5);
        assert!(hotel.validate().is_ok());
    }

    #[test]
    fn test_defaults_applied() {
        let hotel = sample_hotel();
        assert_eq!(hotel.rating.overall, 4.0);
        assert_eq!(hotel.location.timezone, "UTC");
        assert_eq!(hotel.policies.check_in.time, "15:00");
        assert_eq!(hotel.status, HotelStatus::Active);
    }

    #[test]
    fn test_validation_failures() {
        let mut hotel = sample_hotel();
        hotel.location.coordinates.latitude = Some(91.0);
        assert!(hotel.validate().is_err());

        let mut hotel = sample_hotel();
        hotel.pricing.tax_rate = 1.5;
        assert!(hotel.validate().is_err());

        let mut hotel = sample_hotel();
        hotel.contact.website = Some("www.no-scheme.com".into());
        assert!(hotel.validate().is_err());

        let mut hotel = sample_hotel();
        hotel.room_types[0].max_occupancy = 0;
        assert!(hotel.validate().is_err());
    }

    #[test]
    fn test_seasonal_pricing() {
        let hotel = sample_hotel();
        assert_eq!(hotel.price_on(date("2030-05-31")), 200.0);
        assert_eq!(hotel.price_on(date("2030-06-01")), 300.0);
        assert_eq!(hotel.price_on(date("2030-08-31")), 300.0);
    }

    #[test]
    fn test_calculate_total_price() {
        let hotel = sample_hotel();
        let suite = hotel.room_types[1].id.clone();
        let quote = hotel.calculate_total_price(3, Some(&suite), date("2030-01-10"));
        assert_eq!(quote.base_price, 300.0);
        assert_eq!(quote.subtotal, 900.0);
        assert_eq!(quote.tax, 90.0);
        assert_eq!(quote.service_charge, 25.0);
        assert_eq!(quote.total, 1015.0);

        let plain = hotel.calculate_total_price(1, None, date("2030-01-10"));
        assert_eq!(plain.total, 245.0);
    }

    #[test]
    fn test_availability_filters_by_occupancy_and_status() {
        let mut hotel = sample_hotel();
        let result = hotel.check_availability(date("2030-01-01"), date("2030-01-03"), 4, &[]);
        assert!(result.available);
        assert_eq!(result.room_types.len(), 1);
        assert_eq!(result.total_available_rooms, 3);

        hotel.status = HotelStatus::Maintenance;
        let result = hotel.check_availability(date("2030-01-01"), date("2030-01-03"), 1, &[]);
        assert!(!result.available);
    }

    #[test]
    fn test_location_match_is_case_insensitive() {
        let hotel = sample_hotel();
        assert!(hotel.matches_location("new york", None));
        assert!(hotel.matches_location("YORK", Some("united")));
        assert!(!hotel.matches_location("Paris", None));
    }

    #[test]
    fn test_staff_membership() {
        let mut hotel = sample_hotel();
        hotel.staff.push(StaffMember {
            user_id: "u1".into(),
            role: StaffRole::Reception,
            permissions: vec![],
        });
        assert!(hotel.is_staff("u1"));
        assert!(!hotel.is_staff("u2"));
    }
}
