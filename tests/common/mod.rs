//! Shared fixtures for the HTTP tests.
#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use smartlodge::api::{ApiServer, AppState};
use smartlodge::core::AppConfig;
use smartlodge::models::hotel::{StaffMember, StaffRole};
use smartlodge::models::{Hotel, UserRole};
use smartlodge::payments::PaymentProvider;
use smartlodge::seed;
use smartlodge::storage::Database;
use std::sync::Arc;

pub const PASSWORD: &str = "secret123";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

pub fn test_app() -> TestApp {
    test_app_with(AppConfig::for_test(), None)
}

pub fn test_app_with(config: AppConfig, payments: Option<Arc<dyn PaymentProvider>>) -> TestApp {
    let state = AppState::with_parts(config, Database::in_memory(), None, payments).unwrap();
    from_state(state)
}

pub fn from_state(state: AppState) -> TestApp {
    let api = ApiServer::new(state);
    let state = api.state();
    let server = TestServer::new(api.create_router()).unwrap();
    TestApp { server, state }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub struct Account {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub async fn register(&self, email: &str) -> Account {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "firstName": "Test",
                "lastName": "Guest",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        Account {
            id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn register_admin(&self, email: &str) -> Account {
        let account = self.register(email).await;
        let mut user = self.state.db.users.get(&account.id).await.unwrap().unwrap();
        user.role = UserRole::Admin;
        self.state.db.users.replace(&user).await.unwrap();
        account
    }

    /// First bundled sample hotel, stored.
    pub async fn seed_hotel(&self) -> Hotel {
        let hotel = seed::parse_hotels(seed::SAMPLE_HOTELS).unwrap().remove(0);
        self.state.db.hotels.insert(&hotel).await.unwrap();
        hotel
    }

    /// A hotel already in the catalogue.
    pub async fn seed_hotel_by_name(&self, name: &str) -> Hotel {
        self.state
            .db
            .hotels
            .find_one(|h| h.name == name)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn add_staff(&self, hotel_id: &str, user_id: &str) {
        let mut hotel = self.state.db.hotels.get(hotel_id).await.unwrap().unwrap();
        hotel.staff.push(StaffMember {
            user_id: user_id.to_string(),
            role: StaffRole::Reception,
            permissions: vec![],
        });
        self.state.db.hotels.replace(&hotel).await.unwrap();
    }

    /// Create a booking as `account` and return its JSON.
    pub async fn book(&self, account: &Account, hotel: &Hotel, days_ahead: i64, nights: i64) -> Value {
        let response = self
            .server
            .post("/api/bookings")
            .add_header("Authorization", bearer(&account.token))
            .json(&booking_body(hotel, days_ahead, nights))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        body["data"]["booking"].clone()
    }
}

pub fn day(offset: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(offset)
}

pub fn booking_body(hotel: &Hotel, days_ahead: i64, nights: i64) -> Value {
    json!({
        "hotelId": hotel.id,
        "roomTypeId": hotel.room_types[0].id,
        "checkIn": day(days_ahead),
        "checkOut": day(days_ahead + nights),
        "guests": { "adults": 2 },
        "guestDetails": {
            "primaryGuest": {
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "phone": "+1 555 0100"
            }
        },
        "paymentMethod": "credit-card"
    })
}
