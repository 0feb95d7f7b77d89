//! Profiles, per-user statistics and account administration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::auth::service::PROFILE_FIELDS;
use crate::core::{AppError, AppResult};
use crate::models::hotel::contains_ci;
use crate::models::user::{LoyaltyProgram, Preferences};
use crate::models::{apply_patch, round_cents, Booking, BookingStatus, User};
use crate::storage::{page_limit, Database, Page};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountFilter {
    #[default]
    Active,
    Inactive,
    All,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub status: AccountFilter,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyGrant {
    pub points: u64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_bookings: u64,
    pub total_spent: f64,
    pub avg_booking_value: f64,
    pub completed_bookings: u64,
    pub cancelled_bookings: u64,
    pub upcoming_bookings: u64,
    pub reviews_written: u64,
    pub loyalty_program: LoyaltyProgram,
    pub member_since: DateTime<Utc>,
}

/// A user with their latest bookings, for the admin detail view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub user: User,
    pub recent_bookings: Vec<Booking>,
}

const RECENT_BOOKINGS: usize = 5;

pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn load(&self, user_id: &str) -> AppResult<User> {
        self.db
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    async fn save(&self, user: &mut User) -> AppResult<()> {
        user.validate(Utc::now().date_naive())?;
        user.touch();
        self.db.users.replace(user).await?;
        Ok(())
    }

    /// Fresh copy of the caller's account.
    pub async fn profile(&self, user: &User) -> AppResult<User> {
        self.load(&user.id).await
    }

    pub async fn update_profile(&self, user: &User, changes: Value) -> AppResult<User> {
        let current = self.load(&user.id).await?;
        let mut updated = apply_patch(&current, changes, Some(&PROFILE_FIELDS))?;
        self.save(&mut updated).await?;
        info!(user_id = %updated.id, "profile updated");
        Ok(updated)
    }

    /// Merge the given keys into the stored preferences.
    pub async fn update_preferences(&self, user: &User, changes: Value) -> AppResult<Preferences> {
        let mut current = self.load(&user.id).await?;
        current.preferences = apply_patch(&current.preferences, changes, None)?;
        self.save(&mut current).await?;
        Ok(current.preferences)
    }

    /// Soft delete of the caller's own account.
    pub async fn delete_account(&self, user: &User) -> AppResult<()> {
        let mut current = self.load(&user.id).await?;
        current.is_active = false;
        current.touch();
        self.db.users.replace(&current).await?;
        info!(user_id = %current.id, "account deactivated");
        Ok(())
    }

    pub async fn bookings(
        &self,
        user: &User,
        status: Option<BookingStatus>,
        page: u64,
        limit: u64,
    ) -> AppResult<Page<Booking>> {
        let user_id = user.id.clone();
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

    pub async fn stats(&self, user: &User, now: DateTime<Utc>) -> AppResult<UserStats> {
        let current = self.load(&user.id).await?;
        let bookings = self.db.bookings.find(|b| b.user == current.id).await?;
        let reviews_written = self.db.reviews.count(|r| r.user == current.id).await?;

        let spent_on: Vec<&Booking> = bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled)
            .collect();
        let total_spent = round_cents(spent_on.iter().map(|b| b.pricing.total).sum());
        let avg_booking_value = if spent_on.is_empty() {
            0.0
        } else {
            round_cents(total_spent / spent_on.len() as f64)
        };
        let count = |status: BookingStatus| bookings.iter().filter(|b| b.status == status).count() as u64;

        Ok(UserStats {
            total_bookings: bookings.len() as u64,
            total_spent,
            avg_booking_value,
            completed_bookings: count(BookingStatus::CheckedOut),
            cancelled_bookings: count(BookingStatus::Cancelled),
            upcoming_bookings: bookings
                .iter()
                .filter(|b| {
                    matches!(b.status, BookingStatus::Pending | BookingStatus::Confirmed)
                        && b.dates.check_in >= now.date_naive()
                })
                .count() as u64,
            reviews_written,
            member_since: current.loyalty_program.member_since,
            loyalty_program: current.loyalty_program,
        })
    }

    pub async fn list(&self, query: UserListQuery) -> AppResult<Page<User>> {
        let filter = query.status;
        Ok(self
            .db
            .users
            .paginate(
                move |u| match filter {
                    AccountFilter::Active => u.is_active,
                    AccountFilter::Inactive => !u.is_active,
                    AccountFilter::All => true,
                },
                |a, b| b.created_at.cmp(&a.created_at),
                query.page.unwrap_or(1),
                page_limit(query.limit, 20),
            )
            .await?)
    }

    /// Case-insensitive match on email, first or last name.
    pub async fn search(&self, query: UserSearchQuery) -> AppResult<Page<User>> {
        let term = query.q.trim().to_string();
        if term.is_empty() {
            return Err(AppError::validation("Search query is required"));
        }
        Ok(self
            .db
            .users
            .paginate(
                move |u| {
                    contains_ci(&u.email, &term)
                        || contains_ci(&u.first_name, &term)
                        || contains_ci(&u.last_name, &term)
                },
                |a, b| a.email.cmp(&b.email),
                query.page.unwrap_or(1),
                page_limit(query.limit, 20),
            )
            .await?)
    }

    pub async fn get(&self, user_id: &str) -> AppResult<UserDetail> {
        let user = self.load(user_id).await?;
        let mut recent_bookings = self.db.bookings.find(|b| b.user == user.id).await?;
        recent_bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_bookings.truncate(RECENT_BOOKINGS);
        Ok(UserDetail { user, recent_bookings })
    }

    pub async fn set_status(&self, admin: &User, user_id: &str, update: StatusUpdate) -> AppResult<User> {
        if admin.id == user_id && !update.is_active {
            return Err(AppError::BadRequest(
                "Administrators cannot deactivate their own account".to_string(),
            ));
        }
        let mut user = self.load(user_id).await?;
        user.is_active = update.is_active;
        user.touch();
        self.db.users.replace(&user).await?;
        info!(user_id, active = update.is_active, by = %admin.email, "account status changed");
        Ok(user)
    }

    pub async fn add_loyalty_points(
        &self,
        admin: &User,
        user_id: &str,
        grant: LoyaltyGrant,
    ) -> AppResult<User> {
        if grant.points == 0 {
            return Err(AppError::validation("Points must be a positive number"));
        }
        let mut user = self.load(user_id).await?;
        user.add_loyalty_points(grant.points);
        user.touch();
        self.db.users.replace(&user).await?;
        info!(
            user_id,
            points = grant.points,
            reason = grant.reason.as_deref().unwrap_or("manual adjustment"),
            by = %admin.email,
            "loyalty points granted"
        );
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::tests::sample_booking;
    use crate::models::{MembershipLevel, UserRole};
    use serde_json::json;

    async fn setup() -> (UserService, Database, User) {
        let db = Database::in_memory();
        let user = User::new("guest@example.com", "Gail", "Guest");
        db.users.insert(&user).await.unwrap();
        (UserService::new(db.clone()), db, user)
    }

    #[tokio::test]
    async fn test_profile_update_ignores_protected_fields() {
        let (service, _, user) = setup().await;
        let updated = service
            .update_profile(&user, json!({ "firstName": "Gwen", "role": "admin", "email": "x@y.com" }))
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Gwen");
        assert_eq!(updated.role, UserRole::User);
        assert_eq!(updated.email, "guest@example.com");
    }

    #[tokio::test]
    async fn test_stats_counts_bookings() {
        let (service, db, user) = setup().await;
        let start = Utc::now().date_naive() + chrono::Duration::days(5);
        for status in [BookingStatus::Pending, BookingStatus::CheckedOut, BookingStatus::Cancelled] {
            let mut booking = sample_booking(start, 2);
            booking.user = user.id.clone();
            booking.status = status;
            db.bookings.insert(&booking).await.unwrap();
        }

        let stats = service.stats(&user, Utc::now()).await.unwrap();
        assert_eq!(stats.total_bookings, 3);
        assert_eq!(stats.completed_bookings, 1);
        assert_eq!(stats.cancelled_bookings, 1);
        assert_eq!(stats.upcoming_bookings, 1);
        assert_eq!(stats.total_spent, 880.0);
        assert_eq!(stats.avg_booking_value, 440.0);
    }

    #[tokio::test]
    async fn test_admin_listing_and_search() {
        let (service, db, user) = setup().await;
        let mut other = User::new("maria@example.com", "Maria", "Lopez");
        other.is_active = false;
        db.users.insert(&other).await.unwrap();

        let active = service.list(UserListQuery::default()).await.unwrap();
        assert_eq!(active.total, 1);
        assert_eq!(active.items[0].id, user.id);

        let all = service
            .list(UserListQuery { status: AccountFilter::All, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let found = service
            .search(UserSearchQuery { q: "LOP".into(), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(found.items[0].id, other.id);
        assert!(service.search(UserSearchQuery::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_loyalty_grant_promotes() {
        let (service, _, user) = setup().await;
        let mut admin = User::new("admin@example.com", "Ada", "Admin");
        admin.role = UserRole::Admin;
        let updated = service
            .add_loyalty_points(&admin, &user.id, LoyaltyGrant { points: 5_200, reason: None })
            .await
            .unwrap();
        assert_eq!(updated.loyalty_program.membership_level, MembershipLevel::Gold);

        assert!(service
            .set_status(&admin, &admin.id, StatusUpdate { is_active: false })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_preferences_merge() {
        let (service, _, user) = setup().await;
        let prefs = service
            .update_preferences(&user, json!({ "currency": "EUR" }))
            .await
            .unwrap();
        assert_eq!(prefs.currency, crate::models::Currency::Eur);
    }
}
