//! Guest reviews, moderation and the hotel rating they feed.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::info;

use super::access;
use crate::core::{AppError, AppResult};
use crate::models::common::new_id;
use crate::models::review::{clean_points, ReviewRating, StayDetails, MONTHS};
use crate::models::{apply_patch, Booking, BookingStatus, Review, ReviewStats, ReviewStatus, User};
use crate::storage::{page_limit, Database, Page};

/// Review fields an author may edit.
const EDITABLE_FIELDS: [&str; 6] = ["rating", "title", "comment", "pros", "cons", "stayDetails"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[serde(alias = "hotel")]
    pub hotel_id: String,
    #[serde(default, alias = "booking")]
    pub booking_id: Option<String>,
    pub rating: ReviewRating,
    pub title: String,
    pub comment: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub stay_details: Option<StayDetails>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ReviewSort {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "rating")]
    Rating,
    #[serde(rename = "helpfulVotes")]
    HelpfulVotes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelReviewQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub sort_by: ReviewSort,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Only reviews whose overall rating rounds to this star value.
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRequest {
    pub status: ReviewStatus,
    #[serde(default)]
    pub moderation_notes: Option<String>,
}

/// A published review with a short reviewer label instead of the account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicReview {
    #[serde(flatten)]
    pub review: Review,
    pub reviewer_name: String,
    pub reviewer_initials: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpfulCount {
    pub helpful_votes: u64,
}

fn review_order(sort: ReviewSort, order: SortOrder) -> impl FnMut(&Review, &Review) -> Ordering {
    move |a, b| {
        let ascending = match sort {
            ReviewSort::CreatedAt => a.created_at.cmp(&b.created_at),
            ReviewSort::Rating => a.rating.overall.total_cmp(&b.rating.overall),
            ReviewSort::HelpfulVotes => a.helpful_votes.cmp(&b.helpful_votes),
        };
        match order {
            SortOrder::Asc => ascending,
            SortOrder::Desc => ascending.reverse(),
        }
    }
}

/// Stay details taken from the booking where the author left them out.
fn stay_from_booking(details: Option<StayDetails>, booking: &Booking) -> StayDetails {
    let mut details = details.unwrap_or_default();
    details.room_type.get_or_insert_with(|| booking.room_type.name.clone());
    details.stay_duration.get_or_insert(booking.dates.nights);
    if details.stay_month.is_none() {
        let month = booking.dates.check_in.month0() as usize;
        details.stay_month = Some(MONTHS[month].to_string());
    }
    details
}

pub struct ReviewService {
    db: Database,
}

impl ReviewService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn load(&self, review_id: &str) -> AppResult<Review> {
        self.db
            .reviews
            .get(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review"))
    }

    async fn ensure_hotel(&self, hotel_id: &str) -> AppResult<()> {
        if self.db.hotels.get(hotel_id).await?.is_none() {
            return Err(AppError::not_found("Hotel"));
        }
        Ok(())
    }

    /// Write the approved-review aggregate back onto the hotel.
    async fn refresh_hotel_rating(&self, hotel_id: &str) -> AppResult<()> {
        let Some(mut hotel) = self.db.hotels.get(hotel_id).await? else {
            return Ok(());
        };
        let reviews = self.db.reviews.find(|r| r.hotel == hotel.id).await?;
        let stats = ReviewStats::from_reviews(&reviews);

        hotel.rating.review_count = stats.total_reviews;
        if stats.total_reviews > 0 {
            hotel.rating.overall = stats.average_rating;
            let breakdown = &mut hotel.rating.breakdown;
            for (slot, value) in [
                (&mut breakdown.cleanliness, stats.breakdown.cleanliness),
                (&mut breakdown.service, stats.breakdown.service),
                (&mut breakdown.location, stats.breakdown.location),
                (&mut breakdown.value, stats.breakdown.value),
                (&mut breakdown.amenities, stats.breakdown.amenities),
            ] {
                // zero means no review rated this aspect
                if value > 0.0 {
                    *slot = value;
                }
            }
        }
        hotel.touch();
        self.db.hotels.replace(&hotel).await?;
        Ok(())
    }

    pub async fn create(&self, user: &User, req: CreateReviewRequest) -> AppResult<Review> {
        self.ensure_hotel(&req.hotel_id).await?;

        let stay_details = match req.booking_id.as_deref() {
            Some(booking_id) => {
                let booking = self
                    .db
                    .bookings
                    .get(booking_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Booking"))?;
                if booking.user != user.id {
                    return Err(AppError::forbidden("You can only review your own bookings"));
                }
                if booking.hotel != req.hotel_id {
                    return Err(AppError::BadRequest(
                        "Booking does not belong to this hotel".to_string(),
                    ));
                }
                if booking.status != BookingStatus::CheckedOut {
                    return Err(AppError::BadRequest(
                        "You can only review a completed stay".to_string(),
                    ));
                }
                stay_from_booking(req.stay_details, &booking)
            }
            None => {
                let duplicate = self
                    .db
                    .reviews
                    .find_one(|r| r.user == user.id && r.hotel == req.hotel_id && r.booking.is_none())
                    .await?;
                if duplicate.is_some() {
                    return Err(AppError::Conflict(
                        "You have already reviewed this hotel".to_string(),
                    ));
                }
                req.stay_details.unwrap_or_default()
            }
        };

        let verified = self
            .db
            .bookings
            .find_one(|b| {
                b.user == user.id && b.hotel == req.hotel_id && b.status == BookingStatus::CheckedOut
            })
            .await?
            .is_some();

        let now = Utc::now();
        let review = Review {
            id: new_id(),
            user: user.id.clone(),
            hotel: req.hotel_id,
            booking: req.booking_id,
            rating: req.rating,
            title: req.title.trim().to_string(),
            comment: req.comment.trim().to_string(),
            pros: clean_points(req.pros),
            cons: clean_points(req.cons),
            stay_details,
            helpful_votes: 0,
            verified,
            response: None,
            status: ReviewStatus::Approved,
            moderation_notes: None,
            created_at: now,
            updated_at: now,
        };
        review.validate()?;
        self.db.reviews.insert(&review).await.map_err(|err| match err {
            crate::storage::StorageError::Duplicate { .. } => {
                AppError::Conflict("This booking has already been reviewed".to_string())
            }
            other => other.into(),
        })?;
        self.refresh_hotel_rating(&review.hotel).await?;

        info!(review_id = %review.id, hotel_id = %review.hotel, verified, "review created");
        Ok(review)
    }

    pub async fn hotel_reviews(
        &self,
        hotel_id: &str,
        query: HotelReviewQuery,
    ) -> AppResult<Page<PublicReview>> {
        self.ensure_hotel(hotel_id).await?;
        let hotel_id = hotel_id.to_string();
        let stars = query.rating;
        let page = self
            .db
            .reviews
            .paginate(
                move |r| {
                    r.hotel == hotel_id
                        && r.is_approved()
                        && stars.map_or(true, |s| r.rating.overall.round() as u8 == s)
                },
                review_order(query.sort_by, query.sort_order),
                query.page.unwrap_or(1),
                page_limit(query.limit, 10),
            )
            .await?;

        let mut items = Vec::with_capacity(page.items.len());
        for review in &page.items {
            let author = self.db.users.get(&review.user).await?;
            items.push(PublicReview {
                reviewer_name: author
                    .as_ref()
                    .map(|u| u.first_name.clone())
                    .unwrap_or_else(|| "Anonymous".to_string()),
                reviewer_initials: Review::reviewer_initials(author.as_ref()),
                review: review.clone(),
            });
        }
        Ok(Page {
            items,
            total: page.total,
            page: page.page,
            pages: page.pages,
            limit: page.limit,
        })
    }

    pub async fn hotel_stats(&self, hotel_id: &str) -> AppResult<ReviewStats> {
        self.ensure_hotel(hotel_id).await?;
        let reviews = self.db.reviews.find(|r| r.hotel == hotel_id).await?;
        Ok(ReviewStats::from_reviews(&reviews))
    }

    pub async fn my_reviews(&self, user: &User, page: u64, limit: u64) -> AppResult<Page<Review>> {
        let user_id = user.id.clone();
        Ok(self
            .db
            .reviews
            .paginate(
                move |r| r.user == user_id,
                |a, b| b.created_at.cmp(&a.created_at),
                page,
                limit,
            )
            .await?)
    }

    /// Completed stays the user has not reviewed yet.
    pub async fn eligible_bookings(&self, user: &User) -> AppResult<Vec<Booking>> {
        let reviewed: Vec<String> = self
            .db
            .reviews
            .find(|r| r.user == user.id)
            .await?
            .into_iter()
            .filter_map(|r| r.booking)
            .collect();
        let mut bookings = self
            .db
            .bookings
            .find(|b| {
                b.user == user.id
                    && b.status == BookingStatus::CheckedOut
                    && !reviewed.contains(&b.id)
            })
            .await?;
        bookings.sort_by(|a, b| b.dates.check_out.cmp(&a.dates.check_out));
        Ok(bookings)
    }

    /// Edits go back to moderation.
    pub async fn update(&self, user: &User, review_id: &str, changes: Value) -> AppResult<Review> {
        let review = self.load(review_id).await?;
        if review.user != user.id {
            return Err(AppError::forbidden("You can only edit your own reviews"));
        }
        let mut updated = apply_patch(&review, changes, Some(&EDITABLE_FIELDS))?;
        updated.title = updated.title.trim().to_string();
        updated.comment = updated.comment.trim().to_string();
        updated.pros = clean_points(updated.pros);
        updated.cons = clean_points(updated.cons);
        updated.status = ReviewStatus::Pending;
        updated.validate()?;
        updated.touch();
        self.db.reviews.replace(&updated).await?;
        self.refresh_hotel_rating(&updated.hotel).await?;
        info!(review_id, "review updated");
        Ok(updated)
    }

    pub async fn delete(&self, user: &User, review_id: &str) -> AppResult<()> {
        let review = self.load(review_id).await?;
        access::ensure_owner(user, &review.user)?;
        self.db.reviews.delete(review_id).await?;
        self.refresh_hotel_rating(&review.hotel).await?;
        info!(review_id, by = %user.email, "review deleted");
        Ok(())
    }

    pub async fn mark_helpful(&self, user: &User, review_id: &str) -> AppResult<HelpfulCount> {
        let mut review = self.load(review_id).await?;
        if !review.is_approved() {
            return Err(AppError::not_found("Review"));
        }
        if review.user == user.id {
            return Err(AppError::BadRequest(
                "You cannot vote for your own review".to_string(),
            ));
        }
        let helpful_votes = review.mark_helpful();
        self.db.reviews.replace(&review).await?;
        Ok(HelpfulCount { helpful_votes })
    }

    pub async fn moderate(
        &self,
        admin: &User,
        review_id: &str,
        req: ModerationRequest,
    ) -> AppResult<Review> {
        access::ensure_admin(admin)?;
        let mut review = self.load(review_id).await?;
        review.status = req.status;
        if req.moderation_notes.is_some() {
            review.moderation_notes = req.moderation_notes;
        }
        review.touch();
        self.db.reviews.replace(&review).await?;
        self.refresh_hotel_rating(&review.hotel).await?;
        info!(review_id, status = ?review.status, by = %admin.email, "review moderated");
        Ok(review)
    }
}
