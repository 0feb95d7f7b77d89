use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::common::round_tenth;
use super::user::User;
use crate::core::validation;
use crate::core::{AppError, AppResult};
use crate::storage::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelType {
    Business,
    #[default]
    Leisure,
    Family,
    Couples,
    Solo,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReviewBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanliness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<f64>,
}

impl ReviewBreakdown {
    fn entries(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("cleanliness", self.cleanliness),
            ("service", self.service),
            ("location", self.location),
            ("value", self.value),
            ("amenities", self.amenities),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRating {
    pub overall: f64,
    #[serde(default)]
    pub breakdown: ReviewBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StayDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stay_duration: Option<u32>,
    #[serde(default)]
    pub travel_type: TravelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stay_month: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user: String,
    pub hotel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking: Option<String>,
    pub rating: ReviewRating,
    pub title: String,
    pub comment: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub stay_details: StayDetails,
    #[serde(default)]
    pub helpful_votes: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ReviewResponse>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Drop blank entries and trim the rest.
pub fn clean_points(points: Vec<String>) -> Vec<String> {
    points
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

impl Review {
    pub fn validate(&self) -> AppResult<()> {
        validation::in_range("Rating", self.rating.overall, 1.0, 5.0)?;
        for (name, value) in self.rating.breakdown.entries() {
            if let Some(value) = value {
                validation::in_range(name, value, 1.0, 5.0)?;
            }
        }
        validation::require("Review title", &self.title)?;
        validation::max_len("Title", &self.title, 100)?;
        validation::require("Review comment", &self.comment)?;
        validation::max_len("Comment", &self.comment, 1000)?;
        for pro in &self.pros {
            validation::max_len("Pro", pro, 200)?;
        }
        for con in &self.cons {
            validation::max_len("Con", con, 200)?;
        }
        if let Some(month) = &self.stay_details.stay_month {
            if !MONTHS.contains(&month.as_str()) {
                return Err(AppError::validation("Stay month must be a month name"));
            }
        }
        Ok(())
    }

    /// Upper-case initials of the author, `AN` when unknown.
    pub fn reviewer_initials(user: Option<&User>) -> String {
        let initial = |s: &str| s.chars().next();
        match user.and_then(|u| Some((initial(&u.first_name)?, initial(&u.last_name)?))) {
            Some((first, last)) => format!("{first}{last}").to_uppercase(),
            None => "AN".to_string(),
        }
    }

    pub fn mark_helpful(&mut self) -> u64 {
        self.helpful_votes += 1;
        self.helpful_votes
    }

    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Document for Review {
    const COLLECTION: &'static str = "reviews";

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        self.booking
            .iter()
            .map(|booking| ("booking", booking.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BreakdownAverages {
    pub cleanliness: f64,
    pub service: f64,
    pub location: f64,
    pub value: f64,
    pub amenities: f64,
}

/// Aggregate over a hotel's approved reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_reviews: u64,
    pub average_rating: f64,
    pub breakdown: BreakdownAverages,
    pub distribution: BTreeMap<u8, u64>,
}

impl ReviewStats {
    /// Averages rounded to one decimal. Reviews that are not approved are ignored.
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let approved: Vec<&Review> = reviews.into_iter().filter(|r| r.is_approved()).collect();
        let mut distribution: BTreeMap<u8, u64> = (1..=5).map(|star| (star, 0)).collect();
        for review in &approved {
            let star = review.rating.overall.round().clamp(1.0, 5.0) as u8;
            *distribution.entry(star).or_default() += 1;
        }

        let average = |values: Vec<f64>| -> f64 {
            if values.is_empty() {
                0.0
            } else {
                round_tenth(values.iter().sum::<f64>() / values.len() as f64)
            }
        };
        let field = |pick: fn(&ReviewBreakdown) -> Option<f64>| {
            average(approved.iter().filter_map(|r| pick(&r.rating.breakdown)).collect())
        };

        Self {
            total_reviews: approved.len() as u64,
            average_rating: average(approved.iter().map(|r| r.rating.overall).collect()),
            breakdown: BreakdownAverages {
                cleanliness: field(|b| b.cleanliness),
                service: field(|b| b.service),
                location: field(|b| b.location),
                value: field(|b| b.value),
                amenities: field(|b| b.amenities),
            },
            distribution,
        }
    }
}
