use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::common::{new_id, Address, Currency};
use crate::core::validation;
use crate::core::AppResult;
use crate::core::AppError;
use crate::storage::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum MembershipLevel {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl MembershipLevel {
    /// Tier earned by a points balance.
    pub fn for_points(points: u64) -> Self {
        match points {
            p if p >= 10_000 => Self::Platinum,
            p if p >= 5_000 => Self::Gold,
            p if p >= 1_000 => Self::Silver,
            _ => Self::Bronze,
        }
    }

    /// Booking discount in percent.
    pub fn discount_percentage(&self) -> u32 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 5,
            Self::Gold => 10,
            Self::Platinum => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub email: bool,
    #[serde(default)]
    pub sms: bool,
    #[serde(default)]
    pub marketing: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self { email: true, sms: false, marketing: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityPreferences {
    #[serde(default)]
    pub wheelchair_access: bool,
    #[serde(default)]
    pub hearing_impaired: bool,
    #[serde(default)]
    pub visually_impaired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub notifications: NotificationPreferences,
    #[serde(default)]
    pub accessibility: AccessibilityPreferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyProgram {
    #[serde(default)]
    pub membership_level: MembershipLevel,
    #[serde(default)]
    pub points: u64,
    pub member_since: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub phone: bool,
    #[serde(default)]
    pub identity: bool,
}

/// A guest or administrator account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clerk_id: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub preferences: Preferences,
    pub loyalty_program: LoyaltyProgram,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub role: UserRole,
    pub is_active: bool,
    #[serde(default)]
    pub is_guest: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, first_name: &str, last_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            clerk_id: None,
            email: email.trim().to_lowercase(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            phone: None,
            date_of_birth: None,
            address: Address::default(),
            preferences: Preferences::default(),
            loyalty_program: LoyaltyProgram {
                membership_level: MembershipLevel::Bronze,
                points: 0,
                member_since: now,
            },
            emergency_contact: None,
            role: UserRole::User,
            is_active: true,
            is_guest: false,
            last_login: Some(now),
            profile_image: None,
            verification_status: VerificationStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Credit points and promote the membership tier when a threshold is crossed.
    pub fn add_loyalty_points(&mut self, points: u64) {
        let program = &mut self.loyalty_program;
        program.points = program.points.saturating_add(points);
        let earned = MembershipLevel::for_points(program.points);
        if earned > program.membership_level {
            program.membership_level = earned;
        }
    }

    pub fn discount_percentage(&self) -> u32 {
        self.loyalty_program.membership_level.discount_percentage()
    }

    pub fn validate(&self, today: NaiveDate) -> AppResult<()> {
        validation::normalize_email(&self.email)?;
        validation::require("First name", &self.first_name)?;
        validation::require("Last name", &self.last_name)?;
        validation::max_len("First name", &self.first_name, 50)?;
        validation::max_len("Last name", &self.last_name, 50)?;

        if let Some(phone) = self.phone.as_deref().filter(|p| !p.is_empty()) {
            if !validation::is_valid_phone(phone) {
                return Err(AppError::validation("Please enter a valid phone number"));
            }
        }
        if let Some(dob) = self.date_of_birth {
            if dob >= today {
                return Err(AppError::validation("Date of birth must be in the past"));
            }
        }
        if let Some(phone) = self
            .emergency_contact
            .as_ref()
            .and_then(|c| c.phone.as_deref())
            .filter(|p| !p.is_empty())
        {
            if !validation::is_valid_phone(phone) {
                return Err(AppError::validation(
                    "Please enter a valid emergency contact phone number",
                ));
            }
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        let mut keys = vec![("email", self.email.clone())];
        if let Some(clerk_id) = &self.clerk_id {
            keys.push(("clerkId", clerk_id.clone()));
        }
        keys
    }
}

/// Password hash kept apart from the profile, keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: String,
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl Document for Credential {
    const COLLECTION: &'static str = "credentials";

    fn id(&self) -> &str {
        &self.id
    }
}

fn default_true() -> bool {
    true
}
