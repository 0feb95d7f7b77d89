//! Domain documents and their pure rules.

pub mod booking;
pub mod common;
pub mod hotel;
pub mod review;
pub mod user;

pub use booking::{Booking, BookingStatus, PaymentStatus};
pub use common::{round_cents, Address, Currency};
pub use hotel::{Hotel, HotelStatus, RoomType};
pub use review::{Review, ReviewStats, ReviewStatus};
pub use user::{Credential, MembershipLevel, User, UserRole};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::core::{AppError, AppResult};

/// Fields a client can never overwrite through a patch.
const PROTECTED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Replace the top-level fields of `doc` named in `patch`, then re-read the document.
///
/// Only keys listed in `allowed` are applied when it is given.
pub fn apply_patch<T>(doc: &T, patch: Value, allowed: Option<&[&str]>) -> AppResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let Value::Object(changes) = patch else {
        return Err(AppError::validation("Request body must be a JSON object"));
    };
    let mut current = serde_json::to_value(doc).map_err(|e| AppError::Internal(e.to_string()))?;
    let Some(fields) = current.as_object_mut() else {
        return Err(AppError::Internal("document is not an object".to_string()));
    };

    for (key, value) in changes {
        if PROTECTED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if allowed.is_some_and(|keys| !keys.contains(&key.as_str())) {
            continue;
        }
        fields.insert(key, value);
    }

    serde_json::from_value(current).map_err(|e| AppError::validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_replaces_top_level_fields() {
        let user = User::new("a@b.com", "Ann", "Lee");
        let patched = apply_patch(&user, json!({ "firstName": "Anna", "id": "hijack" }), None)
            .unwrap();
        assert_eq!(patched.first_name, "Anna");
        assert_eq!(patched.id, user.id);
    }

    #[test]
    fn test_patch_respects_allow_list() {
        let user = User::new("a@b.com", "Ann", "Lee");
        let patched = apply_patch(
            &user,
            json!({ "firstName": "Anna", "role": "admin" }),
            Some(&["firstName"]),
        )
        .unwrap();
        assert_eq!(patched.first_name, "Anna");
        assert_eq!(patched.role, UserRole::User);
    }

    #[test]
    fn test_patch_rejects_bad_types() {
        let user = User::new("a@b.com", "Ann", "Lee");
        assert!(apply_patch(&user, json!({ "isActive": "yes" }), None).is_err());
        assert!(apply_patch(&user, json!([1, 2]), None).is_err());
    }
}
