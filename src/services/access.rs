//! Ownership, staff and admin checks shared by the services.

use crate::core::{AppError, AppResult};
use crate::models::{Hotel, User};

pub fn ensure_admin(user: &User) -> AppResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Admin access required"))
    }
}

/// Owners and admins pass.
pub fn ensure_owner(user: &User, owner_id: &str) -> AppResult<()> {
    if user.is_admin() || user.id == owner_id {
        Ok(())
    } else {
        Err(AppError::forbidden("Access denied"))
    }
}

/// Staff of `hotel` and admins pass.
pub fn ensure_staff(user: &User, hotel: &Hotel) -> AppResult<()> {
    if user.is_admin() || hotel.is_staff(&user.id) {
        Ok(())
    } else {
        Err(AppError::forbidden("Hotel staff access required"))
    }
}
