//! Password strength rules and bcrypt hashing

use crate::core::{AppError, AppResult};

pub struct PasswordService {
    min_length: usize,
    bcrypt_cost: u32,
}

impl PasswordService {
    pub fn new(min_length: usize, bcrypt_cost: u32) -> Self {
        Self { min_length, bcrypt_cost }
    }

    /// At least `min_length` characters with one letter and one digit.
    pub fn validate_strength(&self, password: &str) -> AppResult<()> {
        if password.chars().count() < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                self.min_length
            )));
        }
        if !password.chars().any(|c| c.is_alphabetic()) {
            return Err(AppError::validation("Password must contain at least one letter"));
        }
        if !password.chars().any(|c| c.is_numeric()) {
            return Err(AppError::validation("Password must contain at least one number"));
        }
        Ok(())
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        bcrypt::hash(password, self.bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new(6, bcrypt::DEFAULT_COST)
    }
}
