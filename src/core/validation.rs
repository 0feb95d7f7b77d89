//! Field validators shared by the models.

use once_cell::sync::Lazy;
use regex::Regex;

use super::errors::AppError;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([.\-]?\w+)*@\w+([.\-]?\w+)*(\.\w{2,3})+$").expect("valid email regex")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[\d\s\-()]+$").expect("valid phone regex"));

static WEBSITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://.+").expect("valid website regex"));

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid time regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_website(url: &str) -> bool {
    WEBSITE_RE.is_match(url)
}

/// `HH:MM`, 24 hour clock.
pub fn is_valid_time(value: &str) -> bool {
    TIME_RE.is_match(value)
}

/// Lower-cased, trimmed email or a validation error.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("Please enter a valid email"));
    }
    Ok(email)
}

pub fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn max_len(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(())
}

pub fn in_range<T: PartialOrd + std::fmt::Display>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<(), AppError> {
    if value < min || value > max {
        return Err(AppError::validation(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("guest@example.com", true ; "plain address")]
    #[test_case("first.last@hotel-group.co.uk", true ; "dotted and hyphenated")]
    #[test_case("no-at-sign.com", false ; "missing at")]
    #[test_case("a@b", false ; "missing tld")]
    #[test_case("a@b.toolong", false ; "tld too long")]
    fn test_email_pattern(input: &str, expected: bool) {
        assert_eq!(is_valid_email(input), expected);
    }

    #[test_case("+1 (555) 123-4567", true ; "formatted")]
    #[test_case("5551234567", true ; "digits")]
    #[test_case("call me", false ; "letters")]
    fn test_phone_pattern(input: &str, expected: bool) {
        assert_eq!(is_valid_phone(input), expected);
    }

    #[test]
    fn test_normalize_email_lowercases() {
        assert_eq!(normalize_email("  Guest@Example.COM ").unwrap(), "guest@example.com");
        assert!(normalize_email("").is_err());
    }

    #[test]
    fn test_website_and_time() {
        assert!(is_valid_website("https://hotel.example"));
        assert!(!is_valid_website("ftp://hotel.example"));
        assert!(is_valid_time("15:00"));
        assert!(!is_valid_time("25:00"));
    }

    #[test]
    fn test_limits() {
        assert!(max_len("Name", "abc", 3).is_ok());
        assert!(max_len("Name", "abcd", 3).is_err());
        assert!(in_range("Rating", 5, 1, 5).is_ok());
        assert!(in_range("Rating", 6, 1, 5).is_err());
        assert!(non_negative("Price", -1.0).is_err());
    }
}
