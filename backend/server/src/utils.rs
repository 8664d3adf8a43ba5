use std::sync::LazyLock;

use regex::Regex;

use crate::{
    error::AppError::{self, InvalidId, MalformedPayload},
    password::MAX_PASSWORD_LENGTH,
};

pub const NAME_LIMIT: usize = 100;
pub const YEAR_LIMIT: usize = 10;
pub const ADDRESS_LIMIT: usize = 255;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PHONE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-().]").unwrap());
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap());

/// Trims and collapses runs of whitespace into a single space.
pub fn sanitize(input: &str) -> String {
    WHITESPACE.replace_all(input.trim(), " ").into_owned()
}

pub fn required(input: &str, limit: usize) -> Result<String, AppError> {
    let value = sanitize(input);

    if value.is_empty() || value.chars().count() > limit {
        return Err(MalformedPayload);
    }

    Ok(value)
}

/// Empty input becomes `None`.
pub fn optional(input: &str, limit: usize) -> Result<Option<String>, AppError> {
    let value = sanitize(input);

    if value.chars().count() > limit {
        return Err(MalformedPayload);
    }

    Ok((!value.is_empty()).then_some(value))
}

/// Like [`optional`] but keeps the empty string, for columns being overwritten.
pub fn bounded(input: &str, limit: usize) -> Result<String, AppError> {
    optional(input, limit).map(Option::unwrap_or_default)
}

/// Strips common separators and checks for 7 to 15 digits with an optional leading `+`.
pub fn normalize_phone(input: &str) -> Result<String, AppError> {
    let phone = PHONE_SEPARATORS.replace_all(input.trim(), "").into_owned();

    if !PHONE.is_match(&phone) {
        return Err(MalformedPayload);
    }

    Ok(phone)
}

/// Passwords are taken verbatim, no trimming.
pub fn password(input: &str) -> Result<&str, AppError> {
    if input.is_empty() || input.len() > MAX_PASSWORD_LENGTH {
        return Err(MalformedPayload);
    }

    Ok(input)
}

/// Path ids that don't parse become 0, which never matches an auto-assigned id.
pub fn path_id(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

pub fn form_id(raw: &str) -> Result<i64, AppError> {
    raw.trim().parse().map_err(|_| InvalidId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  Asha   Rao "), "Asha Rao");
        assert_eq!(sanitize("line\none\ttab"), "line one tab");
        assert_eq!(sanitize("     "), "");
    }

    #[test]
    fn test_required() {
        assert_eq!(required(" CSE ", NAME_LIMIT).unwrap(), "CSE");
        assert!(matches!(required("   ", NAME_LIMIT), Err(MalformedPayload)));
        assert!(matches!(required("2024-2025 batch", YEAR_LIMIT), Err(MalformedPayload)));
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional("", NAME_LIMIT).unwrap(), None);
        assert_eq!(optional(" IIT ", NAME_LIMIT).unwrap(), Some("IIT".to_string()));
        assert!(optional(&"a".repeat(ADDRESS_LIMIT + 1), ADDRESS_LIMIT).is_err());
    }

    #[test]
    fn test_bounded() {
        assert_eq!(bounded("  ", YEAR_LIMIT).unwrap(), "");
        assert_eq!(bounded("3rd", YEAR_LIMIT).unwrap(), "3rd");
    }

    #[test]
    fn test_phone() {
        assert_eq!(normalize_phone("98765 43210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("+91 (987) 654-3210").unwrap(), "+919876543210");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("98765abc10").is_err());
        assert!(normalize_phone("").is_err());
    }

    #[test]
    fn test_password() {
        assert_eq!(password(" spaced ").unwrap(), " spaced ");
        assert!(password("").is_err());
        assert!(password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_ids() {
        assert_eq!(path_id("42"), 42);
        assert_eq!(path_id("abc"), 0);
        assert_eq!(form_id(" 7 ").unwrap(), 7);
        assert!(matches!(form_id("seven"), Err(InvalidId)));
        assert!(matches!(form_id(""), Err(InvalidId)));
    }
}
