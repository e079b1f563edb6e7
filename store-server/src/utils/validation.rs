//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Limits mirror what the admin dashboard enforces client-side, so a
//! well-behaved client never sees these errors.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Category names: the dashboard form enforces 6-25 characters
pub const MIN_CATEGORY_NAME_LEN: usize = 6;
pub const MAX_CATEGORY_NAME_LEN: usize = 25;

/// Product / variant names
pub const MAX_NAME_LEN: usize = 200;

/// Notes, descriptions
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone, SKU, etc.
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Addresses
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Validation helpers (CRUD handlers) ──────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.chars().count()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.chars().count() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.chars().count()
        )));
    }
    Ok(())
}

/// Validate a category name against the 6-25 character window.
pub fn validate_category_name(name: &str) -> Result<(), AppError> {
    let len = name.trim().chars().count();
    if len < MIN_CATEGORY_NAME_LEN || len > MAX_CATEGORY_NAME_LEN {
        return Err(AppError::validation(format!(
            "category name must be {MIN_CATEGORY_NAME_LEN}-{MAX_CATEGORY_NAME_LEN} characters ({len} given)"
        )));
    }
    Ok(())
}

/// Validate a star rating value (1-5).
pub fn validate_rating(star: i32) -> Result<(), AppError> {
    if !(1..=5).contains(&star) {
        return Err(AppError::validation(format!(
            "rating must be between 1 and 5 ({star} given)"
        )));
    }
    Ok(())
}

/// Derive a URL-safe slug from a product name.
///
/// Lowercases, maps whitespace runs to single dashes and drops anything
/// outside `[a-z0-9-]`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_name_window() {
        assert!(validate_category_name("Phones").is_ok()); // exactly 6
        assert!(validate_category_name("Gaming Laptops & Desktops").is_ok()); // exactly 25
        assert!(validate_category_name("Audio").is_err()); // 5 chars
        assert!(validate_category_name("A very long category name here").is_err());
        assert!(validate_category_name("   ").is_err());
    }

    #[test]
    fn test_rating_range() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("ok", "name", 10).is_ok());
        assert!(validate_required_text("  ", "name", 10).is_err());
        assert!(validate_required_text("0123456789ab", "name", 10).is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Galaxy S24 Ultra"), "galaxy-s24-ultra");
        assert_eq!(slugify("  iPhone 15 Pro (256GB)  "), "iphone-15-pro-256gb");
        assert_eq!(slugify("---"), "");
    }
}
