//! Shared utility functions

use chrono::{DateTime, Utc};

/// Parse a datetime string (RFC3339 format) or return current time
pub fn parse_datetime_or_now(s: &str) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Canonical form of an email address: trimmed and lowercased.
///
/// Every lookup and insert goes through this so that `A@X.com` and
/// ` a@x.com` resolve to the same identity.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Build a URL slug from a display name
///
/// Alphanumeric characters are lowercased and kept; every other run of
/// characters collapses into a single `-`. Leading and trailing separators
/// are dropped.
///
/// # Examples
///
/// ```
/// use storefront_db::utils::slugify;
///
/// assert_eq!(slugify("Home & Garden"), "home-garden");
/// assert_eq!(slugify("  USB-C Cables "), "usb-c-cables");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Electronics"), "electronics");
        assert_eq!(slugify("Home & Garden"), "home-garden");
        assert_eq!(slugify("--Kids' Toys--"), "kids-toys");
        assert_eq!(slugify("Café Crème"), "café-crème");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }

    #[test]
    fn test_parse_datetime_or_now() {
        let parsed = parse_datetime_or_now("2024-01-01T12:00:00Z");
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");

        let now_before = Utc::now();
        let parsed = parse_datetime_or_now("invalid");
        let now_after = Utc::now();
        assert!(parsed >= now_before && parsed <= now_after);
    }
}
