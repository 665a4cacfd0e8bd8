//! Cookie session channel
//!
//! A session cookie is named by the identity id it belongs to and carries the
//! session token as its value. Setting and clearing use the same attributes so
//! browsers treat the removal as replacing the live cookie.

use chrono::{DateTime, Duration, Utc};

const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; Secure; SameSite=None";

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Set-Cookie` value that stores `token` for identity `id` until now + `ttl`
pub fn set_session_cookie(id: i64, token: &str, ttl: Duration) -> String {
    let expires = Utc::now() + ttl;
    format!(
        "{}={}; Expires={}; Max-Age={}; {}",
        id,
        token,
        http_date(expires),
        ttl.num_seconds().max(0),
        COOKIE_ATTRIBUTES
    )
}

/// `Set-Cookie` value that removes the session cookie of identity `id`
pub fn clear_session_cookie(id: i64) -> String {
    format!(
        "{}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; {}",
        id, COOKIE_ATTRIBUTES
    )
}

/// Split a raw `Cookie` header into name/value pairs, in order
///
/// Pairs without `=` are skipped; surrounding whitespace and optional double
/// quotes around the value are stripped.
pub fn parse_cookies(header: &str) -> Vec<(&str, &str)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name, value))
        })
        .collect()
}
