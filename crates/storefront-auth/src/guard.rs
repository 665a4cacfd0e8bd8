//! Guard decisions for authenticated and admin-only requests
//!
//! [`authenticate`] never touches the database: it only reads the cookie
//! header and checks the session token. [`authorize_admin`] performs exactly
//! one identity lookup and never caches the result.

use http::HeaderMap;
use http::header::COOKIE;
use storefront_db::{Database, User};
use tracing::debug;

use crate::error::AuthError;
use crate::jwt::TokenSigner;
use crate::session::parse_cookies;

/// Identity bound to a request by the auth guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i64,
}

/// Resolve the session identity from the request cookies
///
/// Every cookie whose name is an identity id and whose value is non-empty is
/// a candidate. The first candidate whose token verifies and names the same
/// id wins; otherwise the first verification error is returned.
pub fn authenticate(headers: &HeaderMap, signer: &TokenSigner) -> Result<SessionUser, AuthError> {
    let raw: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    if raw.is_empty() {
        debug!("Rejecting request without cookie header");
        return Err(AuthError::NoSession);
    }

    let candidates: Vec<(i64, &str)> = raw
        .iter()
        .flat_map(|header| parse_cookies(header))
        .filter(|(_, value)| !value.is_empty())
        .filter_map(|(name, value)| name.parse::<i64>().ok().map(|id| (id, value)))
        .collect();

    if candidates.is_empty() {
        debug!("Rejecting request without session token");
        return Err(AuthError::NoToken);
    }

    let mut first_error = None;
    for (cookie_id, token) in candidates {
        let outcome = signer.verify_session(token).and_then(|id| {
            if id == cookie_id {
                Ok(id)
            } else {
                Err(AuthError::InvalidToken)
            }
        });

        match outcome {
            Ok(id) => {
                debug!("Authenticated session for identity {}", id);
                return Ok(SessionUser { id });
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(first_error.unwrap_or(AuthError::InvalidToken))
}

/// Load the bound identity and require the admin flag
pub async fn authorize_admin(
    db: &Database,
    session: Option<&SessionUser>,
) -> Result<User, AuthError> {
    let session = session.ok_or(AuthError::Unauthenticated)?;

    let user = db
        .get_user_by_id(session.id)
        .await?
        .ok_or(AuthError::IdentityNotFound)?;

    if !user.is_admin {
        debug!("Identity {} is not an admin", user.id);
        return Err(AuthError::Forbidden);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenClaims;
    use chrono::Duration;
    use http::HeaderValue;
    use storefront_db::NewUser;

    fn signer() -> TokenSigner {
        TokenSigner::new("session-secret").unwrap()
    }

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn session_token(signer: &TokenSigner, id: i64) -> String {
        signer.issue(&TokenClaims::Session { id }, Duration::minutes(90)).unwrap()
    }

    #[test]
    fn test_no_cookie_header() {
        let result = authenticate(&HeaderMap::new(), &signer());
        assert!(matches!(result, Err(AuthError::NoSession)));
    }

    #[test]
    fn test_empty_or_missing_token() {
        let result = authenticate(&headers("5="), &signer());
        assert!(matches!(result, Err(AuthError::NoToken)));

        let result = authenticate(&headers("theme=dark"), &signer());
        assert!(matches!(result, Err(AuthError::NoToken)));
    }

    #[test]
    fn test_tampered_token() {
        let signer = signer();
        let token = session_token(&signer, 5);
        let result = authenticate(&headers(&format!("5={}x", token)), &signer);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();
        let token = signer
            .issue(&TokenClaims::Session { id: 5 }, Duration::seconds(-10))
            .unwrap();
        let result = authenticate(&headers(&format!("5={}", token)), &signer);
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_cookie_name_must_match_token_identity() {
        let signer = signer();
        let token = session_token(&signer, 5);
        let result = authenticate(&headers(&format!("6={}", token)), &signer);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_valid_session_binds_identity() {
        let signer = signer();
        let stale = session_token(&TokenSigner::new("other").unwrap(), 3);
        let live = session_token(&signer, 5);
        let cookie = format!("theme=dark; 3={}; 5={}", stale, live);

        let user = authenticate(&headers(&cookie), &signer).unwrap();
        assert_eq!(user, SessionUser { id: 5 });
    }

    async fn db_with(is_admin: bool) -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .insert_user(NewUser {
                name: "Someone".to_string(),
                email: "someone@x.com".to_string(),
                password_hash: "hash".to_string(),
                is_admin,
            })
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_role_guard_without_session() {
        let (db, _) = db_with(true).await;
        let result = authorize_admin(&db, None).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_role_guard_non_admin() {
        let (db, id) = db_with(false).await;
        let result = authorize_admin(&db, Some(&SessionUser { id })).await;
        assert!(matches!(result, Err(AuthError::Forbidden)));
    }

    #[tokio::test]
    async fn test_role_guard_vanished_identity() {
        let (db, id) = db_with(true).await;
        db.delete_user(id).await.unwrap();
        let result = authorize_admin(&db, Some(&SessionUser { id })).await;
        assert!(matches!(result, Err(AuthError::IdentityNotFound)));
    }

    #[tokio::test]
    async fn test_role_guard_admin() {
        let (db, id) = db_with(true).await;
        let user = authorize_admin(&db, Some(&SessionUser { id })).await.unwrap();
        assert!(user.is_admin);
    }
}
