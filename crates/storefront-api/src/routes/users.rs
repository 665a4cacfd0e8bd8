//! Account routes: registration, sessions, profiles and moderation

use axum::{
    Extension, Router,
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode, header::COOKIE, header::SET_COOKIE},
    middleware::from_fn_with_state,
    response::{AppendHeaders, IntoResponse},
    routing::{delete, get, post, put},
};
use chrono::Duration;
use storefront_auth::{
    PendingRegistration, PendingReset, SessionUser, TokenClaims, authorize_admin,
    clear_session_cookie, hash_password, parse_cookies, set_session_cookie, verify_password,
};
use storefront_db::utils::normalize_email;
use storefront_db::{DbError, NewUser, Page};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::mail::{Email, activation_email, reset_email};
use crate::middleware::rate_limit;
use crate::response::ApiResponse;
use crate::state::AppState;

use super::types::{
    CredentialsRequest, LoginData, PaginationQuery, RegisterRequest, TokenData, TokenRequest,
    UpdateUserRequest, UserData, UserResponse,
};
use super::{admin_only, authed};

// ==================== Input Validation ====================

/// Minimum allowed password length
const MIN_PASSWORD_LENGTH: usize = 6;
/// Maximum allowed password length
const MAX_PASSWORD_LENGTH: usize = 256;

const DEFAULT_USERS_PER_PAGE: i64 = 5;

/// Treat missing and blank fields alike
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// ==================== Session Cookies ====================

type SetCookies = AppendHeaders<Vec<(HeaderName, String)>>;

fn carries_session_cookie(headers: &HeaderMap, id: i64) -> bool {
    let name = id.to_string();
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|raw| parse_cookies(raw).iter().any(|(n, _)| *n == name))
}

/// Set a fresh session cookie, clearing the one the client sent first
fn rotate_session_cookie(headers: &HeaderMap, id: i64, token: &str, ttl: Duration) -> SetCookies {
    let mut cookies = Vec::with_capacity(2);
    if carries_session_cookie(headers, id) {
        cookies.push((SET_COOKIE, clear_session_cookie(id)));
    }
    cookies.push((SET_COOKIE, set_session_cookie(id, token, ttl)));
    AppendHeaders(cookies)
}

/// Allow the request when it targets the caller's own account or the caller is an admin
async fn ensure_self_or_admin(
    state: &AppState,
    session: &SessionUser,
    target_id: i64,
) -> Result<(), ApiError> {
    if session.id != target_id {
        authorize_admin(&state.db, Some(session)).await?;
    }
    Ok(())
}

async fn deliver(state: &AppState, email: Email) {
    let to = email.to.clone();
    if let Err(e) = state.mailer.send(email).await {
        warn!("Failed to send email to {}: {}", to, e);
    }
}

// ==================== Registration ====================

/// POST /api/users
async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<TokenData>, ApiError> {
    let (Some(name), Some(email), Some(password)) = (
        non_blank(request.name),
        non_blank(request.email),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::Validation("Please fill all the fields!".to_string()));
    };
    validate_password(&password)?;

    let email = normalize_email(&email);
    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "User already exists with email {}. Please sign in.",
            email
        )));
    }

    let password_hash = hash_password(&password)?;
    let claims = TokenClaims::PendingRegistration(PendingRegistration {
        name: name.clone(),
        email: email.clone(),
        password_hash,
    });
    let token = state
        .account_tokens
        .issue(&claims, state.settings.token_ttls.confirmation)?;

    let settings = &state.settings;
    deliver(
        &state,
        activation_email(&settings.mail_from, &email, &name, &settings.client_url, &token),
    )
    .await;

    info!("Registration pending for {}", email);

    Ok(ApiResponse::created(
        format!("Verification email has been sent to {}.", email),
        TokenData { token },
    ))
}

/// POST /api/users/activate
async fn activate_account(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<ApiResponse, ApiError> {
    let token = non_blank(request.token)
        .ok_or_else(|| ApiError::Validation("Token not found".to_string()))?;
    let pending = state.account_tokens.verify_registration(&token)?;

    let already_active =
        || ApiError::Conflict("This account is already activated!, please login".to_string());

    if state.db.get_user_by_email(&pending.email).await?.is_some() {
        return Err(already_active());
    }

    let user = state
        .db
        .insert_user(NewUser {
            name: pending.name,
            email: pending.email,
            password_hash: pending.password_hash,
            is_admin: false,
        })
        .await
        .map_err(|e| match e {
            DbError::Duplicate(_) => already_active(),
            e => e.into(),
        })?;

    info!("Activated account {} ({})", user.id, user.email);

    Ok(ApiResponse::message("Account activated!! Now, you can login.")
        .with_status(StatusCode::CREATED))
}

// ==================== Sessions ====================

/// POST /api/users/loginuser
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) =
        (non_blank(request.email), request.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::Validation("email or password is missing!".to_string()));
    };
    validate_password(&password)?;

    debug!("Login attempt for {}", email);

    let user = state.db.get_user_by_email(&email).await?.ok_or_else(|| {
        ApiError::NotFound(format!(
            "User does not exist with email {}. Please register.",
            normalize_email(&email)
        ))
    })?;

    if user.is_banned {
        warn!("Banned identity {} attempted to log in", user.id);
        return Err(ApiError::Unauthorized("user is banned from login.".to_string()));
    }

    if !verify_password(&password, &user.password_hash)? {
        warn!("Failed login for identity {}", user.id);
        return Err(ApiError::Unauthorized("email or password did not match".to_string()));
    }

    let ttl = state.settings.token_ttls.session;
    let token = state
        .session_tokens
        .issue(&TokenClaims::Session { id: user.id }, ttl)?;
    let cookies = rotate_session_cookie(&headers, user.id, &token, ttl);

    info!("Identity {} logged in", user.id);

    Ok((
        cookies,
        ApiResponse::ok(
            "login successful!",
            LoginData {
                user: user.into(),
                token,
            },
        ),
    ))
}

/// POST /api/users/logout
async fn logout(Extension(session): Extension<SessionUser>) -> impl IntoResponse {
    info!("Identity {} logged out", session.id);
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie(session.id))]),
        ApiResponse::message("logout successful!"),
    )
}

/// GET /api/users/refreshtoken
async fn refresh_token(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let ttl = state.settings.token_ttls.refresh;
    let token = state
        .session_tokens
        .issue(&TokenClaims::Session { id: session.id }, ttl)?;
    let cookies = rotate_session_cookie(&headers, session.id, &token, ttl);

    debug!("Refreshed session for identity {}", session.id);

    Ok((cookies, ApiResponse::ok("Refresh token was returned!", TokenData { token })))
}

// ==================== Password Reset ====================

/// POST /api/users/forgetpassword
async fn forget_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CredentialsRequest>,
) -> Result<ApiResponse<TokenData>, ApiError> {
    let (Some(email), Some(password)) =
        (non_blank(request.email), request.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::Validation("email or password is missing!".to_string()));
    };
    validate_password(&password)?;

    let user = state.db.get_user_by_email(&email).await?.ok_or_else(|| {
        ApiError::NotFound(format!(
            "User does not exist with email {}. Please register.",
            normalize_email(&email)
        ))
    })?;

    let password_hash = hash_password(&password)?;
    let claims = TokenClaims::PendingReset(PendingReset {
        email: user.email.clone(),
        password_hash,
    });
    let token = state
        .account_tokens
        .issue(&claims, state.settings.token_ttls.confirmation)?;

    let settings = &state.settings;
    deliver(
        &state,
        reset_email(&settings.mail_from, &user.email, &user.name, &settings.client_url, &token),
    )
    .await;

    info!("Password reset requested for identity {}", user.id);

    Ok(ApiResponse::created(
        "Verification email has been sent to your email.",
        TokenData { token },
    ))
}

/// POST /api/users/resetpassword
async fn reset_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<ApiResponse, ApiError> {
    let token = non_blank(request.token)
        .ok_or_else(|| ApiError::Validation("Token is missing.".to_string()))?;
    let pending = state.account_tokens.verify_reset(&token)?;

    if !state
        .db
        .update_user_password(&pending.email, &pending.password_hash)
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "User does not exist with email {}",
            pending.email
        )));
    }

    info!("Password reset applied for {}", pending.email);

    Ok(ApiResponse::message("password is reset successfully."))
}

// ==================== Profiles ====================

/// GET /api/users/getuserprofile/{id}
async fn user_profile(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<UserData>, ApiError> {
    ensure_self_or_admin(&state, &session, id).await?;

    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User is not found.".to_string()))?;

    Ok(ApiResponse::ok(
        "User was returned successfully!",
        UserData { user: user.into() },
    ))
}

/// PUT /api/users/updateuser/{email}
async fn update_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(email): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<ApiResponse<UserData>, ApiError> {
    let name = non_blank(request.name)
        .ok_or_else(|| ApiError::Validation("Name is required".to_string()))?;

    let user = state
        .db
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user found with email {}", email)))?;

    ensure_self_or_admin(&state, &session, user.id).await?;

    state.db.update_user_name(user.id, &name).await?;
    let user = state
        .db
        .get_user_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user found with email {}", email)))?;

    info!("Updated name of identity {}", user.id);

    Ok(ApiResponse::ok("account name is updated", UserData { user: user.into() }))
}

// ==================== Administration ====================

/// GET /api/users/getallusers (Admin only)
async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PaginationQuery>,
) -> Result<ApiResponse<Vec<UserResponse>>, ApiError> {
    let page = Page::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_USERS_PER_PAGE),
    );
    let users = state.db.list_customers(page).await?;

    Ok(ApiResponse::ok(
        "all users returned",
        users.into_iter().map(UserResponse::from).collect(),
    ))
}

/// DELETE /api/users/{id} (Admin only)
async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse, ApiError> {
    if !state.db.delete_user(id).await? {
        return Err(ApiError::NotFound("user is not found.".to_string()));
    }

    info!("Deleted identity {}", id);

    Ok(ApiResponse::message("user is deleted successfully."))
}

async fn set_banned(state: &AppState, id: i64, banned: bool) -> Result<UserResponse, ApiError> {
    let not_found = || ApiError::NotFound(format!("No user found with id {}", id));

    if !state.db.set_user_banned(id, banned).await? {
        return Err(not_found());
    }
    let user = state.db.get_user_by_id(id).await?.ok_or_else(not_found)?;

    info!("Identity {} banned={}", id, banned);
    Ok(user.into())
}

/// GET /api/users/banuser/{id} (Admin only)
async fn ban_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<UserData>, ApiError> {
    let user = set_banned(&state, id, true).await?;
    Ok(ApiResponse::ok("user is banned", UserData { user }))
}

/// GET /api/users/unbanuser/{id} (Admin only)
async fn unban_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<UserData>, ApiError> {
    let user = set_banned(&state, id, false).await?;
    Ok(ApiResponse::ok("user is unbanned", UserData { user }))
}

/// Create account routes, mounted under `/api/users`
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/activate", post(activate_account))
        .route("/loginuser", post(login))
        .route("/forgetpassword", post(forget_password))
        .route("/resetpassword", post(reset_password))
        .route("/logout", authed(post(logout), state))
        .route("/refreshtoken", authed(get(refresh_token), state))
        .route("/getuserprofile/{id}", authed(get(user_profile), state))
        .route("/updateuser/{email}", authed(put(update_user), state))
        .route("/getallusers", admin_only(get(list_users), state))
        .route("/banuser/{id}", admin_only(get(ban_user), state))
        .route("/unbanuser/{id}", admin_only(get(unban_user), state))
        .route("/{id}", admin_only(delete(delete_user), state))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
}
