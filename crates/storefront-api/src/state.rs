//! Application state

use std::path::PathBuf;
use std::sync::Arc;

use storefront_auth::{TokenSigner, TokenTtls};
use storefront_db::Database;
use storefront_storage::ImageStore;

use crate::mail::Mailer;
use crate::rate_limit::RateLimiter;

/// Runtime settings the handlers need, resolved once at startup
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub token_ttls: TokenTtls,
    /// Base URL embedded in activation and reset links
    pub client_url: String,
    /// Sender address of outgoing mail
    pub mail_from: String,
    pub max_image_bytes: usize,
    /// Directory served under `/images/products`
    pub image_dir: PathBuf,
    /// Allowed CORS origins; empty disables the CORS layer
    pub cors_origins: Vec<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub images: Arc<dyn ImageStore>,
    pub mailer: Arc<dyn Mailer>,
    /// Signs login and refresh sessions
    pub session_tokens: Arc<TokenSigner>,
    /// Signs activation and password-reset links
    pub account_tokens: Arc<TokenSigner>,
    pub rate_limiter: Arc<RateLimiter>,
    pub settings: Arc<AppSettings>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        images: Arc<dyn ImageStore>,
        mailer: Arc<dyn Mailer>,
        session_tokens: TokenSigner,
        account_tokens: TokenSigner,
        rate_limiter: RateLimiter,
        settings: AppSettings,
    ) -> Self {
        Self {
            db,
            images,
            mailer,
            session_tokens: Arc::new(session_tokens),
            account_tokens: Arc::new(account_tokens),
            rate_limiter: Arc::new(rate_limiter),
            settings: Arc::new(settings),
        }
    }
}
