//! Configuration loading and management

use anyhow::{Context, Result, bail};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use storefront_auth::TokenTtls;
use tracing::{info, warn};

/// Longest accepted token lifetime (7 days)
const MAX_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser origins allowed to call the API with credentials
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret for login and refresh sessions
    #[serde(default)]
    pub session_secret: String,
    /// Secret for activation and password-reset tokens
    #[serde(default)]
    pub account_secret: String,
    #[serde(default = "default_confirmation_ttl")]
    pub confirmation_ttl_minutes: i64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_minutes: i64,
    /// Admin account created at startup when no admin exists yet
    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,
    #[serde(default)]
    pub bootstrap_admin_password: Option<String>,
    #[serde(default = "default_admin_name")]
    pub bootstrap_admin_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            account_secret: String::new(),
            confirmation_ttl_minutes: default_confirmation_ttl(),
            session_ttl_minutes: default_session_ttl(),
            refresh_ttl_minutes: default_refresh_ttl(),
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
            bootstrap_admin_name: default_admin_name(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttls(&self) -> TokenTtls {
        TokenTtls {
            confirmation: Duration::minutes(self.confirmation_ttl_minutes),
            session: Duration::minutes(self.session_ttl_minutes),
            refresh: Duration::minutes(self.refresh_ttl_minutes),
        }
    }
}

/// Outgoing mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Account mail is sent from
    #[serde(default = "default_smtp_user")]
    pub smtp_user: String,
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Base URL used in activation and reset links
    #[serde(default = "default_client_url")]
    pub client_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_user: default_smtp_user(),
            smtp_password: None,
            client_url: default_client_url(),
        }
    }
}

/// Image storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

/// Account route rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_db_url() -> String {
    "sqlite:./data/storefront.db".to_string()
}

fn default_confirmation_ttl() -> i64 {
    10
}

fn default_session_ttl() -> i64 {
    90
}

fn default_refresh_ttl() -> i64 {
    15
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

fn default_smtp_user() -> String {
    "no-reply@localhost".to_string()
}

fn default_client_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_image_dir() -> String {
    "./data/images/products".to_string()
}

fn default_max_image_bytes() -> usize {
    2 * 1024 * 1024 // 2 MiB
}

fn default_max_requests() -> usize {
    100
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from a file, then apply environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path))?;
            info!("Loaded configuration from {}", path);
            config
        } else {
            info!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override settings from environment-style variables
    fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid SERVER_PORT: {}", port))?;
        }
        if let Some(secret) = lookup("JWT_AUTHORIZATION_KEY") {
            self.auth.session_secret = secret;
        }
        if let Some(secret) = lookup("JWT_SECRET_KEY") {
            self.auth.account_secret = secret;
        }
        if let Some(user) = lookup("SMTP_USER") {
            self.mail.smtp_user = user;
        }
        if let Some(password) = lookup("SMTP_PASSWORD") {
            self.mail.smtp_password = Some(password);
        }
        if let Some(url) = lookup("CLIENT_URL") {
            self.mail.client_url = url;
        }
        if let Some(url) = lookup("DB_URL") {
            self.database.url = url;
        }
        if let Some(dir) = lookup("IMAGE_DIR") {
            self.storage.image_dir = dir;
        }
        Ok(())
    }

    /// Reject configurations the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.auth.session_secret.is_empty() {
            bail!("auth.session_secret (JWT_AUTHORIZATION_KEY) must be set");
        }
        if self.auth.account_secret.is_empty() {
            bail!("auth.account_secret (JWT_SECRET_KEY) must be set");
        }
        if self.auth.session_secret == self.auth.account_secret {
            warn!("Session and account tokens share the same signing secret");
        }

        let ttls = [
            ("confirmation", self.auth.confirmation_ttl_minutes),
            ("session", self.auth.session_ttl_minutes),
            ("refresh", self.auth.refresh_ttl_minutes),
        ];
        for (name, minutes) in ttls {
            if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
                bail!(
                    "auth.{}_ttl_minutes must be between 1 and {}, got {}",
                    name,
                    MAX_TTL_MINUTES,
                    minutes
                );
            }
        }

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            bail!("rate_limit.max_requests and rate_limit.window_secs must be positive");
        }
        if self.storage.max_image_bytes == 0 {
            bail!("storage.max_image_bytes must be positive");
        }
        Ok(())
    }
}
