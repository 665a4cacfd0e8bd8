//! Storefront - E-commerce catalog and account service

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, LoggingConfig};
use storefront_api::{AppSettings, AppState, LogMailer, RateLimiter, create_router};
use storefront_auth::{TokenSigner, hash_password};
use storefront_db::utils::normalize_email;
use storefront_db::{Database, NewUser};
use storefront_storage::LocalImageStore;

/// Storefront - product catalog and account API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "STOREFRONT_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "STOREFRONT_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Storefront v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;

    // Initialize database
    let db = Database::new(&config.database.url).await?;
    bootstrap_admin(&db, &config).await?;

    // Initialize image storage
    let images = Arc::new(LocalImageStore::new(&config.storage.image_dir).await?);

    if config.mail.smtp_password.is_none() {
        info!("No SMTP password configured, outgoing mail is written to the log");
    }

    let settings = AppSettings {
        token_ttls: config.auth.token_ttls(),
        client_url: config.mail.client_url.clone(),
        mail_from: config.mail.smtp_user.clone(),
        max_image_bytes: config.storage.max_image_bytes,
        image_dir: PathBuf::from(&config.storage.image_dir),
        cors_origins: config.server.cors_origins.clone(),
    };

    // Create application state
    let state = AppState::new(
        db,
        images,
        Arc::new(LogMailer),
        TokenSigner::new(&config.auth.session_secret)?,
        TokenSigner::new(&config.auth.account_secret)?,
        RateLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        ),
        settings,
    );

    // Create router
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Create the configured admin account if no admin exists yet
async fn bootstrap_admin(db: &Database, config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (
        config.auth.bootstrap_admin_email.as_deref(),
        config.auth.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    if db.has_admin().await? {
        return Ok(());
    }

    let email = normalize_email(email);
    if db.get_user_by_email(&email).await?.is_some() {
        warn!(
            "Bootstrap admin {} already exists as a customer account, skipping",
            email
        );
        return Ok(());
    }

    info!("Creating bootstrap admin account {}", email);
    db.insert_user(NewUser {
        name: config.auth.bootstrap_admin_name.clone(),
        email,
        password_hash: hash_password(password)?,
        is_admin: true,
    })
    .await?;

    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
