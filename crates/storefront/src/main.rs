//! Cartwright Storefront - cart, account and checkout API.
//!
//! This binary serves the JSON API on port 3000 by default.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` (or process memory) behind the `Store` traits
//! - tower-sessions cookie sessions for signed-in users
//! - Lettre + Askama for order confirmation email
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p cartwright-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cartwright_storefront::config::{StoreBackend, StorefrontConfig};
use cartwright_storefront::db::{self, MemoryStore, PgStore, Store};
use cartwright_storefront::middleware::{create_session_layer, postgres_session_store};
use cartwright_storefront::services::{LogNotifier, NotificationSender, SmtpNotifier, TimeOrderNumbers};
use cartwright_storefront::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

/// SMTP when configured, otherwise log-only.
fn notifier(config: &StorefrontConfig) -> Arc<dyn NotificationSender> {
    let Some(email) = &config.email else {
        tracing::warn!("SMTP_HOST not set; order confirmations will only be logged");
        return Arc::new(LogNotifier);
    };

    match SmtpNotifier::new(email, &config.base_url) {
        Ok(smtp) => Arc::new(smtp),
        Err(e) => {
            tracing::error!(error = %e, "Invalid SMTP configuration; falling back to log-only notifications");
            Arc::new(LogNotifier)
        }
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartwright_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let notifier = notifier(&config);
    let numbers = Arc::new(TimeOrderNumbers::new());

    let app = match config.backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_ref()
                .expect("database URL is required for the postgres backend");
            let pool = db::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
            let session_layer = create_session_layer(postgres_session_store(&pool), &config);
            let state = AppState::new(config.clone(), store, Some(pool), notifier, numbers);
            cartwright_storefront::app(state, session_layer)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; all data is lost on restart");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            let session_layer = create_session_layer(tower_sessions::MemoryStore::default(), &config);
            let state = AppState::new(config.clone(), store, None, notifier, numbers);
            cartwright_storefront::app(state, session_layer)
        }
    };

    // Start server
    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Peer addresses feed the rate limiter when no proxy header is present
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
