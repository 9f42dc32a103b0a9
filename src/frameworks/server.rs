// Framework bootstrap for the booking service runtime.

use crate::domain::ports::{BookingStore, IdentityProvider};
use crate::frameworks::config::{self, Settings};
use crate::frameworks::db;
use crate::interface_adapters::clients::auth::AuthClient;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::{
    AppState, InMemoryBookingStore, InMemoryDraftStore, PostgresBookingStore, SessionLocks,
    StaticTokenIdentityProvider,
};

use std::net::SocketAddr;
use std::{io::Result, sync::Arc, time::Duration};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

// Serve with settings loaded from the config file and environment.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let settings = config::load_settings().map_err(std::io::Error::other)?;
    run_with_settings(listener, settings).await
}

pub async fn run_with_settings(listener: tokio::net::TcpListener, settings: Settings) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(&settings).await?;
    let app = app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let settings = config::load_settings()
        .inspect_err(|e| tracing::error!(error = %e, "failed to load configuration"))
        .map_err(std::io::Error::other)?;
    let address = SocketAddr::new(settings.host, settings.port);

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run_with_settings(listener, settings).await
}

async fn build_state(settings: &Settings) -> Result<AppState> {
    let identity: Arc<dyn IdentityProvider> = match &settings.auth.service_url {
        Some(auth_base_url) => {
            let client = AuthClient::new(auth_base_url.clone(), settings.auth.verify_timeout)
                .map_err(|e| std::io::Error::other(format!("failed to initialize auth client: {e}")))?;
            tracing::debug!(
                auth_base_url = %auth_base_url,
                auth_verify_timeout_ms = settings.auth.verify_timeout.as_millis(),
                "auth client configured"
            );
            Arc::new(client)
        }
        None => {
            tracing::debug!(
                tokens = settings.auth.static_tokens.len(),
                "using static token identities"
            );
            Arc::new(StaticTokenIdentityProvider {
                tokens: settings.auth.static_tokens.clone(),
            })
        }
    };

    let bookings: Arc<dyn BookingStore> = match &settings.database_url {
        Some(database_url) => {
            let pool = db::connect_pool(database_url).await.map_err(|e| {
                tracing::error!(error = %e, "failed to connect to database");
                std::io::Error::other(e)
            })?;
            db::run_migrations(&pool).await.map_err(|e| {
                tracing::error!(error = %e, "failed to run migrations");
                std::io::Error::other(e)
            })?;
            tracing::info!("bookings stored in postgres");
            Arc::new(PostgresBookingStore { db: pool })
        }
        None => {
            tracing::warn!("DATABASE_URL not set; bookings are kept in memory");
            Arc::new(InMemoryBookingStore::default())
        }
    };

    let drafts = InMemoryDraftStore::default();
    let session_locks = SessionLocks::default();
    spawn_draft_sweeper(drafts.clone(), session_locks.clone(), settings.draft_ttl);

    Ok(AppState {
        bookings,
        drafts: Arc::new(drafts),
        identity,
        session_locks,
        settings: Arc::new(settings.booking.clone()),
    })
}

// Periodically drop abandoned session drafts and their idle locks.
fn spawn_draft_sweeper(drafts: InMemoryDraftStore, session_locks: SessionLocks, ttl: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config::DRAFT_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let expired = drafts.prune(ttl).await;
            let released = session_locks.prune_idle().await;
            if expired > 0 || released > 0 {
                tracing::debug!(expired, released, "swept session drafts");
            }
        }
    });
}
