//! EventEase check-in service.
//!
//! QR-code attendance verification for events: attendees fetch a signed,
//! time-bound QR token for their registration; organizers scan it and the
//! service records attendance idempotently. Tokens are stateless
//! capabilities — single use is enforced by the attendance ledger's
//! uniqueness, not by a revocation list.

use std::time::Duration;

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::routing::{get, post};
use axum::{Json, Router};
use migration::{Migrator, MigratorTrait};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod auth;
pub mod checkin;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod qr;
pub mod state;
pub mod token;
pub mod util;

use config::Config;
use state::AppState;
use token::TokenSigner;

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "service": "eventease",
    }))
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/api/registrations/{id}/qr",
            get(handlers::registrations::handle_registration_qr),
        )
        .route("/api/attendance/scan", post(handlers::attendance::handle_scan))
        .route("/api/attendance/mark", post(handlers::attendance::handle_mark))
        .route(
            "/api/events/{id}/attendance",
            get(handlers::events::handle_event_attendance),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let config = Config::load();

    info!("Connecting to database...");
    let db = db::db_connect(&config.database_url)
        .await
        .expect("Failed to open database connection");

    info!("Applying migrations...");
    Migrator::up(&db, None)
        .await
        .expect("Failed to apply migrations");

    let signer = TokenSigner::new(config.signing_secret.as_bytes().to_vec());
    let state = AppState::new(db, signer);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .expect("Failed to bind listener");
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Server shutting down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
