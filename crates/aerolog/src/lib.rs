//! aerolog library - HTTP handlers and application setup.
//!
//! this crate provides the http server for the aerolog backend:
//! - [`handlers`]: http request handlers (accounts, devices, the device
//!   key handshake, measurement ingestion and queries)
//! - [`cli`]: command-line interface implementation

#![warn(missing_docs)]

/// command-line interface implementation.
pub mod cli;
/// http request handlers.
pub mod handlers;

use aerolog_db::AerologDb;
use aerolog_types::Config;
use axum::{
    Router,
    routing::{get, post},
};

/// shared application state for request handlers.
#[derive(Clone)]
pub struct AppState {
    /// database connection for persistent storage.
    pub db: AerologDb,
    /// server configuration.
    pub config: Config,
}

/// create the axum application with all routes.
pub fn create_app(db: AerologDb, config: Config) -> Router {
    let state = AppState { db, config };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/device-users/login", post(handlers::device_login))
        .route("/device-users/enroll", post(handlers::device_enroll))
        .route("/devices/register", post(handlers::register_device))
        .route("/devices/user/{user_id}", get(handlers::list_user_devices))
        .route("/devices/{mac}", get(handlers::get_device))
        .route("/measurements", post(handlers::ingest_measurement))
        .route("/measurements/recent", get(handlers::recent_measurements))
        .route("/measurements/{mac}", get(handlers::list_measurements))
        .route(
            "/measurements/{mac}/latest",
            get(handlers::latest_measurement),
        )
        .with_state(state)
}
