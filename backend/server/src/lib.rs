//! Documentation of a college student roster.
//!
//! Students register and look up their own profile.
//! Admins manage every student record from a dashboard.
//!
//!
//!
//! # General Infrastructure
//! - Single axum server rendering HTML pages, no frontend build step
//! - Forms post back to the same path they were served from
//! - One SQLite file holds both tables, created on startup
//! - Passwords are bcrypt hashed before they touch the database
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`/`POST` | `/register` | Student registration |
//! | `GET`/`POST` | `/login` | Student login, redirects to the profile |
//! | `GET` | `/student/{id}` | Student profile |
//! | `GET`/`POST` | `/admin/register` | Admin registration |
//! | `GET`/`POST` | `/admin/login` | Admin login, redirects to the dashboard |
//! | `GET` | `/admin/dashboard` | Every student, streamed off a cursor |
//! | `GET`/`POST` | `/admin/add` | Add a student with a full profile |
//! | `GET`/`POST` | `/admin/edit/{id}` | Edit branch, college, year and address |
//! | `GET` | `/admin/delete/{id}` | Delete a student |
//! | `GET` | `/health` | Liveness probe |
//!
//!
//!
//! # Dashboard
//!
//! The listing is the only place rows are scanned in bulk. See [`stream`].
//!
//! - Producer on the blocking pool walks the SQLite cursor
//! - Handler collects records as they arrive, in id order
//! - First bad row fails the whole page, no partial listings
//! - Bounded by `MAX_STREAMS` concurrent listings and `STREAM_TIMEOUT_MS` each
//!
//!
//!
//! # Notes
//!
//! Logging in only redirects. There are no sessions, so the profile and admin pages
//! are reachable by URL.
//!
//!
//!
//! # Setup
//!
//! Run with debug logs.
//! ```sh
//! RUST_LOG=college=debug,tower_http=debug cargo run --bin college
//! ```
//!
//! Use a throwaway database.
//! ```sh
//! DATABASE_PATH=:memory: cargo run --bin college
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//!
//!
//! # Environment
//!
//! | Variable | Default |
//! |----------|---------|
//! | `RUST_PORT` | `8080` |
//! | `DATABASE_PATH` | `college.db` |
//! | `STREAM_TIMEOUT_MS` | `5000` |
//! | `MAX_STREAMS` | `16` |
//! | `BCRYPT_COST` | `12` |
//!
//! The seeded `admin` password is read from `/run/secrets/ADMIN_SEED_PASSWORD`,
//! falling back to `admin123`.
use std::{error::Error, sync::Arc};

use axum::{Router, routing::get};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod password;
pub mod routes;
pub mod state;
pub mod stream;
pub mod utils;
pub mod views;

use config::Config;
use routes::{
    add_student_handler, add_student_page, admin_login_handler, admin_login_page,
    admin_register_handler, admin_register_page, dashboard_handler, delete_student_handler,
    edit_student_handler, edit_student_page, health_handler, login_handler, login_page,
    profile_handler, register_handler, register_page,
};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", get(register_page).post(register_handler))
        .route("/login", get(login_page).post(login_handler))
        .route("/student/{id}", get(profile_handler))
        .route(
            "/admin/register",
            get(admin_register_page).post(admin_register_handler),
        )
        .route("/admin/login", get(admin_login_page).post(admin_login_handler))
        .route("/admin/dashboard", get(dashboard_handler))
        .route("/admin/add", get(add_student_page).post(add_student_handler))
        .route(
            "/admin/edit/{id}",
            get(edit_student_page).post(edit_student_handler),
        )
        .route("/admin/delete/{id}", get(delete_student_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> Result<(), Box<dyn Error + Send + Sync>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new(Config::load()).await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let app = router(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
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
