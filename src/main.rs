//! Folio Backend
//!
//! Lead-capture and submission moderation service for a portfolio site,
//! with SQLite persistence and live roster views for the admin.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod intake;
mod models;
mod roster;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::{AdminCredentials, SessionRegistry};
use config::Config;
use db::SubmissionStore;
use intake::Intake;

/// Upper bound on how long an expired session keeps its roster subscribed.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SubmissionStore>,
    pub intake: Arc<Intake<SubmissionStore>>,
    pub sessions: Arc<SessionRegistry<SubmissionStore>>,
    pub admin: Arc<AdminCredentials>,
}

impl AppState {
    pub fn new(store: SubmissionStore, config: &Config) -> Self {
        let store = Arc::new(store);
        Self {
            intake: Arc::new(Intake::new(Arc::clone(&store))),
            sessions: Arc::new(SessionRegistry::new(
                Arc::clone(&store),
                config.session_ttl,
            )),
            admin: Arc::new(AdminCredentials::new(
                config.admin_email.clone(),
                config.admin_password.clone(),
            )),
            store,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Folio Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Admin session TTL: {:?}", config.session_ttl);

    if config.admin_password.is_none() {
        tracing::warn!("No admin password configured (FOLIO_ADMIN_PASSWORD). Admin login is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let store = SubmissionStore::new(pool, config.notify_capacity);
    tracing::info!(
        "Collection ready at revision {}",
        store.get_revision_id().await?
    );

    let state = AppState::new(store, &config);
    let _reaper = state
        .sessions
        .spawn_reaper(config.session_ttl.min(SESSION_SWEEP_INTERVAL));

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let sessions = Arc::clone(&state.sessions);

    // Admin routes behind a live session
    let admin_routes = Router::new()
        .route("/admin/logout", post(api::logout))
        .route("/admin/roster", get(api::get_roster))
        .route("/admin/roster", delete(api::close_roster))
        .route("/admin/submissions", delete(api::delete_all_submissions))
        .route("/admin/submissions/{id}", delete(api::delete_submission))
        .layer(middleware::from_fn(move |req, next| {
            auth::session_auth_layer(Arc::clone(&sessions), req, next)
        }));

    // Public routes
    let public_routes = Router::new()
        .route("/submissions", post(api::create_submission))
        .route("/admin/login", post(api::login))
        .route("/admin/session", get(api::session_status));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", admin_routes.merge(public_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
