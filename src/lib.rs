//! Ripple - A lightweight social feed and follow-graph server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                       │
//! │  - Auth, users, posts, notifications endpoints              │
//! │  - Prometheus metrics endpoint                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                           │
//! │  - Accounts & username rules                                │
//! │  - Follow graph & notifications                             │
//! │  - Feed, comments, likes                                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                             │
//! │  - SQLite (sqlx)                                            │
//! │  - Third-party image host (multipart upload)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `storage`: Media upload to the image host
//! - `auth`: Sessions, passwords, extractors
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and services.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Media storage (third-party image host)
    pub storage: Arc<storage::MediaStorage>,

    /// Account service (signup, login, profiles, usernames)
    pub accounts: Arc<service::AccountService>,

    /// Social graph service (follow toggle, lists, reconciliation)
    pub graph: Arc<service::GraphService>,

    /// Feed service (posts, comments, likes, shares)
    pub feed: Arc<service::FeedService>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database (runs migrations)
    /// 2. Build the shared HTTP client
    /// 3. Initialize media storage
    /// 4. Wire up services
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 2. Shared HTTP client
        let http_client = reqwest::Client::builder()
            .user_agent("Ripple/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        // 3. Media storage
        let storage = Arc::new(storage::MediaStorage::new(&config.media, http_client));
        tracing::info!("Media storage initialized");

        // 4. Services
        let accounts = Arc::new(service::AccountService::new(db.clone(), storage.clone()));
        let graph = Arc::new(service::GraphService::new(db.clone()));
        let feed = Arc::new(service::FeedService::new(db.clone(), storage.clone()));

        // Seed the gauges from the current table sizes
        metrics::USERS_TOTAL.set(db.count_users().await?);
        metrics::POSTS_TOTAL.set(db.count_posts().await?);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            storage,
            accounts,
            graph,
            feed,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .merge(api::metrics_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
