//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use atelier_channels::telegram::{Messenger, TelegramAdapter};
use atelier_core::AtelierConfig;
use atelier_feedback::FeedbackService;
use atelier_services::{
    AdminService, AiEstimator, LocationService, NotificationService,
};
use atelier_store::AtelierDb;

/// Shared state for the gateway server.
pub struct AppState {
    pub config: AtelierConfig,
    pub db: Arc<AtelierDb>,
    pub telegram: Arc<dyn Messenger>,
    pub feedback: Arc<FeedbackService>,
    pub notifier: NotificationService,
    pub admin: AdminService,
    pub location: LocationService,
    pub estimator: AiEstimator,
}

impl AppState {
    /// Wire the full service graph from config, a database, and a messenger.
    pub fn new(config: AtelierConfig, db: Arc<AtelierDb>, telegram: Arc<dyn Messenger>) -> Self {
        let feedback = Arc::new(FeedbackService::new(
            db.clone(),
            telegram.clone(),
            config.admin.chat_ids.clone(),
            config.links.maps_url.clone(),
        ));
        let notifier = NotificationService::new(
            db.clone(),
            telegram.clone(),
            feedback.clone(),
            &config.location,
        );
        let admin = AdminService::new(db.clone(), telegram.clone());
        let location = LocationService::new(telegram.clone(), config.location.clone());
        let estimator = AiEstimator::new(&config.ai);

        Self {
            config,
            db,
            telegram,
            feedback,
            notifier,
            admin,
            location,
            estimator,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook/telegram", post(super::routes::telegram_webhook))
        .route(
            "/trigger-notification",
            post(super::routes::trigger_notification),
        )
        .route("/tasks/check-feedback", get(super::routes::check_feedback))
        .route("/health", get(super::routes::health_check))
        .layer(
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn start(config: AtelierConfig) -> anyhow::Result<()> {
    let db_path = config.storage.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let db = Arc::new(AtelierDb::open(&db_path)?);
    tracing::info!("💾 Database ready: {}", db_path.display());

    let telegram: Arc<dyn Messenger> = Arc::new(TelegramAdapter::new(&config.telegram.bot_token));

    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    if config.admin.chat_ids.is_empty() {
        tracing::warn!("⚠️ No admin chat ids configured — admin menu and alerts are disabled");
    }

    let state = Arc::new(AppState::new(config, db, telegram));
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
