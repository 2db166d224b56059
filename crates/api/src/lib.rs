//! Heart Disease Risk Assessment Server
//!
//! JSON API, server-rendered pages and session authentication around the
//! risk-scoring pipeline.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod assessment;
pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
mod routes;
pub mod views;

pub use crate::config::{load_config, AppConfig};
pub use error::{ApiError, StartupError};

use chatbot::Responder;
use data_validator::{ValidationConfig, Validator};
use inference_engine::InferenceEngine;
use storage::Repository;

const SESSION_PURGE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// Application state shared across handlers
pub struct AppState {
    /// Loaded configuration
    pub config: AppConfig,
    /// Storage repository
    pub repository: Repository,
    /// Risk classifier and bander
    pub engine: InferenceEngine,
    /// Range checks for clinical input
    pub validator: Validator,
    /// Keyword chatbot
    pub chatbot: Responder,
    /// Argon2 cost for new password hashes
    pub password_params: argon2::Params,
    /// Prometheus exporter, when installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: AppConfig,
        repository: Repository,
        engine: InferenceEngine,
    ) -> Result<Self, StartupError> {
        let password_params = auth::password_params(&config.auth)
            .map_err(|e| StartupError::PasswordParams(e.to_string()))?;

        Ok(Self {
            config,
            repository,
            engine,
            validator: Validator::new(ValidationConfig::default()),
            chatbot: Responder::new(),
            password_params,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        })
    }

    /// Open the database and load the model named in `config`
    pub async fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let repository = Repository::connect(&config.database.url).await?;
        let engine =
            InferenceEngine::from_model_path(config.model.path.as_deref(), config.model.threshold)?;
        Self::new(config, repository, engine)
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: SystemMetrics,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub inference: ComponentHealth,
    pub database: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: Option<String>,
}

/// Record counts
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub user_count: i64,
    pub prediction_count: i64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/predict", post(routes::predictions::api_predict))
        .route("/api/chatbot", post(routes::chatbot::chat))
        .route("/api/predictions", get(routes::predictions::get_predictions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_user,
        ));

    let pages = Router::new()
        .route("/home", get(routes::pages::home))
        .route(
            "/prediction",
            get(routes::pages::prediction_form).post(routes::pages::prediction_submit),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_page_user,
        ));

    let mut account = Router::new()
        .route(
            "/login",
            get(routes::account::login_form).post(routes::account::login_submit),
        )
        .route(
            "/register",
            get(routes::account::register_form).post(routes::account::register_submit),
        );
    if let Some(config) = rate_limit::create_governor_config(&state.config.rate_limit) {
        account = account.layer(GovernorLayer { config });
    }

    let public = Router::new()
        .route("/", get(routes::pages::index))
        .route("/logout", get(routes::account::logout))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    let mut router = Router::new()
        .merge(api)
        .merge(pages)
        .merge(account)
        .merge(public)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&state.config.server.cors_origins) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let database = match state.repository.ping().await {
        Ok(()) => ComponentHealth {
            status: "ok".to_string(),
            detail: None,
        },
        Err(e) => {
            warn!("Health check: database unavailable: {}", e);
            ComponentHealth {
                status: "error".to_string(),
                detail: Some("database unavailable".to_string()),
            }
        }
    };
    let healthy = database.status == "ok";

    let user_count = state.repository.user_count().await.unwrap_or(0);
    let prediction_count = state.repository.prediction_count().await.unwrap_or(0);

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            inference: ComponentHealth {
                status: "ok".to_string(),
                detail: Some(state.engine.classifier_name().to_string()),
            },
            database,
        },
        metrics: SystemMetrics {
            user_count,
            prediction_count,
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

/// Initialize logging
pub fn init_logging(config: &crate::config::LoggingConfig) -> Result<(), StartupError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| StartupError::Logging(format!("unknown log level '{}'", config.level)))?;

    let result = if config.json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| StartupError::Logging(e.to_string()))
}

/// Run the server until Ctrl-C
pub async fn run_server(config: AppConfig) -> Result<(), StartupError> {
    let mut state = AppState::from_config(config).await?;
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Prometheus recorder not installed: {}", e),
    }
    let state = Arc::new(state);

    spawn_session_purge(state.repository.clone());

    let addr = state.config.server.listen_addr.clone();
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

fn spawn_session_purge(repository: Repository) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match repository.purge_expired_sessions(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(n) => info!("Purged {} expired sessions", n),
                Err(e) => warn!("Session purge failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received (Ctrl-C)"),
        Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
    }
}
