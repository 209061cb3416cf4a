//! Acervo API Gateway
//!
//! The entry point for all HTTP traffic.
//! Handles:
//! - Public catalog search and record detail
//! - Document download and inline view
//! - Authenticated record and reference-data management
//! - Rate limiting
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use acervo_common::{
    auth::JwtManager,
    config::AppConfig,
    db::DbPool,
    metrics,
    storage::{self, FileStorage},
};
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub storage: Arc<dyn FileStorage>,
    pub jwt: Option<Arc<JwtManager>>,
}

impl FromRef<AppState> for Option<Arc<JwtManager>> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    init_tracing(&config);

    info!("Starting Acervo API Gateway v{}", acervo_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!(port = config.observability.metrics_port, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        db.migrate().await?;
    }

    // File storage
    let storage = storage::from_config(&config.storage).await?;

    // Token verification for write endpoints
    let jwt = match config.auth.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => Some(Arc::new(JwtManager::new(
            secret,
            config.auth.jwt_expiration_secs,
        ))),
        _ => {
            warn!("auth.jwt_secret is not set; management endpoints will refuse every request");
            None
        }
    };

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        storage,
        jwt,
    };

    // Build the router
    let app = create_router(state)?;

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Result<Router, acervo_common::AppError> {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Public catalog
        .route("/catalog", get(handlers::catalog::list))
        .route("/catalog/facets", get(handlers::catalog::facets))
        .route("/catalog/{id}", get(handlers::catalog::detail))
        // Payload retrieval
        .route("/download/{id}", get(handlers::documents::download))
        .route("/view/{id}", get(handlers::documents::view))
        // Record management (bearer token)
        .route(
            "/records",
            get(handlers::records::list).post(handlers::records::create),
        )
        .route(
            "/records/{id}",
            get(handlers::records::get)
                .put(handlers::records::update)
                .delete(handlers::records::deactivate),
        )
        .route(
            "/records/{id}/file",
            put(handlers::records::upload)
                .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes)),
        )
        // Reference data
        .route(
            "/lookups/{kind}",
            get(handlers::lookups::list).post(handlers::lookups::create),
        )
        .route(
            "/lookups/{kind}/{id}",
            axum::routing::delete(handlers::lookups::delete),
        )
        .route(
            "/subprojects",
            get(handlers::lookups::list_subprojects).post(handlers::lookups::create_subproject),
        )
        .route(
            "/subprojects/{id}",
            axum::routing::delete(handlers::lookups::delete_subproject),
        );

    let mut app = Router::new()
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests));

    if state.config.rate_limit.enabled {
        let per_second = state.config.rate_limit.requests_per_second;
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        )?;
        app = app.layer(axum::middleware::from_fn(
            move |request: axum::extract::Request, next: axum::middleware::Next| {
                middleware::rate_limit::rate_limit_middleware(request, next, limiter.clone(), per_second)
            },
        ));
    }

    // Compose the app
    Ok(app
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
