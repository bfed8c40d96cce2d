//! DocQA API Gateway
//!
//! The HTTP entry point for document question answering.
//! Handles:
//! - Document upload and indexing
//! - Question answering with conversation memory
//! - Rate limiting
//! - Observability (logging, metrics)

mod extract;
mod handlers;
mod middleware;

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    routing::{get, post},
    BoxError, Router,
};
use docqa_common::{config::AppConfig, errors::AppError, metrics};
use docqa_context::QaEngine;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<QaEngine>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config);
    info!(
        service = %config.observability.service_name,
        "Starting DocQA API Gateway v{}",
        docqa_common::VERSION
    );

    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::QUERY_LATENCY_BUCKETS,
            )?
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Build the pipeline
    let engine = QaEngine::from_config(&config)?;
    warn!("Conversation memory is in-process only and is lost on restart");

    let state = AppState {
        config: config.clone(),
        engine: Arc::new(engine),
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

/// JSON or human-readable logs; `RUST_LOG` overrides the configured level
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Result<Router, AppError> {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route(
            "/embedding",
            post(handlers::documents::upload_document)
                .layer(DefaultBodyLimit::max(config.server.max_upload_bytes)),
        )
        .route("/query", post(handlers::query::query))
        .route(
            "/conversations/{id}",
            get(handlers::conversations::get_conversation),
        );

    if config.rate_limit.enabled {
        let rate_limit = middleware::rate_limit::RateLimit::from_config(&config.rate_limit)?;
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
            rate_limit,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    let app = Router::new()
        .route("/", get(handlers::health::root))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests));

    Ok(with_request_timeout(app, config.request_timeout())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state))
}

/// Bound every request; an expired request gets the error envelope
fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(middleware_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Internal {
            message: "Request exceeded the server timeout".to_string(),
        }
    } else {
        AppError::Internal {
            message: format!("Unhandled middleware error: {}", err),
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
