//! HTTP server for the journal API
//!
//! Provides:
//! - Trade records, dashboard and calendar views (/api/trades, /api/dashboard, /api/calendar)
//! - Trading rules (/api/rules)
//! - Trade-history insight (/api/insight)

pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{Authenticator, StaticTokens};
use crate::cache::QueryCache;
use crate::config::ServerConfig;
use crate::db::Database;
use crate::error::Result;
use crate::insight::{InsightProvider, PlaceholderInsight};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<dyn Authenticator>,
    pub insight: Arc<dyn InsightProvider>,
    pub cache: Arc<QueryCache>,
}

impl AppState {
    pub fn new(
        db: Database,
        auth: impl Authenticator + 'static,
        insight: impl InsightProvider + 'static,
    ) -> Self {
        Self {
            db: Arc::new(db),
            auth: Arc::new(auth),
            insight: Arc::new(insight),
            cache: Arc::new(QueryCache::new()),
        }
    }
}

const INSIGHT_ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// The insight route answers its own preflight, so it carries fixed CORS
/// headers on every response instead of going through `CorsLayer`.
async fn with_insight_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(INSIGHT_ALLOWED_HEADERS),
    );
    response
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/trades", get(handlers::list_trades).post(handlers::create_trade))
        .route("/api/trades/recent", get(handlers::recent_trades))
        .route("/api/trades/:id", get(handlers::get_trade).delete(handlers::delete_trade))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/calendar", get(handlers::calendar))
        .route("/api/catalog", get(handlers::catalog))
        .route("/api/rules", get(handlers::list_rules).post(handlers::create_rule))
        .route("/api/rules/:id", put(handlers::rename_rule).delete(handlers::delete_rule))
        .layer(cors);

    let insight = Router::new()
        .route(
            "/api/insight",
            get(handlers::insight)
                .post(handlers::insight)
                .options(handlers::insight_preflight),
        )
        .layer(middleware::map_response(with_insight_cors));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(api)
        .merge(insight)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    log::info!("Shutdown signal received, draining connections");
}

/// Opens the database, binds the listener and serves until Ctrl-C
pub async fn serve(config: ServerConfig) -> Result<()> {
    let db = Database::new(&config.db_path)?;
    log::info!("Database ready at {}", config.db_path);

    let state = AppState::new(db, StaticTokens::new(config.api_tokens), PlaceholderInsight);
    log::info!("Insight provider: {}", state.insight.name());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!("Trading journal API listening on {}", config.bind_addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}
