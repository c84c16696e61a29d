//! HTTP API for log statistics and security insights
//!
//! Every handler delegates to [`QueryService`] or the insight detectors. A
//! store that cannot be opened yields `{"error": "Database connection failed"}`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{error::Result, insights, query::QueryService};

pub const DATABASE_UNAVAILABLE: &str = "Database connection failed";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub queries: QueryService,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

/// Build the API router
pub fn create_router(queries: QueryService) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/top-endpoints", get(get_top_endpoints))
        .route("/top-ips", get(get_top_ips))
        .route("/requests-over-time", get(get_requests_over_time))
        .route("/search", get(search_logs))
        .route("/security-insights", get(get_security_insights))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { queries })
}

pub struct HttpServer {
    queries: QueryService,
}

impl HttpServer {
    pub fn new(queries: QueryService) -> Self {
        Self { queries }
    }

    pub async fn serve(self, addr: &str) -> std::io::Result<()> {
        let app = create_router(self.queries);

        info!(addr, "starting HTTP server");

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await
    }
}

/// Map an operation result onto the response contract
fn respond<T: Serialize>(operation: &str, result: Result<T>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) if e.is_store_unavailable() => {
            error!(operation, error = %e, "store unavailable");
            Json(json!({ "error": DATABASE_UNAVAILABLE })).into_response()
        }
        Err(e) => {
            error!(operation, error = %e, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn get_stats(State(state): State<AppState>) -> Response {
    respond("stats", state.queries.stats().await)
}

async fn get_top_endpoints(State(state): State<AppState>) -> Response {
    respond("top_endpoints", state.queries.top_endpoints().await)
}

async fn get_top_ips(State(state): State<AppState>) -> Response {
    respond("top_ips", state.queries.top_ips().await)
}

async fn get_requests_over_time(State(state): State<AppState>) -> Response {
    respond("requests_over_time", state.queries.requests_over_time().await)
}

async fn search_logs(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    respond("search", state.queries.search(&params.q).await)
}

async fn get_security_insights(State(state): State<AppState>) -> Response {
    respond(
        "security_insights",
        insights::security_insights(state.queries.store()).await,
    )
}
