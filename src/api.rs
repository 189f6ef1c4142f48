//! HTTP surface: one scrape route per platform, name unification, health.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::config::AppConfig;
use crate::normalize::ScrapeResponse;
use crate::pipeline;
use crate::platform::Platform;
use crate::unify::UnifyClient;

/// Shared by every handler.
pub struct AppState {
    pub config: AppConfig,
    pub unify: UnifyClient,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScrapeParams {
    /// Product name to search for.
    pub name: Option<String>,
}

/// Routing-level failure envelope. Scrape failures ride inside the normal
/// [`ScrapeResponse`]; this shape is only for requests that never got a
/// scrape result at all.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlatformError {
    pub success: bool,
    pub platform: String,
    pub error: String,
    /// Extra diagnostics, withheld in production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UnifyRequest {
    /// Product page link to reduce to a search phrase.
    pub link: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnifyResponse {
    pub success: bool,
    #[serde(rename = "searchQuery", skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/amazon",
    params(ScrapeParams),
    responses(
        (status = 200, description = "Scrape outcome envelope", body = ScrapeResponse),
        (status = 400, description = "Missing product name", body = PlatformError),
        (status = 504, description = "Scrape exceeded its deadline", body = PlatformError)
    ),
    tag = "scrape"
)]
pub async fn scrape_amazon(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    run_scrape(Platform::Amazon, &state, params).await
}

#[utoipa::path(
    get,
    path = "/api/flipkart",
    params(ScrapeParams),
    responses(
        (status = 200, description = "Scrape outcome envelope", body = ScrapeResponse),
        (status = 400, description = "Missing product name", body = PlatformError),
        (status = 504, description = "Scrape exceeded its deadline", body = PlatformError)
    ),
    tag = "scrape"
)]
pub async fn scrape_flipkart(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    run_scrape(Platform::Flipkart, &state, params).await
}

#[utoipa::path(
    get,
    path = "/api/myntra",
    params(ScrapeParams),
    responses(
        (status = 200, description = "Scrape outcome envelope", body = ScrapeResponse),
        (status = 400, description = "Missing product name", body = PlatformError),
        (status = 504, description = "Scrape exceeded its deadline", body = PlatformError)
    ),
    tag = "scrape"
)]
pub async fn scrape_myntra(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    run_scrape(Platform::Myntra, &state, params).await
}

async fn run_scrape(platform: Platform, state: &AppState, params: ScrapeParams) -> Response {
    let name = params.name.unwrap_or_default();
    let name = name.trim();
    if name.is_empty() {
        let body = PlatformError {
            success: false,
            platform: platform.to_string(),
            error: "missing required query parameter: name".to_string(),
            details: None,
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    // Hard stop a little past the scrape's own deadline so a wedged browser
    // cannot hold the connection open.
    let hard_stop = state.config.scrape_budget() + Duration::from_secs(5);
    let scrape = pipeline::scrape_product(platform, name, &state.config);
    match tokio::time::timeout(hard_stop, scrape).await {
        Ok(result) => Json(ScrapeResponse::from_result(result)).into_response(),
        Err(_) => {
            warn!(%platform, name, "scrape hard-stopped past its deadline");
            let body = timeout_envelope(platform, &state.config, hard_stop);
            (StatusCode::GATEWAY_TIMEOUT, Json(body)).into_response()
        }
    }
}

/// Envelope for a scrape that hit the hard stop. Diagnostics ride in
/// `details` outside production and are withheld in it.
fn timeout_envelope(platform: Platform, config: &AppConfig, hard_stop: Duration) -> PlatformError {
    let details =
        (!config.is_production()).then(|| format!("no response within {}s", hard_stop.as_secs()));
    PlatformError {
        success: false,
        platform: platform.to_string(),
        error: "scrape timed out".to_string(),
        details,
    }
}

#[utoipa::path(
    post,
    path = "/api/unify",
    request_body = UnifyRequest,
    responses(
        (status = 200, description = "Unification outcome", body = UnifyResponse),
        (status = 400, description = "Missing link", body = UnifyResponse)
    ),
    tag = "unify"
)]
pub async fn unify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnifyRequest>,
) -> Response {
    let link = req.link.trim();
    if link.is_empty() {
        let body = UnifyResponse {
            success: false,
            search_query: None,
            error: Some("missing required field: link".to_string()),
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let body = match state.unify.unify_product_name(link).await {
        Ok(query) => UnifyResponse {
            success: true,
            search_query: Some(query),
            error: None,
        },
        Err(err) => {
            warn!(%err, link, "name unification failed");
            UnifyResponse {
                success: false,
                search_query: None,
                error: Some(err.to_string()),
            }
        }
    };
    Json(body).into_response()
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "health"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
