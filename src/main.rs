use axum::{
    routing::{get, post},
    Router,
};
use dotenv::dotenv;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use price_scraper::api::{self, AppState};
use price_scraper::config::AppConfig;
use price_scraper::normalize::{ProductData, Rating, ScrapeResponse};
use price_scraper::unify::UnifyClient;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::scrape_amazon,
        api::scrape_flipkart,
        api::scrape_myntra,
        api::unify,
        api::health
    ),
    components(
        schemas(
            ScrapeResponse,
            ProductData,
            Rating,
            api::PlatformError,
            api::UnifyRequest,
            api::UnifyResponse
        )
    ),
    tags(
        (name = "scrape", description = "Product price scraping"),
        (name = "unify", description = "Product name unification"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let port = config.port;
    let unify = UnifyClient::new(config.gemini_api_key.clone());
    let state = Arc::new(AppState { config, unify });

    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/amazon", get(api::scrape_amazon))
        .route("/api/flipkart", get(api::scrape_flipkart))
        .route("/api/myntra", get(api::scrape_myntra))
        .route("/api/unify", post(api::unify))
        .route("/health", get(api::health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    println!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
