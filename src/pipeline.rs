//! One product scrape, end to end: search, locate, extract.

use scraper::Html;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{Result, ScrapeError};
use crate::extract::{extract_product, ProductRecord};
use crate::listing;
use crate::navigator;
use crate::platform::Platform;
use crate::session::{BrowserSession, Deadline};

/// Search `platform` for `query` and return the extracted record for the
/// first organic result. One browser per scrape; the whole run shares one
/// wall-clock deadline.
pub async fn scrape_product(
    platform: Platform,
    query: &str,
    config: &AppConfig,
) -> Result<ProductRecord> {
    let scrape_id = Uuid::new_v4();
    let deadline = Deadline::new(config.scrape_budget());
    info!(%scrape_id, %platform, query, "scrape started");

    let session = BrowserSession::launch(config.headless)?;
    let result = run(&session, platform, query, &deadline).await;
    session.release();

    match &result {
        Ok(record) => info!(
            %scrape_id,
            %platform,
            title = record.title.as_deref().unwrap_or("(untitled)"),
            "scrape finished"
        ),
        Err(err) => warn!(%scrape_id, %platform, %err, "scrape failed"),
    }
    result
}

async fn run(
    session: &BrowserSession,
    platform: Platform,
    query: &str,
    deadline: &Deadline,
) -> Result<ProductRecord> {
    let spec = platform.spec();

    navigator::open_search_results(session, spec, query, deadline).await?;
    let serp_html = page_html(session)?;
    // Html is not Send; parse inside a block so it is gone before the next await.
    let hit = {
        let serp = Html::parse_document(&serp_html);
        listing::first_organic_product_url(&serp, spec)?
    };
    info!(platform = spec.name, position = hit.position, url = %hit.url, "organic product located");

    navigator::open_product_page(session, spec, &hit.url, deadline).await?;
    let detail_html = page_html(session)?;
    let record = {
        let detail = Html::parse_document(&detail_html);
        extract_product(&detail, spec, &hit.url)
    };
    Ok(record)
}

fn page_html(session: &BrowserSession) -> Result<String> {
    session.tab().get_content().map_err(ScrapeError::protocol)
}
