//! One-shot scrape from the command line, printing the JSON envelope.

use anyhow::{bail, Result};
use dotenv::dotenv;

use price_scraper::config::AppConfig;
use price_scraper::normalize::ScrapeResponse;
use price_scraper::{scrape_product, Platform};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(platform), Some(name)) = (args.next(), args.next()) else {
        bail!("usage: scrape <amazon|flipkart|myntra> \"<product name>\"");
    };
    let platform: Platform = match platform.parse() {
        Ok(platform) => platform,
        Err(message) => bail!(message),
    };

    let config = AppConfig::from_env()?;
    println!("🔎 Scraping {platform} for \"{name}\"...");

    let result = scrape_product(platform, &name, &config).await;
    let envelope = ScrapeResponse::from_result(result);
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    Ok(())
}
