//! Headless-Chrome price scraper for Indian e-commerce platforms.
//!
//! Given a product name, the scraper drives a real browser through a
//! platform's search flow, skips sponsored placements, opens the first
//! organic product page and extracts price, discount, rating and offers
//! into a stable JSON envelope. [`api`] exposes the same flow over HTTP,
//! [`unify`] turns a product link back into a searchable name.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod listing;
pub mod navigator;
pub mod normalize;
pub mod pipeline;
pub mod platform;
pub mod session;
pub mod unify;

pub use error::ScrapeError;
pub use pipeline::scrape_product;
pub use platform::Platform;
