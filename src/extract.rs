//! Field extraction from a captured product page.
//!
//! The pipeline snapshots the rendered DOM once; everything in this module
//! is a pure function over that snapshot. Each field walks its own selector
//! chain independently, so a redesign that breaks one field leaves the rest
//! standing. A field with no match is `None`, never a failure.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

use crate::platform::{compile, DetailSelectors, PlatformSpec};

const MAX_OFFERS: usize = 3;
/// Anything shorter is icon text or "T&C" noise, not an offer.
const MIN_OFFER_CHARS: usize = 12;

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
static COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*([kK])?").unwrap());
static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3})\s*%").unwrap());

/// Everything one scrape learns about one product. Owned by the caller,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub platform: String,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub mrp: Option<f64>,
    pub discount_percent: Option<i64>,
    pub rating_stars: Option<f64>,
    pub review_count: Option<i64>,
    pub offers: Vec<String>,
    pub seller: Option<String>,
    pub availability: Option<String>,
    pub delivery: Option<String>,
    pub source_url: String,
}

/// Extract every field from a parsed product page. Deterministic for a given
/// document: same snapshot in, same record out.
pub fn extract_product(document: &Html, spec: &PlatformSpec, source_url: &str) -> ProductRecord {
    let d = &spec.detail;

    let price = first_text(document, d.price).and_then(|t| parse_price(&t));
    let mrp = first_text(document, d.mrp).and_then(|t| parse_price(&t));
    // A computed discount beats the badge: badges go stale when prices move.
    let discount_percent = computed_discount(price, mrp)
        .or_else(|| first_text(document, d.discount_badge).and_then(|t| parse_discount_badge(&t)));

    ProductRecord {
        platform: spec.name.to_string(),
        title: first_text(document, d.title),
        price,
        mrp,
        discount_percent,
        rating_stars: first_text(document, d.rating).and_then(|t| parse_rating(&t)),
        review_count: first_text(document, d.review_count).and_then(|t| parse_review_count(&t)),
        offers: collect_offers(document, d.offers),
        seller: first_text(document, d.seller),
        availability: availability(document, d),
        delivery: first_text(document, d.delivery),
        source_url: source_url.to_string(),
    }
}

/// First non-empty collapsed text under any selector in the chain.
fn first_text(document: &Html, chain: &[&str]) -> Option<String> {
    for raw in chain {
        let Some(selector) = compile(raw) else { continue };
        for element in document.select(&selector) {
            let text = collapse_ws(&element.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn first_element<'a>(document: &'a Html, chain: &[&str]) -> Option<ElementRef<'a>> {
    chain
        .iter()
        .filter_map(|raw| compile(raw))
        .find_map(|selector| document.select(&selector).next())
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First price-looking number, ignoring currency symbols and separators.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    NUMBER.find(&cleaned).and_then(|m| m.as_str().parse().ok())
}

pub fn parse_rating(text: &str) -> Option<f64> {
    NUMBER.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Review counts come as "1,234 ratings", "605 Ratings & 58 Reviews" or the
/// abbreviated "1.2k". The first number wins; a k suffix scales it.
pub fn parse_review_count(text: &str) -> Option<i64> {
    let cleaned = text.replace(',', "");
    let caps = COUNT.captures(&cleaned)?;
    let base: f64 = caps.get(1)?.as_str().parse().ok()?;
    let scaled = if caps.get(2).is_some() { base * 1000.0 } else { base };
    Some(scaled.round() as i64)
}

/// Percentage out of a badge like "(40% OFF)". Requires the percent sign so
/// rupee amounts in the same badge are never mistaken for a percentage.
pub fn parse_discount_badge(text: &str) -> Option<i64> {
    PERCENT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn computed_discount(price: Option<f64>, mrp: Option<f64>) -> Option<i64> {
    let (price, mrp) = (price?, mrp?);
    if mrp <= 0.0 {
        return None;
    }
    Some(((mrp - price) / mrp * 100.0).round() as i64)
}

/// Walk the offer groups in priority order, collecting up to three distinct
/// offers. Comparison is case-insensitive on collapsed text.
pub fn collect_offers(document: &Html, groups: &[&[&str]]) -> Vec<String> {
    let mut offers: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    'groups: for group in groups {
        for raw in *group {
            let Some(selector) = compile(raw) else { continue };
            for element in document.select(&selector) {
                let text = collapse_ws(&element.text().collect::<String>());
                if text.chars().count() < MIN_OFFER_CHARS {
                    continue;
                }
                let key = text.to_lowercase();
                if seen.contains(&key) {
                    continue;
                }
                seen.push(key);
                offers.push(text);
                if offers.len() == MAX_OFFERS {
                    break 'groups;
                }
            }
        }
    }
    offers
}

fn availability(document: &Html, d: &DetailSelectors) -> Option<String> {
    if let Some(text) = first_text(document, d.availability) {
        return Some(text);
    }
    if let Some(text) = first_text(document, d.out_of_stock) {
        return Some(text);
    }
    if let Some(control) = first_element(document, d.add_to_cart) {
        // `disabled` is a boolean attribute; any value counts as disabled.
        let state = if control.value().attr("disabled").is_none() {
            "In Stock"
        } else {
            "Out of Stock"
        };
        return Some(state.to_string());
    }
    if !d.add_to_cart.is_empty() {
        return Some("Out of Stock".to_string());
    }
    None
}
