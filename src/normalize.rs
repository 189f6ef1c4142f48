//! The stable output contract.
//!
//! Downstream price-comparison tooling string-matches against this envelope,
//! so the key set, key order and sentinel values here are load-bearing.
//! Partial extraction still produces the full shape: absent fields become
//! nulls or sentinels, `delivery` is the one key that disappears entirely.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ScrapeError;
use crate::extract::ProductRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub stars: Option<f64>,
    pub total_reviews: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub title: String,
    /// Formatted price or "Not available".
    pub price: String,
    pub mrp: Option<String>,
    pub discount: Option<String>,
    pub rating: Rating,
    pub top_offers: Vec<String>,
    pub seller: String,
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
    pub product_link: String,
}

/// One envelope per scrape call, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScrapeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ProductData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResponse {
    pub fn ok(record: ProductRecord) -> Self {
        Self {
            success: true,
            data: Some(normalize(record)),
            error: None,
        }
    }

    pub fn err(error: &ScrapeError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    pub fn from_result(result: Result<ProductRecord, ScrapeError>) -> Self {
        match result {
            Ok(record) => Self::ok(record),
            Err(err) => Self::err(&err),
        }
    }
}

/// Map a raw record onto the envelope shape, applying sentinels.
pub fn normalize(record: ProductRecord) -> ProductData {
    let offers = if record.offers.is_empty() {
        vec!["No offers available".to_string()]
    } else {
        record.offers
    };

    ProductData {
        title: record
            .title
            .unwrap_or_else(|| "Unknown product".to_string()),
        price: record
            .price
            .map(format_inr)
            .unwrap_or_else(|| "Not available".to_string()),
        mrp: record.mrp.map(format_inr),
        discount: record.discount_percent.map(|pct| format!("{pct}%")),
        rating: Rating {
            stars: record.rating_stars,
            total_reviews: record.review_count,
        },
        top_offers: offers,
        seller: record
            .seller
            .unwrap_or_else(|| "Not specified".to_string()),
        availability: record.availability,
        delivery: record.delivery,
        product_link: record.source_url,
    }
}

/// Format an amount as rupees with en-IN digit grouping: the last three
/// digits form one group, everything above groups in twos. Paise only show
/// for fractional amounts.
pub fn format_inr(amount: f64) -> String {
    let paise = (amount * 100.0).round() as i64;
    let rupees = paise / 100;
    let frac = paise % 100;
    let grouped = group_indian(&rupees.to_string());
    if frac == 0 {
        format!("₹{grouped}")
    } else {
        format!("₹{grouped}.{frac:02}")
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut pairs = Vec::new();
    let mut end = head.len();
    while end > 2 {
        pairs.push(&head[end - 2..end]);
        end -= 2;
    }
    pairs.push(&head[..end]);
    pairs.reverse();
    format!("{},{}", pairs.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> ProductRecord {
        ProductRecord {
            platform: "flipkart".to_string(),
            title: Some("Nike Revolution 6 Running Shoes For Men".to_string()),
            price: Some(2999.0),
            mrp: Some(4999.0),
            discount_percent: Some(40),
            rating_stars: Some(4.3),
            review_count: Some(1234),
            offers: vec![
                "Bank Offer 10% off on HDFC Bank Credit Card".to_string(),
                "No cost EMI on orders above ₹2,999".to_string(),
            ],
            seller: Some("RetailNet".to_string()),
            availability: Some("In Stock".to_string()),
            delivery: Some("Delivery by 31 Aug, Sunday".to_string()),
            source_url: "https://www.flipkart.com/nike-revolution-6/p/nike-shoes-123".to_string(),
        }
    }

    fn bare_record() -> ProductRecord {
        ProductRecord {
            platform: "myntra".to_string(),
            title: None,
            price: None,
            mrp: None,
            discount_percent: None,
            rating_stars: None,
            review_count: None,
            offers: vec![],
            seller: None,
            availability: None,
            delivery: None,
            source_url: "https://www.myntra.com/x/1/buy".to_string(),
        }
    }

    #[test]
    fn format_inr_groups_the_indian_way() {
        assert_eq!(format_inr(2999.0), "₹2,999");
        assert_eq!(format_inr(123456.0), "₹1,23,456");
        assert_eq!(format_inr(1234567.0), "₹12,34,567");
        assert_eq!(format_inr(100.0), "₹100");
        assert_eq!(format_inr(999.0), "₹999");
        assert_eq!(format_inr(1000.0), "₹1,000");
    }

    #[test]
    fn format_inr_keeps_paise_only_when_fractional() {
        assert_eq!(format_inr(499.5), "₹499.50");
        assert_eq!(format_inr(499.0), "₹499");
        assert_eq!(format_inr(123456.75), "₹1,23,456.75");
    }

    #[test]
    fn sentinels_fill_every_gap() {
        let data = normalize(bare_record());
        assert_eq!(data.title, "Unknown product");
        assert_eq!(data.price, "Not available");
        assert_eq!(data.mrp, None);
        assert_eq!(data.discount, None);
        assert_eq!(data.top_offers, vec!["No offers available"]);
        assert_eq!(data.seller, "Not specified");
        assert_eq!(data.availability, None);
        assert_eq!(data.delivery, None);
    }

    #[test]
    fn discount_percent_renders_with_a_percent_sign() {
        let data = normalize(full_record());
        assert_eq!(data.discount.as_deref(), Some("40%"));
    }

    #[test]
    fn success_envelope_has_the_exact_shape() {
        let response = ScrapeResponse::ok(full_record());
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            "{\"success\":true,\"data\":{\
             \"title\":\"Nike Revolution 6 Running Shoes For Men\",\
             \"price\":\"₹2,999\",\
             \"mrp\":\"₹4,999\",\
             \"discount\":\"40%\",\
             \"rating\":{\"stars\":4.3,\"totalReviews\":1234},\
             \"topOffers\":[\"Bank Offer 10% off on HDFC Bank Credit Card\",\"No cost EMI on orders above ₹2,999\"],\
             \"seller\":\"RetailNet\",\
             \"availability\":\"In Stock\",\
             \"delivery\":\"Delivery by 31 Aug, Sunday\",\
             \"productLink\":\"https://www.flipkart.com/nike-revolution-6/p/nike-shoes-123\"}}"
        );
    }

    #[test]
    fn delivery_key_disappears_when_absent() {
        let mut record = full_record();
        record.delivery = None;
        let json = serde_json::to_string(&ScrapeResponse::ok(record)).unwrap();
        assert!(!json.contains("delivery"));
        assert!(json.contains("\"availability\":\"In Stock\""));
    }

    #[test]
    fn nulls_survive_in_the_success_envelope() {
        let json = serde_json::to_string(&ScrapeResponse::ok(bare_record())).unwrap();
        assert!(json.contains("\"mrp\":null"));
        assert!(json.contains("\"discount\":null"));
        assert!(json.contains("\"rating\":{\"stars\":null,\"totalReviews\":null}"));
        assert!(json.contains("\"availability\":null"));
    }

    #[test]
    fn error_envelope_is_success_false_plus_message() {
        let err = ScrapeError::NoOrganicResult {
            platform: "amazon".to_string(),
        };
        let json = serde_json::to_string(&ScrapeResponse::err(&err)).unwrap();
        assert_eq!(
            json,
            "{\"success\":false,\"error\":\"no organic result found on amazon\"}"
        );
    }

    #[test]
    fn serialization_is_byte_stable() {
        let a = serde_json::to_string(&ScrapeResponse::ok(full_record())).unwrap();
        let b = serde_json::to_string(&ScrapeResponse::ok(full_record())).unwrap();
        assert_eq!(a, b);
    }
}
