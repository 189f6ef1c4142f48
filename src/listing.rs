//! Sponsored filtering and product-link resolution over a results page.
//!
//! Platforms interleave paid placements with organic results and the paid
//! slots lead. Picking "the" product for a query means walking the listings
//! in page order, dropping everything that looks like an ad, and taking the
//! first survivor that links to a real product page. No scoring, no
//! reordering: DOM order is the ranking.

use scraper::{ElementRef, Html};
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::platform::{compile, PlatformSpec, SponsoredSignals};

/// The organic listing a scrape settles on.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganicHit {
    /// 1-based position among all listings, sponsored included.
    pub position: usize,
    /// Absolute product-page URL.
    pub url: String,
}

/// Find the first organic listing with a valid product link.
///
/// Candidates are evaluated strictly in page order. A candidate is rejected
/// when any sponsorship signal fires, when it carries no link, or when its
/// link does not look like a product page; rejection moves on to the next
/// candidate. An exhausted list is [`ScrapeError::NoOrganicResult`].
pub fn first_organic_product_url(document: &Html, spec: &PlatformSpec) -> Result<OrganicHit> {
    let no_organic = || ScrapeError::NoOrganicResult {
        platform: spec.name.to_string(),
    };
    let Some(listing) = compile(spec.listing_selector) else {
        return Err(no_organic());
    };

    let mut total = 0usize;
    for (idx, candidate) in document.select(&listing).enumerate() {
        total += 1;
        let position = idx + 1;

        if let Some(signal) = sponsored_signal(&candidate, &spec.sponsored) {
            debug!(platform = spec.name, position, signal, "skipping sponsored listing");
            continue;
        }
        let Some(href) = candidate_link(&candidate, spec) else {
            debug!(platform = spec.name, position, "organic listing carries no link");
            continue;
        };
        if !is_product_path(&href, spec.product_path_markers) {
            debug!(platform = spec.name, position, href, "link is not a product page");
            continue;
        }

        return Ok(OrganicHit {
            position,
            url: absolutize(spec.origin, &href),
        });
    }

    debug!(platform = spec.name, total, "no organic candidate survived");
    Err(no_organic())
}

/// Which sponsorship signal, if any, fires for this listing. The four
/// signals are independent; one is enough.
fn sponsored_signal(candidate: &ElementRef, signals: &SponsoredSignals) -> Option<&'static str> {
    if matches_any(candidate, signals.marker_selectors) {
        return Some("marker element");
    }
    if has_token_text(candidate, signals.text_tokens) {
        return Some("label text");
    }
    if candidate
        .value()
        .classes()
        .any(|class| signals.promo_classes.contains(&class))
    {
        return Some("promo class");
    }
    if matches_any(candidate, signals.label_selectors) {
        return Some("ad label");
    }
    None
}

fn matches_any(candidate: &ElementRef, selectors: &[&str]) -> bool {
    selectors
        .iter()
        .filter_map(|raw| compile(raw))
        .any(|selector| candidate.select(&selector).next().is_some())
}

/// Token match is exact on the normalized text node, not a substring scan.
/// "Adidas" must never trip the "ad" token.
fn has_token_text(candidate: &ElementRef, tokens: &[&str]) -> bool {
    candidate.text().any(|node| {
        let normalized = node.trim().to_lowercase();
        tokens.contains(&normalized.as_str())
    })
}

/// First non-empty href in the link chain, in chain order.
fn candidate_link(candidate: &ElementRef, spec: &PlatformSpec) -> Option<String> {
    for raw in spec.product_link_selectors {
        let Some(selector) = compile(raw) else { continue };
        let href = candidate
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty());
        if let Some(href) = href {
            return Some(href.to_string());
        }
    }
    None
}

fn is_product_path(href: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| href.contains(marker))
}

/// Platforms serve root-relative, protocol-relative and bare-relative hrefs.
fn absolutize(origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", origin.trim_end_matches('/'), href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{FLIPKART, MYNTRA};

    fn flipkart_serp(cards: &[String]) -> Html {
        Html::parse_document(&format!(
            "<html><body><div id=\"container\">{}</div></body></html>",
            cards.join("\n")
        ))
    }

    fn sponsored_by_text(id: &str, title: &str) -> String {
        format!(
            r#"<div data-id="{id}">
                <span>Sponsored</span>
                <a class="_1fQZEK" href="/{id}/p/itm-{id}">{title}</a>
            </div>"#
        )
    }

    fn sponsored_by_label(id: &str, title: &str) -> String {
        format!(
            r#"<div data-id="{id}">
                <div class="_4HTuuX"></div>
                <a class="_1fQZEK" href="/{id}/p/itm-{id}">{title}</a>
            </div>"#
        )
    }

    fn organic(id: &str, href: &str, title: &str) -> String {
        format!(
            r#"<div data-id="{id}">
                <a class="_1fQZEK" href="{href}">{title}</a>
            </div>"#
        )
    }

    #[test]
    fn first_organic_candidate_wins_after_sponsored_leads() {
        let serp = flipkart_serp(&[
            sponsored_by_text("s1", "Sponsored Shoe One"),
            sponsored_by_label("s2", "Sponsored Shoe Two"),
            organic("o3", "/nike-shoes/p/nike-shoes-123?pid=SHOE1", "Nike Revolution 6"),
            organic("o4", "/other/p/other-999", "Some Other Shoe"),
        ]);
        let hit = first_organic_product_url(&serp, &FLIPKART).unwrap();
        assert_eq!(hit.position, 3);
        assert_eq!(
            hit.url,
            "https://www.flipkart.com/nike-shoes/p/nike-shoes-123?pid=SHOE1"
        );

        // Same document, same pick.
        let again = first_organic_product_url(&serp, &FLIPKART).unwrap();
        assert_eq!(hit, again);
    }

    #[test]
    fn all_sponsored_is_no_organic_result() {
        let serp = flipkart_serp(&[
            sponsored_by_text("s1", "Ad One"),
            sponsored_by_label("s2", "Ad Two"),
            sponsored_by_text("s3", "Ad Three"),
        ]);
        let err = first_organic_product_url(&serp, &FLIPKART).unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::NoOrganicResult { ref platform } if platform == "flipkart"
        ));
    }

    #[test]
    fn empty_results_is_no_organic_result() {
        let serp = flipkart_serp(&[]);
        assert!(matches!(
            first_organic_product_url(&serp, &FLIPKART),
            Err(ScrapeError::NoOrganicResult { .. })
        ));
    }

    #[test]
    fn marker_element_flags_sponsored() {
        let serp = flipkart_serp(&[
            r#"<div data-id="s1">
                <div data-tkid="com.SEARCH_AD.xyz"></div>
                <a class="_1fQZEK" href="/paid/p/paid-1">Paid Placement</a>
            </div>"#
                .to_string(),
            organic("o2", "/real/p/real-2", "Real Product"),
        ]);
        let hit = first_organic_product_url(&serp, &FLIPKART).unwrap();
        assert_eq!(hit.position, 2);
    }

    #[test]
    fn promo_class_on_the_card_flags_sponsored() {
        let serp = flipkart_serp(&[
            r#"<div data-id="s1" class="_2I5qvP">
                <a class="_1fQZEK" href="/promo/p/promo-1">Promoted</a>
            </div>"#
                .to_string(),
            organic("o2", "/real/p/real-2", "Real Product"),
        ]);
        let hit = first_organic_product_url(&serp, &FLIPKART).unwrap();
        assert_eq!(hit.position, 2);
    }

    #[test]
    fn adidas_never_trips_the_ad_token() {
        let serp = flipkart_serp(&[organic(
            "o1",
            "/adidas-runner/p/adi-1",
            "Adidas Men Running Shoes",
        )]);
        let hit = first_organic_product_url(&serp, &FLIPKART).unwrap();
        assert_eq!(hit.position, 1);
        assert!(hit.url.ends_with("/adidas-runner/p/adi-1"));
    }

    #[test]
    fn candidate_without_a_product_path_is_skipped() {
        let serp = flipkart_serp(&[
            organic("o1", "/deals-of-the-day", "Banner Pretending To Be A Card"),
            organic("o2", "/nike/p/nike-2", "Nike Shoe"),
        ]);
        let hit = first_organic_product_url(&serp, &FLIPKART).unwrap();
        assert_eq!(hit.position, 2);
        assert!(hit.url.contains("/p/"));
    }

    #[test]
    fn only_invalid_links_means_no_organic_result() {
        let serp = flipkart_serp(&[organic("o1", "/deals-of-the-day", "Banner")]);
        assert!(matches!(
            first_organic_product_url(&serp, &FLIPKART),
            Err(ScrapeError::NoOrganicResult { .. })
        ));
    }

    #[test]
    fn myntra_watermark_flags_sponsored() {
        let serp = Html::parse_document(
            r#"<html><body><ul class="results-base">
                <li class="product-base">
                    <div class="product-waterMark">AD</div>
                    <a data-refreshpage="true" href="paid/shoe/1/buy">Paid Shoe</a>
                </li>
                <li class="product-base">
                    <a data-refreshpage="true" href="nike/air-max/123/buy">Nike Air Max</a>
                </li>
            </ul></body></html>"#,
        );
        let hit = first_organic_product_url(&serp, &MYNTRA).unwrap();
        assert_eq!(hit.position, 2);
        assert_eq!(hit.url, "https://www.myntra.com/nike/air-max/123/buy");
    }

    #[test]
    fn href_shapes_all_absolutize_to_the_origin() {
        assert_eq!(
            absolutize("https://www.flipkart.com", "/a/p/b"),
            "https://www.flipkart.com/a/p/b"
        );
        assert_eq!(
            absolutize("https://www.myntra.com", "nike/1/buy"),
            "https://www.myntra.com/nike/1/buy"
        );
        assert_eq!(
            absolutize("https://www.flipkart.com", "//dl.flipkart.com/a/p/b"),
            "https://dl.flipkart.com/a/p/b"
        );
        assert_eq!(
            absolutize("https://www.amazon.in", "https://www.amazon.in/x/dp/B01"),
            "https://www.amazon.in/x/dp/B01"
        );
    }
}
