//! Per-platform scraping capabilities.
//!
//! Everything that differs between Amazon.in, Flipkart and Myntra lives here
//! as static data: how search is reached, what a result listing looks like,
//! which signals mark a listing as paid placement, and the selector fallback
//! chains for every product-page field. The engine itself stays generic; a
//! markup change on a platform is fixed by editing a table, not code.
//!
//! Selector chains are ordered most-specific first. Platforms rotate their
//! generated class names, so most chains end in an older class or a broader
//! attribute selector that survives a redesign for a while.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    Flipkart,
    Myntra,
}

impl Platform {
    pub fn spec(&self) -> &'static PlatformSpec {
        match self {
            Platform::Amazon => &AMAZON,
            Platform::Flipkart => &FLIPKART,
            Platform::Myntra => &MYNTRA,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spec().name)
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "amazon" => Ok(Platform::Amazon),
            "flipkart" => Ok(Platform::Flipkart),
            "myntra" => Ok(Platform::Myntra),
            other => Err(format!(
                "unknown platform \"{other}\" (expected amazon, flipkart or myntra)"
            )),
        }
    }
}

/// How a platform gets from a product name to a rendered results page.
#[derive(Debug, Clone, Copy)]
pub enum SearchStrategy {
    /// Results are addressable directly; `{query}` is replaced with the
    /// URL-encoded product name.
    DirectUrl { template: &'static str },
    /// The site only renders results after a query is typed into its search
    /// box and submitted.
    Interactive {
        home_url: &'static str,
        input_selector: &'static str,
    },
}

/// Independent signals that mark a search listing as paid placement.
/// Any one firing is enough to classify the listing as sponsored.
#[derive(Debug, Clone, Copy)]
pub struct SponsoredSignals {
    /// Elements that only exist inside sponsored cards.
    pub marker_selectors: &'static [&'static str],
    /// Text nodes that equal one of these after trim + lowercase.
    pub text_tokens: &'static [&'static str],
    /// Class names on the card itself that the platform uses for ad slots.
    pub promo_classes: &'static [&'static str],
    /// Dedicated "Sponsored"/"Ad" label elements.
    pub label_selectors: &'static [&'static str],
}

/// Selector fallback chains for the product detail page, one per field.
/// An empty chain means the platform never exposes that field.
#[derive(Debug, Clone, Copy)]
pub struct DetailSelectors {
    pub title: &'static [&'static str],
    pub price: &'static [&'static str],
    pub mrp: &'static [&'static str],
    pub discount_badge: &'static [&'static str],
    pub rating: &'static [&'static str],
    pub review_count: &'static [&'static str],
    /// Offer sources in priority order; earlier groups are preferred when
    /// the cap of three offers is reached.
    pub offers: &'static [&'static [&'static str]],
    pub seller: &'static [&'static str],
    pub availability: &'static [&'static str],
    pub out_of_stock: &'static [&'static str],
    pub add_to_cart: &'static [&'static str],
    pub delivery: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct PlatformSpec {
    pub name: &'static str,
    pub origin: &'static str,
    pub search: SearchStrategy,
    /// Element that proves the results page rendered at all.
    pub results_container: &'static str,
    /// One search result listing.
    pub listing_selector: &'static str,
    pub sponsored: SponsoredSignals,
    /// Link chains inside an organic listing, tried in order.
    pub product_link_selectors: &'static [&'static str],
    /// A resolved href must contain one of these to count as a product page.
    pub product_path_markers: &'static [&'static str],
    pub detail: DetailSelectors,
}

pub static AMAZON: PlatformSpec = PlatformSpec {
    name: "amazon",
    origin: "https://www.amazon.in",
    search: SearchStrategy::DirectUrl {
        template: "https://www.amazon.in/s?k={query}",
    },
    results_container: "div.s-main-slot",
    listing_selector: "div[data-component-type='s-search-result']",
    sponsored: SponsoredSignals {
        marker_selectors: &[
            "div[data-component-type='sp-sponsored-result']",
            ".puis-sponsored-label-text",
        ],
        text_tokens: &["sponsored", "ad"],
        promo_classes: &["AdHolder", "s-sponsored-list-item"],
        label_selectors: &["span.puis-label-popover-default", "a.puis-sponsored-label-info-icon"],
    },
    product_link_selectors: &[
        "h2 a.a-link-normal",
        "a.a-link-normal.s-no-outline",
        "a.a-link-normal[href*='/dp/']",
    ],
    product_path_markers: &["/dp/", "/gp/product/"],
    detail: DetailSelectors {
        title: &["#productTitle", "#title span"],
        price: &[
            "#corePriceDisplay_desktop_feature_div span.a-price-whole",
            "#corePrice_feature_div .a-price .a-offscreen",
            "span.a-price .a-offscreen",
            "#priceblock_ourprice",
            "#priceblock_dealprice",
        ],
        mrp: &[
            "#corePriceDisplay_desktop_feature_div span.a-price.a-text-price .a-offscreen",
            "span.a-price.a-text-price .a-offscreen",
            "#priceblock_listprice",
        ],
        discount_badge: &[
            "#corePriceDisplay_desktop_feature_div .savingsPercentage",
            "span.savingsPercentage",
        ],
        rating: &[
            "#acrPopover span.a-icon-alt",
            "span[data-hook='rating-out-of-text']",
            "i.a-icon-star span.a-icon-alt",
        ],
        review_count: &["#acrCustomerReviewText", "span[data-hook='total-review-count']"],
        offers: &[
            &[
                "#itembox-InstantBankDiscount .a-truncate-full",
                "div.vsx__offers .offers-items-content",
            ],
            &[
                "#promoPriceBlockMessage_feature_div .promoPriceBlockMessage",
                "#applicable_promotion_list_sec .a-list-item",
            ],
            &["#dealBadge_feature_div", "#sns-tier-badge-text"],
        ],
        seller: &["#sellerProfileTriggerId", "#merchant-info a", "#merchant-info"],
        availability: &["#availability span", "#availability"],
        out_of_stock: &["#outOfStock"],
        add_to_cart: &["#add-to-cart-button"],
        delivery: &[
            "#mir-layout-DELIVERY_BLOCK-slot-PRIMARY_DELIVERY_MESSAGE_LARGE span.a-text-bold",
            "#deliveryBlockMessage span.a-text-bold",
        ],
    },
};

pub static FLIPKART: PlatformSpec = PlatformSpec {
    name: "flipkart",
    origin: "https://www.flipkart.com",
    search: SearchStrategy::DirectUrl {
        template: "https://www.flipkart.com/search?q={query}",
    },
    // Not div#container: that is the SPA shell and exists before anything
    // renders. The results column only appears once the page has results.
    results_container: "div._1YokD2, div.DOjaWF",
    listing_selector: "div[data-id]",
    sponsored: SponsoredSignals {
        marker_selectors: &["div[data-tkid*='SEARCH_AD']"],
        text_tokens: &["sponsored", "ad"],
        promo_classes: &["_2I5qvP"],
        label_selectors: &["div._4HTuuX", "span.f8qK5m"],
    },
    product_link_selectors: &[
        "a._1fQZEK",
        "a.s1Q9rs",
        "a.CGtC98",
        "a[href*='/p/']",
    ],
    product_path_markers: &["/p/"],
    detail: DetailSelectors {
        title: &["span.B_NuCI", "span.VU-ZEz", "h1._6EBuvT"],
        price: &["div._30jeq3._16Jk6d", "div._30jeq3", "div.Nx9bqj.CxhGGd", "div.Nx9bqj"],
        mrp: &["div._3I9_wc._2p6lqe", "div._3I9_wc", "div.yRaY8j"],
        discount_badge: &["div._3Ay6Sb._31Dcoz span", "div._3Ay6Sb span", "div.UkUFwK span"],
        rating: &["div._3LWZlK", "div.XQDdHH"],
        review_count: &["span._2_R_DZ", "span.Wphh3N"],
        offers: &[
            &["div._3j4Zjq li._16eBzU span", "li._16eBzU"],
            &["div._2AVyCP li", "span._2Tpdn3"],
            &["div.kF1Ml8 li"],
        ],
        seller: &["#sellerName span span", "#sellerName span", "#sellerName"],
        availability: &[],
        out_of_stock: &["div._16FRp0", "div.Z8JjpR"],
        add_to_cart: &["button._2KpZ6l._2U9uOA", "button.QqFHMw"],
        delivery: &["div._3XINqE", "div.Y8v7Fl", "div._1TPvTK"],
    },
};

pub static MYNTRA: PlatformSpec = PlatformSpec {
    name: "myntra",
    origin: "https://www.myntra.com",
    search: SearchStrategy::Interactive {
        home_url: "https://www.myntra.com",
        input_selector: "input.desktop-searchBar",
    },
    results_container: "ul.results-base",
    listing_selector: "li.product-base",
    sponsored: SponsoredSignals {
        marker_selectors: &["div.product-waterMark"],
        text_tokens: &["sponsored", "ad"],
        promo_classes: &["product-sponsored"],
        label_selectors: &["span.product-adTag"],
    },
    product_link_selectors: &["a[data-refreshpage='true']", "a[href*='/buy']", "a"],
    product_path_markers: &["/buy"],
    detail: DetailSelectors {
        title: &["h1.pdp-title", "h1.pdp-name"],
        price: &["span.pdp-price strong", "p.pdp-discount-container span.pdp-price"],
        mrp: &["span.pdp-mrp s", "p.pdp-discount-container s"],
        discount_badge: &["span.pdp-discount"],
        rating: &["div.index-overallRating div.index-flexRow", "div.index-overallRating"],
        review_count: &["div.index-ratingsCount"],
        offers: &[
            &["div.pdp-offers-offerLikeBestPrice", "div.pdp-offers-offer"],
            &["div.pdp-offers-labelMarkup", "span.pdp-offers-boldText"],
            &["div.offer-label"],
        ],
        seller: &["span.supplier-productSellerName"],
        availability: &[],
        out_of_stock: &["p.pdp-outOfStock", "div.soldOutP"],
        add_to_cart: &["div.pdp-add-to-bag", "button.pdp-add-to-bag"],
        delivery: &[],
    },
};

/// Compile a selector from a platform table. Chains tolerate a bad entry by
/// skipping it, so one typo never takes down a whole field.
pub(crate) fn compile(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(err) => {
            warn!("unparsable selector \"{raw}\": {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_chains(spec: &PlatformSpec) -> Vec<&'static str> {
        let mut chains: Vec<&'static str> = vec![spec.results_container, spec.listing_selector];
        chains.extend(spec.sponsored.marker_selectors);
        chains.extend(spec.sponsored.label_selectors);
        chains.extend(spec.product_link_selectors);
        let d = &spec.detail;
        for chain in [
            d.title,
            d.price,
            d.mrp,
            d.discount_badge,
            d.rating,
            d.review_count,
            d.seller,
            d.availability,
            d.out_of_stock,
            d.add_to_cart,
            d.delivery,
        ] {
            chains.extend(chain);
        }
        for group in d.offers {
            chains.extend(*group);
        }
        if let SearchStrategy::Interactive { input_selector, .. } = spec.search {
            chains.push(input_selector);
        }
        chains
    }

    #[test]
    fn every_selector_in_every_table_parses() {
        for platform in [Platform::Amazon, Platform::Flipkart, Platform::Myntra] {
            let spec = platform.spec();
            for raw in all_chains(spec) {
                assert!(
                    Selector::parse(raw).is_ok(),
                    "{}: selector {:?} does not parse",
                    spec.name,
                    raw
                );
            }
        }
    }

    #[test]
    fn platform_round_trips_through_strings() {
        for (text, platform) in [
            ("amazon", Platform::Amazon),
            ("Flipkart", Platform::Flipkart),
            (" MYNTRA ", Platform::Myntra),
        ] {
            assert_eq!(text.parse::<Platform>().unwrap(), platform);
        }
        assert!("ebay".parse::<Platform>().is_err());
        assert_eq!(Platform::Amazon.to_string(), "amazon");
    }

    #[test]
    fn flipkart_results_wait_skips_the_bare_app_shell() {
        use scraper::Html;

        let container = Selector::parse(FLIPKART.results_container).unwrap();

        // What the SPA serves before it renders anything.
        let shell = Html::parse_document(r#"<html><body><div id="container"></div></body></html>"#);
        assert!(shell.select(&container).next().is_none());

        let rendered = Html::parse_document(
            r#"<html><body><div id="container">
                <div class="_1YokD2 _3Mn1Gg"><div data-id="MOBGT">card</div></div>
            </div></body></html>"#,
        );
        assert!(rendered.select(&container).next().is_some());
    }

    #[test]
    fn only_myntra_searches_interactively() {
        assert!(matches!(
            Platform::Myntra.spec().search,
            SearchStrategy::Interactive { .. }
        ));
        for platform in [Platform::Amazon, Platform::Flipkart] {
            assert!(matches!(
                platform.spec().search,
                SearchStrategy::DirectUrl { .. }
            ));
        }
    }

    #[test]
    fn path_markers_match_known_product_urls() {
        let cases = [
            (Platform::Amazon, "https://www.amazon.in/Nike-Revolution/dp/B0ABC12345"),
            (Platform::Flipkart, "https://www.flipkart.com/nike-shoes/p/itm123"),
            (Platform::Myntra, "https://www.myntra.com/shoes/nike/nike-air/123/buy"),
        ];
        for (platform, url) in cases {
            let markers = platform.spec().product_path_markers;
            assert!(markers.iter().any(|m| url.contains(m)), "{url}");
        }
    }
}
