//! Drives a session from a product name to a rendered page.
//!
//! Two strategies cover the three platforms: Amazon and Flipkart accept the
//! query straight in the URL, Myntra only renders results for a query typed
//! into its search box. Both end in the same settle step that waits for the
//! DOM to stop mutating before anything reads it.

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::Tab;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Result, ScrapeError};
use crate::platform::{PlatformSpec, SearchStrategy};
use crate::session::{BrowserSession, Deadline, NAV_TIMEOUT, SELECTOR_TIMEOUT};

/// DOM-quiescence check: resolves once no mutation has landed for 800ms,
/// capped at 6s for pages that never go quiet. The debounce timer is armed
/// up front so a page with zero mutations resolves immediately.
const SETTLE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        let timer;
        const done = (how) => { observer.disconnect(); resolve(how); };
        const observer = new MutationObserver(() => {
            clearTimeout(timer);
            timer = setTimeout(() => done("settled"), 800);
        });
        observer.observe(document.body, { childList: true, subtree: true });
        timer = setTimeout(() => done("settled"), 800);
        setTimeout(() => done("capped"), 6000);
    });
"#;

/// Navigate to the platform's search results for `query` and wait until the
/// results list has rendered.
pub async fn open_search_results(
    session: &BrowserSession,
    spec: &PlatformSpec,
    query: &str,
    deadline: &Deadline,
) -> Result<()> {
    match spec.search {
        SearchStrategy::DirectUrl { template } => {
            let url = search_url(template, query);
            debug!(platform = spec.name, %url, "direct search");
            navigate(session.tab(), &url, deadline)?;
        }
        SearchStrategy::Interactive {
            home_url,
            input_selector,
        } => {
            debug!(platform = spec.name, query, "interactive search");
            type_and_submit(session.tab(), home_url, input_selector, query, deadline).await?;
        }
    }

    wait_for(session.tab(), spec.results_container, deadline)?;
    // Listings can trail the container; give them a moment but don't fail
    // here, an empty list is the locator's call.
    if let Err(err) = wait_for_clamped(
        session.tab(),
        spec.listing_selector,
        deadline.clamp(Duration::from_secs(10)),
    ) {
        warn!(platform = spec.name, %err, "no listing appeared, continuing");
    }
    settle(session.tab()).await;
    Ok(())
}

/// Navigate to a located product page and wait for its title element.
pub async fn open_product_page(
    session: &BrowserSession,
    spec: &PlatformSpec,
    url: &str,
    deadline: &Deadline,
) -> Result<()> {
    navigate(session.tab(), url, deadline)?;
    let title_marker = spec.detail.title.join(", ");
    wait_for(session.tab(), &title_marker, deadline)?;
    settle(session.tab()).await;
    Ok(())
}

pub(crate) fn search_url(template: &str, query: &str) -> String {
    template.replace("{query}", &urlencoding::encode(query))
}

fn navigate(tab: &Arc<Tab>, url: &str, deadline: &Deadline) -> Result<()> {
    let bound = deadline.clamp(NAV_TIMEOUT);
    if bound.is_zero() {
        return Err(ScrapeError::NavigationTimeout {
            url: url.to_string(),
            waited_secs: 0,
        });
    }
    tab.set_default_timeout(bound);
    tab.navigate_to(url).map_err(ScrapeError::protocol)?;
    tab.wait_until_navigated()
        .map_err(|_| ScrapeError::NavigationTimeout {
            url: url.to_string(),
            waited_secs: bound.as_secs(),
        })?;
    Ok(())
}

fn wait_for(tab: &Arc<Tab>, selector: &str, deadline: &Deadline) -> Result<()> {
    wait_for_clamped(tab, selector, deadline.clamp(SELECTOR_TIMEOUT))
}

fn wait_for_clamped(tab: &Arc<Tab>, selector: &str, bound: Duration) -> Result<()> {
    if bound.is_zero() {
        return Err(ScrapeError::SelectorTimeout {
            selector: selector.to_string(),
            waited_secs: 0,
        });
    }
    tab.wait_for_element_with_custom_timeout(selector, bound)
        .map(|_| ())
        .map_err(|_| ScrapeError::SelectorTimeout {
            selector: selector.to_string(),
            waited_secs: bound.as_secs(),
        })
}

/// Typing sleeps between keys, so a long query could outlast the budget one
/// keystroke at a time. Checked between keys; mirrors the zero-bound
/// short-circuit in [`navigate`].
fn ensure_time_remains(deadline: &Deadline, url: &str) -> Result<()> {
    if deadline.exhausted() {
        return Err(ScrapeError::NavigationTimeout {
            url: url.to_string(),
            waited_secs: 0,
        });
    }
    Ok(())
}

/// Open the home page, type the query into the search box one character at a
/// time and submit it. Typing cadence is jittered; instant input is a common
/// bot tell on sites that watch keystroke timing.
async fn type_and_submit(
    tab: &Arc<Tab>,
    home_url: &str,
    input_selector: &str,
    query: &str,
    deadline: &Deadline,
) -> Result<()> {
    navigate(tab, home_url, deadline)?;
    wait_for(tab, input_selector, deadline)?;

    // JS focus is more reliable than a synthesized click on animated headers.
    let focus = format!(
        r#"
        (() => {{
            const input = document.querySelector("{input_selector}");
            if (input) {{ input.click(); input.focus(); input.value = ''; }}
        }})();
        "#
    );
    tab.evaluate(&focus, false).map_err(ScrapeError::protocol)?;
    sleep(Duration::from_millis(400)).await;

    for ch in query.chars() {
        ensure_time_remains(deadline, home_url)?;
        tab.type_str(&ch.to_string()).map_err(ScrapeError::protocol)?;
        sleep(Duration::from_millis(typing_delay_ms())).await;
    }
    sleep(Duration::from_millis(300)).await;

    tab.press_key("Enter").map_err(ScrapeError::protocol)?;
    tab.set_default_timeout(deadline.clamp(NAV_TIMEOUT));
    tab.wait_until_navigated()
        .map_err(|_| ScrapeError::NavigationTimeout {
            url: format!("{home_url} (submitted search)"),
            waited_secs: deadline.clamp(NAV_TIMEOUT).as_secs(),
        })?;
    Ok(())
}

fn typing_delay_ms() -> u64 {
    60 + rand::random::<u64>() % 80
}

async fn settle(tab: &Arc<Tab>) {
    match tab.evaluate(SETTLE_SCRIPT, true) {
        Ok(result) => debug!(outcome = ?result.value, "page settled"),
        Err(err) => {
            // Evaluation can fail mid-navigation; fall back to a flat wait.
            debug!(%err, "settle script failed, sleeping instead");
            sleep(Duration::from_millis(1500)).await;
        }
    }
}
