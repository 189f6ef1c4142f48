//! One isolated browser per scrape attempt.
//!
//! A [`BrowserSession`] owns the Chrome process and the single tab a scrape
//! runs in. Dropping the session kills the process, so teardown holds on
//! every exit path, including panics and early returns.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::protocol::cdp::Emulation::{SetLocaleOverride, SetTimezoneOverride};
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::error::{Result, ScrapeError};

/// Upper bound for a single page navigation.
pub const NAV_TIMEOUT: Duration = Duration::from_secs(60);
/// Upper bound for one structural element wait.
pub const SELECTOR_TIMEOUT: Duration = Duration::from_secs(30);
/// Default wall-clock budget for a whole scrape attempt.
pub const DEFAULT_SCRAPE_BUDGET: Duration = Duration::from_secs(90);

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/124.0.0.0 Safari/537.36",
    ]
});

/// Wall-clock budget for one scrape attempt.
///
/// Every bounded wait in the flow clamps its own timeout to what remains of
/// the budget, so a slow early step eats into the later ones instead of
/// stacking timeouts past the overall limit.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    /// Clamp a per-step bound to the remaining budget.
    pub fn clamp(&self, step: Duration) -> Duration {
        step.min(self.remaining())
    }

    pub fn exhausted(&self) -> bool {
        self.remaining().is_zero()
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new(DEFAULT_SCRAPE_BUDGET)
    }
}

/// Script injected before any page script runs. Removes the automation flag
/// and fills in the browser surface headless Chrome leaves bare.
const IDENTITY_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-IN', 'en'] });
    window.chrome = {
        runtime: {},
        app: { isInstalled: false },
        csi: function() {},
        loadTimes: function() { return { connectionInfo: 'h2' }; }
    };
    const originalQuery = window.navigator.permissions.query;
    window.navigator.permissions.query = (parameters) => (
        parameters.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : originalQuery(parameters)
    );
"#;

pub struct BrowserSession {
    // Field order matters: the tab must drop before the browser that owns it.
    tab: Arc<Tab>,
    _browser: Browser,
}

impl BrowserSession {
    /// Launch an isolated Chrome with a fresh identity and open one tab.
    pub fn launch(headless: bool) -> Result<Self> {
        let user_agent = pick_user_agent();
        let ua_arg = format!("--user-agent={user_agent}");

        let mut args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-infobars"),
            OsStr::new("--window-position=0,0"),
            OsStr::new("--ignore-certificate-errors"),
            OsStr::new("--incognito"),
        ];
        if headless {
            args.push(OsStr::new("--headless=new"));
        }
        args.push(OsStr::new(&ua_arg));

        let browser = Browser::new(LaunchOptions {
            headless: false, // modern headless goes in through args
            window_size: Some((1920, 1080)),
            args,
            ..Default::default()
        })
        .map_err(ScrapeError::launch)?;

        let tab = browser.new_tab().map_err(ScrapeError::launch)?;
        tab.set_default_timeout(NAV_TIMEOUT);

        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: IDENTITY_SCRIPT.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(ScrapeError::protocol)?;
        tab.call_method(SetTimezoneOverride {
            timezone_id: "Asia/Kolkata".to_string(),
        })
        .map_err(ScrapeError::protocol)?;
        tab.call_method(SetLocaleOverride {
            locale: Some("en-IN".to_string()),
        })
        .map_err(ScrapeError::protocol)?;

        info!(user_agent, headless, "browser session launched");
        Ok(Self {
            tab,
            _browser: browser,
        })
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Explicit happy-path teardown. Dropping the session has the same
    /// effect; the method only marks the intent at the call site.
    pub fn release(self) {}
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Browser's own Drop kills the Chrome process.
        debug!("browser session closed");
    }
}

fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_script_covers_the_headless_tells() {
        assert!(IDENTITY_SCRIPT.contains("navigator, 'webdriver'"));
        assert!(IDENTITY_SCRIPT.contains("window.chrome = {"));
        assert!(IDENTITY_SCRIPT.contains("permissions.query"));
    }

    #[test]
    fn user_agent_pool_is_realistic() {
        assert!(!USER_AGENTS.is_empty());
        for ua in USER_AGENTS.iter() {
            assert!(ua.starts_with("Mozilla/5.0"));
        }
        assert!(USER_AGENTS.contains(&pick_user_agent()));
    }

    #[test]
    fn deadline_clamps_steps_to_the_remaining_budget() {
        let deadline = Deadline::new(Duration::from_secs(10));
        assert_eq!(deadline.clamp(Duration::from_secs(5)), Duration::from_secs(5));
        assert!(deadline.clamp(Duration::from_secs(60)) <= Duration::from_secs(10));
        assert!(!deadline.exhausted());
    }

    #[test]
    fn deadline_exhausts_once_the_budget_is_spent() {
        let deadline = Deadline::new(Duration::ZERO);
        assert!(deadline.exhausted());
        assert_eq!(deadline.clamp(Duration::from_secs(30)), Duration::ZERO);
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[test]
    fn default_deadline_carries_the_standard_budget() {
        let deadline = Deadline::default();
        assert!(!deadline.exhausted());
        assert!(deadline.remaining() <= DEFAULT_SCRAPE_BUDGET);
        assert!(deadline.remaining() > DEFAULT_SCRAPE_BUDGET - Duration::from_secs(1));
    }
}
