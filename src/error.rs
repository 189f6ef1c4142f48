use thiserror::Error;

/// Failures that abort a scrape attempt.
///
/// Missing page data is never one of these: a field the page does not expose
/// comes back as `None` and the scrape still succeeds. Every variant here
/// short-circuits the remaining pipeline steps and surfaces as a
/// `success: false` envelope.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser launch failed: {message}")]
    Launch { message: String },

    #[error("navigation to {url} timed out after {waited_secs}s")]
    NavigationTimeout { url: String, waited_secs: u64 },

    #[error("element \"{selector}\" did not appear within {waited_secs}s")]
    SelectorTimeout { selector: String, waited_secs: u64 },

    #[error("no organic result found on {platform}")]
    NoOrganicResult { platform: String },

    #[error("browser protocol error: {message}")]
    Protocol { message: String },
}

impl ScrapeError {
    pub fn launch(err: impl std::fmt::Display) -> Self {
        Self::Launch {
            message: err.to_string(),
        }
    }

    pub fn protocol(err: impl std::fmt::Display) -> Self {
        Self::Protocol {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
