//! Runtime configuration, read once from the environment at startup.

use std::time::Duration;

use thiserror::Error;

/// A config value that failed to parse. Missing values never error; every
/// setting has a default or is optional.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Deployment environment, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port (`PORT`, default 3000).
    pub port: u16,
    /// Deployment environment (`APP_ENV`, default development).
    pub app_env: AppEnv,
    /// Wall-clock budget for one scrape in seconds (`SCRAPE_DEADLINE_SECS`, default 90).
    pub scrape_deadline_secs: u64,
    /// Run Chrome headless. `CHROME_HEADFUL=1` flips this off for debugging.
    pub headless: bool,
    /// Gemini key for the name-unification endpoint (`GEMINI_API_KEY`).
    pub gemini_api_key: Option<String>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(|key| std::env::var(key))
    }

    /// Parsing is driven by a lookup fn so tests can feed a plain map
    /// instead of mutating process env vars.
    fn build<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let or_default = |var: &str, default: &str| -> String {
            lookup(var).unwrap_or_else(|_| default.to_string())
        };

        let port = or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: "PORT".to_string(),
                reason: e.to_string(),
            })?;

        let scrape_deadline_secs = or_default("SCRAPE_DEADLINE_SECS", "90")
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: "SCRAPE_DEADLINE_SECS".to_string(),
                reason: e.to_string(),
            })?;

        let app_env = parse_app_env(&or_default("APP_ENV", "development"));
        let headless = !lookup("CHROME_HEADFUL").map(|v| truthy(&v)).unwrap_or(false);
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(AppConfig {
            port,
            app_env,
            scrape_deadline_secs,
            headless,
            gemini_api_key,
        })
    }

    pub fn scrape_budget(&self) -> Duration {
        Duration::from_secs(self.scrape_deadline_secs)
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}

/// Unrecognized values fall back to development.
fn parse_app_env(raw: &str) -> AppEnv {
    match raw.trim().to_lowercase().as_str() {
        "production" => AppEnv::Production,
        _ => AppEnv::Development,
    }
}

fn truthy(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
