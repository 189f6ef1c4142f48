//! Product-name unification via the Gemini API.
//!
//! Product links carry marketplace noise (tracking params, seller slugs,
//! campaign ids). This client asks a language model to boil a link down to
//! the short search phrase a shopper would type, so the same product can be
//! looked up across platforms.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum UnifyError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingKey,
    #[error("language model request failed: {0}")]
    Request(String),
    #[error("language model returned HTTP {0}")]
    UpstreamStatus(u16),
    #[error("language model returned no usable text")]
    EmptyAnswer,
}

// Every level is optional: the API omits whole branches on safety blocks
// and empty completions, and that must read as EmptyAnswer, not a parse error.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Client for the name-unification model. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UnifyClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl UnifyClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    /// Point the client at a custom endpoint (for testing with wiremock).
    pub fn with_endpoint(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        UnifyClient {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Turn a product link into a short cross-platform search phrase.
    pub async fn unify_product_name(&self, link: &str) -> Result<String, UnifyError> {
        let key = self.api_key.as_deref().ok_or(UnifyError::MissingKey)?;

        let prompt = format!(
            "Extract the product from this link and answer with only a short search \
             phrase of the form brand + model + key specs, nothing else: {link}"
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", key)])
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| UnifyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UnifyError::UpstreamStatus(status.as_u16()));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| UnifyError::Request(e.to_string()))?;

        let query = parsed
            .candidates
            .into_iter()
            .flatten()
            .filter_map(|candidate| candidate.content)
            .filter_map(|content| content.parts)
            .flatten()
            .filter_map(|part| part.text)
            .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
            .find(|text| !text.is_empty())
            .ok_or(UnifyError::EmptyAnswer)?;

        debug!(link, query, "unified product name");
        Ok(query)
    }
}
