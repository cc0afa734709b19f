//! Profanity screening for submitted words.
//!
//! Screening happens in the connection's reader task, before an `add-word`
//! command reaches the event loop, so room state is never touched while a
//! check is outstanding. The check fails open: if the service errors or
//! times out, the words are accepted.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Public endpoint used when no URL is configured explicitly.
pub const DEFAULT_PROFANITY_URL: &str = "https://vector.profanity.dev";

/// Result of screening one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Service answered: no profanity.
    Clean,
    /// Service answered: profanity detected.
    Profane,
    /// Service unreachable, non-2xx, or returned an unreadable body.
    ServiceError(String),
    /// Service did not answer within the timeout.
    TimedOut,
}

impl CheckOutcome {
    /// Whether the submission may be forwarded. Only a positive detection
    /// blocks it.
    pub fn allows(&self) -> bool {
        !matches!(self, Self::Profane)
    }
}

/// Screens text before it is added to a room.
#[async_trait]
pub trait ProfanityCheck: Send + Sync {
    /// Screen `text`. Never fails; failures are reported as outcomes.
    async fn check(&self, text: &str) -> CheckOutcome;
}

/// Accepts everything. Used when screening is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScreening;

#[async_trait]
impl ProfanityCheck for NoScreening {
    async fn check(&self, _text: &str) -> CheckOutcome {
        CheckOutcome::Clean
    }
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
    is_profanity: bool,
}

/// HTTP client for a profanity-detection service.
///
/// POSTs `{"message": text}` and reads `{"isProfanity": bool}`.
#[derive(Debug, Clone)]
pub struct HttpProfanityCheck {
    client: reqwest::Client,
    url: String,
}

impl HttpProfanityCheck {
    /// Build a checker with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }

    /// Service URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ProfanityCheck for HttpProfanityCheck {
    async fn check(&self, text: &str) -> CheckOutcome {
        let response =
            match self.client.post(&self.url).json(&CheckRequest { message: text }).send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => return CheckOutcome::TimedOut,
                Err(e) => return CheckOutcome::ServiceError(format!("request failed: {e}")),
            };

        let status = response.status();
        if !status.is_success() {
            return CheckOutcome::ServiceError(format!("service returned {status}"));
        }

        match response.json::<CheckResponse>().await {
            Ok(CheckResponse { is_profanity: true }) => CheckOutcome::Profane,
            Ok(CheckResponse { is_profanity: false }) => CheckOutcome::Clean,
            Err(e) if e.is_timeout() => CheckOutcome::TimedOut,
            Err(e) => CheckOutcome::ServiceError(format!("unreadable response: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_profane_blocks() {
        assert!(CheckOutcome::Clean.allows());
        assert!(CheckOutcome::ServiceError("500".to_string()).allows());
        assert!(CheckOutcome::TimedOut.allows());
        assert!(!CheckOutcome::Profane.allows());
    }

    #[test]
    fn response_field_is_camel_case() {
        let parsed: CheckResponse = serde_json::from_str(r#"{"isProfanity":true}"#).unwrap();
        assert!(parsed.is_profanity);
    }

    #[tokio::test]
    async fn no_screening_is_clean() {
        assert_eq!(NoScreening.check("anything").await, CheckOutcome::Clean);
    }
}
