//! Topic suggestions for room hosts.
//!
//! A topic is a random encyclopedia article: its title becomes the prompt
//! participants respond to and its intro paragraph is shown as context.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// MediaWiki API endpoint used when no URL is configured explicitly.
pub const DEFAULT_TOPIC_URL: &str = "https://en.wikipedia.org/w/api.php";

/// A suggested topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    /// Article title
    pub title: String,
    /// Plain-text intro of the article. Empty if the article has none.
    pub summary: String,
}

impl Topic {
    /// Question shown to participants.
    pub fn prompt(&self) -> String {
        format!("What words come to mind when you hear about \"{}\"?", self.title)
    }
}

/// Why a topic could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    /// Service unreachable, non-2xx, or returned an unexpected body
    #[error("topic service error: {0}")]
    Service(String),

    /// Service did not answer within the timeout
    #[error("topic service timed out")]
    Timeout,
}

impl From<reqwest::Error> for TopicError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout } else { Self::Service(err.to_string()) }
    }
}

/// Source of topic suggestions.
#[async_trait]
pub trait TopicSource: Send + Sync {
    /// Fetch one topic.
    async fn suggest(&self) -> Result<Topic, TopicError>;
}

#[derive(Deserialize)]
struct RandomResponse {
    query: RandomQuery,
}

#[derive(Deserialize)]
struct RandomQuery {
    random: Vec<RandomPage>,
}

#[derive(Deserialize)]
struct RandomPage {
    title: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    query: ExtractQuery,
}

#[derive(Deserialize)]
struct ExtractQuery {
    pages: BTreeMap<String, ExtractPage>,
}

#[derive(Deserialize)]
struct ExtractPage {
    #[serde(default)]
    extract: Option<String>,
}

/// MediaWiki-backed topic source.
///
/// Picks a random main-namespace article, then fetches its plain-text intro.
#[derive(Debug, Clone)]
pub struct WikipediaTopics {
    client: reqwest::Client,
    url: String,
}

impl WikipediaTopics {
    /// Build a source against a MediaWiki `api.php` endpoint.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wordpulse/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url: url.into() })
    }

    async fn random_title(&self) -> Result<String, TopicError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("action", "query"),
                ("list", "random"),
                ("rnnamespace", "0"),
                ("rnlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await?;
        let body: RandomResponse = checked(response)?.json().await?;

        body.query
            .random
            .into_iter()
            .next()
            .map(|page| page.title)
            .ok_or_else(|| TopicError::Service("no random article returned".to_string()))
    }

    async fn summary(&self, title: &str) -> Result<String, TopicError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .send()
            .await?;
        let body: ExtractResponse = checked(response)?.json().await?;

        Ok(body.query.pages.into_values().next().and_then(|page| page.extract).unwrap_or_default())
    }
}

#[async_trait]
impl TopicSource for WikipediaTopics {
    async fn suggest(&self) -> Result<Topic, TopicError> {
        let title = self.random_title().await?;
        let summary = self.summary(&title).await?;
        Ok(Topic { title, summary })
    }
}

fn checked(response: reqwest::Response) -> Result<reqwest::Response, TopicError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TopicError::Service(format!("service returned {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_quotes_title() {
        let topic = Topic { title: "Platypus".to_string(), summary: String::new() };
        assert_eq!(topic.prompt(), "What words come to mind when you hear about \"Platypus\"?");
    }

    #[test]
    fn extract_response_parses_page_map() {
        let body = r#"{"batchcomplete":"","query":{"pages":{"4321":{"pageid":4321,"ns":0,"title":"Platypus","extract":"A mammal."}}}}"#;
        let parsed: ExtractResponse = serde_json::from_str(body).unwrap();

        let extract = parsed.query.pages.into_values().next().and_then(|p| p.extract);
        assert_eq!(extract.as_deref(), Some("A mammal."));
    }

    #[test]
    fn missing_extract_is_tolerated() {
        let body = r#"{"query":{"pages":{"-1":{"ns":0,"title":"Gone","missing":""}}}}"#;
        let parsed: ExtractResponse = serde_json::from_str(body).unwrap();

        assert!(parsed.query.pages.into_values().next().and_then(|p| p.extract).is_none());
    }
}
