//! Tavily web search API client.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    General,
    News,
}

impl Topic {
    fn as_str(&self) -> &'static str {
        match self {
            Topic::General => "general",
            Topic::News => "news",
        }
    }
}

/// Per-query knobs. `time_range` takes the Tavily values
/// ("day", "week", "month", "year").
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub topic: Topic,
    pub time_range: Option<&'static str>,
    pub max_results: u32,
    pub include_images: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            topic: Topic::General,
            time_range: None,
            max_results: 5,
            include_images: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_range: Option<&'a str>,
    max_results: u32,
    include_images: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub images: Vec<String>,
}

pub struct TavilyClient {
    api_key: String,
    client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    pub async fn search(&self, query: &str, opts: &SearchOptions) -> Result<SearchResponse> {
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            topic: opts.topic.as_str(),
            time_range: opts.time_range,
            max_results: opts.max_results,
            include_images: opts.include_images,
        };

        let resp: SearchResponse = self
            .client
            .post(TAVILY_API_URL)
            .json(&request)
            .send()
            .await
            .context("Tavily API request failed")?
            .json()
            .await
            .context("Failed to parse Tavily response")?;

        info!(query, count = resp.results.len(), "Tavily search complete");
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_tolerates_missing_fields() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"results":[{"url":"https://a.com"}]}"#).unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].url, "https://a.com");
        assert!(resp.results[0].title.is_empty());
        assert!(resp.images.is_empty());
    }

    #[test]
    fn request_omits_absent_time_range() {
        let req = SearchRequest {
            api_key: "k",
            query: "q",
            topic: "news",
            time_range: None,
            max_results: 5,
            include_images: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("time_range"));
    }
}
