// Hacker News adapter over the Algolia time-bounded search API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use trendpulse_common::{host_of, Item, Lang, Tier};

use super::{clip, SourceAdapter, USER_AGENT};

const HN_SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search_by_date";

#[derive(Debug, Deserialize)]
struct HnResponse {
    #[serde(default)]
    hits: Vec<HnHit>,
}

#[derive(Debug, Deserialize)]
struct HnHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    story_text: Option<String>,
    #[serde(default)]
    created_at_i: i64,
    #[serde(default, rename = "objectID")]
    object_id: String,
}

pub struct HnAdapter {
    client: reqwest::Client,
    queries: Vec<&'static str>,
}

impl HnAdapter {
    pub fn new(queries: Vec<&'static str>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to build HTTP client"),
            queries,
        }
    }

    fn hit_to_item(hit: HnHit, cutoff: DateTime<Utc>) -> Option<Item> {
        let published_at = Utc.timestamp_opt(hit.created_at_i, 0).single()?;
        if published_at < cutoff {
            return None;
        }

        let title = hit.title?.trim().to_string();
        if title.is_empty() {
            return None;
        }

        let link = hit
            .url
            .filter(|u| u.starts_with("http"))
            .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", hit.object_id));
        let source_domain = host_of(&link)?;

        Some(Item {
            title,
            link,
            published_at,
            summary: hit
                .story_text
                .map(|t| clip(t.trim(), 500))
                .unwrap_or_default(),
            source_domain,
            feed_title: "Hacker News".to_string(),
            tier: Tier::Community,
            lang: Lang::En,
        })
    }
}

#[async_trait]
impl SourceAdapter for HnAdapter {
    fn name(&self) -> &'static str {
        "hn"
    }

    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>> {
        let cutoff = Utc::now() - chrono::Duration::hours(window_hours);
        let since = cutoff.timestamp();

        let mut items = Vec::new();
        for query in &self.queries {
            let resp: HnResponse = self
                .client
                .get(HN_SEARCH_URL)
                .header("User-Agent", USER_AGENT)
                .query(&[
                    ("query", (*query).to_string()),
                    ("tags", "story".to_string()),
                    ("numericFilters", format!("created_at_i>{since}")),
                    ("hitsPerPage", "50".to_string()),
                ])
                .send()
                .await
                .context("HN search request failed")?
                .json()
                .await
                .context("Failed to parse HN response")?;

            debug!(query, hits = resp.hits.len(), "HN search");
            items.extend(
                resp.hits
                    .into_iter()
                    .filter_map(|hit| Self::hit_to_item(hit, cutoff)),
            );
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_without_url_links_to_the_discussion() {
        let hit = HnHit {
            title: Some("Show HN: tiny LLM runner".into()),
            url: None,
            story_text: None,
            created_at_i: Utc::now().timestamp(),
            object_id: "4242".into(),
        };
        let item = HnAdapter::hit_to_item(hit, Utc::now() - chrono::Duration::hours(1)).unwrap();
        assert_eq!(item.link, "https://news.ycombinator.com/item?id=4242");
        assert_eq!(item.source_domain, "news.ycombinator.com");
        assert_eq!(item.tier, Tier::Community);
    }

    #[test]
    fn stale_hits_are_dropped() {
        let hit = HnHit {
            title: Some("old".into()),
            url: Some("https://example.com".into()),
            story_text: None,
            created_at_i: (Utc::now() - chrono::Duration::hours(100)).timestamp(),
            object_id: "1".into(),
        };
        assert!(HnAdapter::hit_to_item(hit, Utc::now() - chrono::Duration::hours(48)).is_none());
    }
}
