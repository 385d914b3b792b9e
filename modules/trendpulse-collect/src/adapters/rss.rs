// RSS/Atom feed adapter over the configured feed list.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use tracing::{debug, warn};

use trendpulse_common::{host_of, Item, Lang, Tier};

use super::{clip, SourceAdapter, USER_AGENT};

const FEED_FANOUT: usize = 6;
const SUMMARY_MAX_CHARS: usize = 500;

/// One configured feed and the tier/lang its items inherit.
#[derive(Debug, Clone)]
pub struct FeedSpec {
    pub url: &'static str,
    pub title: &'static str,
    pub tier: Tier,
    pub lang: Lang,
}

pub struct RssAdapter {
    client: reqwest::Client,
    feeds: Vec<FeedSpec>,
}

impl RssAdapter {
    pub fn new(feeds: Vec<FeedSpec>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            feeds,
        }
    }

    async fn fetch_feed(&self, spec: &FeedSpec, cutoff: chrono::DateTime<chrono::Utc>) -> Result<Vec<Item>> {
        let resp = self
            .client
            .get(spec.url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("feed fetch failed")?;

        let bytes = resp.bytes().await.context("failed to read feed body")?;
        let feed = feed_rs::parser::parse(&bytes[..]).context("failed to parse RSS/Atom feed")?;

        let items = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let link = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

                let published = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&chrono::Utc))?;
                if published < cutoff {
                    return None;
                }

                let title = entry.title.map(|t| t.content.trim().to_string())?;
                if title.is_empty() {
                    return None;
                }

                let summary = entry
                    .summary
                    .map(|s| clip(s.content.trim(), SUMMARY_MAX_CHARS))
                    .unwrap_or_default();

                let source_domain = host_of(&link).or_else(|| host_of(spec.url))?;

                Some(Item {
                    title,
                    link,
                    published_at: published,
                    summary,
                    source_domain,
                    feed_title: spec.title.to_string(),
                    tier: spec.tier,
                    lang: spec.lang,
                })
            })
            .collect();

        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    fn name(&self) -> &'static str {
        "rss"
    }

    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>> {
        let cutoff = chrono::Utc::now() - chrono::Duration::hours(window_hours);

        let futures: Vec<_> = self
            .feeds
            .iter()
            .map(|spec| async move { (spec, self.fetch_feed(spec, cutoff).await) })
            .collect();
        let per_feed: Vec<_> = stream::iter(futures)
        .buffer_unordered(FEED_FANOUT)
        .collect()
        .await;

        let mut items = Vec::new();
        for (spec, result) in per_feed {
            match result {
                Ok(mut batch) => {
                    debug!(feed = spec.title, count = batch.len(), "feed parsed");
                    items.append(&mut batch);
                }
                Err(e) => warn!(feed = spec.title, error = %e, "feed fetch failed"),
            }
        }

        Ok(items)
    }
}
