// YouTube channel adapter over the per-channel Atom feeds.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use tracing::warn;

use trendpulse_common::{contains_hangul, Item, Lang, Tier};

use super::{clip, SourceAdapter, USER_AGENT};

const CHANNEL_FANOUT: usize = 4;

#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub channel_id: &'static str,
    pub name: &'static str,
}

pub struct YoutubeAdapter {
    client: reqwest::Client,
    channels: Vec<ChannelSpec>,
}

impl YoutubeAdapter {
    pub fn new(channels: Vec<ChannelSpec>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            channels,
        }
    }

    async fn fetch_channel(
        &self,
        spec: &ChannelSpec,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Item>> {
        let url = format!(
            "https://www.youtube.com/feeds/videos.xml?channel_id={}",
            spec.channel_id
        );
        let bytes = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("channel feed fetch failed")?
            .bytes()
            .await
            .context("failed to read channel feed body")?;

        let feed = feed_rs::parser::parse(&bytes[..]).context("failed to parse channel feed")?;

        // Channel name carrying Hangul marks a Korean-language channel.
        let lang = if contains_hangul(spec.name) { Lang::Ko } else { Lang::En };

        Ok(feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let link = entry.links.first().map(|l| l.href.clone())?;
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
                Some(Item {
                    title,
                    link,
                    published_at: published,
                    summary: entry
                        .summary
                        .map(|s| clip(s.content.trim(), 500))
                        .unwrap_or_default(),
                    source_domain: "youtube.com".to_string(),
                    feed_title: spec.name.to_string(),
                    tier: Tier::Community,
                    lang,
                })
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>> {
        let cutoff = chrono::Utc::now() - chrono::Duration::hours(window_hours);

        let futures: Vec<_> = self
            .channels
            .iter()
            .map(|spec| async move { (spec, self.fetch_channel(spec, cutoff).await) })
            .collect();
        let per_channel: Vec<_> = stream::iter(futures)
        .buffer_unordered(CHANNEL_FANOUT)
        .collect()
        .await;

        let mut items = Vec::new();
        for (spec, result) in per_channel {
            match result {
                Ok(mut batch) => items.append(&mut batch),
                Err(e) => warn!(channel = spec.name, error = %e, "channel fetch failed"),
            }
        }
        Ok(items)
    }
}
