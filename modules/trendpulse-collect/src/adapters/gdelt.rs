// GDELT DOC 2.0 API adapter (artlist mode, compact timestamps).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use trendpulse_common::{host_of, Item, Lang, Tier};

use super::{SourceAdapter, USER_AGENT};

const GDELT_DOC_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";
const MAX_RECORDS: u32 = 75;

#[derive(Debug, Default, Deserialize)]
struct GdeltResponse {
    #[serde(default)]
    articles: Vec<GdeltArticle>,
}

#[derive(Debug, Deserialize)]
struct GdeltArticle {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    seendate: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    domain: String,
}

pub struct GdeltAdapter {
    client: reqwest::Client,
    query: &'static str,
}

impl GdeltAdapter {
    pub fn new(query: &'static str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("Failed to build HTTP client"),
            query,
        }
    }

    /// GDELT emits `YYYYMMDDhhmmss`, sometimes with a `T` separator and a
    /// trailing `Z`. All of it is UTC.
    fn parse_seendate(raw: &str) -> Option<DateTime<Utc>> {
        let compact: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        NaiveDateTime::parse_from_str(&compact, "%Y%m%d%H%M%S")
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn map_language(label: &str) -> Option<Lang> {
        match label.to_ascii_lowercase().as_str() {
            "korean" => Some(Lang::Ko),
            "english" => Some(Lang::En),
            _ => None,
        }
    }

    fn article_to_item(article: GdeltArticle, cutoff: DateTime<Utc>) -> Option<Item> {
        let published_at = Self::parse_seendate(&article.seendate)?;
        if published_at < cutoff {
            return None;
        }
        let lang = Self::map_language(&article.language)?;

        let title = article.title.trim().to_string();
        if title.is_empty() || !article.url.starts_with("http") {
            return None;
        }

        let source_domain = if article.domain.is_empty() {
            host_of(&article.url)?
        } else {
            article.domain.to_lowercase()
        };

        Some(Item {
            title,
            link: article.url,
            published_at,
            summary: String::new(),
            source_domain,
            feed_title: "GDELT".to_string(),
            tier: Tier::P2Raw,
            lang,
        })
    }
}

#[async_trait]
impl SourceAdapter for GdeltAdapter {
    fn name(&self) -> &'static str {
        "gdelt"
    }

    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>> {
        let end = Utc::now();
        let start = end - chrono::Duration::hours(window_hours);

        let resp: GdeltResponse = self
            .client
            .get(GDELT_DOC_URL)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("query", self.query.to_string()),
                ("mode", "artlist".to_string()),
                ("format", "json".to_string()),
                ("startdatetime", start.format("%Y%m%d%H%M%S").to_string()),
                ("enddatetime", end.format("%Y%m%d%H%M%S").to_string()),
                ("maxrecords", MAX_RECORDS.to_string()),
                ("sort", "datedesc".to_string()),
            ])
            .send()
            .await
            .context("GDELT request failed")?
            .json()
            .await
            .context("Failed to parse GDELT response")?;

        debug!(articles = resp.articles.len(), "GDELT artlist");

        let cutoff = start;
        Ok(resp
            .articles
            .into_iter()
            .filter_map(|a| Self::article_to_item(a, cutoff))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_and_decorated_timestamps() {
        let a = GdeltAdapter::parse_seendate("20250610113000").unwrap();
        let b = GdeltAdapter::parse_seendate("20250610T113000Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.format("%Y-%m-%d %H:%M").to_string(), "2025-06-10 11:30");
    }

    #[test]
    fn unknown_languages_are_dropped() {
        assert_eq!(GdeltAdapter::map_language("English"), Some(Lang::En));
        assert_eq!(GdeltAdapter::map_language("Korean"), Some(Lang::Ko));
        assert_eq!(GdeltAdapter::map_language("French"), None);
    }
}
