// Curated markdown-listing adapter: a GitHub folder of date-named digest
// files, each holding `[title](url)` links to hand-picked articles.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use trendpulse_common::{contains_hangul, host_of, Item, Lang, Tier};

use super::{SourceAdapter, USER_AGENT};

const GITHUB_API: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const MAX_FILES: usize = 3;

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("valid date regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([^\]]+)\]\((https?://[^)\s]+)\)").expect("valid markdown link regex")
    })
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    entry_type: String,
    #[serde(default)]
    download_url: Option<String>,
}

pub struct MarkdownListingAdapter {
    client: reqwest::Client,
    token: String,
    repo: &'static str,
    path: &'static str,
    skip_domains: Vec<&'static str>,
}

impl MarkdownListingAdapter {
    pub fn new(
        token: &str,
        repo: &'static str,
        path: &'static str,
        skip_domains: Vec<&'static str>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            token: token.to_string(),
            repo,
            path,
            skip_domains,
        }
    }

    fn file_date(name: &str) -> Option<NaiveDate> {
        let caps = date_re().captures(name)?;
        NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )
    }

    fn extract_links(
        &self,
        markdown: &str,
        published_at: DateTime<Utc>,
        file_name: &str,
    ) -> Vec<Item> {
        link_re()
            .captures_iter(markdown)
            .filter_map(|caps| {
                let title = caps[1].trim().to_string();
                let link = caps[2].to_string();
                let source_domain = host_of(&link)?;
                if title.is_empty()
                    || self.skip_domains.iter().any(|d| source_domain == *d)
                {
                    return None;
                }
                let lang = if contains_hangul(&title) { Lang::Ko } else { Lang::En };
                Some(Item {
                    title,
                    link,
                    published_at,
                    summary: String::new(),
                    source_domain,
                    feed_title: file_name.to_string(),
                    tier: Tier::P0Curated,
                    lang,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for MarkdownListingAdapter {
    fn name(&self) -> &'static str {
        "markdown-listing"
    }

    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>> {
        let cutoff = Utc::now() - chrono::Duration::hours(window_hours);
        let cutoff_date = cutoff.date_naive();

        let entries: Vec<ContentEntry> = self
            .client
            .get(format!(
                "{GITHUB_API}/repos/{}/contents/{}",
                self.repo, self.path
            ))
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .context("listing request failed")?
            .error_for_status()
            .context("listing request rejected")?
            .json()
            .await
            .context("Failed to parse folder listing")?;

        // Date-named markdown files inside the window, newest first, top 3.
        let mut dated: Vec<(NaiveDate, ContentEntry)> = entries
            .into_iter()
            .filter(|e| e.entry_type == "file" && e.name.ends_with(".md"))
            .filter_map(|e| {
                let date = Self::file_date(&e.name)?;
                (date >= cutoff_date).then_some((date, e))
            })
            .collect();
        dated.sort_by(|a, b| b.0.cmp(&a.0));
        dated.truncate(MAX_FILES);

        let mut items = Vec::new();
        for (date, entry) in dated {
            let Some(url) = entry.download_url else { continue };
            let published_at = date
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid")
                .and_utc()
                // File dates have day granularity; pin inside the window.
                .max(cutoff);

            match self
                .client
                .get(&url)
                .header("User-Agent", USER_AGENT)
                .send()
                .await
                .and_then(|r| r.error_for_status())
            {
                Ok(resp) => match resp.text().await {
                    Ok(markdown) => {
                        let batch = self.extract_links(&markdown, published_at, &entry.name);
                        debug!(file = entry.name, links = batch.len(), "digest parsed");
                        items.extend(batch);
                    }
                    Err(e) => warn!(file = entry.name, error = %e, "digest body read failed"),
                },
                Err(e) => warn!(file = entry.name, error = %e, "digest download failed"),
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_date_parses_dated_names() {
        assert_eq!(
            MarkdownListingAdapter::file_date("briefing-2025-06-10.md"),
            NaiveDate::from_ymd_opt(2025, 6, 10)
        );
        assert_eq!(MarkdownListingAdapter::file_date("README.md"), None);
    }

    #[test]
    fn extract_links_skips_social_domains_and_tags_lang() {
        let adapter = MarkdownListingAdapter::new(
            "t",
            "org/briefings",
            "daily",
            vec!["x.com", "facebook.com"],
        );
        let md = "- [Mistral Large 3 발표](https://mistral.ai/news/large-3)\n\
                  - [thread](https://x.com/someone/status/1)\n\
                  - [Gemini 2.5 review](https://blog.google/gemini-2-5)\n";
        let items = adapter.extract_links(md, Utc::now(), "2025-06-10.md");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].lang, Lang::Ko);
        assert_eq!(items[1].lang, Lang::En);
        assert!(items.iter().all(|i| i.tier == Tier::P0Curated));
    }
}
