// HTML changelog adapter: per-source CSS-selector strategies for vendor
// release pages that publish no feed.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::{stream, StreamExt};
use scraper::{Html, Selector};
use tracing::warn;

use trendpulse_common::{Item, Lang, Tier};

use super::{SourceAdapter, USER_AGENT};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%Y.%m.%d"];
const SOURCE_FANOUT: usize = 3;

/// How to read one changelog page: which elements are entries, and where the
/// title, link, and date live inside each entry.
#[derive(Debug, Clone)]
pub struct ChangelogStrategy {
    pub name: &'static str,
    pub url: &'static str,
    pub entry_selector: &'static str,
    pub title_selector: &'static str,
    pub date_selector: &'static str,
    pub lang: Lang,
}

pub struct ChangelogAdapter {
    client: reqwest::Client,
    strategies: Vec<ChangelogStrategy>,
}

impl ChangelogAdapter {
    pub fn new(strategies: Vec<ChangelogStrategy>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            strategies,
        }
    }

    fn parse_date(raw: &str) -> Option<NaiveDate> {
        let trimmed = raw.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
    }

    /// Synchronous extraction so the non-`Send` DOM never crosses an await.
    fn parse_entries(
        strategy: &ChangelogStrategy,
        html: &str,
        cutoff: DateTime<Utc>,
    ) -> Vec<Item> {
        let (Ok(entry_sel), Ok(title_sel), Ok(date_sel)) = (
            Selector::parse(strategy.entry_selector),
            Selector::parse(strategy.title_selector),
            Selector::parse(strategy.date_selector),
        ) else {
            warn!(source = strategy.name, "invalid changelog selector");
            return Vec::new();
        };
        let link_sel = Selector::parse("a[href]").expect("valid anchor selector");

        let base = match url::Url::parse(strategy.url) {
            Ok(u) => u,
            Err(_) => return Vec::new(),
        };
        let source_domain = match trendpulse_common::host_of(strategy.url) {
            Some(d) => d,
            None => return Vec::new(),
        };

        let document = Html::parse_document(html);
        let mut items = Vec::new();
        for entry in document.select(&entry_sel) {
            let Some(title_el) = entry.select(&title_sel).next() else { continue };
            let title = title_el.text().collect::<String>().trim().to_string();
            if title.is_empty() {
                continue;
            }

            let Some(date_el) = entry.select(&date_sel).next() else { continue };
            let date_text = date_el
                .value()
                .attr("datetime")
                .map(str::to_string)
                .unwrap_or_else(|| date_el.text().collect::<String>());
            let Some(date) = Self::parse_date(&date_text) else { continue };

            // Entries carry day granularity; pin inside the window.
            let published_at = date
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid")
                .and_utc()
                .max(cutoff);
            if date < cutoff.date_naive() {
                continue;
            }

            let link = entry
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| base.join(href).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| strategy.url.to_string());

            items.push(Item {
                title,
                link,
                published_at,
                summary: String::new(),
                source_domain: source_domain.clone(),
                feed_title: strategy.name.to_string(),
                tier: Tier::P0Releases,
                lang: strategy.lang,
            });
        }
        items
    }
}

#[async_trait]
impl SourceAdapter for ChangelogAdapter {
    fn name(&self) -> &'static str {
        "changelog"
    }

    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>> {
        let cutoff = Utc::now() - chrono::Duration::hours(window_hours);

        let futures: Vec<_> = self
            .strategies
            .iter()
            .map(|strategy| async move {
                let html = self
                    .client
                    .get(strategy.url)
                    .header("User-Agent", USER_AGENT)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .context("changelog fetch failed")?
                    .text()
                    .await
                    .context("changelog body read failed")?;
                Ok::<_, anyhow::Error>((strategy, html))
            })
            .collect();
        let per_source: Vec<_> = stream::iter(futures)
        .buffer_unordered(SOURCE_FANOUT)
        .collect()
        .await;

        let mut items = Vec::new();
        for result in per_source {
            match result {
                Ok((strategy, html)) => {
                    items.extend(Self::parse_entries(strategy, &html, cutoff));
                }
                Err(e) => warn!(error = %e, "changelog source failed"),
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> ChangelogStrategy {
        ChangelogStrategy {
            name: "Acme Changelog",
            url: "https://acme.dev/changelog",
            entry_selector: "article.release",
            title_selector: "h2",
            date_selector: "time",
            lang: Lang::En,
        }
    }

    #[test]
    fn parses_dated_entries_inside_the_window() {
        let today = Utc::now().date_naive();
        let html = format!(
            r#"<html><body>
              <article class="release">
                <h2>Acme Runtime 2.4</h2>
                <time datetime="{today}">today</time>
                <a href="/changelog/2-4">notes</a>
              </article>
              <article class="release">
                <h2>Acme Runtime 1.0</h2>
                <time datetime="2020-01-01">long ago</time>
                <a href="/changelog/1-0">notes</a>
              </article>
            </body></html>"#,
            today = today.format("%Y-%m-%d"),
        );
        let cutoff = Utc::now() - chrono::Duration::hours(48);
        let items = ChangelogAdapter::parse_entries(&strategy(), &html, cutoff);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Acme Runtime 2.4");
        assert_eq!(items[0].link, "https://acme.dev/changelog/2-4");
        assert_eq!(items[0].tier, Tier::P0Releases);
        assert!(items[0].published_at >= cutoff);
    }

    #[test]
    fn tolerates_multiple_date_formats() {
        assert!(ChangelogAdapter::parse_date("2025-06-10").is_some());
        assert!(ChangelogAdapter::parse_date("Jun 10, 2025").is_some());
        assert!(ChangelogAdapter::parse_date("June 10, 2025").is_some());
        assert!(ChangelogAdapter::parse_date("2025.06.10").is_some());
        assert!(ChangelogAdapter::parse_date("whenever").is_none());
    }
}
