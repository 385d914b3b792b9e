//! Adapter fan-out and URL-keyed merge.
//!
//! The adapter order is fixed and expresses tier priority: when two sources
//! emit the same URL, the first occurrence wins, so curated families must run
//! ahead of raw ones in the merge.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::{info, warn};

use trendpulse_common::{Config, Item};

use crate::adapters::changelog::ChangelogAdapter;
use crate::adapters::gdelt::GdeltAdapter;
use crate::adapters::github::{GithubReleasesAdapter, GithubSearchAdapter};
use crate::adapters::hn::HnAdapter;
use crate::adapters::markdown::MarkdownListingAdapter;
use crate::adapters::rss::RssAdapter;
use crate::adapters::youtube::YoutubeAdapter;
use crate::adapters::SourceAdapter;
use crate::sources;

/// The default adapter set in merge-priority order: curated RSS, curated
/// markdown, releases, changelogs, YouTube, HN, GDELT, GitHub search.
/// GitHub-backed adapters are skipped when no token is configured.
pub fn default_adapters(config: &Config) -> Vec<Box<dyn SourceAdapter>> {
    let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();

    adapters.push(Box::new(RssAdapter::new(sources::feeds())));

    if let Some(token) = &config.github_token {
        adapters.push(Box::new(MarkdownListingAdapter::new(
            token,
            sources::MARKDOWN_REPO,
            sources::MARKDOWN_PATH,
            sources::social_skip_domains(),
        )));
        adapters.push(Box::new(GithubReleasesAdapter::new(
            token,
            sources::tracked_repos(),
        )));
    } else {
        info!("GITHUB_TOKEN not set, skipping GitHub-backed adapters");
    }

    adapters.push(Box::new(ChangelogAdapter::new(
        sources::changelog_strategies(),
    )));
    adapters.push(Box::new(YoutubeAdapter::new(sources::youtube_channels())));
    adapters.push(Box::new(HnAdapter::new(sources::hn_queries())));
    adapters.push(Box::new(GdeltAdapter::new(sources::GDELT_QUERY)));

    if let Some(token) = &config.github_token {
        adapters.push(Box::new(GithubSearchAdapter::new(
            token,
            sources::GITHUB_SEARCH_QUERY,
        )));
    }

    adapters
}

/// Run every adapter concurrently (settled join: a failed adapter contributes
/// nothing), then merge in adapter order keeping the first occurrence of each
/// URL.
pub async fn collect_items(
    adapters: &[Box<dyn SourceAdapter>],
    window_hours: i64,
) -> Vec<Item> {
    let settled = join_all(adapters.iter().map(|adapter| async move {
        match adapter.collect(window_hours).await {
            Ok(items) => {
                info!(adapter = adapter.name(), count = items.len(), "adapter done");
                items
            }
            Err(e) => {
                warn!(adapter = adapter.name(), error = %e, "adapter failed");
                Vec::new()
            }
        }
    }))
    .await;

    merge(settled)
}

fn merge(batches: Vec<Vec<Item>>) -> Vec<Item> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    for batch in batches {
        for item in batch {
            if item.title.is_empty() || !item.link.starts_with("http") {
                continue;
            }
            if seen.insert(item.link.clone()) {
                merged.push(item);
            }
        }
    }
    info!(total = merged.len(), "items merged");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trendpulse_common::{Lang, Tier};

    fn item(link: &str, tier: Tier) -> Item {
        Item {
            title: format!("item {link}"),
            link: link.to_string(),
            published_at: Utc::now(),
            summary: String::new(),
            source_domain: "example.com".to_string(),
            feed_title: "Example".to_string(),
            tier,
            lang: Lang::En,
        }
    }

    #[test]
    fn first_occurrence_wins_across_batches() {
        let curated = vec![item("https://a.com/x", Tier::P0Curated)];
        let raw = vec![
            item("https://a.com/x", Tier::P2Raw),
            item("https://b.com/y", Tier::P2Raw),
        ];
        let merged = merge(vec![curated, raw]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].tier, Tier::P0Curated);
    }

    #[test]
    fn invalid_items_are_dropped() {
        let batch = vec![
            Item {
                title: String::new(),
                ..item("https://a.com", Tier::P2Raw)
            },
            Item {
                link: "not-a-url".to_string(),
                ..item("https://b.com", Tier::P2Raw)
            },
            item("https://c.com", Tier::P2Raw),
        ];
        let merged = merge(vec![batch]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].link, "https://c.com");
    }
}
