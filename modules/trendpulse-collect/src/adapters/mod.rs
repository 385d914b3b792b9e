//! Source adapters. Each family fetches one upstream feed type and emits
//! canonical `Item`s; adapters fail in isolation and the collector swallows
//! their errors.

pub mod changelog;
pub mod gdelt;
pub mod github;
pub mod hn;
pub mod markdown;
pub mod rss;
pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;

use trendpulse_common::Item;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch items published within the last `window_hours`. Every returned
    /// item carries a valid absolute URL and an in-window timestamp.
    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>>;
}

/// Truncate to at most `max` characters on a char boundary.
pub(crate) fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub(crate) const USER_AGENT: &str = "trendpulse-collect/0.1";
