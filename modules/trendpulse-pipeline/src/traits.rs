// Trait abstractions for pipeline dependencies.
//
// ItemSource replaces the live collector, Chat the LLM endpoint, Searcher the
// Tavily client, and SnapshotStore the Postgres store. These enable
// deterministic testing with the fakes in `testing`: no network, no database.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use tavily_client::{SearchOptions, SearchResponse, TavilyClient};
use trendpulse_common::{Item, TrendpulseError};
use trendpulse_store::{KeywordRecord, SnapshotRecord, SourceRecord, Store};

// ---------------------------------------------------------------------------
// ItemSource — replaces the adapter fan-out
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Deduplicated, tier-priority-merged items for the window.
    async fn collect(&self, window_hours: i64) -> Vec<Item>;
}

/// Production source: the configured adapter set.
pub struct LiveItemSource {
    adapters: Vec<Box<dyn trendpulse_collect::SourceAdapter>>,
}

impl LiveItemSource {
    pub fn new(config: &trendpulse_common::Config) -> Self {
        Self {
            adapters: trendpulse_collect::default_adapters(config),
        }
    }
}

#[async_trait]
impl ItemSource for LiveItemSource {
    async fn collect(&self, window_hours: i64) -> Vec<Item> {
        trendpulse_collect::collect_items(&self.adapters, window_hours).await
    }
}

// ---------------------------------------------------------------------------
// Chat — replaces the OpenAI endpoint
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Chat: Send + Sync {
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> Result<String>;
}

#[async_trait]
impl Chat for ai_client::OpenAi {
    async fn chat(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        self.chat(system, user, temperature).await
    }
}

// ---------------------------------------------------------------------------
// Searcher — replaces the Tavily client
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str, opts: &SearchOptions) -> Result<SearchResponse>;
}

#[async_trait]
impl Searcher for TavilyClient {
    async fn search(&self, query: &str, opts: &SearchOptions) -> Result<SearchResponse> {
        self.search(query, opts)
            .await
            .map_err(|e| TrendpulseError::Search(e.to_string()).into())
    }
}

// ---------------------------------------------------------------------------
// SnapshotStore — replaces the Postgres store
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert the snapshot row; false when it already existed.
    async fn insert_snapshot(&self, snapshot: &SnapshotRecord) -> Result<bool>;

    /// Insert a keyword row; an existing `(snapshot_id, keyword_id)` wins.
    async fn insert_keyword(&self, keyword: &KeywordRecord) -> Result<()>;

    /// Upsert a source row on `(snapshot_id, keyword_id, type, url)`.
    async fn insert_source(&self, source: &SourceRecord) -> Result<()>;

    /// Record aliases for search lookup. Best-effort.
    async fn upsert_aliases(&self, keyword_id: &str, aliases: &[String], lang: &str);

    /// Most recent prior rank per keyword id before the given snapshot.
    async fn previous_ranks(
        &self,
        before_snapshot: &str,
        keyword_ids: &[String],
    ) -> Result<HashMap<String, i32>>;

    /// The most recent snapshot ids strictly before the given one.
    async fn recent_snapshot_ids(&self, before_snapshot: &str, limit: i64) -> Result<Vec<String>>;

    /// A keyword's most recent row with sources among the given snapshots.
    async fn cached_keyword(
        &self,
        keyword_id: &str,
        within_snapshots: &[String],
    ) -> Result<Option<(KeywordRecord, Vec<SourceRecord>)>>;
}

#[async_trait]
impl SnapshotStore for Store {
    async fn insert_snapshot(&self, snapshot: &SnapshotRecord) -> Result<bool> {
        self.insert_snapshot(snapshot).await
    }

    async fn insert_keyword(&self, keyword: &KeywordRecord) -> Result<()> {
        self.insert_keyword(keyword).await
    }

    async fn insert_source(&self, source: &SourceRecord) -> Result<()> {
        self.insert_source(source).await
    }

    async fn upsert_aliases(&self, keyword_id: &str, aliases: &[String], lang: &str) {
        self.upsert_aliases(keyword_id, aliases, lang).await
    }

    async fn previous_ranks(
        &self,
        before_snapshot: &str,
        keyword_ids: &[String],
    ) -> Result<HashMap<String, i32>> {
        self.previous_ranks(before_snapshot, keyword_ids).await
    }

    async fn recent_snapshot_ids(&self, before_snapshot: &str, limit: i64) -> Result<Vec<String>> {
        self.recent_snapshot_ids(before_snapshot, limit).await
    }

    async fn cached_keyword(
        &self,
        keyword_id: &str,
        within_snapshots: &[String],
    ) -> Result<Option<(KeywordRecord, Vec<SourceRecord>)>> {
        self.cached_keyword(keyword_id, within_snapshots).await
    }
}
