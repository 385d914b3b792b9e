//! In-memory fakes for the pipeline's trait seams. Deterministic tests with
//! no network and no database; the store fake mimics the uniqueness
//! semantics of the SQL layer so idempotence is testable.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use tavily_client::{SearchOptions, SearchResponse, SearchResult};
use trendpulse_common::Item;
use trendpulse_store::{KeywordRecord, SnapshotRecord, SourceRecord};

use crate::og::ImageProber;
use crate::traits::{Chat, ItemSource, Searcher, SnapshotStore};

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

pub struct FakeItemSource {
    items: Vec<Item>,
}

impl FakeItemSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl ItemSource for FakeItemSource {
    async fn collect(&self, _window_hours: i64) -> Vec<Item> {
        self.items.clone()
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Extraction calls run at temperature 0 and get the canned JSON array;
/// every other call (summaries, translations) counts as generation.
pub struct FakeChat {
    extraction_json: String,
    pub extraction_calls: AtomicUsize,
    pub generation_calls: AtomicUsize,
}

impl FakeChat {
    pub fn new(extraction_json: impl Into<String>) -> Self {
        Self {
            extraction_json: extraction_json.into(),
            extraction_calls: AtomicUsize::new(0),
            generation_calls: AtomicUsize::new(0),
        }
    }

    pub fn generation_count(&self) -> usize {
        self.generation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Chat for FakeChat {
    async fn chat(&self, _system: &str, user: &str, temperature: f32) -> Result<String> {
        if temperature == 0.0 {
            self.extraction_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(self.extraction_json.clone());
        }
        self.generation_calls.fetch_add(1, Ordering::SeqCst);
        // One line per input line keeps the translation path satisfied.
        Ok(user
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|_| "요약 문장입니다.")
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

// ---------------------------------------------------------------------------
// Searcher
// ---------------------------------------------------------------------------

pub struct FakeSearcher {
    results: Vec<SearchResult>,
    pub calls: AtomicUsize,
}

impl FakeSearcher {
    pub fn new(results: Vec<(&str, &str)>) -> Self {
        Self {
            results: results
                .into_iter()
                .map(|(title, url)| SearchResult {
                    title: title.to_string(),
                    url: url.to_string(),
                    content: format!("snippet about {title}"),
                    published_date: None,
                })
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Searcher for FakeSearcher {
    async fn search(&self, _query: &str, opts: &SearchOptions) -> Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if opts.include_images {
            return Ok(SearchResponse::default());
        }
        Ok(SearchResponse {
            results: self.results.clone(),
            images: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Image prober
// ---------------------------------------------------------------------------

pub struct NoopProber;

#[async_trait]
impl ImageProber for NoopProber {
    async fn probe(&self, _url: &str) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    snapshots: BTreeMap<String, SnapshotRecord>,
    keywords: BTreeMap<(String, String), KeywordRecord>,
    sources: BTreeMap<(String, String, String, String), SourceRecord>,
    aliases: BTreeMap<(String, String), String>,
}

/// Mirrors the SQL layer's conflict behavior: snapshot and keyword inserts
/// are first-write-wins, source inserts upsert on the composite key.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner.lock().expect("store lock").snapshots.len()
    }

    pub fn keyword_rows(&self, snapshot_id: &str) -> Vec<KeywordRecord> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .keywords
            .values()
            .filter(|k| k.snapshot_id == snapshot_id)
            .cloned()
            .collect()
    }

    pub fn source_rows(&self, snapshot_id: &str, keyword_id: &str) -> Vec<SourceRecord> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .sources
            .values()
            .filter(|s| s.snapshot_id == snapshot_id && s.keyword_id == keyword_id)
            .cloned()
            .collect()
    }

    pub fn total_rows(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock().expect("store lock");
        (
            inner.snapshots.len(),
            inner.keywords.len(),
            inner.sources.len(),
        )
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn insert_snapshot(&self, snapshot: &SnapshotRecord) -> Result<bool> {
        let mut inner = self.inner.lock().expect("store lock");
        if inner.snapshots.contains_key(&snapshot.snapshot_id) {
            return Ok(false);
        }
        inner
            .snapshots
            .insert(snapshot.snapshot_id.clone(), snapshot.clone());
        Ok(true)
    }

    async fn insert_keyword(&self, keyword: &KeywordRecord) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock");
        inner
            .keywords
            .entry((keyword.snapshot_id.clone(), keyword.keyword_id.clone()))
            .or_insert_with(|| keyword.clone());
        Ok(())
    }

    async fn insert_source(&self, source: &SourceRecord) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock");
        inner.sources.insert(
            (
                source.snapshot_id.clone(),
                source.keyword_id.clone(),
                source.source_type.clone(),
                source.url.clone(),
            ),
            source.clone(),
        );
        Ok(())
    }

    async fn upsert_aliases(&self, keyword_id: &str, aliases: &[String], lang: &str) {
        let mut inner = self.inner.lock().expect("store lock");
        for alias in aliases {
            inner
                .aliases
                .entry((keyword_id.to_string(), alias.clone()))
                .or_insert_with(|| lang.to_string());
        }
    }

    async fn previous_ranks(
        &self,
        before_snapshot: &str,
        keyword_ids: &[String],
    ) -> Result<HashMap<String, i32>> {
        let inner = self.inner.lock().expect("store lock");
        let mut best: HashMap<String, (String, i32)> = HashMap::new();
        for ((snapshot_id, keyword_id), row) in &inner.keywords {
            if snapshot_id.as_str() >= before_snapshot
                || !keyword_ids.contains(keyword_id)
            {
                continue;
            }
            match best.get(keyword_id) {
                Some((seen, _)) if seen.as_str() >= snapshot_id.as_str() => {}
                _ => {
                    best.insert(keyword_id.clone(), (snapshot_id.clone(), row.rank));
                }
            }
        }
        Ok(best.into_iter().map(|(k, (_, rank))| (k, rank)).collect())
    }

    async fn recent_snapshot_ids(&self, before_snapshot: &str, limit: i64) -> Result<Vec<String>> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner
            .snapshots
            .keys()
            .filter(|id| id.as_str() < before_snapshot)
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn cached_keyword(
        &self,
        keyword_id: &str,
        within_snapshots: &[String],
    ) -> Result<Option<(KeywordRecord, Vec<SourceRecord>)>> {
        let inner = self.inner.lock().expect("store lock");
        let mut candidates: Vec<&String> = within_snapshots.iter().collect();
        candidates.sort();
        for snapshot_id in candidates.into_iter().rev() {
            let key = (snapshot_id.clone(), keyword_id.to_string());
            let Some(row) = inner.keywords.get(&key) else { continue };
            let sources: Vec<SourceRecord> = inner
                .sources
                .values()
                .filter(|s| s.snapshot_id == *snapshot_id && s.keyword_id == keyword_id)
                .cloned()
                .collect();
            if !sources.is_empty() {
                return Ok(Some((row.clone(), sources)));
            }
        }
        Ok(None)
    }
}
