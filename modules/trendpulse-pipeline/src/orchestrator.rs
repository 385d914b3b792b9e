//! Phase composition: collect, extract, match, rank, persist, enrich.
//!
//! The snapshot row commits before any keyword row so the foreign key holds
//! and readers only ever observe complete snapshots. Per-keyword failures are
//! tallied, never propagated; the run succeeds as long as the snapshot row
//! committed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use futures::{stream, StreamExt};
use tracing::{info, warn};

use trendpulse_common::{
    contains_hangul, next_update_at, Config, RunStats, TrendpulseError,
};
use trendpulse_store::{KeywordRecord, SnapshotRecord, SourceRecord, Store};

use crate::enricher::{Enricher, Enrichment};
use crate::extractor::Extractor;
use crate::matcher;
use crate::og::{self, ImageProber, OgImageProber};
use crate::reuse;
use crate::scorer::{self, RankedKeyword};
use crate::traits::{Chat, ItemSource, LiveItemSource, Searcher, SnapshotStore};

/// Collection lookback. Adapters drop anything older.
const COLLECT_WINDOW_HOURS: i64 = 48;
/// Snapshots scanned by the reuse cache (~48h at 4 runs/day).
const REUSE_SNAPSHOT_WINDOW: i64 = 4;

/// Seoul is UTC+9 with no DST, so a fixed offset is exact.
fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("valid KST offset")
}

/// Snapshot identity from wall-clock time in KST: `YYYYMMDD_HHMM_KST`.
pub fn snapshot_id_for(now: DateTime<Utc>) -> String {
    format!("{}_KST", now.with_timezone(&kst()).format("%Y%m%d_%H%M"))
}

pub struct PipelineDeps {
    pub items: Arc<dyn ItemSource>,
    pub chat: Arc<dyn Chat>,
    pub searcher: Arc<dyn Searcher>,
    pub prober: Arc<dyn ImageProber>,
    pub store: Arc<dyn SnapshotStore>,
}

pub struct Pipeline {
    deps: PipelineDeps,
    config: Config,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps, config: Config) -> Self {
        Self { deps, config }
    }

    /// Wire the production dependencies.
    pub fn live(config: Config, store: Store) -> Self {
        let chat = {
            let mut ai = ai_client::OpenAi::new(&config.openai_api_key, &config.openai_model);
            if let Some(base) = &config.openai_base_url {
                ai = ai.with_base_url(base);
            }
            ai
        };
        let deps = PipelineDeps {
            items: Arc::new(LiveItemSource::new(&config)),
            chat: Arc::new(chat),
            searcher: Arc::new(tavily_client::TavilyClient::new(&config.tavily_api_key)),
            prober: Arc::new(OgImageProber::new()),
            store: Arc::new(store),
        };
        Self::new(deps, config)
    }

    pub async fn run(&self) -> Result<RunStats> {
        self.run_at(Utc::now()).await
    }

    /// Run one snapshot with a pinned clock. Re-running with the same minute
    /// is a per-row no-op thanks to the store's uniqueness semantics.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunStats> {
        let started = Instant::now();
        let snapshot_id = snapshot_id_for(now);
        info!(snapshot_id, "pipeline run starting");

        // Phase 1: collect.
        let items = self.deps.items.collect(COLLECT_WINDOW_HOURS).await;
        info!(items = items.len(), "collection complete");

        // Phases 2-3: extract and match.
        let extracted = Extractor::new(self.deps.chat.as_ref()).extract(&items).await;
        let supported = matcher::match_keywords(extracted, &items);

        // Phase 4: score and shortlist.
        let shortlisted = scorer::shortlist(supported, now);

        // Phase 5: the snapshot row commits before any keyword row.
        let snapshot = SnapshotRecord {
            snapshot_id: snapshot_id.clone(),
            updated_at_utc: now,
            next_update_at_utc: next_update_at(now, &self.config.schedule_utc),
        };
        let inserted = self
            .deps
            .store
            .insert_snapshot(&snapshot)
            .await
            .map_err(|e| TrendpulseError::Database(format!("snapshot insert failed: {e}")))?;
        if !inserted {
            info!(snapshot_id, "snapshot row already present, continuing idempotently");
        }

        // Ranking against the most recent prior appearance of each keyword.
        let keyword_ids: Vec<String> = shortlisted
            .iter()
            .map(|(k, _)| k.keyword_id.clone())
            .collect();
        let previous_ranks = match self
            .deps
            .store
            .previous_ranks(&snapshot_id, &keyword_ids)
            .await
        {
            Ok(ranks) => ranks,
            Err(e) => {
                warn!(error = %e, "previous rank lookup failed, treating all keywords as new");
                HashMap::new()
            }
        };
        let ranked = scorer::finalize(shortlisted, &previous_ranks);
        let new_count = ranked.iter().filter(|r| r.is_new).count();

        let recent_snapshots = match self
            .deps
            .store
            .recent_snapshot_ids(&snapshot_id, REUSE_SNAPSHOT_WINDOW)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "recent snapshot lookup failed, reuse cache disabled");
                Vec::new()
            }
        };

        // Phase 6-8: enrichment (or reuse) and persistence.
        let detailed: Vec<RankedKeyword> = ranked
            .iter()
            .filter(|r| r.rank <= self.config.detailed_keywords)
            .cloned()
            .collect();
        let lightweight: Vec<RankedKeyword> = ranked
            .into_iter()
            .filter(|r| r.rank > self.config.detailed_keywords)
            .collect();

        let enricher = Enricher::new(
            Arc::clone(&self.deps.searcher),
            Arc::clone(&self.deps.chat),
            Arc::clone(&self.deps.prober),
            self.config.enable_en_summary,
            self.config.summary_context_limit,
        );

        // Settled join: each task logs its own failure and yields None, so
        // completion order never matters.
        let detailed_futures: Vec<_> = detailed
            .iter()
            .map(|rk| {
                let snapshot_id = snapshot_id.as_str();
                let enricher = &enricher;
                let recent = recent_snapshots.as_slice();
                async move {
                    match self.persist_detailed(snapshot_id, rk, enricher, recent).await {
                        Ok(reused) => Some(reused),
                        Err(e) => {
                            warn!(keyword = rk.keyword.keyword, error = %e, "keyword failed");
                            None
                        }
                    }
                }
            })
            .collect();
        let detailed_results: Vec<Option<bool>> = stream::iter(detailed_futures)
            .buffer_unordered(self.config.keyword_concurrency)
            .collect()
            .await;

        let mut keyword_count = 0usize;
        let mut reused_count = 0usize;
        for reused in detailed_results.into_iter().flatten() {
            keyword_count += 1;
            if reused {
                reused_count += 1;
            }
        }

        let lightweight_futures: Vec<_> = lightweight
            .iter()
            .map(|rk| {
                let snapshot_id = snapshot_id.as_str();
                async move {
                    match self
                        .deps
                        .store
                        .insert_keyword(&lightweight_record(snapshot_id, rk))
                        .await
                    {
                        Ok(()) => Some(()),
                        Err(e) => {
                            warn!(keyword = rk.keyword.keyword, error = %e, "lightweight insert failed");
                            None
                        }
                    }
                }
            })
            .collect();
        let lightweight_results: Vec<Option<()>> = stream::iter(lightweight_futures)
            .buffer_unordered(self.config.lightweight_concurrency)
            .collect()
            .await;
        keyword_count += lightweight_results.into_iter().flatten().count();

        let stats = RunStats {
            snapshot_id,
            keyword_count,
            reused_count,
            new_count,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!("pipeline run complete: {stats}");
        Ok(stats)
    }

    /// Enrich (or reuse) one top keyword and persist its row and sources.
    /// Returns whether the reuse cache served it.
    async fn persist_detailed(
        &self,
        snapshot_id: &str,
        ranked: &RankedKeyword,
        enricher: &Enricher,
        recent_snapshots: &[String],
    ) -> Result<bool> {
        let (enrichment, reused) = match reuse::try_reuse(
            self.deps.store.as_ref(),
            &ranked.keyword.keyword_id,
            recent_snapshots,
        )
        .await
        {
            Some(cached) => (cached, true),
            None => (enricher.enrich(&ranked.keyword.keyword).await, false),
        };

        self.deps
            .store
            .insert_keyword(&detailed_record(snapshot_id, ranked, &enrichment))
            .await?;

        // Source order within a keyword is irrelevant; the unique index makes
        // the inserts commutative.
        let records: Vec<SourceRecord> = enrichment
            .sources
            .iter()
            .map(|s| SourceRecord {
                snapshot_id: snapshot_id.to_string(),
                keyword_id: ranked.keyword.keyword_id.clone(),
                source_type: s.kind.as_str().to_string(),
                title: s.title.clone(),
                url: s.url.clone(),
                domain: s.domain.clone(),
                published_at_utc: s.published_at,
                snippet: s.snippet.clone(),
                image_url: s
                    .image_url
                    .clone()
                    .unwrap_or_else(|| og::DEFAULT_IMAGE.to_string()),
                title_ko: s.title_ko.clone(),
                title_en: s.title_en.clone(),
            })
            .collect();
        let inserts = futures::future::join_all(
            records.iter().map(|r| self.deps.store.insert_source(r)),
        )
        .await;
        for result in inserts {
            if let Err(e) = result {
                warn!(keyword = ranked.keyword.keyword, error = %e, "source insert failed");
            }
        }

        if !ranked.keyword.aliases.is_empty() {
            for (lang, aliases) in partition_aliases(&ranked.keyword.aliases) {
                self.deps
                    .store
                    .upsert_aliases(&ranked.keyword.keyword_id, &aliases, lang)
                    .await;
            }
        }

        Ok(reused)
    }
}

fn partition_aliases(aliases: &[String]) -> Vec<(&'static str, Vec<String>)> {
    let (ko, en): (Vec<String>, Vec<String>) = aliases
        .iter()
        .cloned()
        .partition(|a| contains_hangul(a));
    let mut out = Vec::new();
    if !ko.is_empty() {
        out.push(("ko", ko));
    }
    if !en.is_empty() {
        out.push(("en", en));
    }
    out
}

fn base_record(snapshot_id: &str, ranked: &RankedKeyword) -> KeywordRecord {
    KeywordRecord {
        snapshot_id: snapshot_id.to_string(),
        keyword_id: ranked.keyword.keyword_id.clone(),
        keyword: ranked.keyword.keyword.clone(),
        rank: ranked.rank as i32,
        delta_rank: ranked.delta_rank,
        is_new: ranked.is_new,
        score: scorer::round4(ranked.scores.total),
        score_recency: scorer::round4(ranked.scores.recency),
        score_frequency: scorer::round4(ranked.scores.frequency),
        score_authority: scorer::round4(ranked.scores.authority),
        score_internal: scorer::round4(ranked.scores.internal),
        summary_short: String::new(),
        summary_short_en: String::new(),
        primary_type: "news".to_string(),
        top_source_title: None,
        top_source_url: None,
        top_source_domain: None,
        top_source_image_url: None,
    }
}

fn detailed_record(
    snapshot_id: &str,
    ranked: &RankedKeyword,
    enrichment: &Enrichment,
) -> KeywordRecord {
    let mut record = base_record(snapshot_id, ranked);
    record.summary_short = enrichment.summary_ko.clone();
    record.summary_short_en = enrichment.summary_en.clone();
    record.primary_type = enrichment.primary_type.as_str().to_string();
    if let Some(top) = &enrichment.top_source {
        record.top_source_title = Some(top.title.clone());
        record.top_source_url = Some(top.url.clone());
        record.top_source_domain = Some(top.domain.clone());
        record.top_source_image_url = Some(top.image_url.clone());
    }
    record
}

/// Positions D+1..R carry ranking data only, so search chips can surface
/// them without enrichment cost.
fn lightweight_record(snapshot_id: &str, ranked: &RankedKeyword) -> KeywordRecord {
    base_record(snapshot_id, ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_id_is_kst_with_suffix() {
        let now = DateTime::parse_from_rfc3339("2025-06-10T17:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        // 17:30 UTC is 02:30 next day in Seoul.
        assert_eq!(snapshot_id_for(now), "20250611_0230_KST");
    }

    #[test]
    fn alias_partition_splits_by_script() {
        let aliases = vec!["클로드".to_string(), "Claude CLI".to_string()];
        let parts = partition_aliases(&aliases);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, "ko");
        assert_eq!(parts[1].0, "en");
    }
}
