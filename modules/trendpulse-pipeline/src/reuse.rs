//! Cross-snapshot reuse: a keyword that already ranked in a recent snapshot
//! keeps its stored summary and sources instead of paying for enrichment
//! again. This is what bounds external-API cost under 4x/day scheduling.

use tracing::{debug, warn};

use trendpulse_store::SourceRecord;

use crate::classify;
use crate::enricher::{EnrichedSource, Enrichment, SourceKind, TopSource};
use crate::og;
use crate::traits::SnapshotStore;

/// Look the keyword up in the recent snapshots; Some when a cached row with
/// at least one source exists.
pub async fn try_reuse(
    store: &dyn SnapshotStore,
    keyword_id: &str,
    recent_snapshots: &[String],
) -> Option<Enrichment> {
    if recent_snapshots.is_empty() {
        return None;
    }

    let cached = match store.cached_keyword(keyword_id, recent_snapshots).await {
        Ok(cached) => cached?,
        Err(e) => {
            warn!(keyword_id, error = %e, "reuse lookup failed, falling through to enrichment");
            return None;
        }
    };

    let (row, source_rows) = cached;
    if source_rows.is_empty() {
        return None;
    }

    let sources: Vec<EnrichedSource> = source_rows.into_iter().map(cached_source).collect();

    // The projection is recomputed rather than copied so legacy primary_type
    // values in old rows never leak into new snapshots.
    let primary_type = classify::primary_type(&sources);
    let top_source = sources.first().map(|s| TopSource {
        title: s.title.clone(),
        url: s.url.clone(),
        domain: s.domain.clone(),
        image_url: s
            .image_url
            .clone()
            .unwrap_or_else(|| og::DEFAULT_IMAGE.to_string()),
    });

    debug!(keyword_id, from_snapshot = row.snapshot_id, "reusing cached enrichment");

    Some(Enrichment {
        sources,
        summary_ko: row.summary_short,
        summary_en: row.summary_short_en,
        primary_type,
        top_source,
    })
}

fn cached_source(row: SourceRecord) -> EnrichedSource {
    let image_url = (row.image_url != og::DEFAULT_IMAGE && !row.image_url.is_empty())
        .then_some(row.image_url);
    EnrichedSource {
        kind: SourceKind::parse(&row.source_type),
        title: row.title,
        url: row.url,
        domain: row.domain,
        published_at: row.published_at_utc,
        snippet: row.snippet,
        image_url,
        title_ko: row.title_ko,
        title_en: row.title_en,
    }
}
