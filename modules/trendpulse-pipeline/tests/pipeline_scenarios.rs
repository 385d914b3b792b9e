//! End-to-end pipeline scenarios on the in-memory fakes: no network, no
//! database, pinned clocks.

use std::sync::Arc;

use chrono::{Duration, Utc};

use trendpulse_common::{Config, Item, Lang, Tier};
use trendpulse_pipeline::testing::{
    FakeChat, FakeItemSource, FakeSearcher, MemoryStore, NoopProber,
};
use trendpulse_pipeline::{Pipeline, PipelineDeps};

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        openai_api_key: String::new(),
        openai_model: "gpt-4o-mini".to_string(),
        openai_base_url: None,
        tavily_api_key: String::new(),
        github_token: None,
        cron_secret: None,
        detailed_keywords: 10,
        keyword_concurrency: 3,
        lightweight_concurrency: 5,
        schedule_utc: vec![(0, 17), (9, 17)],
        enable_en_summary: true,
        summary_context_limit: 5,
        web_host: "127.0.0.1".to_string(),
        web_port: 0,
    }
}

fn item(title: &str, link: &str, domain: &str, tier: Tier, hours_ago: i64) -> Item {
    Item {
        title: title.to_string(),
        link: link.to_string(),
        published_at: Utc::now() - Duration::hours(hours_ago),
        summary: String::new(),
        source_domain: domain.to_string(),
        feed_title: domain.to_string(),
        tier,
        lang: Lang::En,
    }
}

fn sample_items() -> Vec<Item> {
    vec![
        item(
            "Claude Code introduces Teams feature",
            "https://anthropic.com/news/teams",
            "anthropic.com",
            Tier::P0Curated,
            2,
        ),
        item(
            "Hands on with Claude Code Teams",
            "https://theverge.com/claude-teams",
            "theverge.com",
            Tier::P1Context,
            5,
        ),
        item(
            "GPT-4o gets a quiet update",
            "https://openai.com/gpt-4o-update",
            "openai.com",
            Tier::P0Curated,
            8,
        ),
    ]
}

const EXTRACTION_JSON: &str = r#"[
    {"keyword": "Claude Code Teams", "aliases": ["클로드 코드 팀즈"]},
    {"keyword": "GPT-4o", "aliases": []}
]"#;

struct Harness {
    pipeline: Pipeline,
    store: Arc<MemoryStore>,
    chat: Arc<FakeChat>,
    searcher: Arc<FakeSearcher>,
}

fn harness(items: Vec<Item>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let chat = Arc::new(FakeChat::new(EXTRACTION_JSON));
    let searcher = Arc::new(FakeSearcher::new(vec![
        ("Coverage piece", "https://news.example.com/coverage"),
        ("Deep dive", "https://blog.example.com/deep-dive"),
    ]));

    let deps = PipelineDeps {
        items: Arc::new(FakeItemSource::new(items)),
        chat: Arc::clone(&chat) as Arc<dyn trendpulse_pipeline::traits::Chat>,
        searcher: Arc::clone(&searcher) as Arc<dyn trendpulse_pipeline::traits::Searcher>,
        prober: Arc::new(NoopProber),
        store: Arc::clone(&store) as Arc<dyn trendpulse_pipeline::traits::SnapshotStore>,
    };

    Harness {
        pipeline: Pipeline::new(deps, test_config()),
        store,
        chat,
        searcher,
    }
}

#[tokio::test]
async fn empty_upstream_still_commits_a_snapshot() {
    let h = harness(Vec::new());
    let stats = h.pipeline.run_at(Utc::now()).await.unwrap();

    assert_eq!(h.store.snapshot_count(), 1);
    assert_eq!(stats.keyword_count, 0);
    assert_eq!(stats.reused_count, 0);
    assert!(h.store.keyword_rows(&stats.snapshot_id).is_empty());
}

#[tokio::test]
async fn run_persists_ranked_keywords_with_sources() {
    let h = harness(sample_items());
    let now = Utc::now();
    let stats = h.pipeline.run_at(now).await.unwrap();

    assert_eq!(stats.keyword_count, 2);
    assert_eq!(stats.new_count, 2);
    assert_eq!(stats.reused_count, 0);

    let mut rows = h.store.keyword_rows(&stats.snapshot_id);
    rows.sort_by_key(|r| r.rank);

    // Ranks are dense 1..n and every keyword is new with delta 0.
    let ranks: Vec<i32> = rows.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2]);
    assert!(rows.iter().all(|r| r.is_new && r.delta_rank == 0));

    // Every enriched keyword row owns at least one source row, and scores
    // are persisted with four-decimal rounding.
    for row in &rows {
        assert!(!h.store.source_rows(&stats.snapshot_id, &row.keyword_id).is_empty());
        assert!(!row.summary_short.is_empty());
        assert_eq!(row.score, (row.score * 10_000.0).round() / 10_000.0);
    }
}

#[tokio::test]
async fn second_run_reuses_cached_enrichment() {
    let h = harness(sample_items());
    let t1 = Utc::now();
    let first = h.pipeline.run_at(t1).await.unwrap();
    assert_eq!(first.reused_count, 0);

    let searches_after_first = h.searcher.call_count();
    let generations_after_first = h.chat.generation_count();
    assert!(searches_after_first > 0);

    let second = h.pipeline.run_at(t1 + Duration::hours(6)).await.unwrap();

    assert_eq!(second.keyword_count, 2);
    assert_eq!(second.reused_count, second.keyword_count);
    // The reuse path never touches the external search or the summarizer.
    assert_eq!(h.searcher.call_count(), searches_after_first);
    assert_eq!(h.chat.generation_count(), generations_after_first);

    // Sources were copied under the new snapshot.
    let rows = h.store.keyword_rows(&second.snapshot_id);
    for row in &rows {
        assert!(!h.store.source_rows(&second.snapshot_id, &row.keyword_id).is_empty());
        assert!(!row.is_new);
    }
}

#[tokio::test]
async fn rerun_in_the_same_minute_is_idempotent() {
    let h = harness(sample_items());
    let pinned = Utc::now();

    let first = h.pipeline.run_at(pinned).await.unwrap();
    let rows_after_first = h.store.total_rows();

    let second = h.pipeline.run_at(pinned).await.unwrap();

    assert_eq!(first.snapshot_id, second.snapshot_id);
    assert_eq!(h.store.total_rows(), rows_after_first);
    assert_eq!(first.keyword_count, second.keyword_count);
    assert_eq!(first.new_count, second.new_count);
}

#[tokio::test]
async fn delta_rank_tracks_the_most_recent_prior_snapshot() {
    let h = harness(sample_items());
    let t1 = Utc::now();
    h.pipeline.run_at(t1).await.unwrap();
    let second = h.pipeline.run_at(t1 + Duration::hours(6)).await.unwrap();

    let rows = h.store.keyword_rows(&second.snapshot_id);
    assert!(!rows.is_empty());
    for row in rows {
        assert!(!row.is_new);
        // Stable support, stable ordering: nothing moved.
        assert_eq!(row.delta_rank, 0);
    }
}
