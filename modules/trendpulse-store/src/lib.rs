//! Postgres persistence for snapshots, ranked keywords, and their sources.
//!
//! Writes are idempotent: snapshot and keyword inserts are absorbed by their
//! primary keys, source inserts upsert on the `(snapshot_id, keyword_id,
//! type, url)` unique index. Re-running a pipeline with the same snapshot id
//! is a per-row no-op.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::warn;

/// A row of the `keywords` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRecord {
    pub snapshot_id: String,
    pub keyword_id: String,
    pub keyword: String,
    pub rank: i32,
    pub delta_rank: i32,
    pub is_new: bool,
    pub score: f64,
    pub score_recency: f64,
    pub score_frequency: f64,
    pub score_authority: f64,
    pub score_internal: f64,
    pub summary_short: String,
    pub summary_short_en: String,
    pub primary_type: String,
    pub top_source_title: Option<String>,
    pub top_source_url: Option<String>,
    pub top_source_domain: Option<String>,
    pub top_source_image_url: Option<String>,
}

/// A row of the `sources` table (sans surrogate id).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRecord {
    pub snapshot_id: String,
    pub keyword_id: String,
    #[sqlx(rename = "type")]
    pub source_type: String,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub published_at_utc: Option<DateTime<Utc>>,
    pub snippet: Option<String>,
    pub image_url: String,
    pub title_ko: Option<String>,
    pub title_en: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub snapshot_id: String,
    pub updated_at_utc: DateTime<Utc>,
    pub next_update_at_utc: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Migration failed")?;
        Ok(())
    }

    /// Insert the snapshot row. Returns true when the row was new.
    pub async fn insert_snapshot(&self, snapshot: &SnapshotRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO snapshots (snapshot_id, updated_at_utc, next_update_at_utc)
            VALUES ($1, $2, $3)
            ON CONFLICT (snapshot_id) DO NOTHING
            "#,
        )
        .bind(&snapshot.snapshot_id)
        .bind(snapshot.updated_at_utc)
        .bind(snapshot.next_update_at_utc)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_keyword(&self, k: &KeywordRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO keywords
                (snapshot_id, keyword_id, keyword, rank, delta_rank, is_new,
                 score, score_recency, score_frequency, score_authority, score_internal,
                 summary_short, summary_short_en, primary_type,
                 top_source_title, top_source_url, top_source_domain, top_source_image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (snapshot_id, keyword_id) DO NOTHING
            "#,
        )
        .bind(&k.snapshot_id)
        .bind(&k.keyword_id)
        .bind(&k.keyword)
        .bind(k.rank)
        .bind(k.delta_rank)
        .bind(k.is_new)
        .bind(k.score)
        .bind(k.score_recency)
        .bind(k.score_frequency)
        .bind(k.score_authority)
        .bind(k.score_internal)
        .bind(&k.summary_short)
        .bind(&k.summary_short_en)
        .bind(&k.primary_type)
        .bind(&k.top_source_title)
        .bind(&k.top_source_url)
        .bind(&k.top_source_domain)
        .bind(&k.top_source_image_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert one source row, refreshing the mutable presentation fields on
    /// conflict so a retried run picks up late-arriving images/translations.
    pub async fn insert_source(&self, s: &SourceRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sources
                (snapshot_id, keyword_id, type, title, url, domain,
                 published_at_utc, snippet, image_url, title_ko, title_en)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (snapshot_id, keyword_id, type, url) DO UPDATE SET
                title = EXCLUDED.title,
                snippet = EXCLUDED.snippet,
                image_url = EXCLUDED.image_url,
                title_ko = EXCLUDED.title_ko,
                title_en = EXCLUDED.title_en,
                published_at_utc = EXCLUDED.published_at_utc
            "#,
        )
        .bind(&s.snapshot_id)
        .bind(&s.keyword_id)
        .bind(&s.source_type)
        .bind(&s.title)
        .bind(&s.url)
        .bind(&s.domain)
        .bind(s.published_at_utc)
        .bind(&s.snippet)
        .bind(&s.image_url)
        .bind(&s.title_ko)
        .bind(&s.title_en)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record aliases for a canonical keyword. Failures log and continue: the
    /// alias table feeds search lookup, not the snapshot itself.
    pub async fn upsert_aliases(&self, keyword_id: &str, aliases: &[String], lang: &str) {
        for alias in aliases {
            let result = sqlx::query(
                r#"
                INSERT INTO keyword_aliases (canonical_keyword_id, alias, lang)
                VALUES ($1, $2, $3)
                ON CONFLICT (canonical_keyword_id, alias) DO NOTHING
                "#,
            )
            .bind(keyword_id)
            .bind(alias)
            .bind(lang)
            .execute(&self.pool)
            .await;

            if let Err(e) = result {
                warn!(keyword_id, alias, error = %e, "alias upsert failed");
            }
        }
    }

    /// Most recent prior rank per keyword id, across snapshots older than
    /// `before_snapshot`. Snapshot ids sort lexicographically in time order.
    pub async fn previous_ranks(
        &self,
        before_snapshot: &str,
        keyword_ids: &[String],
    ) -> Result<HashMap<String, i32>> {
        let rows: Vec<(String, i32)> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (keyword_id) keyword_id, rank
            FROM keywords
            WHERE keyword_id = ANY($1) AND snapshot_id < $2
            ORDER BY keyword_id, snapshot_id DESC
            "#,
        )
        .bind(keyword_ids)
        .bind(before_snapshot)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// The `limit` most recent snapshot ids strictly before `before_snapshot`.
    pub async fn recent_snapshot_ids(
        &self,
        before_snapshot: &str,
        limit: i64,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT snapshot_id FROM snapshots
            WHERE snapshot_id < $1
            ORDER BY snapshot_id DESC
            LIMIT $2
            "#,
        )
        .bind(before_snapshot)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The keyword's most recent row among the given snapshots that still has
    /// at least one source attached, together with those sources.
    pub async fn cached_keyword(
        &self,
        keyword_id: &str,
        within_snapshots: &[String],
    ) -> Result<Option<(KeywordRecord, Vec<SourceRecord>)>> {
        if within_snapshots.is_empty() {
            return Ok(None);
        }

        let row: Option<KeywordRecord> = sqlx::query_as(
            r#"
            SELECT snapshot_id, keyword_id, keyword, rank, delta_rank, is_new,
                   score, score_recency, score_frequency, score_authority, score_internal,
                   summary_short, summary_short_en, primary_type,
                   top_source_title, top_source_url, top_source_domain, top_source_image_url
            FROM keywords k
            WHERE keyword_id = $1
              AND snapshot_id = ANY($2)
              AND EXISTS (
                  SELECT 1 FROM sources s
                  WHERE s.snapshot_id = k.snapshot_id AND s.keyword_id = k.keyword_id
              )
            ORDER BY snapshot_id DESC
            LIMIT 1
            "#,
        )
        .bind(keyword_id)
        .bind(within_snapshots)
        .fetch_optional(&self.pool)
        .await?;

        let Some(keyword) = row else { return Ok(None) };

        let sources: Vec<SourceRecord> = sqlx::query_as(
            r#"
            SELECT snapshot_id, keyword_id, type, title, url, domain,
                   published_at_utc, snippet, image_url, title_ko, title_en
            FROM sources
            WHERE snapshot_id = $1 AND keyword_id = $2
            ORDER BY id ASC
            "#,
        )
        .bind(&keyword.snapshot_id)
        .bind(keyword_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((keyword, sources)))
    }
}
