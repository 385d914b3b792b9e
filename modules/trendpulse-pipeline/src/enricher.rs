//! Top-keyword enrichment: external search fan-out, OG-image backfill,
//! bilingual summaries, and title translation. Every external call degrades
//! to a safe default; an enriched keyword is always persistable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::warn;

use tavily_client::{SearchOptions, SearchResponse, Topic};
use trendpulse_common::{contains_hangul, host_of, PrimaryType};

use crate::classify;
use crate::og::{self, ImageProber};
use crate::traits::{Chat, Searcher};

const NEWS_RESULTS: u32 = 8;
const WEB_RESULTS: u32 = 8;
const VIDEO_RESULTS: u32 = 5;
const IMAGE_RESULTS: u32 = 3;
const TRANSLATE_PER_KIND: usize = 8;
const SUMMARY_MAX_CHARS: usize = 220;
const SNIPPET_MAX_CHARS: usize = 300;

/// Persisted `type` of a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    News,
    Web,
    Video,
    Image,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::News => "news",
            SourceKind::Web => "web",
            SourceKind::Video => "video",
            SourceKind::Image => "image",
        }
    }

    /// Stored rows from older snapshots are tolerated; anything unknown
    /// reads as a plain web source.
    pub fn parse(raw: &str) -> SourceKind {
        match raw {
            "news" => SourceKind::News,
            "video" => SourceKind::Video,
            "image" => SourceKind::Image,
            _ => SourceKind::Web,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichedSource {
    pub kind: SourceKind,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub published_at: Option<DateTime<Utc>>,
    pub snippet: Option<String>,
    pub image_url: Option<String>,
    pub title_ko: Option<String>,
    pub title_en: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TopSource {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub image_url: String,
}

/// Everything the persistence phase needs for one enriched keyword.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub sources: Vec<EnrichedSource>,
    pub summary_ko: String,
    pub summary_en: String,
    pub primary_type: PrimaryType,
    pub top_source: Option<TopSource>,
}

pub struct Enricher {
    searcher: Arc<dyn Searcher>,
    chat: Arc<dyn Chat>,
    prober: Arc<dyn ImageProber>,
    enable_en_summary: bool,
    summary_context_limit: usize,
}

impl Enricher {
    pub fn new(
        searcher: Arc<dyn Searcher>,
        chat: Arc<dyn Chat>,
        prober: Arc<dyn ImageProber>,
        enable_en_summary: bool,
        summary_context_limit: usize,
    ) -> Self {
        Self {
            searcher,
            chat,
            prober,
            enable_en_summary,
            summary_context_limit,
        }
    }

    pub async fn enrich(&self, keyword: &str) -> Enrichment {
        let mut sources = self.search_groups(keyword).await;

        og::backfill_images(self.prober.as_ref(), &mut sources).await;

        let (summary_ko, summary_en) = self.summarize(keyword, &sources).await;
        self.translate_titles(&mut sources).await;

        let primary_type = classify::primary_type(&sources);
        let top_source = sources.first().map(|s| TopSource {
            title: s.title.clone(),
            url: s.url.clone(),
            domain: s.domain.clone(),
            image_url: s.image_url.clone().unwrap_or_else(|| og::DEFAULT_IMAGE.to_string()),
        });

        Enrichment {
            sources,
            summary_ko,
            summary_en,
            primary_type,
            top_source,
        }
    }

    /// The four per-type queries, concurrently; a failed query contributes an
    /// empty group.
    async fn search_groups(&self, keyword: &str) -> Vec<EnrichedSource> {
        let video_query = format!("{keyword} video");
        let queries: Vec<(SourceKind, String, SearchOptions)> = vec![
            (
                SourceKind::News,
                keyword.to_string(),
                SearchOptions {
                    topic: Topic::News,
                    time_range: Some("week"),
                    max_results: NEWS_RESULTS,
                    include_images: false,
                },
            ),
            (
                SourceKind::Web,
                keyword.to_string(),
                SearchOptions {
                    topic: Topic::General,
                    time_range: Some("month"),
                    max_results: WEB_RESULTS,
                    include_images: false,
                },
            ),
            (
                SourceKind::Video,
                video_query,
                SearchOptions {
                    topic: Topic::General,
                    time_range: Some("month"),
                    max_results: VIDEO_RESULTS,
                    include_images: false,
                },
            ),
            (
                SourceKind::Image,
                keyword.to_string(),
                SearchOptions {
                    topic: Topic::General,
                    time_range: None,
                    max_results: IMAGE_RESULTS,
                    include_images: true,
                },
            ),
        ];

        let groups = join_all(queries.into_iter().map(|(kind, query, opts)| {
            let searcher = Arc::clone(&self.searcher);
            async move {
                match searcher.search(&query, &opts).await {
                    Ok(resp) => (kind, resp),
                    Err(e) => {
                        warn!(query, kind = kind.as_str(), error = %e, "search failed");
                        (kind, SearchResponse::default())
                    }
                }
            }
        }))
        .await;

        let mut sources = Vec::new();
        for (kind, resp) in groups {
            if kind == SourceKind::Image {
                for image_url in resp.images {
                    let Some(domain) = host_of(&image_url) else { continue };
                    sources.push(EnrichedSource {
                        kind,
                        title: keyword.to_string(),
                        url: image_url.clone(),
                        domain,
                        published_at: None,
                        snippet: None,
                        image_url: Some(image_url),
                        title_ko: None,
                        title_en: None,
                    });
                }
                continue;
            }
            for result in resp.results {
                let Some(domain) = host_of(&result.url) else { continue };
                let title = result.title.trim().to_string();
                if title.is_empty() {
                    continue;
                }
                sources.push(EnrichedSource {
                    kind,
                    title,
                    url: result.url,
                    domain,
                    published_at: result.published_date.as_deref().and_then(parse_published),
                    snippet: (!result.content.is_empty())
                        .then(|| result.content.chars().take(SNIPPET_MAX_CHARS).collect()),
                    image_url: None,
                    title_ko: None,
                    title_en: None,
                });
            }
        }
        sources
    }

    /// Korean summary plus, when enabled, an English one in parallel.
    async fn summarize(&self, keyword: &str, sources: &[EnrichedSource]) -> (String, String) {
        let news: Vec<&EnrichedSource> = sources
            .iter()
            .filter(|s| s.kind == SourceKind::News)
            .collect();
        let context_pool: Vec<&EnrichedSource> = if news.is_empty() {
            sources.iter().collect()
        } else {
            news
        };
        let context = context_pool
            .iter()
            .take(self.summary_context_limit)
            .map(|s| match &s.snippet {
                Some(snippet) => format!("- {}: {}", s.title, snippet),
                None => format!("- {}", s.title),
            })
            .collect::<Vec<_>>()
            .join("\n");

        if context.is_empty() {
            return (fallback_summary_ko(keyword), fallback_summary_en(keyword));
        }

        let ko = async {
            match self
                .chat
                .chat(SUMMARY_KO_SYSTEM_PROMPT, &format!("키워드: {keyword}\n\n{context}"), 0.2)
                .await
            {
                Ok(text) => sanitize_summary(&text),
                Err(e) => {
                    warn!(keyword, error = %e, "Korean summary failed");
                    fallback_summary_ko(keyword)
                }
            }
        };

        let en = async {
            if !self.enable_en_summary {
                return String::new();
            }
            match self
                .chat
                .chat(SUMMARY_EN_SYSTEM_PROMPT, &format!("Keyword: {keyword}\n\n{context}"), 0.2)
                .await
            {
                Ok(text) => sanitize_summary(&text),
                Err(e) => {
                    warn!(keyword, error = %e, "English summary failed");
                    fallback_summary_en(keyword)
                }
            }
        };

        tokio::join!(ko, en)
    }

    /// Batch-translate the leading titles of each type into Korean. A
    /// line-count mismatch keeps the originals.
    async fn translate_titles(&self, sources: &mut [EnrichedSource]) {
        for kind in [SourceKind::News, SourceKind::Web, SourceKind::Video] {
            let targets: Vec<usize> = sources
                .iter()
                .enumerate()
                .filter(|(_, s)| s.kind == kind)
                .map(|(idx, _)| idx)
                .take(TRANSLATE_PER_KIND)
                .collect();
            if targets.is_empty() {
                continue;
            }

            let titles: Vec<String> = targets.iter().map(|&i| sources[i].title.clone()).collect();
            let user = titles.join("\n");

            let translated = match self.chat.chat(TRANSLATE_SYSTEM_PROMPT, &user, 0.2).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(kind = kind.as_str(), error = %e, "title translation failed");
                    continue;
                }
            };

            let lines: Vec<&str> = translated
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            if lines.len() != targets.len() {
                warn!(
                    kind = kind.as_str(),
                    expected = targets.len(),
                    got = lines.len(),
                    "translation line count mismatch, keeping originals"
                );
                continue;
            }

            for (&idx, line) in targets.iter().zip(&lines) {
                sources[idx].title_ko = Some((*line).to_string());
            }
        }

        for source in sources.iter_mut() {
            if !contains_hangul(&source.title) {
                source.title_en = Some(source.title.clone());
            } else if source.title_ko.is_none() {
                source.title_ko = Some(source.title.clone());
            }
        }
    }
}

fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .or_else(|| DateTime::parse_from_rfc2822(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Single prose line, capped for the card UI.
fn sanitize_summary(raw: &str) -> String {
    let joined = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = joined.trim_start_matches(['-', '*', '•']).trim().to_string();
    cleaned.chars().take(SUMMARY_MAX_CHARS).collect()
}

fn fallback_summary_ko(keyword: &str) -> String {
    format!("{keyword} 관련 최신 동향이 수집되었습니다. 자세한 내용은 출처 링크를 확인하세요.")
}

fn fallback_summary_en(keyword: &str) -> String {
    format!("Recent coverage of {keyword} has been collected; see the linked sources for details.")
}

const SUMMARY_KO_SYSTEM_PROMPT: &str = "주어진 키워드와 관련 기사 목록을 바탕으로 한국어 한 줄 요약을 작성한다. \
220자 이내, 이모지 금지, 불릿 금지, 한 문장의 평서문으로만 답한다.";

const SUMMARY_EN_SYSTEM_PROMPT: &str = "Write a one-line English summary of the keyword from the listed articles. \
At most 220 characters, no emoji, no bullets, a single prose sentence only.";

const TRANSLATE_SYSTEM_PROMPT: &str = "Translate each input line into natural Korean. Keep product names, company names, \
and version numbers verbatim. Return exactly one output line per input line, same order, no numbering.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_flattens_and_caps() {
        let messy = "- 첫 줄\n\n둘째 줄  ";
        assert_eq!(sanitize_summary(messy), "첫 줄 둘째 줄");

        let long = "a".repeat(500);
        assert_eq!(sanitize_summary(&long).chars().count(), SUMMARY_MAX_CHARS);
    }

    #[test]
    fn parse_published_accepts_both_formats() {
        assert!(parse_published("2025-06-10T11:30:00Z").is_some());
        assert!(parse_published("Tue, 10 Jun 2025 11:30:00 GMT").is_some());
        assert!(parse_published("yesterday").is_none());
    }

    #[test]
    fn source_kind_parse_tolerates_legacy_values() {
        assert_eq!(SourceKind::parse("news"), SourceKind::News);
        assert_eq!(SourceKind::parse("video"), SourceKind::Video);
        assert_eq!(SourceKind::parse("whatever"), SourceKind::Web);
    }
}
