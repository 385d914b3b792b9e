//! Primary-type classification: a weighted vote over a keyword's enrichment
//! sources, mapping each to news/social/data.

use trendpulse_common::PrimaryType;

use crate::enricher::{EnrichedSource, SourceKind};

const SOCIAL_HOSTS: &[&str] = &[
    "x.com",
    "twitter.com",
    "facebook.com",
    "instagram.com",
    "threads.net",
    "linkedin.com",
    "reddit.com",
    "news.ycombinator.com",
];

const DATA_HOSTS: &[&str] = &[
    "github.com",
    "huggingface.co",
    "kaggle.com",
    "arxiv.org",
    "paperswithcode.com",
    "youtube.com",
    "youtu.be",
];

/// Category of one source.
pub fn classify(source: &EnrichedSource) -> PrimaryType {
    match source.kind {
        SourceKind::Video | SourceKind::Image => return PrimaryType::Data,
        SourceKind::News | SourceKind::Web => {}
    }

    let domain = source.domain.as_str();
    if SOCIAL_HOSTS.iter().any(|h| domain == *h) {
        return PrimaryType::Social;
    }
    if DATA_HOSTS.iter().any(|h| domain == *h) {
        return PrimaryType::Data;
    }

    let url = source.url.to_lowercase();
    let title = source.title.to_lowercase();
    if url.contains("arxiv") || url.contains("doi.org") || url.contains("youtube.com/watch") {
        return PrimaryType::Data;
    }
    if title.contains("[paper]") || title.contains("dataset") || title.contains("benchmark") {
        return PrimaryType::Data;
    }

    PrimaryType::News
}

/// Weighted vote: positions 1-3 weigh 3, 4-8 weigh 2, the rest 1. Ties break
/// to the first source's category, then to the fixed order
/// news -> social -> data.
pub fn primary_type(sources: &[EnrichedSource]) -> PrimaryType {
    if sources.is_empty() {
        return PrimaryType::News;
    }

    let mut weights: [(PrimaryType, u32); 3] = [
        (PrimaryType::News, 0),
        (PrimaryType::Social, 0),
        (PrimaryType::Data, 0),
    ];
    for (idx, source) in sources.iter().enumerate() {
        let weight = match idx {
            0..=2 => 3,
            3..=7 => 2,
            _ => 1,
        };
        let category = classify(source);
        for (c, w) in weights.iter_mut() {
            if *c == category {
                *w += weight;
            }
        }
    }

    let max = weights.iter().map(|(_, w)| *w).max().unwrap_or(0);
    let tied: Vec<PrimaryType> = weights
        .iter()
        .filter(|(_, w)| *w == max)
        .map(|(c, _)| *c)
        .collect();
    if tied.len() == 1 {
        return tied[0];
    }

    let first = classify(&sources[0]);
    if tied.contains(&first) {
        return first;
    }
    tied[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(kind: SourceKind, domain: &str) -> EnrichedSource {
        EnrichedSource {
            kind,
            title: format!("about {domain}"),
            url: format!("https://{domain}/x"),
            domain: domain.to_string(),
            published_at: None,
            snippet: None,
            image_url: None,
            title_ko: None,
            title_en: None,
        }
    }

    #[test]
    fn explicit_media_kinds_are_data() {
        assert_eq!(
            classify(&source(SourceKind::Video, "vimeo.com")),
            PrimaryType::Data
        );
        assert_eq!(
            classify(&source(SourceKind::Image, "cdn.example.com")),
            PrimaryType::Data
        );
    }

    #[test]
    fn hosts_drive_social_and_data() {
        assert_eq!(
            classify(&source(SourceKind::Web, "reddit.com")),
            PrimaryType::Social
        );
        assert_eq!(
            classify(&source(SourceKind::Web, "github.com")),
            PrimaryType::Data
        );
        assert_eq!(
            classify(&source(SourceKind::News, "reuters.com")),
            PrimaryType::News
        );
    }

    #[test]
    fn leading_positions_dominate_the_vote() {
        // Three leading news sources (3+3+3) outvote five trailing social
        // ones (2+2+2+2+1).
        let mut sources = vec![
            source(SourceKind::News, "reuters.com"),
            source(SourceKind::News, "bbc.com"),
            source(SourceKind::News, "cnn.com"),
        ];
        for _ in 0..5 {
            sources.push(source(SourceKind::Web, "reddit.com"));
        }
        assert_eq!(primary_type(&sources), PrimaryType::News);
    }

    #[test]
    fn tie_breaks_to_first_source_category() {
        // news 3, social 3: the first source is social.
        let sources = vec![
            source(SourceKind::Web, "x.com"),
            source(SourceKind::News, "reuters.com"),
        ];
        assert_eq!(primary_type(&sources), PrimaryType::Social);
    }

    #[test]
    fn empty_sources_default_to_news() {
        assert_eq!(primary_type(&[]), PrimaryType::News);
    }
}
