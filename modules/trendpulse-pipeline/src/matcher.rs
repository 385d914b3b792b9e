//! Support computation: one scan over the collected items per keyword,
//! tolerant of near-phrase titles and half-transliterated forms.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use trendpulse_common::{
    contains_hangul, strip_hangul, Item, KeywordCandidate, NormalizedKeyword,
};

use crate::extractor::ExtractedKeyword;

/// Tokens ignored when splitting a phrase into significant match tokens.
/// Independent from the extractor's generic vocabulary on purpose: this list
/// tunes match tolerance, not drop decisions.
fn match_stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        [
            "the", "and", "for", "with", "from", "into", "new", "via",
            "및", "등", "위한", "통한", "대한", "관련",
        ]
        .into_iter()
        .collect()
    })
}

/// How one keyword variant matches an item's text.
enum Matcher {
    /// Whole-word match for short single tokens ("Go", "R1").
    WholeWord(Regex),
    /// Substring match for a single significant word.
    Substring(String),
    /// All significant tokens present, order-independent.
    AllTokens(Vec<String>),
}

impl Matcher {
    fn build(variant: &str) -> Option<Matcher> {
        let variant = variant.trim().to_lowercase();
        if variant.is_empty() {
            return None;
        }

        let tokens: Vec<&str> = variant.split_whitespace().collect();
        if tokens.len() == 1 {
            let token = tokens[0];
            if token.chars().count() <= 2 {
                let pattern = format!(r"\b{}\b", regex::escape(token));
                return Regex::new(&pattern).ok().map(Matcher::WholeWord);
            }
            return Some(Matcher::Substring(token.to_string()));
        }

        let significant: Vec<String> = tokens
            .iter()
            .filter(|t| t.chars().count() >= 3 && !match_stopwords().contains(**t))
            .map(|t| t.to_string())
            .collect();

        if significant.is_empty() {
            // Nothing left to split on; fall back to the whole phrase.
            return Some(Matcher::Substring(variant));
        }
        Some(Matcher::AllTokens(significant))
    }

    fn matches(&self, haystack: &str) -> bool {
        match self {
            Matcher::WholeWord(re) => re.is_match(haystack),
            Matcher::Substring(needle) => haystack.contains(needle),
            Matcher::AllTokens(tokens) => tokens.iter().all(|t| haystack.contains(t)),
        }
    }
}

/// The matchers for one keyword: its own text plus, for Hangul-bearing
/// keywords, the ASCII remnant so "클로드 Code" still hits English titles.
fn variant_matchers(keyword: &str) -> Vec<Matcher> {
    let mut matchers: Vec<Matcher> = Matcher::build(keyword).into_iter().collect();
    if contains_hangul(keyword) {
        let ascii = strip_hangul(keyword);
        if ascii.chars().filter(|c| c.is_ascii_alphanumeric()).count() >= 3 {
            matchers.extend(Matcher::build(&ascii));
        }
    }
    matchers
}

/// Compute support for each keyword; keywords no item supports are dropped.
pub fn match_keywords(extracted: Vec<ExtractedKeyword>, items: &[Item]) -> Vec<NormalizedKeyword> {
    let haystacks: Vec<String> = items
        .iter()
        .map(|i| format!("{} {}", i.title, i.summary).to_lowercase())
        .collect();

    let mut out = Vec::new();
    for kw in extracted {
        let matchers = variant_matchers(&kw.keyword);
        if matchers.is_empty() {
            continue;
        }

        let mut candidate =
            KeywordCandidate::new(kw.keyword.clone(), chrono::DateTime::UNIX_EPOCH);
        for (item, haystack) in items.iter().zip(&haystacks) {
            if matchers.iter().any(|m| m.matches(haystack)) {
                candidate.absorb(item);
            }
        }

        if candidate.count == 0 {
            continue;
        }
        out.push(NormalizedKeyword {
            keyword_id: kw.keyword_id,
            keyword: kw.keyword,
            aliases: kw.aliases,
            candidate,
        });
    }

    info!(supported = out.len(), "matching complete");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trendpulse_common::{keyword_id, Lang, Tier};

    fn item(title: &str, domain: &str, tier: Tier) -> Item {
        Item {
            title: title.to_string(),
            link: format!("https://{domain}/{}", title.len()),
            published_at: Utc::now(),
            summary: String::new(),
            source_domain: domain.to_string(),
            feed_title: "t".to_string(),
            tier,
            lang: Lang::En,
        }
    }

    fn extracted(keyword: &str) -> ExtractedKeyword {
        ExtractedKeyword {
            keyword_id: keyword_id(keyword),
            keyword: keyword.to_string(),
            aliases: Vec::new(),
        }
    }

    #[test]
    fn phrase_matches_near_phrase_title() {
        let items = vec![item(
            "Claude Code introduces Teams feature",
            "anthropic.com",
            Tier::P0Curated,
        )];
        let matched = match_keywords(vec![extracted("Claude Code Teams")], &items);
        assert_eq!(matched.len(), 1);
        assert!(matched[0].candidate.count >= 1);
    }

    #[test]
    fn short_tokens_require_whole_words() {
        let items = vec![
            item("Go 1.23 adds new GC knobs", "go.dev", Tier::P1Context),
            item("Golang and Gophers gather", "example.com", Tier::P2Raw),
        ];
        let matched = match_keywords(vec![extracted("Go")], &items);
        assert_eq!(matched.len(), 1);
        // "Golang" must not count as a whole-word "go" hit.
        assert_eq!(matched[0].candidate.count, 1);
    }

    #[test]
    fn unsupported_keywords_are_dropped() {
        let items = vec![item("Nothing relevant here", "a.com", Tier::P2Raw)];
        let matched = match_keywords(vec![extracted("Mistral Large")], &items);
        assert!(matched.is_empty());
    }

    #[test]
    fn hangul_keyword_matches_english_title_via_ascii_variant() {
        let items = vec![item(
            "Blackwell GPUs hit the data center",
            "nvidia.com",
            Tier::P1Context,
        )];
        let matched = match_keywords(vec![extracted("엔비디아 Blackwell")], &items);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn support_merges_domains_and_best_tier() {
        let items = vec![
            item("Gemini 2.5 launches", "blog.google", Tier::P0Curated),
            item("Hands on with Gemini 2.5", "theverge.com", Tier::P1Context),
        ];
        let matched = match_keywords(vec![extracted("Gemini 2.5")], &items);
        let cand = &matched[0].candidate;
        assert_eq!(cand.count, 2);
        assert_eq!(cand.domains.len(), 2);
        assert_eq!(cand.tier, Tier::P0Curated);
    }
}
