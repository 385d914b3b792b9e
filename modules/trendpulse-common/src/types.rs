use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Keywords ranked and persisted per snapshot.
pub const TOP_RANKED: usize = 20;

/// Authority classification assigned by the source adapter. The declaration
/// order is the ordinal: lower = higher authority, and the collector drops
/// duplicate URLs in favor of the lower ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    P0Curated,
    P0Releases,
    P1Context,
    P2Raw,
    Community,
}

impl Tier {
    /// Authority score component in [0, 1].
    pub fn authority(&self) -> f64 {
        match self {
            Tier::P0Curated => 1.0,
            Tier::P0Releases => 1.0,
            Tier::P1Context => 0.6,
            Tier::P2Raw => 0.3,
            Tier::Community => 0.2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::P0Curated => "P0_CURATED",
            Tier::P0Releases => "P0_RELEASES",
            Tier::P1Context => "P1_CONTEXT",
            Tier::P2Raw => "P2_RAW",
            Tier::Community => "COMMUNITY",
        }
    }

    /// The better (lower ordinal) of two tiers.
    pub fn best(self, other: Tier) -> Tier {
        if other < self { other } else { self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lang {
    Ko,
    En,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Ko => "ko",
            Lang::En => "en",
        }
    }
}

/// One collected upstream item. `link` is the global dedup key; `published_at`
/// is guaranteed by the adapter to lie within its lookback window.
#[derive(Debug, Clone)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub summary: String,
    pub source_domain: String,
    pub feed_title: String,
    pub tier: Tier,
    pub lang: Lang,
}

/// Support metadata for an extracted keyword, merged across matching items.
#[derive(Debug, Clone)]
pub struct KeywordCandidate {
    pub text: String,
    pub count: u32,
    pub domains: HashSet<String>,
    pub latest_at: DateTime<Utc>,
    pub tier: Tier,
}

impl KeywordCandidate {
    pub fn new(text: impl Into<String>, latest_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            count: 0,
            domains: HashSet::new(),
            latest_at,
            tier: Tier::Community,
        }
    }

    /// Fold one supporting item into the candidate.
    pub fn absorb(&mut self, item: &Item) {
        self.count += 1;
        self.domains.insert(item.source_domain.clone());
        if item.published_at > self.latest_at {
            self.latest_at = item.published_at;
        }
        self.tier = self.tier.best(item.tier);
    }
}

/// A keyword that survived extraction and normalization. `keyword_id` is the
/// deterministic slug used as the persistence key across snapshots.
#[derive(Debug, Clone)]
pub struct NormalizedKeyword {
    pub keyword_id: String,
    pub keyword: String,
    pub aliases: Vec<String>,
    pub candidate: KeywordCandidate,
}

/// Dominant source-category of a keyword's enrichment sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryType {
    News,
    Social,
    Data,
}

impl PrimaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryType::News => "news",
            PrimaryType::Social => "social",
            PrimaryType::Data => "data",
        }
    }
}

/// Summary counters returned by one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub snapshot_id: String,
    pub keyword_count: usize,
    pub reused_count: usize,
    pub new_count: usize,
    pub elapsed_ms: u64,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot {}: {} keywords ({} reused, {} new) in {}ms",
            self.snapshot_id,
            self.keyword_count,
            self.reused_count,
            self.new_count,
            self.elapsed_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordinal_orders_by_authority_priority() {
        assert!(Tier::P0Curated < Tier::P0Releases);
        assert!(Tier::P0Releases < Tier::P1Context);
        assert!(Tier::P1Context < Tier::P2Raw);
        assert!(Tier::P2Raw < Tier::Community);
    }

    #[test]
    fn tier_best_picks_lower_ordinal() {
        assert_eq!(Tier::Community.best(Tier::P1Context), Tier::P1Context);
        assert_eq!(Tier::P0Curated.best(Tier::P2Raw), Tier::P0Curated);
    }

    #[test]
    fn authority_weakly_increases_with_better_tier() {
        let tiers = [
            Tier::Community,
            Tier::P2Raw,
            Tier::P1Context,
            Tier::P0Releases,
            Tier::P0Curated,
        ];
        for pair in tiers.windows(2) {
            assert!(pair[1].authority() >= pair[0].authority());
        }
    }

    #[test]
    fn absorb_merges_support() {
        let t0 = Utc::now();
        let mut cand = KeywordCandidate::new("Claude Code", t0);
        let item = Item {
            title: "Claude Code ships".into(),
            link: "https://example.com/a".into(),
            published_at: t0 + chrono::Duration::hours(1),
            summary: String::new(),
            source_domain: "example.com".into(),
            feed_title: "Example".into(),
            tier: Tier::P0Curated,
            lang: Lang::En,
        };
        cand.absorb(&item);
        assert_eq!(cand.count, 1);
        assert_eq!(cand.latest_at, item.published_at);
        assert_eq!(cand.tier, Tier::P0Curated);
        assert!(cand.domains.contains("example.com"));
    }
}
