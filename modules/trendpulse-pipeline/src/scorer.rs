//! Weighted scoring and ranking with novelty bonus and delta rank.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use trendpulse_common::{NormalizedKeyword, TOP_RANKED};

const RECENCY_WEIGHT: f64 = 0.45;
const FREQUENCY_WEIGHT: f64 = 0.20;
const AUTHORITY_WEIGHT: f64 = 0.20;
const INTERNAL_WEIGHT: f64 = 0.15;

/// Half-life-ish decay constant: support from 36 hours ago scores 1/e.
const RECENCY_TAU_HOURS: f64 = 36.0;
/// Domain count at which frequency saturates.
const FREQUENCY_SATURATION: f64 = 10.0;

const NOVELTY_BONUS: f64 = 0.15;

#[derive(Debug, Clone, Copy)]
pub struct ScoreBreakdown {
    pub recency: f64,
    pub frequency: f64,
    pub authority: f64,
    pub internal: f64,
    pub total: f64,
}

/// A keyword with its final rank and movement against the prior snapshot.
#[derive(Debug, Clone)]
pub struct RankedKeyword {
    pub keyword: NormalizedKeyword,
    pub scores: ScoreBreakdown,
    pub rank: usize,
    pub delta_rank: i32,
    pub is_new: bool,
}

/// Score one candidate. All components live in [0, 1].
pub fn score(keyword: &NormalizedKeyword, now: DateTime<Utc>) -> ScoreBreakdown {
    let age_hours = (now - keyword.candidate.latest_at)
        .num_seconds()
        .max(0) as f64
        / 3600.0;
    let recency = (-age_hours / RECENCY_TAU_HOURS).exp();
    let frequency = (keyword.candidate.domains.len() as f64 / FREQUENCY_SATURATION).min(1.0);
    let authority = keyword.candidate.tier.authority();
    // Reserved operator boost/blacklist channel.
    let internal = 0.0;

    let total = RECENCY_WEIGHT * recency
        + FREQUENCY_WEIGHT * frequency
        + AUTHORITY_WEIGHT * authority
        + INTERNAL_WEIGHT * internal;

    ScoreBreakdown {
        recency,
        frequency,
        authority,
        internal,
        total,
    }
}

/// Score everything and keep the raw top `TOP_RANKED`, sorted by total
/// descending (keyword id breaks float ties deterministically).
pub fn shortlist(
    keywords: Vec<NormalizedKeyword>,
    now: DateTime<Utc>,
) -> Vec<(NormalizedKeyword, ScoreBreakdown)> {
    let mut scored: Vec<(NormalizedKeyword, ScoreBreakdown)> = keywords
        .into_iter()
        .map(|k| {
            let s = score(&k, now);
            (k, s)
        })
        .collect();

    sort_by_total(&mut scored, |entry| entry.1.total, |entry| entry.0.keyword_id.as_str());
    scored.truncate(TOP_RANKED);
    scored
}

/// Apply the novelty bonus against the previous ranks, re-sort, and assign
/// dense ranks 1..n. `delta_rank = prev_rank - rank`, positive = rose.
pub fn finalize(
    shortlisted: Vec<(NormalizedKeyword, ScoreBreakdown)>,
    previous_ranks: &HashMap<String, i32>,
) -> Vec<RankedKeyword> {
    let mut entries: Vec<(NormalizedKeyword, ScoreBreakdown, Option<i32>)> = shortlisted
        .into_iter()
        .map(|(keyword, mut scores)| {
            let prev = previous_ranks.get(&keyword.keyword_id).copied();
            if prev.is_none() {
                scores.total += NOVELTY_BONUS;
            }
            (keyword, scores, prev)
        })
        .collect();

    sort_by_total(&mut entries, |e| e.1.total, |e| e.0.keyword_id.as_str());

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, (keyword, scores, prev))| {
            let rank = idx + 1;
            RankedKeyword {
                keyword,
                scores,
                rank,
                delta_rank: prev.map(|p| p - rank as i32).unwrap_or(0),
                is_new: prev.is_none(),
            }
        })
        .collect()
}

fn sort_by_total<T>(
    entries: &mut [T],
    total: impl Fn(&T) -> f64,
    tiebreak: impl Fn(&T) -> &str,
) {
    entries.sort_by(|a, b| {
        total(b)
            .partial_cmp(&total(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| tiebreak(a).cmp(tiebreak(b)))
    });
}

/// Four-decimal rounding applied to persisted score fields.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use trendpulse_common::{KeywordCandidate, Tier};

    fn keyword(id: &str, domains: usize, age_hours: i64, tier: Tier, now: DateTime<Utc>) -> NormalizedKeyword {
        let mut candidate = KeywordCandidate::new(id, now - Duration::hours(age_hours));
        candidate.count = domains as u32;
        for d in 0..domains {
            candidate.domains.insert(format!("d{d}.com"));
        }
        candidate.tier = tier;
        NormalizedKeyword {
            keyword_id: id.to_string(),
            keyword: id.to_string(),
            aliases: Vec::new(),
            candidate,
        }
    }

    #[test]
    fn recency_strictly_increases_with_later_support() {
        let now = Utc::now();
        let newer = score(&keyword("a", 3, 2, Tier::P2Raw, now), now);
        let older = score(&keyword("a", 3, 20, Tier::P2Raw, now), now);
        assert!(newer.recency > older.recency);
        assert!(newer.total > older.total);
    }

    #[test]
    fn frequency_increases_up_to_saturation() {
        let now = Utc::now();
        let few = score(&keyword("a", 2, 5, Tier::P2Raw, now), now);
        let more = score(&keyword("a", 8, 5, Tier::P2Raw, now), now);
        let max = score(&keyword("a", 10, 5, Tier::P2Raw, now), now);
        let over = score(&keyword("a", 15, 5, Tier::P2Raw, now), now);
        assert!(more.frequency > few.frequency);
        assert!((max.frequency - 1.0).abs() < f64::EPSILON);
        assert!((over.frequency - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn authority_follows_tier() {
        let now = Utc::now();
        let curated = score(&keyword("a", 3, 5, Tier::P0Curated, now), now);
        let community = score(&keyword("a", 3, 5, Tier::Community, now), now);
        assert!(curated.authority > community.authority);
        assert!((curated.authority - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn novelty_bonus_reorders_and_renumbers() {
        // Raw totals A:0.70, B:0.68, C:0.60 with C new: after the +0.15
        // bonus the order is C, A, B with dense ranks 1..3.
        let now = Utc::now();
        let mk = |id: &str| keyword(id, 1, 1, Tier::P2Raw, now);
        let breakdown = |total: f64| ScoreBreakdown {
            recency: 0.0,
            frequency: 0.0,
            authority: 0.0,
            internal: 0.0,
            total,
        };
        let shortlisted = vec![
            (mk("a"), breakdown(0.70)),
            (mk("b"), breakdown(0.68)),
            (mk("c"), breakdown(0.60)),
        ];
        let prev: HashMap<String, i32> = [("a".to_string(), 1), ("b".to_string(), 2)].into();

        let ranked = finalize(shortlisted, &prev);
        let order: Vec<(&str, usize)> = ranked
            .iter()
            .map(|r| (r.keyword.keyword_id.as_str(), r.rank))
            .collect();
        assert_eq!(order, vec![("c", 1), ("a", 2), ("b", 3)]);

        let c = &ranked[0];
        assert!(c.is_new);
        assert_eq!(c.delta_rank, 0);
        assert!((c.scores.total - 0.75).abs() < 1e-9);

        // A held rank 1 and fell to 2: delta is negative.
        assert_eq!(ranked[1].delta_rank, -1);
        assert!(!ranked[1].is_new);
        assert_eq!(ranked[2].delta_rank, -1);
    }

    #[test]
    fn shortlist_caps_at_top_ranked() {
        let now = Utc::now();
        let keywords: Vec<NormalizedKeyword> = (0..30)
            .map(|i| keyword(&format!("kw{i:02}"), 1 + i % 5, 1, Tier::P2Raw, now))
            .collect();
        assert_eq!(shortlist(keywords, now).len(), TOP_RANKED);
    }

    #[test]
    fn round4_matches_persisted_precision() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.1), 0.1);
    }
}
