//! Deterministic hard-drop filters applied after LLM extraction.
//!
//! The LLM prompt forbids most of these shapes already; the filters are the
//! safety net that holds when it drifts. Applied in a fixed order, first
//! match wins.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use trendpulse_common::contains_hangul;

/// Exact canonical strings that are never keywords on their own.
fn generic_terms() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        [
            "ai",
            "인공지능",
            "생성형 ai",
            "생성형ai",
            "generative ai",
            "ai 모델",
            "ai model",
            "llm",
            "대규모 언어모델",
            "거대언어모델",
            "machine learning",
            "머신러닝",
            "deep learning",
            "딥러닝",
            "chatbot",
            "챗봇",
            "ai agent",
            "ai 에이전트",
            "에이전트",
            "agent",
            "모델",
            "model",
            "데이터",
            "data",
            "플랫폼",
            "platform",
            "서비스",
            "service",
            "기술",
            "technology",
            "솔루션",
            "solution",
            "자동화",
            "automation",
            "neural network",
            "인공신경망",
        ]
        .into_iter()
        .collect()
    })
}

/// Word-level generic vocabulary for the phrase-shaped filters.
fn generic_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        [
            "ai",
            "artificial",
            "intelligence",
            "model",
            "models",
            "agent",
            "agents",
            "data",
            "platform",
            "platforms",
            "service",
            "services",
            "system",
            "systems",
            "tech",
            "technology",
            "solution",
            "solutions",
            "tool",
            "tools",
            "software",
            "digital",
            "smart",
            "machine",
            "learning",
            "deep",
            "generative",
            "assistant",
            "assistants",
            "chatbot",
            "chatbots",
            "automation",
            "workflow",
            "enterprise",
            "startup",
            "industry",
            "market",
            "인공지능",
            "생성형",
            "모델",
            "에이전트",
            "데이터",
            "플랫폼",
            "서비스",
            "시스템",
            "기술",
            "솔루션",
            "도구",
            "소프트웨어",
            "디지털",
            "스마트",
            "학습",
            "자동화",
            "프로젝트",
            "설계",
            "개발",
            "구축",
            "관리",
            "분석",
            "검색",
            "추천",
            "생성",
            "전략",
            "혁신",
            "산업",
            "시장",
            "교육",
            "업무",
            "기업",
            "비서",
        ]
        .into_iter()
        .collect()
    })
}

/// Off-topic vocabulary: a keyword touching these is not an AI trend.
fn non_topic_terms() -> &'static [&'static str] {
    &[
        "주식",
        "증시",
        "코스피",
        "코스닥",
        "부동산",
        "환율",
        "금리",
        "비트코인",
        "bitcoin",
        "암호화폐",
        "crypto",
        "블록체인",
        "blockchain",
        "nft",
        "야구",
        "축구",
        "올림픽",
        "월드컵",
        "대선",
        "선거",
        "총선",
        "날씨",
        "태풍",
    ]
}

/// English function words and Korean standalone particles ignored when
/// counting significant words.
fn insignificant_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        [
            "the", "a", "an", "of", "for", "and", "or", "in", "on", "with", "to", "by", "at",
            "은", "는", "이", "가", "을", "를", "의", "와", "과", "및", "등", "로", "으로", "에",
            "에서", "부터", "까지",
        ]
        .into_iter()
        .collect()
    })
}

fn agent_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^ai[ -](agents?|에이전트)\b").expect("valid agent prefix regex")
    })
}

fn generic_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^ai[ -](기반|모델|투자|학습용|활용|powered|based|driven|enabled)\b")
            .expect("valid generic prefix regex")
    })
}

fn headline_ending_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(했다|한다|된다|이다|입니다|습니다|합니다|네요|세요|어요|아요|하나|할까|될까|을까)$")
            .expect("valid headline ending regex")
    })
}

fn counter_expression_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d+\s*(종|개|건|가지|곳|명|원|억|조)").expect("valid counter regex")
    })
}

fn transliteration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[가-힣]-[A-Za-z0-9]|[A-Za-z0-9]-[가-힣]")
            .expect("valid transliteration regex")
    })
}

/// Why a keyword was dropped. None means it survives.
pub fn drop_reason(keyword: &str) -> Option<&'static str> {
    let canonical = keyword.trim().to_lowercase();
    if canonical.is_empty() {
        return Some("empty");
    }

    if generic_terms().contains(canonical.as_str()) {
        return Some("generic-term");
    }
    // The dedicated AI-prefix shapes run ahead of the word-set test so a
    // phrase like "AI Agent System" is attributed to its own rule.
    if is_generic_ai_agent_phrase(&canonical) {
        return Some("generic-ai-agent");
    }
    if is_generic_ai_prefix_phrase(&canonical) {
        return Some("generic-ai-prefix");
    }
    if is_all_generic_phrase(&canonical) {
        return Some("generic-phrase");
    }
    if significant_word_count(&canonical) > 4 {
        return Some("too-many-words");
    }
    if is_headline(&canonical) {
        return Some("headline");
    }
    if is_non_topic(&canonical) {
        return Some("non-topic");
    }
    if is_transliteration_remnant(&canonical) {
        return Some("transliteration-remnant");
    }
    None
}

/// Multi-word phrase where every word of length >= 3 is generic vocabulary.
fn is_all_generic_phrase(canonical: &str) -> bool {
    let words: Vec<&str> = canonical.split_whitespace().collect();
    if words.len() < 2 {
        return false;
    }
    let significant: Vec<&str> = words.iter().copied().filter(|w| w.chars().count() >= 3).collect();
    !significant.is_empty() && significant.iter().all(|w| generic_words().contains(w))
}

/// "AI agent ..." / "AI 에이전트 ..." with only generic words after.
pub fn is_generic_ai_agent_phrase(canonical: &str) -> bool {
    let Some(m) = agent_prefix_re().find(canonical) else {
        return false;
    };
    tail_is_generic(&canonical[m.end()..])
}

/// "AI 기반 ..." / "AI-powered ..." with only generic words after.
pub fn is_generic_ai_prefix_phrase(canonical: &str) -> bool {
    let Some(m) = generic_prefix_re().find(canonical) else {
        return false;
    };
    tail_is_generic(&canonical[m.end()..])
}

fn tail_is_generic(tail: &str) -> bool {
    tail.split_whitespace().all(|w| generic_words().contains(w))
}

fn significant_word_count(canonical: &str) -> usize {
    canonical
        .split_whitespace()
        .filter(|w| !insignificant_words().contains(w))
        .count()
}

/// Korean article-headline shapes: sentence-final endings, quote marks, and
/// counter expressions.
fn is_headline(canonical: &str) -> bool {
    if canonical
        .chars()
        .any(|c| matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}' | '「' | '」' | '…'))
    {
        return true;
    }
    if counter_expression_re().is_match(canonical) {
        return true;
    }
    let Some(last) = canonical.split_whitespace().last() else {
        return false;
    };
    contains_hangul(last) && headline_ending_re().is_match(last)
}

fn is_non_topic(canonical: &str) -> bool {
    non_topic_terms().iter().any(|t| canonical.contains(t))
}

/// Mixed-script hyphenation left over from a half-transliterated phrase
/// ("엔비디아-GPU"); the ASCII variant already covers the real keyword.
fn is_transliteration_remnant(canonical: &str) -> bool {
    contains_hangul(canonical) && transliteration_re().is_match(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_generic_terms_are_dropped() {
        assert_eq!(drop_reason("AI"), Some("generic-term"));
        assert_eq!(drop_reason("인공지능"), Some("generic-term"));
        assert_eq!(drop_reason("생성형 AI"), Some("generic-term"));
        assert_eq!(drop_reason("LLM"), Some("generic-term"));
    }

    #[test]
    fn all_generic_phrases_are_dropped() {
        assert_eq!(drop_reason("AI 데이터 플랫폼"), Some("generic-phrase"));
        assert_eq!(drop_reason("smart data platform"), Some("generic-phrase"));
    }

    #[test]
    fn generic_agent_phrases_are_dropped() {
        assert_eq!(drop_reason("AI Agent System"), Some("generic-ai-agent"));
        assert_eq!(drop_reason("AI 에이전트 플랫폼"), Some("generic-ai-agent"));
        // A named agent product is not generic.
        assert_eq!(drop_reason("AI Agent Claude"), None);
    }

    #[test]
    fn generic_ai_prefix_phrases_are_dropped() {
        assert_eq!(
            drop_reason("AI 기반 프로젝트 설계 에이전트"),
            Some("generic-ai-prefix")
        );
        assert_eq!(drop_reason("AI-powered assistant"), Some("generic-ai-prefix"));
        // A concrete product name after the prefix survives the prefix rule.
        assert_eq!(drop_reason("AI 기반 Copilot Workspace"), None);
    }

    #[test]
    fn product_and_version_names_are_retained() {
        assert_eq!(drop_reason("GPT-4o"), None);
        assert_eq!(drop_reason("Claude Code"), None);
        assert_eq!(drop_reason("Llama 3.1"), None);
        assert_eq!(drop_reason("온디바이스 NPU"), None);
    }

    #[test]
    fn long_phrases_are_dropped() {
        assert_eq!(
            drop_reason("New open source framework for building multimodal pipelines"),
            Some("too-many-words")
        );
        // Particles do not count as significant words.
        assert_eq!(drop_reason("삼성전자의 가우스 온디바이스 모델"), None);
    }

    #[test]
    fn headline_shapes_are_dropped() {
        assert_eq!(drop_reason("오픈AI 새 모델 공개했다"), Some("headline"));
        assert_eq!(drop_reason("\"혁신\" 선언"), Some("headline"));
        assert_eq!(drop_reason("신규 모델 3종"), Some("headline"));
    }

    #[test]
    fn non_topic_keywords_are_dropped() {
        assert_eq!(drop_reason("비트코인 ETF"), Some("non-topic"));
        assert_eq!(drop_reason("AI 주식 전망"), Some("non-topic"));
    }

    #[test]
    fn transliteration_remnants_are_dropped() {
        assert_eq!(drop_reason("엔비디아-GPU"), Some("transliteration-remnant"));
        // Pure ASCII hyphenation is a version name, not a remnant.
        assert_eq!(drop_reason("GPT-4o mini"), None);
    }

    #[test]
    fn filter_order_stops_at_first_match() {
        // "ai agent" is both an exact generic term and an agent phrase; the
        // exact set fires first.
        assert_eq!(drop_reason("AI Agent"), Some("generic-term"));
    }
}
