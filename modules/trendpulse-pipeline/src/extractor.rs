//! LLM keyword extraction over batched titles, with a regex fallback and the
//! deterministic filter chain behind it.

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use trendpulse_common::{keyword_id, Item, TrendpulseError};

use crate::filters;
use crate::traits::Chat;

const BATCH_SIZE: usize = 200;

/// Trailing domain-action words stripped before canonical comparison
/// ("Claude 출시" and "Claude" are the same keyword).
const TRAILING_ACTION_WORDS: &[&str] = &[
    "도입", "채택", "활용", "공개", "출시", "발표", "확대", "추진", "적용", "업데이트", "통합",
    "지원", "강화", "개선",
];

/// What the LLM returns for each keyword.
#[derive(Debug, Clone, Deserialize)]
pub struct RawKeyword {
    pub keyword: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A keyword that survived merge, dedup, and the filter chain.
#[derive(Debug, Clone)]
pub struct ExtractedKeyword {
    pub keyword_id: String,
    pub keyword: String,
    pub aliases: Vec<String>,
}

pub struct Extractor<'a> {
    chat: &'a dyn Chat,
}

impl<'a> Extractor<'a> {
    pub fn new(chat: &'a dyn Chat) -> Self {
        Self { chat }
    }

    /// Run the full extraction pipeline over the collected items.
    pub async fn extract(&self, items: &[Item]) -> Vec<ExtractedKeyword> {
        let titles = batch_titles(items);
        if titles.is_empty() {
            return Vec::new();
        }

        let mut merged: HashMap<String, RawKeyword> = HashMap::new();
        for batch in titles.chunks(BATCH_SIZE) {
            match self.extract_batch(batch).await {
                Ok(raws) => merge_raw(&mut merged, raws),
                Err(e) => warn!(batch_size = batch.len(), error = %e, "extraction batch skipped"),
            }
        }

        if merged.is_empty() {
            info!("LLM extraction yielded nothing, running regex fallback");
            merge_raw(&mut merged, fallback_keywords(&titles));
        }

        let deduped = dedup_trailing_actions(merged);

        let mut out = Vec::new();
        for raw in deduped.into_values() {
            if let Some(reason) = filters::drop_reason(&raw.keyword) {
                tracing::debug!(keyword = raw.keyword, reason, "keyword filtered");
                continue;
            }
            out.push(ExtractedKeyword {
                keyword_id: keyword_id(&raw.keyword),
                keyword: raw.keyword.trim().to_string(),
                aliases: raw.aliases,
            });
        }

        info!(keywords = out.len(), "extraction complete");
        out
    }

    async fn extract_batch(&self, titles: &[String]) -> Result<Vec<RawKeyword>> {
        let user_prompt = titles
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .chat
            .chat(EXTRACTION_SYSTEM_PROMPT, &user_prompt, 0.0)
            .await?;

        let raws = parse_keyword_array(&response)?;
        if raws.is_empty() {
            return Err(TrendpulseError::Extraction("empty keyword array".into()).into());
        }
        Ok(raws)
    }
}

/// Trimmed, case-insensitively deduplicated titles, stably sorted so
/// higher-authority titles lead each batch.
fn batch_titles(items: &[Item]) -> Vec<String> {
    let mut sorted: Vec<&Item> = items.iter().collect();
    sorted.sort_by_key(|i| i.tier);

    let mut seen = std::collections::HashSet::new();
    sorted
        .into_iter()
        .filter_map(|i| {
            let title = i.title.trim();
            (!title.is_empty() && seen.insert(title.to_lowercase())).then(|| title.to_string())
        })
        .collect()
}

/// The response must be a JSON array of `{keyword, aliases[]}`; markdown
/// fences around it are tolerated by slicing the outermost brackets. Anything
/// else is an extraction error scoped to its batch.
pub(crate) fn parse_keyword_array(
    response: &str,
) -> std::result::Result<Vec<RawKeyword>, TrendpulseError> {
    let start = response
        .find('[')
        .ok_or_else(|| TrendpulseError::Extraction("no JSON array in response".into()))?;
    let end = response
        .rfind(']')
        .filter(|&end| end > start)
        .ok_or_else(|| TrendpulseError::Extraction("unterminated JSON array in response".into()))?;

    let raws: Vec<RawKeyword> = serde_json::from_str(&response[start..=end])
        .map_err(|e| TrendpulseError::Extraction(format!("malformed keyword array: {e}")))?;
    Ok(raws
        .into_iter()
        .filter(|r| !r.keyword.trim().is_empty())
        .collect())
}

/// Case-insensitive merge with alias union.
fn merge_raw(merged: &mut HashMap<String, RawKeyword>, raws: Vec<RawKeyword>) {
    for raw in raws {
        let canonical = raw.keyword.trim().to_lowercase();
        match merged.get_mut(&canonical) {
            Some(existing) => {
                for alias in raw.aliases {
                    let lower = alias.to_lowercase();
                    if lower != canonical
                        && !existing.aliases.iter().any(|a| a.to_lowercase() == lower)
                    {
                        existing.aliases.push(alias);
                    }
                }
            }
            None => {
                merged.insert(canonical, raw);
            }
        }
    }
}

fn camel_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+$").expect("valid camel-case regex")
    })
}

fn versioned_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]+-?\d+(?:\.\d+)*$").expect("valid version regex"))
}

/// Zero-LLM fallback: CamelCase identifiers and version-numbered names pulled
/// straight out of the titles.
fn fallback_keywords(titles: &[String]) -> Vec<RawKeyword> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for title in titles {
        for token in title.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if token.chars().count() < 4 {
                continue;
            }
            if !camel_case_re().is_match(token) && !versioned_re().is_match(token) {
                continue;
            }
            if seen.insert(token.to_lowercase()) {
                out.push(RawKeyword {
                    keyword: token.to_string(),
                    aliases: Vec::new(),
                });
            }
        }
    }
    out
}

/// Strip a trailing action word before comparing canonicals; collisions merge
/// aliases and keep the stripped display form.
fn dedup_trailing_actions(merged: HashMap<String, RawKeyword>) -> HashMap<String, RawKeyword> {
    let mut out: HashMap<String, RawKeyword> = HashMap::new();
    for (_, raw) in merged {
        let stripped = strip_trailing_action(raw.keyword.trim());
        let canonical = stripped.to_lowercase();
        match out.get_mut(&canonical) {
            Some(existing) => {
                for alias in collision_aliases(&raw, &stripped) {
                    let lower = alias.to_lowercase();
                    if lower != canonical
                        && !existing.aliases.iter().any(|a| a.to_lowercase() == lower)
                    {
                        existing.aliases.push(alias);
                    }
                }
            }
            None => {
                let aliases = collision_aliases(&raw, &stripped)
                    .into_iter()
                    .filter(|a| a.to_lowercase() != canonical)
                    .collect();
                out.insert(
                    canonical,
                    RawKeyword {
                        keyword: stripped,
                        aliases,
                    },
                );
            }
        }
    }
    out
}

fn collision_aliases(raw: &RawKeyword, stripped: &str) -> Vec<String> {
    let mut aliases = raw.aliases.clone();
    if raw.keyword.trim() != stripped {
        aliases.push(raw.keyword.trim().to_string());
    }
    aliases
}

fn strip_trailing_action(keyword: &str) -> String {
    let words: Vec<&str> = keyword.split_whitespace().collect();
    if words.len() > 1 && TRAILING_ACTION_WORDS.contains(words.last().expect("non-empty")) {
        return words[..words.len() - 1].join(" ");
    }
    keyword.to_string()
}

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract trending AI-related keywords from a batch of news titles.

Rules:
- Each keyword is a named concept: a product, model, company, framework, technique, or event.
- 1-3 words, never more than 4.
- Preserve product and version names verbatim ("GPT-4o", "Llama 3.1", "Claude Code").
- Never output an article headline or a full sentence.
- Never output generic umbrella terms ("AI", "generative AI", "AI model", "AI agent", "LLM") or phrases made only of such words.
- Korean titles yield Korean keywords unless the concept has an established English name.
- Target 20-35 keywords for the whole batch.

Output: a JSON array, nothing else. Each element:
{"keyword": "display form", "aliases": ["alternative surface forms seen in the titles"]}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_fenced_arrays() {
        let plain = r#"[{"keyword":"GPT-4o","aliases":["gpt4o"]}]"#;
        assert_eq!(parse_keyword_array(plain).unwrap().len(), 1);

        let fenced = "```json\n[{\"keyword\":\"Claude Code\",\"aliases\":[]}]\n```";
        let parsed = parse_keyword_array(fenced).unwrap();
        assert_eq!(parsed[0].keyword, "Claude Code");
    }

    #[test]
    fn rejects_non_array_responses() {
        assert!(parse_keyword_array("no keywords today").is_err());
        assert!(parse_keyword_array(r#"{"keyword":"x"}"#).is_err());
    }

    #[test]
    fn merge_unions_aliases_case_insensitively() {
        let mut merged = HashMap::new();
        merge_raw(
            &mut merged,
            vec![RawKeyword {
                keyword: "Claude Code".into(),
                aliases: vec!["클로드 코드".into()],
            }],
        );
        merge_raw(
            &mut merged,
            vec![RawKeyword {
                keyword: "claude code".into(),
                aliases: vec!["클로드 코드".into(), "Claude CLI".into()],
            }],
        );
        assert_eq!(merged.len(), 1);
        let kw = &merged["claude code"];
        assert_eq!(kw.aliases.len(), 2);
    }

    #[test]
    fn trailing_action_words_collapse() {
        let mut merged = HashMap::new();
        merge_raw(
            &mut merged,
            vec![
                RawKeyword {
                    keyword: "하이퍼클로바X 출시".into(),
                    aliases: vec![],
                },
                RawKeyword {
                    keyword: "하이퍼클로바X".into(),
                    aliases: vec![],
                },
            ],
        );
        let deduped = dedup_trailing_actions(merged);
        assert_eq!(deduped.len(), 1);
        let kw = deduped.values().next().unwrap();
        assert_eq!(kw.keyword, "하이퍼클로바X");
        assert!(kw.aliases.iter().any(|a| a == "하이퍼클로바X 출시"));
    }

    #[test]
    fn fallback_finds_camel_case_and_versions() {
        let titles = vec![
            "DeepSeek releases new coder".to_string(),
            "Llama-3 beats the benchmark".to_string(),
            "the rest is noise".to_string(),
        ];
        let raws = fallback_keywords(&titles);
        let keywords: Vec<&str> = raws.iter().map(|r| r.keyword.as_str()).collect();
        assert!(keywords.contains(&"DeepSeek"));
        assert!(keywords.contains(&"Llama-3"));
        assert_eq!(keywords.len(), 2);
    }
}
