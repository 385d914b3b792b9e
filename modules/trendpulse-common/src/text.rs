//! Keyword-id slugs and Hangul-aware text helpers.

/// Hangul syllables, Jamo, and compatibility Jamo.
pub fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}

pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(is_hangul)
}

/// Deterministic keyword id for a canonical string.
///
/// ASCII-friendly canonicals slug directly; Hangul-bearing canonicals (or
/// degenerate ones with fewer than two alphanumerics) fall back to a 32-bit
/// rolling hash rendered in base36.
///
/// ```
/// assert_eq!(trendpulse_common::keyword_id("GPT-4o"), "gpt_4o");
/// assert_eq!(trendpulse_common::keyword_id("Claude Code"), "claude_code");
/// assert!(trendpulse_common::keyword_id("온디바이스 AI").starts_with("kw_"));
/// ```
pub fn keyword_id(text: &str) -> String {
    let canonical = text.trim();
    if !contains_hangul(canonical) {
        if let Some(slug) = ascii_slug(canonical) {
            return slug;
        }
    }
    format!("kw_{}", base36(rolling_hash(canonical)))
}

/// Lowercase, collapse punctuation runs to a single underscore, keep
/// `[a-z0-9_]`. None when fewer than two alphanumerics survive.
fn ascii_slug(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    let alnum = out.chars().filter(|c| c.is_ascii_alphanumeric()).count();
    (alnum >= 2).then_some(out)
}

/// `h = h*31 + codepoint (mod 2^32)` over the string's chars.
fn rolling_hash(text: &str) -> u32 {
    let mut h: u32 = 0;
    for c in text.chars() {
        h = h.wrapping_mul(31).wrapping_add(c as u32);
    }
    h
}

fn base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

/// Strip Hangul runs and normalize separators, leaving the ASCII remnant of a
/// partially-transliterated keyword ("클로드 Code" -> "Code").
pub fn strip_hangul(text: &str) -> String {
    let ascii: String = text
        .chars()
        .map(|c| if is_hangul(c) { ' ' } else { c })
        .collect();
    ascii
        .split_whitespace()
        .map(|t| t.trim_matches(['-', '_', '·']))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased host with a leading `www.` removed. None for unparseable URLs.
pub fn host_of(link: &str) -> Option<String> {
    let parsed = url::Url::parse(link).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_id_is_deterministic() {
        assert_eq!(keyword_id("Mistral Large 3"), keyword_id("Mistral Large 3"));
        assert_eq!(keyword_id("온디바이스 AI"), keyword_id("온디바이스 AI"));
    }

    #[test]
    fn ascii_slug_collapses_punctuation() {
        assert_eq!(keyword_id("GPT-4o mini"), "gpt_4o_mini");
        assert_eq!(keyword_id("Llama 3.1"), "llama_3_1");
        assert_eq!(keyword_id("  DeepSeek-V3  "), "deepseek_v3");
    }

    #[test]
    fn hangul_canonicals_hash_with_prefix() {
        let id = keyword_id("생성형 AI");
        assert!(id.starts_with("kw_"));
        assert!(id.len() > 3);
    }

    #[test]
    fn too_short_ascii_falls_back_to_hash() {
        assert!(keyword_id("X").starts_with("kw_"));
        assert!(keyword_id("-").starts_with("kw_"));
    }

    #[test]
    fn distinct_ascii_canonicals_get_distinct_slugs() {
        assert_ne!(keyword_id("Claude Code"), keyword_id("Claude Teams"));
    }

    #[test]
    fn strip_hangul_keeps_ascii_remnant() {
        assert_eq!(strip_hangul("클로드 Code"), "Code");
        assert_eq!(strip_hangul("엔비디아-Blackwell 칩"), "Blackwell");
    }

    #[test]
    fn host_of_normalizes() {
        assert_eq!(
            host_of("https://www.Example.COM/a/b").as_deref(),
            Some("example.com")
        );
        assert_eq!(host_of("not a url"), None);
    }
}
