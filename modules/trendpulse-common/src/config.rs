use std::env;

use crate::schedule::parse_schedule;
use crate::types::TOP_RANKED;

/// Application configuration loaded from environment variables.
/// Parsed once at startup and treated as immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string (`DATABASE_URL`, falling back to `POSTGRES_URL`).
    pub database_url: String,

    // LLM (extraction, summaries, translation)
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: Option<String>,

    // External search
    pub tavily_api_key: String,

    // GitHub adapters (absent token disables them)
    pub github_token: Option<String>,

    // Trigger auth (absent disables the bearer check)
    pub cron_secret: Option<String>,

    /// Keywords receiving full enrichment (1..=TOP_RANKED).
    pub detailed_keywords: usize,
    /// Enrichment worker pool size (1..=10).
    pub keyword_concurrency: usize,
    /// Lightweight-insert pool size (1..=20).
    pub lightweight_concurrency: usize,

    /// UTC `HH:MM` slots the pipeline runs at, sorted ascending.
    pub schedule_utc: Vec<(u32, u32)>,

    pub enable_en_summary: bool,
    /// Sources fed to the summarizer (1..=10).
    pub summary_context_limit: usize,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if the database URL is missing.
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("POSTGRES_URL"))
            .unwrap_or_else(|_| panic!("DATABASE_URL (or POSTGRES_URL) is required"));

        Self {
            database_url,
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            tavily_api_key: env::var("TAVILY_API_KEY").unwrap_or_default(),
            github_token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            detailed_keywords: bounded_env("PIPELINE_DETAILED_KEYWORDS", 10, 1, TOP_RANKED),
            keyword_concurrency: bounded_env("PIPELINE_KEYWORD_CONCURRENCY", 3, 1, 10),
            lightweight_concurrency: bounded_env("PIPELINE_LIGHTWEIGHT_CONCURRENCY", 5, 1, 20),
            schedule_utc: parse_schedule(
                &env::var("PIPELINE_SCHEDULE_UTC").unwrap_or_else(|_| "0:17,9:17".to_string()),
            ),
            enable_en_summary: env::var("ENABLE_EN_SUMMARY")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            summary_context_limit: bounded_env("SUMMARY_CONTEXT_LIMIT", 5, 1, 10),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }

    /// Log the shape of each sensitive setting for debugging, never the value.
    pub fn log_redacted(&self) {
        let vars = [
            ("DATABASE_URL", &self.database_url),
            ("OPENAI_API_KEY", &self.openai_api_key),
            ("TAVILY_API_KEY", &self.tavily_api_key),
        ];
        for (name, value) in vars {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
        tracing::info!(
            github = self.github_token.is_some(),
            cron_secret = self.cron_secret.is_some(),
            model = %self.openai_model,
            detailed = self.detailed_keywords,
            "pipeline config"
        );
    }
}

fn bounded_env(key: &str, default: usize, min: usize, max: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_env_clamps_and_defaults() {
        // Unset vars take the default; the clamp holds for any parse result.
        assert_eq!(bounded_env("TRENDPULSE_TEST_UNSET_VAR", 10, 1, 20), 10);
        assert_eq!(7usize.clamp(1, 10), 7);
        assert_eq!(0usize.clamp(1, 10), 1);
        assert_eq!(99usize.clamp(1, 10), 10);
    }
}
