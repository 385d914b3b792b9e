//! The configured source catalog: which feeds, channels, repos, and pages the
//! collector watches, and the tier each family carries.

use trendpulse_common::{Lang, Tier};

use crate::adapters::changelog::ChangelogStrategy;
use crate::adapters::rss::FeedSpec;
use crate::adapters::youtube::ChannelSpec;

/// Curated and context RSS/Atom feeds.
pub fn feeds() -> Vec<FeedSpec> {
    vec![
        FeedSpec {
            url: "https://www.aitimes.com/rss/allArticle.xml",
            title: "AI타임스",
            tier: Tier::P0Curated,
            lang: Lang::Ko,
        },
        FeedSpec {
            url: "https://openai.com/news/rss.xml",
            title: "OpenAI News",
            tier: Tier::P0Curated,
            lang: Lang::En,
        },
        FeedSpec {
            url: "https://blog.google/technology/ai/rss/",
            title: "Google AI Blog",
            tier: Tier::P0Curated,
            lang: Lang::En,
        },
        FeedSpec {
            url: "https://huggingface.co/blog/feed.xml",
            title: "Hugging Face Blog",
            tier: Tier::P0Curated,
            lang: Lang::En,
        },
        FeedSpec {
            url: "https://techcrunch.com/category/artificial-intelligence/feed/",
            title: "TechCrunch AI",
            tier: Tier::P1Context,
            lang: Lang::En,
        },
        FeedSpec {
            url: "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml",
            title: "The Verge AI",
            tier: Tier::P1Context,
            lang: Lang::En,
        },
        FeedSpec {
            url: "https://venturebeat.com/category/ai/feed/",
            title: "VentureBeat AI",
            tier: Tier::P1Context,
            lang: Lang::En,
        },
        FeedSpec {
            url: "https://zdnet.co.kr/news/news_xml.asp",
            title: "지디넷코리아",
            tier: Tier::P2Raw,
            lang: Lang::Ko,
        },
        FeedSpec {
            url: "https://www.technologyreview.com/feed/",
            title: "MIT Technology Review",
            tier: Tier::P2Raw,
            lang: Lang::En,
        },
    ]
}

/// YouTube channels; Hangul in the name marks a Korean channel.
pub fn youtube_channels() -> Vec<ChannelSpec> {
    vec![
        ChannelSpec {
            channel_id: "UCbfYPyITQ-7l4upoX8nvctg",
            name: "Two Minute Papers",
        },
        ChannelSpec {
            channel_id: "UCNJ1Ymd5yFuUPtn21xtRbbw",
            name: "AI Explained",
        },
        ChannelSpec {
            channel_id: "UCQNE2JmbasNYbjGAcuBiRRg",
            name: "조코딩 JoCoding",
        },
    ]
}

/// Repos whose releases feed the P1 context tier.
pub fn tracked_repos() -> Vec<&'static str> {
    vec![
        "huggingface/transformers",
        "langchain-ai/langchain",
        "vllm-project/vllm",
        "ollama/ollama",
        "ggml-org/llama.cpp",
        "comfyanonymous/ComfyUI",
    ]
}

/// Community repo search seed; the adapter appends the window bound.
pub const GITHUB_SEARCH_QUERY: &str = "ai agent in:name,description";

/// Algolia queries for the HN adapter.
pub fn hn_queries() -> Vec<&'static str> {
    vec!["AI", "LLM"]
}

/// GDELT DOC query with source-language bounds.
pub const GDELT_QUERY: &str =
    "(\"artificial intelligence\" OR \"generative AI\") (sourcelang:english OR sourcelang:korean)";

/// Curated daily-digest markdown folder.
pub const MARKDOWN_REPO: &str = "trendpulse-dev/ai-briefings";
pub const MARKDOWN_PATH: &str = "daily";

/// Link domains dropped from curated digests (discussion threads, not
/// articles).
pub fn social_skip_domains() -> Vec<&'static str> {
    vec![
        "x.com",
        "twitter.com",
        "facebook.com",
        "instagram.com",
        "threads.net",
        "linkedin.com",
        "reddit.com",
    ]
}

/// Vendor changelog pages without feeds.
pub fn changelog_strategies() -> Vec<ChangelogStrategy> {
    vec![
        ChangelogStrategy {
            name: "Anthropic Release Notes",
            url: "https://docs.anthropic.com/en/release-notes/overview",
            entry_selector: "article section.release",
            title_selector: "h3",
            date_selector: "time",
            lang: Lang::En,
        },
        ChangelogStrategy {
            name: "Cursor Changelog",
            url: "https://www.cursor.com/changelog",
            entry_selector: "article",
            title_selector: "h2",
            date_selector: "time",
            lang: Lang::En,
        },
        ChangelogStrategy {
            name: "OpenAI Platform Changelog",
            url: "https://platform.openai.com/docs/changelog",
            entry_selector: "div.changelog-entry",
            title_selector: "h3",
            date_selector: "div.changelog-date",
            lang: Lang::En,
        },
    ]
}
