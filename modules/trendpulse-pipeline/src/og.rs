//! OG-image backfill: scrape page meta for the first sources that arrived
//! without an image.

use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use scraper::{Html, Selector};
use tracing::debug;

use crate::enricher::EnrichedSource;

/// Sentinel written when no image could be found; the column is non-null.
pub const DEFAULT_IMAGE: &str = "/images/source-default.png";

/// Sources probed per keyword.
const MAX_PROBES: usize = 10;
/// Probes in flight at once.
const PROBE_FANOUT: usize = 5;

#[async_trait]
pub trait ImageProber: Send + Sync {
    /// Best-effort image URL for a page. None on any failure.
    async fn probe(&self, url: &str) -> Option<String>;
}

pub struct OgImageProber {
    client: reqwest::Client,
}

impl OgImageProber {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for OgImageProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageProber for OgImageProber {
    async fn probe(&self, url: &str) -> Option<String> {
        let resp = self
            .client
            .get(url)
            .header("User-Agent", "trendpulse-pipeline/0.1")
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;
        let html = resp.text().await.ok()?;
        let image = extract_page_image(&html, url);
        debug!(url, found = image.is_some(), "og probe");
        image
    }
}

/// Meta priority: `og:image`, `twitter:image`, then `link[rel=icon]`.
pub(crate) fn extract_page_image(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let base = url::Url::parse(base_url).ok();

    let selectors = [
        "meta[property=\"og:image\"]",
        "meta[name=\"og:image\"]",
        "meta[name=\"twitter:image\"]",
        "meta[property=\"twitter:image\"]",
    ];
    for raw in selectors {
        let sel = Selector::parse(raw).expect("valid meta selector");
        if let Some(content) = document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            return resolve(content, base.as_ref());
        }
    }

    let icon_sel = Selector::parse("link[rel~=\"icon\"]").expect("valid icon selector");
    document
        .select(&icon_sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .and_then(|href| resolve(href, base.as_ref()))
}

fn resolve(candidate: &str, base: Option<&url::Url>) -> Option<String> {
    if candidate.starts_with("http") {
        return Some(candidate.to_string());
    }
    base.and_then(|b| b.join(candidate).ok()).map(|u| u.to_string())
}

/// Probe pages for the first `MAX_PROBES` image-less sources, `PROBE_FANOUT`
/// at a time, and backfill in place.
pub async fn backfill_images(prober: &dyn ImageProber, sources: &mut [EnrichedSource]) {
    let targets: Vec<usize> = sources
        .iter()
        .enumerate()
        .filter(|(_, s)| s.image_url.is_none() && s.url.starts_with("http"))
        .map(|(idx, _)| idx)
        .take(MAX_PROBES)
        .collect();

    let probed: Vec<(usize, Option<String>)> =
        stream::iter(targets.into_iter().map(|idx| {
            let url = sources[idx].url.clone();
            async move { (idx, prober.probe(&url).await) }
        }))
        .buffer_unordered(PROBE_FANOUT)
        .collect()
        .await;

    for (idx, image) in probed {
        if let Some(image) = image {
            sources[idx].image_url = Some(image);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_image_wins_over_icon() {
        let html = r#"<html><head>
            <link rel="icon" href="/favicon.ico">
            <meta property="og:image" content="https://cdn.a.com/hero.png">
        </head></html>"#;
        assert_eq!(
            extract_page_image(html, "https://a.com/post"),
            Some("https://cdn.a.com/hero.png".to_string())
        );
    }

    #[test]
    fn twitter_image_and_relative_urls_resolve() {
        let html = r#"<html><head>
            <meta name="twitter:image" content="/img/card.png">
        </head></html>"#;
        assert_eq!(
            extract_page_image(html, "https://a.com/post"),
            Some("https://a.com/img/card.png".to_string())
        );
    }

    #[test]
    fn icon_is_the_last_resort() {
        let html = r#"<html><head><link rel="icon" href="/favicon.ico"></head></html>"#;
        assert_eq!(
            extract_page_image(html, "https://a.com/"),
            Some("https://a.com/favicon.ico".to_string())
        );
        assert_eq!(extract_page_image("<html></html>", "https://a.com/"), None);
    }
}
