// GitHub REST v3 adapters: release feeds for tracked repos, and repository
// search for community activity. Both require a token; the catalog skips them
// when none is configured.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use trendpulse_common::{Item, Lang, Tier};

use super::{clip, SourceAdapter, USER_AGENT};

const GITHUB_API: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const RELEASES_PER_REPO: u32 = 3;
const REPO_FANOUT: usize = 4;

fn github_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client")
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
}

pub struct GithubReleasesAdapter {
    client: reqwest::Client,
    token: String,
    repos: Vec<&'static str>,
}

impl GithubReleasesAdapter {
    pub fn new(token: &str, repos: Vec<&'static str>) -> Self {
        Self {
            client: github_client(),
            token: token.to_string(),
            repos,
        }
    }

    async fn releases_for(&self, repo: &str, cutoff: DateTime<Utc>) -> Result<Vec<Item>> {
        let resp = self
            .client
            .get(format!("{GITHUB_API}/repos/{repo}/releases"))
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
            .query(&[("per_page", RELEASES_PER_REPO.to_string())])
            .send()
            .await
            .context("GitHub releases request failed")?;

        // Repos without releases (or renamed repos) are not an error.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let releases: Vec<Release> = resp
            .error_for_status()
            .context("GitHub releases request rejected")?
            .json()
            .await
            .context("Failed to parse GitHub releases")?;

        Ok(releases
            .into_iter()
            .filter_map(|r| {
                if r.draft || r.prerelease {
                    return None;
                }
                let published_at = r.published_at?;
                if published_at < cutoff {
                    return None;
                }
                let label = r.name.filter(|n| !n.trim().is_empty()).unwrap_or(r.tag_name);
                Some(Item {
                    title: format!("{repo} {label}"),
                    link: r.html_url,
                    published_at,
                    summary: r.body.map(|b| clip(b.trim(), 500)).unwrap_or_default(),
                    source_domain: "github.com".to_string(),
                    feed_title: repo.to_string(),
                    tier: Tier::P1Context,
                    lang: Lang::En,
                })
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for GithubReleasesAdapter {
    fn name(&self) -> &'static str {
        "github-releases"
    }

    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>> {
        let cutoff = Utc::now() - chrono::Duration::hours(window_hours);

        let futures: Vec<_> = self
            .repos
            .iter()
            .map(|repo| async move { (*repo, self.releases_for(repo, cutoff).await) })
            .collect();
        let per_repo: Vec<_> = stream::iter(futures)
        .buffer_unordered(REPO_FANOUT)
        .collect()
        .await;

        let mut items = Vec::new();
        for (repo, result) in per_repo {
            match result {
                Ok(mut batch) => items.append(&mut batch),
                Err(e) => warn!(repo, error = %e, "releases fetch failed"),
            }
        }
        debug!(count = items.len(), "GitHub releases collected");
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct RepoSearchResponse {
    #[serde(default)]
    items: Vec<RepoHit>,
}

#[derive(Debug, Deserialize)]
struct RepoHit {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

pub struct GithubSearchAdapter {
    client: reqwest::Client,
    token: String,
    query: &'static str,
}

impl GithubSearchAdapter {
    pub fn new(token: &str, query: &'static str) -> Self {
        Self {
            client: github_client(),
            token: token.to_string(),
            query,
        }
    }
}

#[async_trait]
impl SourceAdapter for GithubSearchAdapter {
    fn name(&self) -> &'static str {
        "github-search"
    }

    async fn collect(&self, window_hours: i64) -> Result<Vec<Item>> {
        let cutoff = Utc::now() - chrono::Duration::hours(window_hours);
        let query = format!("{} created:>{}", self.query, cutoff.format("%Y-%m-%dT%H:%M:%SZ"));

        let resp = self
            .client
            .get(format!("{GITHUB_API}/search/repositories"))
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
            .query(&[
                ("q", query.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", "30"),
            ])
            .send()
            .await
            .context("GitHub search request failed")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let data: RepoSearchResponse = resp
            .error_for_status()
            .context("GitHub search request rejected")?
            .json()
            .await
            .context("Failed to parse GitHub search response")?;

        debug!(hits = data.items.len(), "GitHub repo search");

        Ok(data
            .items
            .into_iter()
            .filter_map(|hit| {
                let created_at = hit.created_at?;
                if created_at < cutoff || hit.full_name.is_empty() {
                    return None;
                }
                Some(Item {
                    title: hit.full_name.clone(),
                    link: hit.html_url,
                    published_at: created_at,
                    summary: hit
                        .description
                        .map(|d| clip(d.trim(), 500))
                        .unwrap_or_default(),
                    source_domain: "github.com".to_string(),
                    feed_title: "GitHub Search".to_string(),
                    tier: Tier::Community,
                    lang: Lang::En,
                })
            })
            .collect())
    }
}
