//! New-release check against a GitHub-style "latest release" feed.

use anyhow::{Context, Result};
use futures_util::future::{BoxFuture, FutureExt};
use serde::Deserialize;

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Release {
    pub tag_name: String,
    /// Page to send the user to for the download.
    pub html_url: String,
}

pub trait UpdateChecker: Send + Sync {
    fn latest_release(&self) -> BoxFuture<'_, Result<Release>>;
}

pub struct ReleaseFeed {
    client: reqwest::Client,
    url: String,
}

impl ReleaseFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    async fn fetch(&self) -> Result<Release> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .header("User-Agent", concat!("vodnav/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .context("Failed to fetch release feed")?;

        if !response.status().is_success() {
            anyhow::bail!("release feed returned status: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse release feed")
    }
}

impl UpdateChecker for ReleaseFeed {
    fn latest_release(&self) -> BoxFuture<'_, Result<Release>> {
        self.fetch().boxed()
    }
}

fn version_parts(tag: &str) -> Option<Vec<u64>> {
    tag.trim()
        .trim_start_matches(&['v', 'V'][..])
        .split('.')
        .map(|p| p.parse().ok())
        .collect()
}

/// Whether `tag` names a different release than `current`. Dotted numeric
/// versions only count when strictly newer.
pub fn is_update(tag: &str, current: &str) -> bool {
    if tag.trim().is_empty() {
        return false;
    }
    match (version_parts(tag), version_parts(current)) {
        (Some(latest), Some(current)) => latest > current,
        _ => tag.trim().trim_start_matches(&['v', 'V'][..]) != current,
    }
}
