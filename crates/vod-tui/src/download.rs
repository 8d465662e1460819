//! Local copies of HLS playlists.
//!
//! The stream URLs handed out by the catalog are tokenised master playlists
//! with relative segment URIs. Saving one to disk only makes it playable if
//! every URI is rewritten to absolute against the original URL first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures_util::future::{BoxFuture, FutureExt};
use reqwest::Url;
use tracing::info;

/// The download capability used by `$file` expansion and the download leaf.
pub trait Downloader: Send + Sync {
    fn download<'a>(&'a self, url: &'a str, suggested_name: &'a str)
        -> BoxFuture<'a, Result<PathBuf>>;
}

pub struct PlaylistDownloader {
    client: reqwest::Client,
    dir: PathBuf,
}

impl PlaylistDownloader {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            dir,
        }
    }

    async fn fetch_and_save(&self, url: &str, suggested_name: &str) -> Result<PathBuf> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch playlist {}", url))?;
        if !response.status().is_success() {
            anyhow::bail!("playlist fetch returned status: {}", response.status());
        }
        let body = response.text().await.context("failed to read playlist")?;

        let base = Url::parse(url).with_context(|| format!("invalid playlist url {}", url))?;
        let rewritten = rewrite_playlist(&body, &base);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = playlist_path(&self.dir, suggested_name);
        tokio::fs::write(&path, rewritten)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!("saved playlist {}", path.display());
        Ok(path)
    }
}

impl Downloader for PlaylistDownloader {
    fn download<'a>(
        &'a self,
        url: &'a str,
        suggested_name: &'a str,
    ) -> BoxFuture<'a, Result<PathBuf>> {
        self.fetch_and_save(url, suggested_name).boxed()
    }
}

pub fn playlist_path(dir: &Path, suggested_name: &str) -> PathBuf {
    dir.join(format!("{}.m3u8", sanitize_file_name(suggested_name)))
}

/// Keep letters, digits, spaces, `-`, `_` and `.`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

/// Make every URI line and `URI="..."` attribute absolute against `base`.
pub fn rewrite_playlist(body: &str, base: &Url) -> String {
    let mut out = String::with_capacity(body.len() + 256);
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push_str(line);
        } else if trimmed.starts_with('#') {
            out.push_str(&rewrite_uri_attribute(line, base));
        } else {
            out.push_str(&absolutize(trimmed, base));
        }
        out.push('\n');
    }
    out
}

fn rewrite_uri_attribute(line: &str, base: &Url) -> String {
    const KEY: &str = "URI=\"";
    let Some(start) = line.find(KEY).map(|i| i + KEY.len()) else {
        return line.to_string();
    };
    let Some(len) = line[start..].find('"') else {
        return line.to_string();
    };
    let uri = &line[start..start + len];
    format!(
        "{}{}{}",
        &line[..start],
        absolutize(uri, base),
        &line[start + len..]
    )
}

fn absolutize(uri: &str, base: &Url) -> String {
    base.join(uri)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| uri.to_string())
}
