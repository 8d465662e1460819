//! `$url` / `$file` expansion for one activation of a command chain.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::download::Downloader;

pub const URL_TOKEN: &str = "$url";
pub const FILE_TOKEN: &str = "$file";

/// Per-activation state: the resolved stream URL and, once something asks for
/// `$file`, the local playlist copy. The download happens at most once per
/// run; a failed download expands to an empty string for the rest of the run.
pub struct CommandRun {
    url: String,
    title: String,
    downloader: Arc<dyn Downloader>,
    file: OnceCell<String>,
}

impl CommandRun {
    pub fn new(url: impl Into<String>, title: impl Into<String>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            downloader,
            file: OnceCell::new(),
        }
    }

    async fn local_file(&self) -> &str {
        self.file
            .get_or_init(|| async {
                match self.downloader.download(&self.url, &self.title).await {
                    Ok(path) => {
                        info!("downloaded {} to {}", self.title, path.display());
                        path.display().to_string()
                    }
                    Err(e) => {
                        warn!("download for {} failed: {:#}", self.title, e);
                        String::new()
                    }
                }
            })
            .await
    }

    /// Replace every placeholder in every token of `argv`.
    pub async fn expand(&self, argv: &[String]) -> Vec<String> {
        let mut expanded = Vec::with_capacity(argv.len());
        for token in argv {
            let mut token = token.clone();
            if token.contains(FILE_TOKEN) {
                token = token.replace(FILE_TOKEN, self.local_file().await);
            }
            expanded.push(token.replace(URL_TOKEN, &self.url));
        }
        expanded
    }
}
