//! Catalog access: the fetch capability the tree resolves against, plus the
//! per-kind record cache that sits in front of it.

pub mod api;
pub mod cache;

use anyhow::Result;
use futures_util::future::BoxFuture;
use thiserror::Error;
use vod_proto::catalog::{Driver, Episode, Event, Season, Session, Team, VodType};

pub use cache::CatalogCache;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog returned HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("no playable url in viewing response for {0}")]
    NoPlayableUrl(String),
}

/// Everything the navigator needs from the remote catalog.
///
/// IDs are the API `self` paths. Implementations make a single attempt per
/// call; caching is the caller's business (see [`CatalogCache`]).
pub trait CatalogSource: Send + Sync {
    fn vod_types(&self) -> BoxFuture<'_, Result<Vec<VodType>>>;

    fn episode<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Episode>>;

    fn seasons(&self) -> BoxFuture<'_, Result<Vec<Season>>>;

    /// All events of `season`, in the order the season lists them.
    fn events<'a>(&'a self, season: &'a Season) -> BoxFuture<'a, Result<Vec<Event>>>;

    /// All sessions of `event` with their channels expanded.
    fn sessions<'a>(&'a self, event: &'a Event) -> BoxFuture<'a, Result<Vec<Session>>>;

    fn driver<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Driver>>;

    fn team<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Team>>;

    /// Exchange an asset or channel ID for a tokenised stream URL.
    fn playable_url<'a>(&'a self, content_id: &'a str) -> BoxFuture<'a, Result<String>>;

    /// The session currently airing, if any.
    fn live_session(&self) -> BoxFuture<'_, Result<Option<Session>>>;
}
