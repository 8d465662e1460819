//! HTTP client for the VOD catalog API.

use anyhow::{Context, Result};
use futures_util::future::{join_all, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use vod_proto::catalog::{Driver, Episode, Event, Season, Session, Team, VodType};

use super::{CatalogError, CatalogSource};

const VOD_TYPES_PATH: &str =
    "/api/vod-type-tag/?fields=uid,name,description,self,content_urls&order=name";
const SEASONS_PATH: &str = "/api/race-season/?fields=uid,name,year,self,has_content,eventoccurrence_urls&year__gt=2017&order=year";
const EVENT_FIELDS: &str =
    "fields=uid,name,official_name,self,start_date,end_date,sessionoccurrence_urls,winner_url,circuit_url";
const SESSION_FIELDS: &str = "fields=uid,name,session_name,status,self,start_time,end_time,channel_urls,channel_urls__uid,channel_urls__name,channel_urls__channel_type,channel_urls__self,driver_urls,winner_url&fields_to_expand=channel_urls";
const LIVE_PATH: &str = "/api/session-occurrence/?status=live";
const VIEWINGS_PATH: &str = "/api/viewings/";

/// List endpoints wrap their results in `{"objects": [...]}`.
#[derive(Debug, Deserialize)]
struct Objects<T> {
    objects: Vec<T>,
}

pub struct ApiClient {
    base: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base, path)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status(),
                url,
            }
            .into());
        }

        response
            .json()
            .await
            .with_context(|| format!("failed to decode {}", url))
    }

    /// Fetch every path concurrently, keep successes in input order.
    async fn get_each<T: DeserializeOwned>(&self, paths: &[String], query: &str) -> Vec<T> {
        let requests = paths.iter().map(|path| {
            let sep = if path.contains('?') { '&' } else { '?' };
            let full = format!("{}{}{}", path, sep, query);
            async move { (full.clone(), self.get_json::<T>(&full).await) }
        });

        join_all(requests)
            .await
            .into_iter()
            .filter_map(|(path, result)| match result {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("skipping {}: {:#}", path, e);
                    None
                }
            })
            .collect()
    }

    async fn fetch_playable_url(&self, content_id: &str) -> Result<String> {
        let body = if content_id.contains("/channels/") {
            json!({ "channel_url": content_id })
        } else {
            json!({ "asset_url": content_id })
        };
        let url = self.url(VIEWINGS_PATH);
        debug!("POST {} for {}", url, content_id);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("viewing request for {} failed", content_id))?;
        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status(),
                url,
            }
            .into());
        }

        let value: Value = response
            .json()
            .await
            .context("failed to decode viewing response")?;
        extract_tokenised_url(&value)
            .ok_or_else(|| CatalogError::NoPlayableUrl(content_id.to_string()).into())
    }
}

/// Channels answer `{"tokenised_url": "..."}`, assets answer
/// `{"objects": [{"tokenised_url": {"url": "..."}}]}`.
fn extract_tokenised_url(value: &Value) -> Option<String> {
    if let Some(url) = value.get("tokenised_url").and_then(Value::as_str) {
        return Some(url.to_string());
    }
    value
        .get("objects")?
        .as_array()?
        .iter()
        .find_map(|obj| obj.get("tokenised_url")?.get("url")?.as_str())
        .map(str::to_string)
}

impl CatalogSource for ApiClient {
    fn vod_types(&self) -> BoxFuture<'_, Result<Vec<VodType>>> {
        async move {
            let list: Objects<VodType> = self.get_json(VOD_TYPES_PATH).await?;
            Ok(list.objects)
        }
        .boxed()
    }

    fn episode<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Episode>> {
        self.get_json(id).boxed()
    }

    fn seasons(&self) -> BoxFuture<'_, Result<Vec<Season>>> {
        async move {
            let list: Objects<Season> = self.get_json(SEASONS_PATH).await?;
            Ok(list.objects)
        }
        .boxed()
    }

    fn events<'a>(&'a self, season: &'a Season) -> BoxFuture<'a, Result<Vec<Event>>> {
        async move {
            Ok(self
                .get_each(&season.eventoccurrence_urls, EVENT_FIELDS)
                .await)
        }
        .boxed()
    }

    fn sessions<'a>(&'a self, event: &'a Event) -> BoxFuture<'a, Result<Vec<Session>>> {
        async move {
            Ok(self
                .get_each(&event.sessionoccurrence_urls, SESSION_FIELDS)
                .await)
        }
        .boxed()
    }

    fn driver<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Driver>> {
        self.get_json(id).boxed()
    }

    fn team<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Team>> {
        self.get_json(id).boxed()
    }

    fn playable_url<'a>(&'a self, content_id: &'a str) -> BoxFuture<'a, Result<String>> {
        self.fetch_playable_url(content_id).boxed()
    }

    fn live_session(&self) -> BoxFuture<'_, Result<Option<Session>>> {
        async move {
            let path = format!("{}&{}", LIVE_PATH, SESSION_FIELDS);
            let list = self.get_json::<Objects<Session>>(&path).await?;
            Ok(list.objects.into_iter().next())
        }
        .boxed()
    }
}
