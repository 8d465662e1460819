//! Catalog record types as returned by the VOD API.
//!
//! Every record is addressed by its API `self` path (e.g.
//! `/api/race-season/race_abc/`), which doubles as the cache key.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Top-level VOD category ("Highlights", "Documentaries", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VodType {
    pub uid: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "self")]
    pub self_url: String,
    pub content_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Episode {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub synopsis: String,
    #[serde(rename = "self")]
    pub self_url: String,
    /// Year/race identifier, e.g. `"1905"` for race 5 of 2019.
    pub data_source_id: String,
    /// Asset URLs; the first one is the playable asset.
    pub items: Vec<String>,
    pub driver_urls: Vec<String>,
    pub team_urls: Vec<String>,
    #[serde(deserialize_with = "lenient_datetime")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Season {
    pub uid: String,
    pub name: String,
    pub year: i32,
    #[serde(rename = "self")]
    pub self_url: String,
    pub has_content: bool,
    pub eventoccurrence_urls: Vec<String>,
}

/// A race weekend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub uid: String,
    pub name: String,
    pub official_name: String,
    #[serde(rename = "self")]
    pub self_url: String,
    /// `YYYY-MM-DD`; kept as text because the API is not consistent about it.
    pub start_date: String,
    pub end_date: String,
    pub sessionoccurrence_urls: Vec<String>,
    pub winner_url: String,
    pub circuit_url: String,
}

impl Event {
    pub fn start(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.start_date.trim(), "%Y-%m-%d").ok()
    }
}

/// One session of a race weekend; its channels are the selectable perspectives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub uid: String,
    pub name: String,
    pub session_name: String,
    pub status: String,
    #[serde(rename = "self")]
    pub self_url: String,
    #[serde(deserialize_with = "lenient_datetime")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_datetime")]
    pub end_time: Option<DateTime<Utc>>,
    pub channel_urls: Vec<Channel>,
    pub driver_urls: Vec<String>,
    pub winner_url: String,
}

impl Session {
    pub fn display_name(&self) -> &str {
        if self.session_name.is_empty() {
            &self.name
        } else {
            &self.session_name
        }
    }
}

/// A single camera/feed of a session (main feed, onboard, data channel...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub uid: String,
    pub name: String,
    pub channel_type: String,
    #[serde(rename = "self")]
    pub self_url: String,
}

impl Channel {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.channel_type
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Driver {
    pub uid: String,
    pub first_name: String,
    pub last_name: String,
    pub racing_number: i32,
    #[serde(rename = "self")]
    pub self_url: String,
    pub team_url: String,
}

impl Driver {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        if self.racing_number > 0 {
            format!("{} ({})", name, self.racing_number)
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub uid: String,
    pub name: String,
    pub colour: String,
    #[serde(rename = "self")]
    pub self_url: String,
}

/// Any record the navigator can point a tree node at.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogRecord {
    VodCategory(VodType),
    Season(Season),
    Event(Event),
    Session(Session),
    Perspective(Channel),
    Episode(Episode),
}

impl CatalogRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::VodCategory(v) => &v.self_url,
            Self::Season(s) => &s.self_url,
            Self::Event(e) => &e.self_url,
            Self::Session(s) => &s.self_url,
            Self::Perspective(c) => &c.self_url,
            Self::Episode(e) => &e.self_url,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::VodCategory(v) => &v.name,
            Self::Season(s) => &s.name,
            Self::Event(e) => &e.name,
            Self::Session(s) => s.display_name(),
            Self::Perspective(c) => c.display_name(),
            Self::Episode(e) => &e.title,
        }
    }
}

// ── IDs ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("id {0:?} is too short")]
    TooShort(String),
    #[error("id {0:?} does not start with a numeric year/race prefix")]
    NotNumeric(String),
}

/// Split a year/race ID (`"1905"`, `"2019..."`) into full year and race number.
///
/// IDs from the 2018 and 2019 seasons carry the full year and no race number.
pub fn parse_year_and_race(input: &str) -> Result<(String, String), IdError> {
    let prefix = match input.get(..4) {
        Some(p) => p,
        None if input.chars().count() < 4 => return Err(IdError::TooShort(input.to_string())),
        None => return Err(IdError::NotNumeric(input.to_string())),
    };
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdError::NotNumeric(input.to_string()));
    }
    if prefix == "2018" || prefix == "2019" {
        return Ok((prefix.to_string(), "0".to_string()));
    }
    let (year, race) = prefix.split_at(2);
    let century = if year < "30" { "20" } else { "19" };
    Ok((format!("{}{}", century, year), race.to_string()))
}

// ── serde helpers ─────────────────────────────────────────────────────────────

/// Accepts RFC 3339, zone-less ISO timestamps, null or garbage (→ `None`).
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
