//! Per-record field lists for the info pane.

use chrono::{DateTime, Utc};
use vod_proto::catalog::{CatalogRecord, Channel, Episode, Event, Season, Session, VodType};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Driver,
    Team,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text; each line becomes its own row.
    Text(String),
    /// Stacked rows under one label.
    List(Vec<String>),
    /// Driver/team URLs, shown by name.
    Refs(RefKind, Vec<String>),
    Time(Option<DateTime<Utc>>),
    Flag(bool),
    Number(i64),
    Nested(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: &'static str,
    pub value: FieldValue,
}

impl Field {
    fn new(label: &'static str, value: FieldValue) -> Self {
        Self { label, value }
    }

    fn text(label: &'static str, value: &str) -> Self {
        Self::new(label, FieldValue::Text(value.to_string()))
    }

    /// Whether the field would render no rows at all.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(v) | FieldValue::Refs(_, v) => v.is_empty(),
            FieldValue::Time(t) => t.is_none(),
            FieldValue::Flag(_) => false,
            FieldValue::Number(n) => *n == 0,
            FieldValue::Nested(fields) => fields.iter().all(Field::is_empty),
        }
    }
}

/// Ordered fields for `record`. Winner fields are never included.
pub fn describe(record: &CatalogRecord) -> Vec<Field> {
    let fields = match record {
        CatalogRecord::VodCategory(v) => describe_vod_type(v),
        CatalogRecord::Season(s) => describe_season(s),
        CatalogRecord::Event(e) => describe_event(e),
        CatalogRecord::Session(s) => describe_session(s),
        CatalogRecord::Perspective(c) => describe_channel(c),
        CatalogRecord::Episode(e) => describe_episode(e),
    };
    fields.into_iter().filter(|f| !f.is_empty()).collect()
}

fn describe_vod_type(v: &VodType) -> Vec<Field> {
    vec![
        Field::text("Name", &v.name),
        Field::text("Description", &v.description),
        Field::new("Items", FieldValue::Number(v.content_urls.len() as i64)),
    ]
}

fn describe_season(s: &Season) -> Vec<Field> {
    vec![
        Field::text("Name", &s.name),
        Field::new("Year", FieldValue::Number(s.year.into())),
        Field::new("Has content", FieldValue::Flag(s.has_content)),
        Field::new("Events", FieldValue::Number(s.eventoccurrence_urls.len() as i64)),
    ]
}

fn describe_event(e: &Event) -> Vec<Field> {
    vec![
        Field::text("Name", &e.name),
        Field::text("Official name", &e.official_name),
        Field::text("Start date", &e.start_date),
        Field::text("End date", &e.end_date),
        Field::new("Sessions", FieldValue::Number(e.sessionoccurrence_urls.len() as i64)),
    ]
}

fn describe_session(s: &Session) -> Vec<Field> {
    let mut fields = vec![
        Field::text("Name", s.display_name()),
        Field::text("Status", &s.status),
        Field::new("Start time", FieldValue::Time(s.start_time)),
        Field::new("End time", FieldValue::Time(s.end_time)),
        Field::new("Drivers", FieldValue::Refs(RefKind::Driver, s.driver_urls.clone())),
    ];
    fields.extend(
        s.channel_urls
            .iter()
            .map(|c| Field::new("Perspective", FieldValue::Nested(describe_channel(c)))),
    );
    fields
}

fn describe_channel(c: &Channel) -> Vec<Field> {
    vec![
        Field::text("Name", &c.name),
        Field::text("Type", &c.channel_type),
    ]
}

fn describe_episode(e: &Episode) -> Vec<Field> {
    vec![
        Field::text("Title", &e.title),
        Field::text("Subtitle", &e.subtitle),
        Field::text("Synopsis", &e.synopsis),
        Field::new("Created", FieldValue::Time(e.created)),
        Field::new("Drivers", FieldValue::Refs(RefKind::Driver, e.driver_urls.clone())),
        Field::new("Teams", FieldValue::Refs(RefKind::Team, e.team_urls.clone())),
        Field::new("Assets", FieldValue::List(e.items.clone())),
        Field::text("Race ID", &e.data_source_id),
    ]
}
