//! Info pane model and the cancellable renderer that fills it.
//!
//! Only one render writes at a time: a new request cancels the active one and
//! waits for it to acknowledge (finish) before clearing the table.
//!
//! ```text
//!   request(A) ──▶ [A writes rows] ─── cancelled ──▶ A done ─┐
//!   request(B) ─── cancel A, wait ──────────────────────────┴─▶ clear ─▶ [B writes rows]
//! ```

pub mod describe;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vod_proto::catalog::CatalogRecord;

use crate::services::Services;
use crate::tree::{NodeRef, TreeNode};
use describe::{describe, Field, FieldValue, RefKind, TIME_FORMAT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct InfoTable {
    pub title: String,
    pub rows: Vec<InfoRow>,
}

#[derive(Clone, Default)]
pub struct SharedTable(Arc<Mutex<InfoTable>>);

impl SharedTable {
    pub fn snapshot(&self) -> InfoTable {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InfoTable> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self, title: String) {
        let mut table = self.lock();
        table.title = title;
        table.rows.clear();
    }

    fn push(&self, row: InfoRow) {
        self.lock().rows.push(row);
    }
}

#[derive(Debug, Clone)]
pub enum InfoSubject {
    Record(CatalogRecord),
    Clear,
}

/// What the info pane should show for `node`: its record, a cleared table
/// for plain containers, or `None` to leave the table as it is.
pub fn subject_for(node: &TreeNode, services: &Services) -> Option<InfoSubject> {
    let reference = node.reference();
    if let NodeRef::Category(index) = reference {
        if let Some(vod_type) = services.vod_type(index) {
            return Some(InfoSubject::Record(CatalogRecord::VodCategory(vod_type)));
        }
    }
    if let Some(record) = reference.record() {
        return Some(InfoSubject::Record(record));
    }
    node.has_children().then_some(InfoSubject::Clear)
}

struct ActiveRender {
    token: CancellationToken,
    finished: watch::Receiver<bool>,
}

pub struct InfoRenderer {
    services: Arc<Services>,
    table: SharedTable,
    active: Mutex<Option<ActiveRender>>,
}

impl InfoRenderer {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            table: SharedTable::default(),
            active: Mutex::new(None),
        }
    }

    pub fn table(&self) -> &SharedTable {
        &self.table
    }

    /// Replace whatever is displayed with `subject`, superseding any render
    /// still in progress.
    pub fn request(&self, subject: InfoSubject) {
        let token = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(false);
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ActiveRender {
                token: token.clone(),
                finished: done_rx,
            });
        if let Some(previous) = &previous {
            previous.token.cancel();
        }

        let services = Arc::clone(&self.services);
        let table = self.table.clone();
        tokio::spawn(async move {
            if let Some(mut previous) = previous {
                let _ = previous.finished.wait_for(|done| *done).await;
            }
            if !token.is_cancelled() {
                match subject {
                    InfoSubject::Record(record) => {
                        table.reset(record.title().to_string());
                        services.redraw.request();
                        write_rows(&services, &table, &token, &describe(&record)).await;
                    }
                    InfoSubject::Clear => table.reset(String::new()),
                }
            }
            let _ = done_tx.send(true);
            services.redraw.request();
        });
    }

    /// Wait until the most recent request has finished.
    #[cfg(test)]
    pub async fn wait_idle(&self) {
        let finished = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|a| a.finished.clone());
        if let Some(mut finished) = finished {
            let _ = finished.wait_for(|done| *done).await;
        }
    }
}

/// Write `fields` row by row. Returns early, without writing, once `token`
/// is cancelled.
async fn write_rows(services: &Services, table: &SharedTable, token: &CancellationToken, fields: &[Field]) {
    for field in fields.iter().filter(|f| !f.is_empty()) {
        let written = match &field.value {
            FieldValue::Nested(nested) => {
                let mut ok = write_row(services, table, token, field.label.to_string(), String::new());
                for inner in nested.iter().filter(|f| !f.is_empty()) {
                    if !ok {
                        break;
                    }
                    let label = format!("  {}", inner.label);
                    ok = write_values(services, table, token, label, &inner.value).await;
                }
                ok
            }
            value => write_values(services, table, token, field.label.to_string(), value).await,
        };
        if !written {
            return;
        }
    }
}

/// One row per value; only the first carries the label.
async fn write_values(
    services: &Services,
    table: &SharedTable,
    token: &CancellationToken,
    label: String,
    value: &FieldValue,
) -> bool {
    let values: Vec<String> = match value {
        FieldValue::Text(text) => text.lines().map(str::to_string).collect(),
        FieldValue::List(items) => items.clone(),
        FieldValue::Refs(kind, ids) => {
            let mut names = Vec::with_capacity(ids.len());
            for id in ids {
                tokio::select! {
                    _ = token.cancelled() => return false,
                    name = resolve_ref(services, *kind, id) => names.push(name),
                }
            }
            names
        }
        FieldValue::Time(Some(t)) => vec![t.format(TIME_FORMAT).to_string()],
        FieldValue::Time(None) => Vec::new(),
        FieldValue::Flag(b) => vec![b.to_string()],
        FieldValue::Number(n) => vec![n.to_string()],
        // one level of nesting only
        FieldValue::Nested(_) => Vec::new(),
    };

    let mut label = Some(label);
    for value in values {
        if !write_row(services, table, token, label.take().unwrap_or_default(), value) {
            return false;
        }
    }
    true
}

fn write_row(services: &Services, table: &SharedTable, token: &CancellationToken, label: String, value: String) -> bool {
    if token.is_cancelled() {
        return false;
    }
    table.push(InfoRow { label, value });
    services.redraw.request();
    true
}

async fn resolve_ref(services: &Services, kind: RefKind, id: &str) -> String {
    let catalog = services.catalog.as_ref();
    let resolved = match kind {
        RefKind::Driver => services.cache.driver(catalog, id).await.map(|d| d.display_name()),
        RefKind::Team => services.cache.team(catalog, id).await.map(|t| t.name),
    };
    resolved.unwrap_or_else(|e| {
        debug!("could not resolve {:?} {}: {:#}", kind, id, e);
        id.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use vod_proto::catalog::{Episode, Season, Session};

    use crate::testing::TestRig;
    use crate::theme::C_NODE_BRANCH;

    fn rows(table: &SharedTable) -> Vec<(String, String)> {
        table
            .snapshot()
            .rows
            .into_iter()
            .map(|r| (r.label, r.value))
            .collect()
    }

    fn pair(label: &str, value: &str) -> (String, String) {
        (label.to_string(), value.to_string())
    }

    async fn idle(renderer: &InfoRenderer) {
        tokio::time::timeout(Duration::from_secs(2), renderer.wait_idle())
            .await
            .expect("render did not finish");
    }

    #[tokio::test]
    async fn renders_episode_fields_with_resolved_names() {
        let rig = TestRig::new();
        rig.catalog.add_driver("/api/driver/1/", "Max", "Verstappen", 1);
        rig.catalog.add_team("/api/team/rbr/", "Red Bull Racing");
        let episode = Episode {
            title: "Race".to_string(),
            synopsis: "Lights out.\nAway we go.".to_string(),
            created: Some(Utc.with_ymd_and_hms(2021, 12, 12, 13, 0, 0).unwrap()),
            driver_urls: vec!["/api/driver/1/".to_string(), "/api/driver/unknown/".to_string()],
            team_urls: vec!["/api/team/rbr/".to_string()],
            ..Default::default()
        };
        let renderer = InfoRenderer::new(Arc::clone(&rig.services));

        renderer.request(InfoSubject::Record(CatalogRecord::Episode(episode)));
        idle(&renderer).await;

        assert_eq!(renderer.table().snapshot().title, "Race");
        assert_eq!(
            rows(renderer.table()),
            vec![
                pair("Title", "Race"),
                pair("Synopsis", "Lights out."),
                pair("", "Away we go."),
                pair("Created", "2021-12-12 13:00:00"),
                pair("Drivers", "Max Verstappen (1)"),
                pair("", "/api/driver/unknown/"),
                pair("Teams", "Red Bull Racing"),
            ]
        );
    }

    #[tokio::test]
    async fn asset_urls_stack_under_one_label() {
        let rig = TestRig::new();
        let episode = Episode {
            title: "Highlights".to_string(),
            items: vec!["/api/assets/1/".to_string(), "/api/assets/2/".to_string()],
            data_source_id: "2103".to_string(),
            ..Default::default()
        };
        let renderer = InfoRenderer::new(Arc::clone(&rig.services));

        renderer.request(InfoSubject::Record(CatalogRecord::Episode(episode)));
        idle(&renderer).await;

        assert_eq!(
            rows(renderer.table()),
            vec![
                pair("Title", "Highlights"),
                pair("Assets", "/api/assets/1/"),
                pair("", "/api/assets/2/"),
                pair("Race ID", "2103"),
            ]
        );
    }

    #[tokio::test]
    async fn nested_fields_get_a_separator_row() {
        let rig = TestRig::new();
        let session = Session {
            name: "Race".to_string(),
            channel_urls: vec![vod_proto::catalog::Channel {
                name: "Main Feed".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let renderer = InfoRenderer::new(Arc::clone(&rig.services));

        renderer.request(InfoSubject::Record(CatalogRecord::Session(session)));
        idle(&renderer).await;

        assert_eq!(
            rows(renderer.table()),
            vec![pair("Name", "Race"), pair("Perspective", ""), pair("  Name", "Main Feed")]
        );
    }

    #[tokio::test]
    async fn newer_request_supersedes_stale_render() {
        let rig = TestRig::new();
        let gate = rig.catalog.gate_drivers();
        rig.catalog.add_driver("/api/driver/16/", "Charles", "Leclerc", 16);
        let slow = Episode {
            title: "Slow".to_string(),
            driver_urls: vec!["/api/driver/16/".to_string()],
            team_urls: vec!["/api/team/fer/".to_string()],
            ..Default::default()
        };
        let fast = Season {
            name: "2022".to_string(),
            year: 2022,
            ..Default::default()
        };
        let renderer = InfoRenderer::new(Arc::clone(&rig.services));

        renderer.request(InfoSubject::Record(CatalogRecord::Episode(slow)));
        tokio::time::timeout(Duration::from_secs(2), async {
            while rig.catalog.calls("driver") == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("driver lookup never started");
        assert_eq!(rows(renderer.table()), vec![pair("Title", "Slow")]);

        renderer.request(InfoSubject::Record(CatalogRecord::Season(fast)));
        idle(&renderer).await;
        gate.add_permits(1);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(renderer.table().snapshot().title, "2022");
        assert_eq!(
            rows(renderer.table()),
            vec![pair("Name", "2022"), pair("Year", "2022"), pair("Has content", "false")]
        );
        assert_eq!(rig.catalog.calls("team"), 0);
    }

    #[tokio::test]
    async fn containers_clear_and_plain_leaves_keep_the_table() {
        let rig = TestRig::new();
        let container = TreeNode::new("Full Race Weekends", C_NODE_BRANCH)
            .with_children(vec![TreeNode::new("2019", C_NODE_BRANCH).into_arc()]);
        let leaf = TreeNode::new("Play with MPV", C_NODE_BRANCH);

        assert!(matches!(subject_for(&container, &rig.services), Some(InfoSubject::Clear)));
        assert!(subject_for(&leaf, &rig.services).is_none());

        let renderer = InfoRenderer::new(Arc::clone(&rig.services));
        renderer.request(InfoSubject::Record(CatalogRecord::Season(Season {
            name: "2019".to_string(),
            ..Default::default()
        })));
        renderer.request(InfoSubject::Clear);
        idle(&renderer).await;
        assert!(rows(renderer.table()).is_empty());
    }
}
