//! In-memory stand-ins for the catalog, process and download capabilities.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use futures_util::future::{self, BoxFuture, FutureExt};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use vod_proto::catalog::{Channel, Driver, Episode, Event, Season, Session, Team, VodType};
use vod_proto::config::Config;

use crate::catalog::CatalogSource;
use crate::command::process::{Launched, OutputStream, ProcessLauncher};
use crate::download::Downloader;
use crate::services::Services;

pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

// ── catalog ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CatalogData {
    vod_types: Vec<VodType>,
    episodes: HashMap<String, Episode>,
    seasons: Vec<Season>,
    events: HashMap<String, Vec<Event>>,
    sessions: HashMap<String, Vec<Session>>,
    drivers: HashMap<String, Driver>,
    teams: HashMap<String, Team>,
    unplayable: HashSet<String>,
    live: Option<Session>,
    failing: HashSet<&'static str>,
}

#[derive(Default)]
pub struct FakeCatalog {
    data: Mutex<CatalogData>,
    calls: Mutex<HashMap<&'static str, usize>>,
    driver_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeCatalog {
    pub fn stream_url(content_id: &str) -> String {
        format!("https://stream.test/{}.m3u8", content_id.trim_matches('/'))
    }

    fn data(&self) -> std::sync::MutexGuard<'_, CatalogData> {
        self.data.lock().unwrap()
    }

    pub fn calls(&self, kind: &str) -> usize {
        self.calls.lock().unwrap().get(kind).copied().unwrap_or(0)
    }

    fn record_call(&self, kind: &'static str) -> Result<()> {
        *self.calls.lock().unwrap().entry(kind).or_default() += 1;
        if self.data().failing.contains(kind) {
            return Err(anyhow!("{} fetch failed", kind));
        }
        Ok(())
    }

    /// Make every call of `kind` fail.
    pub fn fail(&self, kind: &'static str) {
        self.data().failing.insert(kind);
    }

    /// Hold driver fetches until permits are added to the returned gate.
    pub fn gate_drivers(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.driver_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn add_vod_type(&self, name: &str, content_urls: &[&str]) {
        self.data().vod_types.push(VodType {
            name: name.to_string(),
            content_urls: argv(content_urls),
            ..Default::default()
        });
    }

    pub fn add_episode(&self, id: &str, title: &str) -> Episode {
        let episode = Episode {
            uid: id.trim_matches('/').replace('/', "_"),
            title: title.to_string(),
            self_url: id.to_string(),
            items: vec![format!("{}asset/", id)],
            ..Default::default()
        };
        self.insert_episode(episode.clone());
        episode
    }

    pub fn insert_episode(&self, episode: Episode) {
        self.data().episodes.insert(episode.self_url.clone(), episode);
    }

    pub fn add_season(&self, id: &str, name: &str, year: i32) -> Season {
        let season = Season {
            name: name.to_string(),
            year,
            self_url: id.to_string(),
            has_content: true,
            ..Default::default()
        };
        self.data().seasons.push(season.clone());
        season
    }

    pub fn add_event(&self, season_id: &str, id: &str, name: &str, start_date: &str) -> Event {
        let event = Event {
            name: name.to_string(),
            self_url: id.to_string(),
            start_date: start_date.to_string(),
            ..Default::default()
        };
        self.data()
            .events
            .entry(season_id.to_string())
            .or_default()
            .push(event.clone());
        event
    }

    /// Add a session to `event_id` with one channel per `(id, name)` pair.
    pub fn add_session(&self, event_id: &str, id: &str, name: &str, channels: &[(&str, &str)]) -> Session {
        let session = Session {
            name: name.to_string(),
            self_url: id.to_string(),
            status: "replay".to_string(),
            channel_urls: channels
                .iter()
                .map(|(cid, cname)| Channel {
                    name: cname.to_string(),
                    self_url: cid.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        self.data()
            .sessions
            .entry(event_id.to_string())
            .or_default()
            .push(session.clone());
        session
    }

    pub fn add_driver(&self, id: &str, first: &str, last: &str, number: i32) {
        self.data().drivers.insert(
            id.to_string(),
            Driver {
                first_name: first.to_string(),
                last_name: last.to_string(),
                racing_number: number,
                self_url: id.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn add_team(&self, id: &str, name: &str) {
        self.data().teams.insert(
            id.to_string(),
            Team {
                name: name.to_string(),
                self_url: id.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn set_live(&self, session: Session) {
        self.data().live = Some(session);
    }

    pub fn make_unplayable(&self, content_id: &str) {
        self.data().unplayable.insert(content_id.to_string());
    }
}

impl CatalogSource for FakeCatalog {
    fn vod_types(&self) -> BoxFuture<'_, Result<Vec<VodType>>> {
        async move {
            self.record_call("vod_types")?;
            Ok(self.data().vod_types.clone())
        }
        .boxed()
    }

    fn episode<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Episode>> {
        async move {
            self.record_call("episode")?;
            self.data()
                .episodes
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow!("no episode {}", id))
        }
        .boxed()
    }

    fn seasons(&self) -> BoxFuture<'_, Result<Vec<Season>>> {
        async move {
            self.record_call("seasons")?;
            Ok(self.data().seasons.clone())
        }
        .boxed()
    }

    fn events<'a>(&'a self, season: &'a Season) -> BoxFuture<'a, Result<Vec<Event>>> {
        async move {
            self.record_call("events")?;
            Ok(self
                .data()
                .events
                .get(&season.self_url)
                .cloned()
                .unwrap_or_default())
        }
        .boxed()
    }

    fn sessions<'a>(&'a self, event: &'a Event) -> BoxFuture<'a, Result<Vec<Session>>> {
        async move {
            self.record_call("sessions")?;
            Ok(self
                .data()
                .sessions
                .get(&event.self_url)
                .cloned()
                .unwrap_or_default())
        }
        .boxed()
    }

    fn driver<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Driver>> {
        async move {
            self.record_call("driver")?;
            let gate = self.driver_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.acquire().await?.forget();
            }
            self.data()
                .drivers
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow!("no driver {}", id))
        }
        .boxed()
    }

    fn team<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Team>> {
        async move {
            self.record_call("team")?;
            self.data()
                .teams
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow!("no team {}", id))
        }
        .boxed()
    }

    fn playable_url<'a>(&'a self, content_id: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            self.record_call("playable_url")?;
            if self.data().unplayable.contains(content_id) {
                return Err(anyhow!("no stream for {}", content_id));
            }
            Ok(Self::stream_url(content_id))
        }
        .boxed()
    }

    fn live_session(&self) -> BoxFuture<'_, Result<Option<Session>>> {
        async move {
            self.record_call("live_session")?;
            Ok(self.data().live.clone())
        }
        .boxed()
    }
}

// ── processes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum FakeExit {
    Code(i32),
    /// The process never exits.
    Pending,
    /// `launch` itself fails.
    LaunchError,
}

#[derive(Default)]
pub struct FakeLauncher {
    exits: Mutex<HashMap<String, FakeExit>>,
    outputs: Mutex<HashMap<String, String>>,
    launches: Mutex<Vec<(Vec<String>, bool)>>,
}

impl FakeLauncher {
    pub fn script(&self, program: &str, exit: FakeExit) {
        self.exits.lock().unwrap().insert(program.to_string(), exit);
    }

    pub fn stdout(&self, program: &str, text: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(program.to_string(), text.to_string());
    }

    /// Every argv passed to `launch`, including failed launches.
    pub fn launches(&self) -> Vec<Vec<String>> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .map(|(argv, _)| argv.clone())
            .collect()
    }

    /// Whether stdout was requested, per launch.
    pub fn captured(&self) -> Vec<bool> {
        self.launches.lock().unwrap().iter().map(|(_, c)| *c).collect()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, argv: &[String], capture_stdout: bool) -> io::Result<Launched> {
        self.launches
            .lock()
            .unwrap()
            .push((argv.to_vec(), capture_stdout));

        let program = argv.first().cloned().unwrap_or_default();
        let exit = self
            .exits
            .lock()
            .unwrap()
            .get(&program)
            .copied()
            .unwrap_or(FakeExit::Code(0));

        let exit = match exit {
            FakeExit::LaunchError => {
                return Err(io::Error::new(io::ErrorKind::NotFound, program));
            }
            FakeExit::Pending => future::pending().boxed(),
            FakeExit::Code(code) => future::ready(Ok(exit_status(code))).boxed(),
        };
        let stdout = capture_stdout.then(|| {
            let text = self
                .outputs
                .lock()
                .unwrap()
                .get(&program)
                .cloned()
                .unwrap_or_default();
            Box::pin(io::Cursor::new(text.into_bytes())) as OutputStream
        });
        Ok(Launched { stdout, exit })
    }
}

// ── downloads ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDownloader {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeDownloader {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Downloader for FakeDownloader {
    fn download<'a>(&'a self, _url: &'a str, suggested_name: &'a str) -> BoxFuture<'a, Result<PathBuf>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("download refused"));
            }
            Ok(PathBuf::from("/downloads").join(format!("{}.m3u8", suggested_name)))
        }
        .boxed()
    }
}

// ── logs ──────────────────────────────────────────────────────────────────────

/// Collects formatted tracing output for assertions.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Route this thread's tracing output into the buffer until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── wiring ────────────────────────────────────────────────────────────────────

/// A `Services` built from fakes, with its config file in a temp dir.
pub struct TestRig {
    pub services: Arc<Services>,
    pub catalog: Arc<FakeCatalog>,
    pub launcher: Arc<FakeLauncher>,
    pub downloader: Arc<FakeDownloader>,
    pub dir: TempDir,
}

impl TestRig {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(FakeCatalog::default());
        let launcher = Arc::new(FakeLauncher::default());
        let downloader = Arc::new(FakeDownloader::default());
        let services = Services::new(
            catalog.clone(),
            launcher.clone(),
            downloader.clone(),
            config,
            dir.path().join("config.toml"),
        );
        Self {
            services,
            catalog,
            launcher,
            downloader,
            dir,
        }
    }
}
