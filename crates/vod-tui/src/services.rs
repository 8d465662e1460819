//! The context object handed to every component that touches the catalog,
//! the configuration or the display.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::Notify;
use vod_proto::catalog::VodType;
use vod_proto::config::Config;

use crate::catalog::{CatalogCache, CatalogSource};
use crate::command::process::ProcessLauncher;
use crate::download::Downloader;

/// Redraw request shared by background tasks and the display loop.
///
/// Requests coalesce: any number of `request()` calls before the loop wakes
/// produce a single redraw.
#[derive(Clone, Default)]
pub struct Redraw(Arc<Notify>);

impl Redraw {
    pub fn request(&self) {
        self.0.notify_one();
    }

    pub async fn wait(&self) {
        self.0.notified().await;
    }
}

pub struct Services {
    pub catalog: Arc<dyn CatalogSource>,
    pub cache: CatalogCache,
    pub launcher: Arc<dyn ProcessLauncher>,
    pub downloader: Arc<dyn Downloader>,
    pub redraw: Redraw,
    config: Mutex<Config>,
    config_path: PathBuf,
    vod_types: RwLock<Vec<VodType>>,
    in_flight: AtomicUsize,
}

impl Services {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        launcher: Arc<dyn ProcessLauncher>,
        downloader: Arc<dyn Downloader>,
        config: Config,
        config_path: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            cache: CatalogCache::new(),
            launcher,
            downloader,
            redraw: Redraw::default(),
            config: Mutex::new(config),
            config_path,
            vod_types: RwLock::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> Config {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `change` and persist the result. The in-memory config only
    /// changes once the file is written.
    pub fn update_config(&self, change: impl FnOnce(&mut Config)) -> anyhow::Result<()> {
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = config.clone();
        change(&mut updated);
        updated.save_to(&self.config_path)?;
        *config = updated;
        Ok(())
    }

    pub fn set_vod_types(&self, types: Vec<VodType>) {
        *self.vod_types.write().unwrap_or_else(PoisonError::into_inner) = types;
    }

    pub fn vod_type(&self, index: usize) -> Option<VodType> {
        self.vod_types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    /// Number of node resolutions currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub(crate) fn track(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard(Arc::clone(self))
    }
}

pub(crate) struct InFlightGuard(Arc<Services>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.0.redraw.request();
    }
}
