//! AppState — read-only data handed to components during render and event
//! handling. Only the App event loop writes to it.

use std::sync::Arc;

use crate::info::InfoTable;
use crate::tree::{visible_rows, TreeNode, VisibleRow};

pub struct AppState {
    pub root: Arc<TreeNode>,
    /// Flattened visible tree, rebuilt before every key dispatch and draw.
    pub rows: Vec<VisibleRow>,
    /// Snapshot of the info table.
    pub info: InfoTable,
    /// Tail of the log file (debug pane only).
    pub log_lines: Vec<String>,
    /// Node resolutions still running.
    pub in_flight: usize,
}

impl AppState {
    pub fn new(root: Arc<TreeNode>) -> Self {
        Self {
            root,
            rows: Vec::new(),
            info: InfoTable::default(),
            log_lines: Vec::new(),
            in_flight: 0,
        }
    }

    pub fn refresh_rows(&mut self) {
        self.rows = visible_rows(&self.root);
    }
}
