//! Content tree model.
//!
//! Nodes are shared as `Arc<TreeNode>`; a parent holds the only strong
//! references to its children, so dropping a node drops its subtree. Each
//! node guards its mutable state with its own short-held lock so a resolving
//! task can attach children while the display loop reads the tree.
//!
//! ```text
//!   Unexpanded ──activate──▶ Loading ──▶ Expanded
//!                                   └──▶ EmptyTerminal (error colour, unselectable)
//! ```

pub mod navigator;
pub mod playback;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ratatui::style::Color;
use vod_proto::catalog::{CatalogRecord, Channel, Episode, Event, Season, Session};
use vod_proto::config::CommandChain;

use crate::theme::C_NODE_ERROR;

pub use navigator::Navigator;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePhase {
    Unexpanded,
    Loading,
    Expanded,
    EmptyTerminal,
}

/// What a node points at; decides what activating it does.
#[derive(Debug, Clone)]
pub enum NodeRef {
    /// Pure container (the root).
    None,
    /// Index into the top-level VOD category list.
    Category(usize),
    /// "Full Race Weekends" before its season list has been fetched.
    AllSeasons,
    /// "Full Race Weekends" after the fetch; reused by refresh.
    Seasons(Arc<Vec<Season>>),
    Season(Season),
    Event(Event),
    Session(Session),
    Perspective(Channel),
    Episode(Episode),
    Playback(PlaybackCommandContext),
    Action(LeafAction),
}

impl NodeRef {
    pub fn record(&self) -> Option<CatalogRecord> {
        match self {
            Self::Season(s) => Some(CatalogRecord::Season(s.clone())),
            Self::Event(e) => Some(CatalogRecord::Event(e.clone())),
            Self::Session(s) => Some(CatalogRecord::Session(s.clone())),
            Self::Perspective(c) => Some(CatalogRecord::Perspective(c.clone())),
            Self::Episode(e) => Some(CatalogRecord::Episode(e.clone())),
            Self::None
            | Self::Category(_)
            | Self::AllSeasons
            | Self::Seasons(_)
            | Self::Playback(_)
            | Self::Action(_) => None,
        }
    }
}

/// A configured command chain bound to one playable item.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackCommandContext {
    pub content_id: String,
    pub title: String,
    pub chain: CommandChain,
}

/// Side effects triggered by leaf nodes other than command chains.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafAction {
    DownloadPlaylist { content_id: String, title: String },
    CopyUrl { content_id: String },
    OpenReleasePage { url: String },
    DisableUpdateCheck,
}

struct NodeInner {
    label: String,
    color: Color,
    selectable: bool,
    expanded: bool,
    phase: NodePhase,
    reference: NodeRef,
    children: Vec<Arc<TreeNode>>,
}

pub struct TreeNode {
    id: u64,
    inner: RwLock<NodeInner>,
}

impl std::fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("label", &self.label())
            .finish()
    }
}

impl TreeNode {
    pub fn new(label: impl Into<String>, color: Color) -> Self {
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            inner: RwLock::new(NodeInner {
                label: label.into(),
                color,
                selectable: true,
                expanded: true,
                phase: NodePhase::Unexpanded,
                reference: NodeRef::None,
                children: Vec::new(),
            }),
        }
    }

    pub fn with_ref(self, reference: NodeRef) -> Self {
        self.write().reference = reference;
        self
    }

    pub fn unselectable(self) -> Self {
        self.write().selectable = false;
        self
    }

    pub fn collapsed(self) -> Self {
        self.write().expanded = false;
        self
    }

    /// Children known up front; the node starts out expanded-phase.
    pub fn with_children(self, children: Vec<Arc<TreeNode>>) -> Self {
        {
            let mut inner = self.write();
            inner.children = children;
            inner.phase = NodePhase::Expanded;
        }
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn read(&self) -> RwLockReadGuard<'_, NodeInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> String {
        self.read().label.clone()
    }

    pub fn set_label(&self, label: impl Into<String>) {
        self.write().label = label.into();
    }

    pub fn color(&self) -> Color {
        self.read().color
    }

    pub fn set_color(&self, color: Color) {
        self.write().color = color;
    }

    pub fn is_selectable(&self) -> bool {
        self.read().selectable
    }

    pub fn is_expanded(&self) -> bool {
        self.read().expanded
    }

    pub fn set_expanded(&self, expanded: bool) {
        self.write().expanded = expanded;
    }

    pub fn toggle_expanded(&self) {
        let mut inner = self.write();
        inner.expanded = !inner.expanded;
    }

    pub fn phase(&self) -> NodePhase {
        self.read().phase
    }

    pub fn reference(&self) -> NodeRef {
        self.read().reference.clone()
    }

    pub fn set_reference(&self, reference: NodeRef) {
        self.write().reference = reference;
    }

    /// Snapshot of the children attached so far.
    pub fn children(&self) -> Vec<Arc<TreeNode>> {
        self.read().children.clone()
    }

    pub fn has_children(&self) -> bool {
        !self.read().children.is_empty()
    }

    pub fn add_child(&self, child: Arc<TreeNode>) {
        self.write().children.push(child);
    }

    pub fn insert_child_at_top(&self, child: Arc<TreeNode>) {
        self.write().children.insert(0, child);
    }

    pub fn clear_children(&self) {
        self.write().children.clear();
    }

    /// Move `Unexpanded` → `Loading`. Returns false if another activation
    /// got there first or the node already has content.
    pub fn begin_loading(&self) -> bool {
        let mut inner = self.write();
        if inner.phase != NodePhase::Unexpanded || !inner.children.is_empty() {
            return false;
        }
        inner.phase = NodePhase::Loading;
        true
    }

    pub fn finish_loading(&self) {
        let mut inner = self.write();
        inner.phase = NodePhase::Expanded;
        inner.expanded = true;
    }

    /// Terminal failure: recolour, lock out, optionally suffix the label.
    pub fn mark_empty(&self, suffix: Option<&str>) {
        let mut inner = self.write();
        inner.phase = NodePhase::EmptyTerminal;
        inner.color = C_NODE_ERROR;
        inner.selectable = false;
        if let Some(suffix) = suffix {
            inner.label.push_str(suffix);
        }
    }
}

/// One line of the flattened, currently visible tree.
#[derive(Debug, Clone)]
pub struct VisibleRow {
    pub node: Arc<TreeNode>,
    pub depth: usize,
}

/// Depth-first walk of `root`, descending only into expanded nodes.
pub fn visible_rows(root: &Arc<TreeNode>) -> Vec<VisibleRow> {
    let mut rows = Vec::new();
    let mut stack = vec![(Arc::clone(root), 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if node.is_expanded() {
            for child in node.children().into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        rows.push(VisibleRow { node, depth });
    }
    rows
}
