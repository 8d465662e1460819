//! Action enum — user intents produced by components and dispatched by the App.

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Tree,
    Info,
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ── Tree ─────────────────────────────────────────────────────────────────
    /// Activate the node under the cursor.
    Activate,
    /// Rebuild the node under the cursor from data already fetched.
    Refresh,
    /// The cursor moved to a different node.
    SelectionChanged,

    // ── System ───────────────────────────────────────────────────────────────
    FocusNext,
    Quit,
}
