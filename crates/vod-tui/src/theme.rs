//! Color palette and style constants for the navigator.

use ratatui::style::{Color, Modifier, Style};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(18, 18, 18);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SELECTION_BG: Color = Color::Rgb(28, 28, 40);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(120, 100, 200);
pub const C_BADGE_PENDING: Color = Color::Rgb(255, 184, 80);

// ── Tree node colors ──────────────────────────────────────────────────────────

/// Root and finished action nodes.
pub const C_NODE_DONE: Color = Color::Rgb(80, 140, 200);
/// Expandable catalog nodes (categories, seasons, events).
pub const C_NODE_BRANCH: Color = Color::Rgb(255, 200, 80);
/// Sessions and perspectives.
pub const C_NODE_FEED: Color = Color::Rgb(100, 160, 130);
/// Episodes and playback options.
pub const C_NODE_LEAF: Color = Color::Rgb(210, 210, 225);
/// Failed or empty nodes, and the live session.
pub const C_NODE_ERROR: Color = Color::Rgb(255, 80, 80);
/// Indicator highlight while a node is busy.
pub const C_BLINK: Color = Color::Rgb(250, 250, 250);
/// Softer highlight for season loads.
pub const C_BLINK_WARM: Color = Color::Rgb(245, 222, 179);

/// Info table field labels.
pub const C_INFO_LABEL: Color = Color::Rgb(80, 140, 200);

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_selected() -> Style {
    Style::default()
        .bg(C_SELECTION_BG)
        .add_modifier(Modifier::BOLD)
}

pub fn style_focused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER_FOCUSED)
}

pub fn style_unfocused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER)
}
