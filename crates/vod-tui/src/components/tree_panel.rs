//! TreePanel — the catalog tree with a cursor over selectable nodes.
//!
//! The cursor is tracked by node id, not row index, so nodes inserted above
//! it (live session, update notice) don't move the selection.

use std::sync::Arc;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_selected, C_BADGE_PENDING, C_MUTED},
    tree::{NodePhase, NodeRef, TreeNode, VisibleRow},
    widgets::pane_chrome::{pane_chrome, Badge},
};

pub struct TreePanel {
    selected: Option<u64>,
    offset: usize,
}

impl TreePanel {
    pub fn new() -> Self {
        Self {
            selected: None,
            offset: 0,
        }
    }

    /// Row index of the cursor, falling back to the first selectable row.
    fn cursor(&self, rows: &[VisibleRow]) -> Option<usize> {
        self.selected
            .and_then(|id| rows.iter().position(|r| r.node.id() == id))
            .or_else(|| rows.iter().position(|r| r.node.is_selectable()))
    }

    pub fn selected_node(&self, state: &AppState) -> Option<Arc<TreeNode>> {
        self.cursor(&state.rows)
            .map(|i| Arc::clone(&state.rows[i].node))
    }

    /// Put the cursor on a valid row; reports whether the selected node changed.
    pub fn sync(&mut self, state: &AppState) -> bool {
        let now = self.cursor(&state.rows).map(|i| state.rows[i].node.id());
        let changed = now != self.selected;
        self.selected = now;
        changed
    }

    fn select_row(&mut self, rows: &[VisibleRow], index: usize) -> Vec<Action> {
        let id = rows[index].node.id();
        if self.selected == Some(id) {
            return vec![];
        }
        self.selected = Some(id);
        vec![Action::SelectionChanged]
    }

    /// Move up to `steps` selectable rows up or down.
    fn step(&mut self, rows: &[VisibleRow], up: bool, steps: usize) -> Vec<Action> {
        let Some(mut index) = self.cursor(rows) else {
            return vec![];
        };
        let mut target = index;
        for _ in 0..steps {
            let next = if up {
                rows[..index].iter().rposition(|r| r.node.is_selectable())
            } else {
                rows.iter()
                    .skip(index + 1)
                    .position(|r| r.node.is_selectable())
                    .map(|p| p + index + 1)
            };
            match next {
                Some(n) => {
                    index = n;
                    target = n;
                }
                None => break,
            }
        }
        self.select_row(rows, target)
    }

    /// Collapse the node under the cursor, or move to its parent row.
    fn collapse(&mut self, rows: &[VisibleRow]) -> Vec<Action> {
        let Some(index) = self.cursor(rows) else {
            return vec![];
        };
        let row = &rows[index];
        if row.node.has_children() && row.node.is_expanded() {
            row.node.set_expanded(false);
            return vec![];
        }
        let parent = rows[..index]
            .iter()
            .rposition(|r| r.depth + 1 == row.depth && r.node.is_selectable());
        match parent {
            Some(p) => self.select_row(rows, p),
            None => vec![],
        }
    }

    fn expand(&mut self, rows: &[VisibleRow]) -> Vec<Action> {
        let Some(index) = self.cursor(rows) else {
            return vec![];
        };
        let node = &rows[index].node;
        if node.has_children() {
            if !node.is_expanded() {
                node.set_expanded(true);
            }
            return vec![];
        }
        let resolvable = !matches!(
            node.reference(),
            NodeRef::None | NodeRef::Playback(_) | NodeRef::Action(_)
        );
        if resolvable && node.phase() == NodePhase::Unexpanded {
            vec![Action::Activate]
        } else {
            vec![]
        }
    }

    fn ensure_visible(&mut self, cursor: usize, height: usize) {
        if height == 0 {
            return;
        }
        if cursor < self.offset {
            self.offset = cursor;
        } else if cursor >= self.offset + height {
            self.offset = cursor + 1 - height;
        }
    }
}

impl Component for TreePanel {
    fn id(&self) -> ComponentId {
        ComponentId::Tree
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let rows = &state.rows;
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.step(rows, true, 1),
            KeyCode::Down | KeyCode::Char('j') => self.step(rows, false, 1),
            KeyCode::PageUp => self.step(rows, true, 10),
            KeyCode::PageDown => self.step(rows, false, 10),
            KeyCode::Home | KeyCode::Char('g') => self.step(rows, true, usize::MAX),
            KeyCode::End | KeyCode::Char('G') => self.step(rows, false, usize::MAX),
            KeyCode::Enter | KeyCode::Char(' ') => vec![Action::Activate],
            KeyCode::Left | KeyCode::Char('h') => self.collapse(rows),
            KeyCode::Right | KeyCode::Char('l') => self.expand(rows),
            KeyCode::Char('r') => vec![Action::Refresh],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge = (state.in_flight > 0).then(|| Badge {
            text: format!("loading {}", state.in_flight),
            color: C_BADGE_PENDING,
        });
        let block = pane_chrome("catalog", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let height = inner.height as usize;
        let cursor = self.cursor(&state.rows);
        if let Some(c) = cursor {
            self.ensure_visible(c, height);
        }

        let width = inner.width as usize;
        let lines: Vec<Line> = state
            .rows
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(height)
            .map(|(i, row)| render_row(row, Some(i) == cursor, width))
            .collect();

        if lines.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  loading…", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn render_row(row: &VisibleRow, selected: bool, width: usize) -> Line<'static> {
    let node = &row.node;
    let marker = if node.has_children() {
        if node.is_expanded() {
            "▾ "
        } else {
            "▸ "
        }
    } else {
        "  "
    };
    let prefix = format!("{}{}", "  ".repeat(row.depth), marker);
    let label = truncate(&node.label(), width.saturating_sub(prefix.width()));

    let mut style = Style::default().fg(node.color());
    if selected {
        style = style.patch(style_selected());
    }
    Line::from(vec![
        Span::styled(prefix, Style::default().fg(C_MUTED)),
        Span::styled(label, style),
    ])
}

/// Cut `text` to at most `max` terminal columns, marking the cut with `…`.
fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
