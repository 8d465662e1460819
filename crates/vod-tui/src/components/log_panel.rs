//! LogPanel — tail of the log file, shown with `--debug`.
//!
//! Follows the newest line unless the user has scrolled up.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_BADGE_PENDING, C_MUTED, C_NODE_ERROR, C_SECONDARY},
    widgets::pane_chrome::pane_chrome,
};

pub struct LogPanel {
    /// First visible line; `usize::MAX` pins the view to the bottom.
    scroll: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self { scroll: usize::MAX }
    }
}

impl Component for LogPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Log
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            KeyCode::End | KeyCode::Char('G') => self.scroll = usize::MAX,
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let block = pane_chrome("debug", focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let logs = &state.log_lines;
        if logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no log entries yet", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let max_scroll = logs.len().saturating_sub(height);
        let start = self.scroll.min(max_scroll);
        if self.scroll != usize::MAX && start == max_scroll {
            self.scroll = usize::MAX;
        } else if self.scroll != usize::MAX {
            self.scroll = start;
        }

        let lines: Vec<Line> = logs
            .iter()
            .skip(start)
            .take(height)
            .map(|raw| {
                let (level, text) = compact_log_line(raw);
                let color = match level {
                    Some("ERROR") => C_NODE_ERROR,
                    Some("WARN") => C_BADGE_PENDING,
                    _ => C_SECONDARY,
                };
                Line::from(Span::styled(text, Style::default().fg(color)))
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}

// ── Log line formatting ───────────────────────────────────────────────────────

const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// Turn a `tracing` fmt line (`<rfc3339> <LEVEL> <target>: <msg>`) into
/// `HH:MM:SS LEVEL msg`. Lines in any other shape pass through unchanged.
fn compact_log_line(raw: &str) -> (Option<&'static str>, String) {
    let mut rest = raw.trim();
    let mut head = Vec::new();

    if let Some((first, tail)) = rest.split_once(char::is_whitespace) {
        if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(first) {
            head.push(ts.with_timezone(&chrono::Local).format("%H:%M:%S").to_string());
            rest = tail.trim_start();
        }
    }

    let mut level = None;
    if let Some((first, tail)) = rest.split_once(char::is_whitespace) {
        if let Some(l) = LEVELS.iter().find(|l| **l == first) {
            level = Some(*l);
            head.push(first.to_string());
            rest = tail.trim_start();
        }
    }

    if let Some((target, msg)) = rest.split_once(": ") {
        if target.contains("::") || target.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            rest = msg;
        }
    }

    let text = if head.is_empty() {
        rest.to_string()
    } else {
        format!("{} {}", head.join(" "), rest)
    };
    (level, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_lines_are_compacted() {
        let (level, text) =
            compact_log_line("2024-06-09T12:30:05.123456Z  WARN vod_tui::tree::navigator: failed to load 2019");
        assert_eq!(level, Some("WARN"));
        assert!(text.ends_with("WARN failed to load 2019"), "{}", text);
        assert_eq!(text.split(' ').next().unwrap().len(), "12:30:05".len());
    }

    #[test]
    fn other_lines_pass_through() {
        assert_eq!(compact_log_line("plain text"), (None, "plain text".to_string()));
    }
}
