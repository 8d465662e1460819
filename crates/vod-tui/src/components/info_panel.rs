//! InfoPanel — two-column field table for the node under the cursor.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::Span,
    widgets::{Paragraph, Row, Table},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_INFO_LABEL, C_MUTED, C_PRIMARY},
    widgets::pane_chrome::pane_chrome,
};

const LABEL_WIDTH: u16 = 16;

pub struct InfoPanel {
    scroll: usize,
}

impl InfoPanel {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }
}

impl Component for InfoPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Info
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll += 1,
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll += 10,
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if *action == Action::SelectionChanged {
            self.scroll = 0;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let title = if state.info.title.is_empty() {
            "info".to_string()
        } else {
            format!("info: {}", state.info.title)
        };
        let block = pane_chrome(&title, focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = &state.info.rows;
        if rows.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  nothing to show", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }

        let max_scroll = rows.len().saturating_sub(inner.height as usize);
        self.scroll = self.scroll.min(max_scroll);

        let table_rows: Vec<Row> = rows
            .iter()
            .skip(self.scroll)
            .map(|r| {
                Row::new(vec![
                    Span::styled(r.label.clone(), Style::default().fg(C_INFO_LABEL)),
                    Span::styled(r.value.clone(), Style::default().fg(C_PRIMARY)),
                ])
            })
            .collect();
        let table = Table::new(table_rows, [Constraint::Length(LABEL_WIDTH), Constraint::Min(10)])
            .column_spacing(1);
        frame.render_widget(table, inner);
    }
}
