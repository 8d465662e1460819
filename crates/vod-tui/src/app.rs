//! App — the terminal event loop.
//!
//! Architecture:
//! - `App` owns the panels and `AppState` (read-only data for the panels).
//! - Keys arrive from a blocking reader task over an mpsc channel.
//! - Background work (node resolution, info rendering, command chains) never
//!   touches the terminal; it requests a redraw through `Services::redraw`.
//! - Panels return `Vec<Action>`; App dispatches each Action.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::components::{info_panel::InfoPanel, log_panel::LogPanel, tree_panel::TreePanel};
use crate::info::{subject_for, InfoRenderer};
use crate::services::Services;
use crate::theme::C_BG;
use crate::tree::navigator::Activation;
use crate::tree::Navigator;

const LOG_TAIL_LINES: usize = 500;

pub struct App {
    navigator: Navigator,
    renderer: InfoRenderer,
    state: AppState,
    tree: TreePanel,
    info: InfoPanel,
    log: LogPanel,
    focus: ComponentId,
    /// `Some` when started with `--debug`; the log pane is shown.
    log_path: Option<PathBuf>,
    /// Background resolutions and leaf actions that have not finished yet.
    tasks: Vec<JoinHandle<()>>,
    should_quit: bool,
}

impl App {
    pub fn new(navigator: Navigator, log_path: Option<PathBuf>) -> Self {
        let renderer = InfoRenderer::new(Arc::clone(navigator.services()));
        let state = AppState::new(Arc::clone(navigator.root()));
        Self {
            navigator,
            renderer,
            state,
            tree: TreePanel::new(),
            info: InfoPanel::new(),
            log: LogPanel::new(),
            focus: ComponentId::Tree,
            log_path,
            tasks: Vec::new(),
            should_quit: false,
        }
    }

    pub fn track_tasks(&mut self, tasks: impl IntoIterator<Item = JoinHandle<()>>) {
        self.tasks.extend(tasks);
    }

    fn services(&self) -> &Arc<Services> {
        self.navigator.services()
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("terminal ready, size={:?}", terminal.size());

        // ── Background task: keyboard events ──────────────────────────────────
        let (key_tx, mut key_rx) = mpsc::channel::<Event>(256);
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if key_tx.blocking_send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Not every indicator step requests a redraw.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let redraw = self.services().redraw.clone();
        info!("navigator started");

        // ── Main loop ─────────────────────────────────────────────────────────
        loop {
            self.sync_state();
            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                ev = key_rx.recv() => match ev {
                    Some(Event::Key(key)) => self.handle_key(key),
                    Some(_) => {}
                    None => break,
                },
                _ = redraw.wait() => {}
                _ = ui_tick.tick() => {}
                _ = log_refresh.tick() => self.reload_log(),
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("navigator stopped");

        Ok(())
    }

    /// Pull the tree, info table and counters into `AppState`, and re-request
    /// info when the cursor landed on a different node without a key press.
    fn sync_state(&mut self) {
        self.state.refresh_rows();
        if self.tree.sync(&self.state) {
            self.dispatch(Action::SelectionChanged);
        }
        self.state.info = self.renderer.table().snapshot();
        self.state.in_flight = self.services().in_flight();
        self.reap_tasks();
    }

    /// Drop finished task handles, logging any task that panicked.
    fn reap_tasks(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(JoinHandle::is_finished);
        self.tasks = running;
        for task in finished {
            if let Some(Err(e)) = task.now_or_never() {
                if e.is_panic() {
                    warn!("background task panicked: {}", e);
                }
            }
        }
    }

    fn reload_log(&mut self) {
        let Some(path) = &self.log_path else {
            return;
        };
        if let Ok(content) = std::fs::read_to_string(path) {
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(LOG_TAIL_LINES);
            self.state.log_lines = lines[start..].iter().map(|l| l.to_string()).collect();
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let actions = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => vec![Action::Quit],
            KeyCode::Tab => vec![Action::FocusNext],
            _ => {
                self.state.refresh_rows();
                let state = &self.state;
                match self.focus {
                    ComponentId::Tree => self.tree.handle_key(key, state),
                    ComponentId::Info => self.info.handle_key(key, state),
                    ComponentId::Log => self.log.handle_key(key, state),
                }
            }
        };
        for action in actions {
            self.dispatch(action);
        }
    }

    fn dispatch(&mut self, action: Action) {
        match &action {
            Action::Activate => {
                if let Some(node) = self.tree.selected_node(&self.state) {
                    let activation = self.navigator.activate(&node);
                    debug!("activate {}: {:?}", node.label(), activation);
                    match activation {
                        Activation::Resolving(task) | Activation::Action(task) => self.tasks.push(task),
                        Activation::Ignored | Activation::Toggled | Activation::Resolved => {}
                    }
                }
            }
            Action::Refresh => {
                if let Some(node) = self.tree.selected_node(&self.state) {
                    if !self.navigator.refresh(&node) {
                        debug!("{} has nothing to refresh", node.label());
                    }
                }
            }
            Action::SelectionChanged => {
                if let Some(node) = self.tree.selected_node(&self.state) {
                    if let Some(subject) = subject_for(&node, self.services()) {
                        self.renderer.request(subject);
                    }
                }
            }
            Action::FocusNext => self.focus = self.next_focus(),
            Action::Quit => self.should_quit = true,
        }

        let follow_ups: Vec<Action> = {
            let state = &self.state;
            let mut all = self.tree.on_action(&action, state);
            all.extend(self.info.on_action(&action, state));
            all.extend(self.log.on_action(&action, state));
            all
        };
        for next in follow_ups {
            self.dispatch(next);
        }
    }

    fn next_focus(&self) -> ComponentId {
        match (self.focus, self.log_path.is_some()) {
            (ComponentId::Tree, _) => ComponentId::Info,
            (ComponentId::Info, true) => ComponentId::Log,
            _ => ComponentId::Tree,
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let focus = self.focus;
        let tree_focused = focus == self.tree.id();
        let info_focused = focus == self.info.id();
        let log_focused = focus == self.log.id();
        self.tree.draw(frame, cols[0], tree_focused, &self.state);

        if self.log_path.is_some() {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(cols[1]);
            self.info.draw(frame, rows[0], info_focused, &self.state);
            self.log.draw(frame, rows[1], log_focused, &self.state);
        } else {
            self.info.draw(frame, cols[1], info_focused, &self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    use crate::bootstrap::{build_root, ALL_SEASONS_LABEL};
    use crate::testing::TestRig;
    use crate::tree::NodePhase;

    fn app(rig: &TestRig) -> App {
        let navigator = Navigator::new(Arc::clone(&rig.services), build_root());
        App::new(navigator, None)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[tokio::test]
    async fn enter_resolves_selected_node() {
        let rig = TestRig::new();
        rig.catalog.add_season("season_2021", "2021", 2021);
        let mut app = app(&rig);
        app.sync_state();

        let node = app.tree.selected_node(&app.state).unwrap();
        assert_eq!(node.label(), ALL_SEASONS_LABEL);
        press(&mut app, KeyCode::Enter);

        for _ in 0..100 {
            if node.phase() == NodePhase::Expanded {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(node.phase(), NodePhase::Expanded);
        app.sync_state();
        assert!(app.state.rows.iter().any(|r| r.node.label() == "2021"));
    }

    #[tokio::test]
    async fn finished_tasks_are_reaped() {
        let rig = TestRig::new();
        let mut app = app(&rig);
        let crashed = tokio::spawn(async { panic!("resolver crashed") });
        let running = tokio::spawn(std::future::pending::<()>());
        app.track_tasks([crashed, running]);

        for _ in 0..100 {
            if app.tasks[0].is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        app.sync_state();

        assert_eq!(app.tasks.len(), 1);
        assert!(!app.tasks[0].is_finished());
    }

    #[tokio::test]
    async fn focus_cycles_and_quit_stops() {
        let rig = TestRig::new();
        let mut app = app(&rig);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, ComponentId::Info);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, ComponentId::Tree);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
