//! Busy indicator: blinks a tree node while some other task is working on it.
//!
//! The worker only flips a flag; the blink loop notices it on its next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use ratatui::style::Color;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::services::Redraw;
use crate::tree::TreeNode;

pub const BLINK_INTERVAL: Duration = Duration::from_millis(200);

/// Toggle `node` between its current colour and `highlight` until `done` is
/// set, then put the original colour back. Stops early if the node is dropped.
pub async fn blink(node: Weak<TreeNode>, done: Arc<AtomicBool>, highlight: Color, redraw: Redraw) {
    let original = match node.upgrade() {
        Some(n) => n.color(),
        None => return,
    };

    let mut ticker = tokio::time::interval(BLINK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lit = false;

    loop {
        ticker.tick().await;
        let Some(node) = node.upgrade() else {
            return;
        };
        if done.load(Ordering::Acquire) {
            node.set_color(original);
            redraw.request();
            return;
        }
        lit = !lit;
        node.set_color(if lit { highlight } else { original });
        redraw.request();
    }
}

/// A running [`blink`] task plus the flag that stops it.
pub struct ActivityIndicator {
    done: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ActivityIndicator {
    pub fn start(node: &Arc<TreeNode>, highlight: Color, redraw: Redraw) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(blink(
            Arc::downgrade(node),
            Arc::clone(&done),
            highlight,
            redraw,
        ));
        Self { done, handle }
    }

    /// Stop blinking and wait until the original colour is back.
    pub async fn finish(self) {
        self.done.store(true, Ordering::Release);
        let _ = self.handle.await;
    }
}
