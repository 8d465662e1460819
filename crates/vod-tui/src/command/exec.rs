//! Command chain execution.
//!
//! ```text
//!   Idle ──url resolved──▶ Running(0) ─▶ Running(1) ─▶ … ─▶ Completed
//!     └───url failed────▶ Failed
//! ```
//!
//! Sequential chains wait for each exit before the next launch; concurrent
//! chains fire every launch back to back and leave the exits to reaper tasks.
//! Neither kind stops on a failing command.

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vod_proto::config::CommandChain;

use super::process::{OutputStream, ProcessLauncher};
use super::template::CommandRun;
use crate::indicator::ActivityIndicator;
use crate::services::{Redraw, Services};
use crate::theme::{C_BLINK, C_NODE_DONE, C_NODE_ERROR};
use crate::tree::{PlaybackCommandContext, TreeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Idle,
    Running(usize),
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug)]
pub struct ChainReport {
    pub state: ChainState,
    /// Indices of commands that were started, in launch order.
    pub launched: Vec<usize>,
    pub failures: Vec<CommandFailure>,
    /// The output monitor of the watched command; resolves to whether the
    /// marker was seen.
    pub watch: Option<JoinHandle<bool>>,
}

impl ChainReport {
    fn new() -> Self {
        Self {
            state: ChainState::Idle,
            launched: Vec::new(),
            failures: Vec::new(),
            watch: None,
        }
    }
}

/// Resolve the stream URL for `ctx` and run its chain. Meant to be spawned.
pub async fn play(services: Arc<Services>, node: Arc<TreeNode>, ctx: PlaybackCommandContext) -> ChainReport {
    let url = match services.catalog.playable_url(&ctx.content_id).await {
        Ok(url) => url,
        Err(e) => {
            warn!("could not resolve a stream for {}: {:#}", ctx.title, e);
            node.set_color(C_NODE_ERROR);
            services.redraw.request();
            let mut report = ChainReport::new();
            report.state = ChainState::Failed;
            return report;
        }
    };

    info!("running '{}' for {}", ctx.chain.title, ctx.title);
    let run = CommandRun::new(url, ctx.title.as_str(), Arc::clone(&services.downloader));
    run_chain(
        &ctx.chain,
        &run,
        services.launcher.as_ref(),
        &node,
        &services.redraw,
    )
    .await
}

/// Run every command of `chain` with placeholders expanded from `run`.
pub async fn run_chain(
    chain: &CommandChain,
    run: &CommandRun,
    launcher: &dyn ProcessLauncher,
    node: &Arc<TreeNode>,
    redraw: &Redraw,
) -> ChainReport {
    let mut report = ChainReport::new();
    let watch = chain.watched_index().zip(chain.watchphrase.clone());

    for (index, template) in chain.commands.iter().enumerate() {
        if template.is_empty() {
            continue;
        }
        report.state = ChainState::Running(index);

        let argv = run.expand(template).await;
        debug!("starting: {}", argv.join(" "));
        let marker = watch
            .as_ref()
            .filter(|(watched, _)| *watched == index)
            .map(|(_, marker)| marker.clone());

        let launched = match launcher.launch(&argv, marker.is_some()) {
            Ok(launched) => launched,
            Err(e) => {
                warn!("failed to start {}: {}", argv[0], e);
                report.failures.push(CommandFailure {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        report.launched.push(index);

        if let (Some(marker), Some(stdout)) = (marker, launched.stdout) {
            let indicator = ActivityIndicator::start(node, C_BLINK, redraw.clone());
            report.watch = Some(tokio::spawn(monitor_output(
                stdout,
                marker,
                indicator,
                Arc::clone(node),
                redraw.clone(),
            )));
        }

        if chain.concurrent {
            tokio::spawn(reap(argv[0].clone(), launched.exit));
        } else if let Err(reason) = wait_exit(&argv[0], launched.exit).await {
            report.failures.push(CommandFailure { index, reason });
        }
    }

    if report.watch.is_none() {
        node.set_color(C_NODE_DONE);
        redraw.request();
    }
    report.state = ChainState::Completed;
    report
}

async fn wait_exit(
    program: &str,
    exit: BoxFuture<'static, io::Result<ExitStatus>>,
) -> Result<(), String> {
    match exit.await {
        Ok(status) if status.success() => {
            debug!("{} exited cleanly", program);
            Ok(())
        }
        Ok(status) => {
            warn!("{} exited with {}", program, status);
            Err(status.to_string())
        }
        Err(e) => {
            warn!("failed waiting for {}: {}", program, e);
            Err(e.to_string())
        }
    }
}

async fn reap(program: String, exit: BoxFuture<'static, io::Result<ExitStatus>>) {
    let _ = wait_exit(&program, exit).await;
}

/// Log `stdout` line by line until a line contains `marker` or the stream
/// ends, then stop the indicator and mark the node done. Output after the
/// marker is drained unread so the child never blocks on a full pipe.
async fn monitor_output(
    stdout: OutputStream,
    marker: String,
    indicator: ActivityIndicator,
    node: Arc<TreeNode>,
    redraw: Redraw,
) -> bool {
    let mut lines = BufReader::new(stdout).lines();
    let mut seen = false;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!("{}", line);
                if line.contains(&marker) {
                    seen = true;
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("watched output closed: {}", e);
                break;
            }
        }
    }

    indicator.finish().await;
    node.set_color(C_NODE_DONE);
    redraw.request();

    if seen {
        let mut rest = lines.into_inner();
        let _ = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await;
    }
    seen
}
