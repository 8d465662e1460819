mod action;
mod app;
mod app_state;
mod bootstrap;
mod catalog;
mod command;
mod component;
mod components;
mod download;
mod indicator;
mod info;
mod services;
#[cfg(test)]
mod testing;
mod theme;
mod tree;
mod update;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use vod_proto::config::Config;

use crate::catalog::api::ApiClient;
use crate::command::process::SystemLauncher;
use crate::download::PlaylistDownloader;
use crate::services::Services;
use crate::tree::Navigator;
use crate::update::{ReleaseFeed, UpdateChecker};

/// Terminal browser for the F1TV video-on-demand catalog.
#[derive(Parser, Debug)]
#[command(name = "vodnav", version, about)]
struct Cli {
    /// Show the log pane next to the info table.
    #[arg(short, long)]
    debug: bool,

    /// Config file to use instead of the platform default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = vod_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("vodnav.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; otherwise app code at debug and HTTP client internals quiet.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("vodnav log: {}", log_path.display());
    tracing::info!("vodnav {} starting…", env!("CARGO_PKG_VERSION"));

    // ── Load config ──────────────────────────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(Config::config_path);
    let config = Config::load_or_default(&config_path);

    // ── Services ─────────────────────────────────────────────────────────────
    let catalog = Arc::new(ApiClient::new(&config.api_base));
    let downloader = Arc::new(PlaylistDownloader::new(config.downloads_dir.clone()));
    let updates = config
        .update_feed
        .clone()
        .filter(|url| !url.is_empty())
        .map(|url| Arc::new(ReleaseFeed::new(url)) as Arc<dyn UpdateChecker>);
    let services = Services::new(
        catalog,
        Arc::new(SystemLauncher),
        downloader,
        config,
        config_path,
    );

    // ── Tree ─────────────────────────────────────────────────────────────────
    let root = bootstrap::build_root();
    let startup = bootstrap::spawn_startup(&services, &root, updates);

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let navigator = Navigator::new(services, root);
    let mut app = app::App::new(navigator, cli.debug.then_some(log_path));
    app.track_tasks(startup);
    app.run().await?;

    Ok(())
}
