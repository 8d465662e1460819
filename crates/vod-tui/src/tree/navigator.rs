//! Node activation: toggling, lazy child resolution and leaf actions.
//!
//! Every asynchronous resolution runs on its own task, blinks its node while
//! pending and is the only writer of that node's children.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use futures_util::stream::{self, StreamExt};
use ratatui::style::Color;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vod_proto::catalog::{parse_year_and_race, Channel, Episode, Event, Season, Session};
use vod_proto::platform;

use super::playback::playback_options;
use super::{LeafAction, NodePhase, NodeRef, TreeNode};
use crate::command;
use crate::indicator::ActivityIndicator;
use crate::services::Services;
use crate::theme::{
    C_BLINK, C_BLINK_WARM, C_NODE_BRANCH, C_NODE_DONE, C_NODE_ERROR, C_NODE_FEED, C_NODE_LEAF,
};

pub const NO_CONTENT_SUFFIX: &str = " - NO CONTENT AVAILABLE";
pub const UPDATES_OFF_LABEL: &str = "update notifications turned off";

/// Episode fetches kept in flight while filling a category.
const EPISODE_FETCH_CONCURRENCY: usize = 8;

/// What an activation did.
#[derive(Debug)]
pub enum Activation {
    /// Loading, locked out, or nothing to do.
    Ignored,
    /// Expanded or collapsed an already resolved node.
    Toggled,
    /// Children are being fetched on this task.
    Resolving(JoinHandle<()>),
    /// Children were attached synchronously.
    Resolved,
    /// A leaf action or command chain was started on this task.
    Action(JoinHandle<()>),
}

pub struct Navigator {
    services: Arc<Services>,
    root: Arc<TreeNode>,
}

impl Navigator {
    pub fn new(services: Arc<Services>, root: Arc<TreeNode>) -> Self {
        Self { services, root }
    }

    pub fn root(&self) -> &Arc<TreeNode> {
        &self.root
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn activate(&self, node: &Arc<TreeNode>) -> Activation {
        if !node.is_selectable() {
            return Activation::Ignored;
        }
        match node.phase() {
            NodePhase::Loading | NodePhase::EmptyTerminal => return Activation::Ignored,
            NodePhase::Expanded => {
                node.toggle_expanded();
                return Activation::Toggled;
            }
            NodePhase::Unexpanded => {}
        }
        if node.has_children() {
            node.toggle_expanded();
            return Activation::Toggled;
        }

        match node.reference() {
            NodeRef::None => Activation::Ignored,
            NodeRef::Seasons(_) => {
                node.toggle_expanded();
                Activation::Toggled
            }
            NodeRef::Playback(ctx) => {
                let services = Arc::clone(&self.services);
                let node = Arc::clone(node);
                Activation::Action(tokio::spawn(async move {
                    let report = command::play(services, node, ctx).await;
                    debug!("chain finished: {:?} launched={:?}", report.state, report.launched);
                }))
            }
            NodeRef::Action(action) => {
                let services = Arc::clone(&self.services);
                let node = Arc::clone(node);
                Activation::Action(tokio::spawn(perform(services, node, action)))
            }
            NodeRef::Episode(episode) => {
                self.attach_now(node, |config| {
                    episode
                        .items
                        .first()
                        .map(|asset| playback_options(&episode.title, asset, config))
                        .unwrap_or_default()
                })
            }
            NodeRef::Perspective(channel) => {
                let title = node.label();
                self.attach_now(node, |config| {
                    playback_options(&title, &channel.self_url, config)
                })
            }
            NodeRef::Session(session) => {
                self.attach_now(node, |_| perspective_nodes(&session.channel_urls))
            }
            reference @ (NodeRef::Category(_)
            | NodeRef::AllSeasons
            | NodeRef::Season(_)
            | NodeRef::Event(_)) => {
                if !node.begin_loading() {
                    return Activation::Ignored;
                }
                Activation::Resolving(self.spawn_resolution(node, reference))
            }
        }
    }

    /// Attach children built on the spot; an empty result locks the node out.
    fn attach_now(
        &self,
        node: &Arc<TreeNode>,
        build: impl FnOnce(&vod_proto::config::Config) -> Vec<Arc<TreeNode>>,
    ) -> Activation {
        if !node.begin_loading() {
            return Activation::Ignored;
        }
        let children = build(&self.services.config());
        if children.is_empty() {
            node.mark_empty(None);
        } else {
            for child in children {
                node.add_child(child);
            }
            node.finish_loading();
        }
        self.services.redraw.request();
        Activation::Resolved
    }

    fn spawn_resolution(&self, node: &Arc<TreeNode>, reference: NodeRef) -> JoinHandle<()> {
        let services = Arc::clone(&self.services);
        let node = Arc::clone(node);
        tokio::spawn(async move {
            let _guard = services.track();
            let indicator = ActivityIndicator::start(&node, highlight_for(&reference), services.redraw.clone());

            let suffix = matches!(reference, NodeRef::Event(_)).then_some(NO_CONTENT_SUFFIX);
            let outcome = resolve(&services, &node, reference).await;
            indicator.finish().await;

            match outcome {
                Ok(0) => {
                    debug!("{} resolved to nothing", node.label());
                    node.mark_empty(suffix);
                }
                Ok(n) => {
                    debug!("{} resolved {} children", node.label(), n);
                    node.finish_loading();
                }
                Err(e) => {
                    warn!("failed to load {}: {:#}", node.label(), e);
                    node.mark_empty(suffix);
                }
            }
            services.redraw.request();
        })
    }

    /// Rebuild the season list of a resolved "Full Race Weekends" node from
    /// the list fetched the first time. Returns false for any other node.
    pub fn refresh(&self, node: &Arc<TreeNode>) -> bool {
        let NodeRef::Seasons(seasons) = node.reference() else {
            return false;
        };
        node.clear_children();
        for season in seasons.iter() {
            node.add_child(season_node(season.clone()));
        }
        self.services.redraw.request();
        true
    }
}

fn highlight_for(reference: &NodeRef) -> Color {
    match reference {
        NodeRef::Season(_) => C_BLINK_WARM,
        _ => C_BLINK,
    }
}

/// Fetch and attach the children of `node`; returns how many were attached.
async fn resolve(services: &Arc<Services>, node: &Arc<TreeNode>, reference: NodeRef) -> Result<usize> {
    match reference {
        NodeRef::Category(index) => resolve_category(services, node, index).await,
        NodeRef::AllSeasons => resolve_all_seasons(services, node).await,
        NodeRef::Season(season) => resolve_season(services, node, &season).await,
        NodeRef::Event(event) => resolve_event(services, node, &event).await,
        NodeRef::None
        | NodeRef::Seasons(_)
        | NodeRef::Session(_)
        | NodeRef::Perspective(_)
        | NodeRef::Episode(_)
        | NodeRef::Playback(_)
        | NodeRef::Action(_) => Ok(0),
    }
}

async fn resolve_category(services: &Arc<Services>, node: &Arc<TreeNode>, index: usize) -> Result<usize> {
    let Some(vod_type) = services.vod_type(index) else {
        return Ok(0);
    };

    let mut episodes = stream::iter(vod_type.content_urls)
        .map(|url| {
            let services = Arc::clone(services);
            async move {
                let result = services.cache.episode(services.catalog.as_ref(), &url).await;
                (url, result)
            }
        })
        .buffered(EPISODE_FETCH_CONCURRENCY);

    let mut attached = 0;
    while let Some((url, result)) = episodes.next().await {
        match result {
            Ok(episode) => {
                node.add_child(episode_node(episode));
                attached += 1;
                services.redraw.request();
            }
            Err(e) => debug!("skipping episode {}: {:#}", url, e),
        }
    }
    Ok(attached)
}

async fn resolve_all_seasons(services: &Arc<Services>, node: &Arc<TreeNode>) -> Result<usize> {
    let seasons = services.catalog.seasons().await.context("failed to list seasons")?;
    for season in &seasons {
        node.add_child(season_node(season.clone()));
    }
    let count = seasons.len();
    node.set_reference(NodeRef::Seasons(Arc::new(seasons)));
    Ok(count)
}

async fn resolve_season(services: &Arc<Services>, node: &Arc<TreeNode>, season: &Season) -> Result<usize> {
    let events = services
        .catalog
        .events(season)
        .await
        .with_context(|| format!("failed to list events of {}", season.name))?;

    let aired = aired_events(events, Local::now().date_naive());
    let count = aired.len();
    for event in aired {
        node.add_child(event_node(event));
        services.redraw.request();
    }
    Ok(count)
}

/// All sessions are fetched before deciding whether the event has content.
async fn resolve_event(services: &Arc<Services>, node: &Arc<TreeNode>, event: &Event) -> Result<usize> {
    let sessions = services
        .catalog
        .sessions(event)
        .await
        .with_context(|| format!("failed to list sessions of {}", event.name))?;

    let mut attached = 0;
    for session in sessions {
        if let Some(child) = session_node(session) {
            node.add_child(child);
            attached += 1;
        }
    }
    Ok(attached)
}

/// Events that started today or earlier, in their original order. Events
/// with unreadable dates are kept.
pub fn aired_events(events: Vec<Event>, today: NaiveDate) -> Vec<Event> {
    events
        .into_iter()
        .filter(|e| e.start().map_or(true, |start| start <= today))
        .collect()
}

/// `"YYYY-RR Title"`, or `"YYYY Title"` for seasons without race numbers.
pub fn episode_label(episode: &Episode) -> String {
    match parse_year_and_race(&episode.data_source_id) {
        Ok((year, race)) if race == "0" => format!("{} {}", year, episode.title),
        Ok((year, race)) => format!("{}-{} {}", year, race, episode.title),
        Err(_) => episode.title.clone(),
    }
}

pub fn episode_node(episode: Episode) -> Arc<TreeNode> {
    TreeNode::new(episode_label(&episode), C_NODE_LEAF)
        .with_ref(NodeRef::Episode(episode))
        .into_arc()
}

pub fn season_node(season: Season) -> Arc<TreeNode> {
    TreeNode::new(season.name.clone(), C_NODE_BRANCH)
        .with_ref(NodeRef::Season(season))
        .into_arc()
}

pub fn event_node(event: Event) -> Arc<TreeNode> {
    TreeNode::new(event.name.clone(), C_NODE_BRANCH)
        .with_ref(NodeRef::Event(event))
        .into_arc()
}

pub(crate) fn perspective_nodes(channels: &[Channel]) -> Vec<Arc<TreeNode>> {
    channels
        .iter()
        .map(|channel| {
            TreeNode::new(channel.display_name(), C_NODE_FEED)
                .with_ref(NodeRef::Perspective(channel.clone()))
                .into_arc()
        })
        .collect()
}

/// A collapsed session node with its perspectives attached, or `None` when
/// the session has no channels to offer.
pub fn session_node(session: Session) -> Option<Arc<TreeNode>> {
    let children = perspective_nodes(&session.channel_urls);
    if children.is_empty() {
        return None;
    }
    Some(
        TreeNode::new(session.display_name(), C_NODE_FEED)
            .with_ref(NodeRef::Session(session))
            .with_children(children)
            .collapsed()
            .into_arc(),
    )
}

// ── leaf actions ──────────────────────────────────────────────────────────────

async fn perform(services: Arc<Services>, node: Arc<TreeNode>, action: LeafAction) {
    let outcome = match &action {
        LeafAction::DownloadPlaylist { content_id, title } => {
            download_playlist(&services, content_id, title).await
        }
        LeafAction::CopyUrl { content_id } => copy_url(&services, content_id).await,
        LeafAction::OpenReleasePage { url } => platform::open_in_browser(url),
        LeafAction::DisableUpdateCheck => services.update_config(|c| c.check_updates = false).map(|()| {
            node.set_label(UPDATES_OFF_LABEL);
        }),
    };

    match outcome {
        Ok(()) => node.set_color(C_NODE_DONE),
        Err(e) => {
            warn!("{:?} failed: {:#}", action, e);
            node.set_color(C_NODE_ERROR);
        }
    }
    services.redraw.request();
}

async fn download_playlist(services: &Services, content_id: &str, title: &str) -> Result<()> {
    let url = services.catalog.playable_url(content_id).await?;
    let path = services.downloader.download(&url, title).await?;
    info!("playlist for {} saved to {}", title, path.display());
    Ok(())
}

async fn copy_url(services: &Services, content_id: &str) -> Result<()> {
    let url = services.catalog.playable_url(content_id).await?;
    arboard::Clipboard::new()
        .and_then(|mut cb| cb.set_text(url.clone()))
        .context("clipboard unavailable")?;
    info!("copied {}", url);
    Ok(())
}
