//! The initial tree and the startup tasks that fill in its top level.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vod_proto::catalog::Session;

use crate::services::Services;
use crate::theme::{C_NODE_BRANCH, C_NODE_DONE, C_NODE_ERROR, C_NODE_LEAF};
use crate::tree::navigator::perspective_nodes;
use crate::tree::{LeafAction, NodeRef, TreeNode};
use crate::update::{is_update, Release, UpdateChecker, CURRENT_VERSION};

pub const ROOT_LABEL: &str = "VOD-Types";
pub const ALL_SEASONS_LABEL: &str = "Full Race Weekends";
pub const DOWNLOAD_UPDATE_LABEL: &str = "download update";
pub const MUTE_UPDATES_LABEL: &str = "don't tell me about updates";

/// Root with the "Full Race Weekends" entry; categories arrive later.
pub fn build_root() -> Arc<TreeNode> {
    let all_seasons = TreeNode::new(ALL_SEASONS_LABEL, C_NODE_BRANCH)
        .with_ref(NodeRef::AllSeasons)
        .into_arc();
    TreeNode::new(ROOT_LABEL, C_NODE_DONE)
        .unselectable()
        .with_children(vec![all_seasons])
        .into_arc()
}

/// Start the category, live-session and update-check loads. Each attaches
/// its nodes to `root` on its own schedule.
pub fn spawn_startup(
    services: &Arc<Services>,
    root: &Arc<TreeNode>,
    updates: Option<Arc<dyn UpdateChecker>>,
) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();

    {
        let (services, root) = (Arc::clone(services), Arc::clone(root));
        tasks.push(tokio::spawn(async move {
            if let Err(e) = load_categories(&services, &root).await {
                warn!("failed to load VOD categories: {:#}", e);
            }
            services.redraw.request();
        }));
    }

    {
        let (services, root) = (Arc::clone(services), Arc::clone(root));
        tasks.push(tokio::spawn(async move {
            match services.catalog.live_session().await {
                Ok(Some(session)) => {
                    if let Some(node) = live_node(session) {
                        root.insert_child_at_top(node);
                        services.redraw.request();
                    }
                }
                Ok(None) => debug!("nothing live"),
                Err(e) => warn!("live session lookup failed: {:#}", e),
            }
        }));
    }

    if let Some(checker) = updates.filter(|_| services.config().check_updates) {
        let (services, root) = (Arc::clone(services), Arc::clone(root));
        tasks.push(tokio::spawn(async move {
            match checker.latest_release().await {
                Ok(release) if is_update(&release.tag_name, CURRENT_VERSION) => {
                    info!("new version available: {}", release.tag_name);
                    root.insert_child_at_top(update_node(&release));
                    services.redraw.request();
                }
                Ok(release) => debug!("up to date (latest {})", release.tag_name),
                Err(e) => debug!("update check failed: {:#}", e),
            }
        }));
    }

    tasks
}

async fn load_categories(services: &Services, root: &TreeNode) -> Result<()> {
    let types = services.catalog.vod_types().await?;
    let nodes: Vec<Arc<TreeNode>> = types
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.content_urls.is_empty())
        .map(|(i, t)| {
            TreeNode::new(t.name.clone(), C_NODE_BRANCH)
                .with_ref(NodeRef::Category(i))
                .into_arc()
        })
        .collect();
    info!("{} VOD categories ({} with content)", types.len(), nodes.len());

    services.set_vod_types(types);
    for node in nodes {
        root.add_child(node);
    }
    Ok(())
}

pub fn live_node(session: Session) -> Option<Arc<TreeNode>> {
    let children = perspective_nodes(&session.channel_urls);
    if children.is_empty() {
        return None;
    }
    Some(
        TreeNode::new(format!("LIVE: {}", session.display_name()), C_NODE_ERROR)
            .with_ref(NodeRef::Session(session))
            .with_children(children)
            .collapsed()
            .into_arc(),
    )
}

pub fn update_node(release: &Release) -> Arc<TreeNode> {
    let download = TreeNode::new(DOWNLOAD_UPDATE_LABEL, C_NODE_LEAF)
        .with_ref(NodeRef::Action(LeafAction::OpenReleasePage {
            url: release.html_url.clone(),
        }))
        .into_arc();
    let mute = TreeNode::new(MUTE_UPDATES_LABEL, C_NODE_LEAF)
        .with_ref(NodeRef::Action(LeafAction::DisableUpdateCheck))
        .into_arc();
    TreeNode::new(format!("New version available: {}", release.tag_name), C_NODE_ERROR)
        .with_children(vec![download, mute])
        .into_arc()
}
