//! The action leaves attached under an episode or perspective.

use std::sync::Arc;

use vod_proto::config::{CommandChain, Config};
use vod_proto::platform;

use super::{LeafAction, NodeRef, PlaybackCommandContext, TreeNode};
use crate::theme::C_NODE_LEAF;

pub const PLAY_WITH_MPV: &str = "Play with MPV";
pub const DOWNLOAD_PLAYLIST: &str = "Download .m3u8";
pub const COPY_URL: &str = "Copy URL";

/// Built-in player chain. mpv prints a `Video --vid=` line once the stream
/// opens, which is what the indicator waits for.
pub fn mpv_chain(language: &str) -> CommandChain {
    CommandChain {
        title: PLAY_WITH_MPV.to_string(),
        concurrent: false,
        commands: vec![vec![
            platform::mpv_binary_name().to_string(),
            "$url".to_string(),
            format!("--alang={}", language),
            "--start=0".to_string(),
        ]],
        watchphrase: Some("Video".to_string()),
        command_to_watch: 0,
    }
}

fn chain_leaf(title: &str, content_id: &str, chain: CommandChain) -> Arc<TreeNode> {
    TreeNode::new(chain.title.clone(), C_NODE_LEAF)
        .with_ref(NodeRef::Playback(PlaybackCommandContext {
            content_id: content_id.to_string(),
            title: title.to_string(),
            chain,
        }))
        .into_arc()
}

fn action_leaf(label: &str, action: LeafAction) -> Arc<TreeNode> {
    TreeNode::new(label, C_NODE_LEAF)
        .with_ref(NodeRef::Action(action))
        .into_arc()
}

/// Play, download, copy, then every configured chain in config order.
pub fn playback_options(title: &str, content_id: &str, config: &Config) -> Vec<Arc<TreeNode>> {
    let mut nodes = vec![
        chain_leaf(title, content_id, mpv_chain(&config.preferred_language)),
        action_leaf(
            DOWNLOAD_PLAYLIST,
            LeafAction::DownloadPlaylist {
                content_id: content_id.to_string(),
                title: title.to_string(),
            },
        ),
        action_leaf(
            COPY_URL,
            LeafAction::CopyUrl {
                content_id: content_id.to_string(),
            },
        ),
    ];
    nodes.extend(
        config
            .custom_playback_options
            .iter()
            .cloned()
            .map(|chain| chain_leaf(title, content_id, chain)),
    );
    nodes
}
