//! Decoding of representative API payloads and config persistence.
//!
//! Run with: cargo test -p vod-proto --test catalog_decode

use vod_proto::catalog::{CatalogRecord, Episode, Event, Session, VodType};
use vod_proto::config::{CommandChain, Config};

#[test]
fn session_with_expanded_channels() {
    let raw = r#"{
        "uid": "sesh_1",
        "name": "Race",
        "session_name": "Race",
        "status": "replay",
        "self": "/api/session-occurrence/sesh_1/",
        "start_time": "2019-03-17T05:10:00Z",
        "end_time": null,
        "channel_urls": [
            {"uid": "chan_1", "name": "WIF", "channel_type": "wif", "self": "/api/channels/chan_1/"},
            {"uid": "chan_2", "name": "", "channel_type": "driver", "self": "/api/channels/chan_2/"}
        ],
        "driver_urls": ["/api/driver/drv_44/"]
    }"#;

    let session: Session = serde_json::from_str(raw).unwrap();
    assert_eq!(session.channel_urls.len(), 2);
    assert_eq!(session.channel_urls[1].display_name(), "driver");
    assert!(session.start_time.is_some());
    assert!(session.end_time.is_none());
    assert_eq!(session.winner_url, "");
}

#[test]
fn sparse_records_decode_with_defaults() {
    let episode: Episode = serde_json::from_str(r#"{"title": "Season review", "created": "soon"}"#).unwrap();
    assert_eq!(episode.title, "Season review");
    assert!(episode.items.is_empty());
    assert!(episode.created.is_none());

    let event: Event = serde_json::from_str(r#"{"name": "Australian GP", "start_date": "2019-03-15"}"#).unwrap();
    assert!(event.start().is_some());
}

#[test]
fn vod_type_envelope() {
    #[derive(serde::Deserialize)]
    struct Objects {
        objects: Vec<VodType>,
    }

    let raw = r#"{"objects": [
        {"name": "Highlights", "self": "/api/vod-type-tag/1/", "content_urls": ["/api/episodes/a/", "/api/episodes/b/"]},
        {"name": "Empty", "self": "/api/vod-type-tag/2/"}
    ]}"#;
    let parsed: Objects = serde_json::from_str(raw).unwrap();
    assert_eq!(parsed.objects[0].content_urls.len(), 2);
    assert!(parsed.objects[1].content_urls.is_empty());

    let record = CatalogRecord::VodCategory(parsed.objects[0].clone());
    assert_eq!(record.title(), "Highlights");
    assert_eq!(record.id(), "/api/vod-type-tag/1/");
}

#[test]
fn config_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.check_updates = false;
    config.custom_playback_options.push(CommandChain {
        title: "Record".to_string(),
        concurrent: true,
        commands: vec![
            vec!["ffmpeg".to_string(), "-i".to_string(), "$file".to_string(), "out.mp4".to_string()],
            vec![],
        ],
        watchphrase: Some("Press [q]".to_string()),
        command_to_watch: 0,
    });
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn first_load_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let config = Config::load_from(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config, Config::default());
}

#[test]
fn malformed_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "preferred_language = [not toml").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load_or_default(&path), Config::default());
}
