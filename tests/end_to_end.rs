//! Full load/edit/save cycles through the public API.

use frigate_cfg::config::{self, InputRole, RetainMode};
use frigate_cfg::prelude::*;
use frigate_cfg::store::{FixedPathPicker, FsSlotStore, MemoryRemoteStore, MemorySlotStore};

const FRIGATE_YML: &str = r#"
mqtt:
  host: 192.168.1.10
  user: frigate
  password: secret
detectors:
  coral:
    type: edgetpu
    device: usb
cameras:
  driveway:
    ffmpeg:
      hwaccel_args: preset-vaapi
      inputs:
        - path: rtsp://10.0.0.5:554/main
          roles: [record]
        - path: rtsp://10.0.0.5:554/sub
          roles: [detect, audio]
    detect:
      width: 1280
      height: 720
    motion:
      threshold: 25
      mask: 0,0,200,0,200,100,0,100
    zones:
      street:
        coordinates: 0,400,1280,400,1280,720,0,720
        objects: [car]
    record:
      enabled: true
      retain:
        days: 7
        mode: motion
      events:
        pre_capture: 3
    snapshots:
      enabled: true
      retain:
        default: 14
        objects:
          person: 30
birdseye:
  enabled: true
  mode: objects
"#;

fn location() -> RemoteLocation {
    RemoteLocation::new("home", "nvr-config", "frigate/config.yml", "main")
}

#[tokio::test]
async fn file_to_cache_to_remote_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("frigate.yml");
    tokio::fs::write(&input, FRIGATE_YML).await.unwrap();

    let remote = MemoryRemoteStore::new();
    let mut store = ConfigStore::new(
        FsSlotStore::new(dir.path().join("cache")),
        FixedPathPicker::open(&input),
    )
    .with_remote(remote.clone());

    let config = store
        .load(ConfigSource::UserFile)
        .await
        .unwrap()
        .done()
        .unwrap();

    let cam = config.camera("driveway").unwrap();
    assert_eq!(cam.name, "driveway");
    assert_eq!(cam.ffmpeg.inputs[1].roles, vec![InputRole::Detect, InputRole::Audio]);
    assert_eq!(cam.motion.as_ref().unwrap().threshold, 25);
    assert_eq!(cam.motion.as_ref().unwrap().contour_area, 10);
    let record = cam.record.as_ref().unwrap();
    assert_eq!(record.retain.as_ref().unwrap().mode, RetainMode::Motion);
    assert_eq!(record.events.as_ref().unwrap().post_capture, 5);
    assert_eq!(cam.zones.as_ref().unwrap()["street"].inertia, 3);
    assert_eq!(config.mqtt.port, 1883);
    assert!(config.extra.contains_key("birdseye"));

    store
        .save(&config, ConfigDestination::LocalCache)
        .await
        .unwrap();
    store
        .save(
            &config,
            ConfigDestination::Remote {
                location: location(),
                message: "initial import".into(),
            },
        )
        .await
        .unwrap();

    // A second session starts from the remote copy.
    let mut other = ConfigStore::new(MemorySlotStore::new(), FixedPathPicker::cancelling())
        .with_remote(remote.clone());
    let pulled = other
        .load(ConfigSource::Remote(location()))
        .await
        .unwrap()
        .done()
        .unwrap();
    assert_eq!(pulled, config);

    let edited = pulled
        .renamed_camera("driveway", "front_drive")
        .unwrap();
    other
        .save(
            &edited,
            ConfigDestination::Remote {
                location: location(),
                message: "rename camera".into(),
            },
        )
        .await
        .unwrap();

    // The first session still holds the old revision.
    let err = store
        .save(
            &config,
            ConfigDestination::Remote {
                location: location(),
                message: "stale".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "conflict");

    let latest = store
        .load(ConfigSource::Remote(location()))
        .await
        .unwrap()
        .done()
        .unwrap();
    assert!(latest.camera("front_drive").is_some());
    assert!(latest.camera("driveway").is_none());
    assert_eq!(
        remote.commit_messages().await,
        vec!["initial import", "rename camera"]
    );
}

#[tokio::test]
async fn cache_survives_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    let config = config::normalize(&config::decode(FRIGATE_YML).unwrap()).unwrap();

    let mut first = ConfigStore::new(FsSlotStore::new(&cache), FixedPathPicker::cancelling());
    first
        .save(&config, ConfigDestination::LocalCache)
        .await
        .unwrap();

    let mut second = ConfigStore::new(FsSlotStore::new(&cache), FixedPathPicker::cancelling());
    let loaded = second
        .load(ConfigSource::LocalCache)
        .await
        .unwrap()
        .done()
        .unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn every_violation_is_reported_with_its_path() {
    let text = r#"
mqtt:
  port: 70000
cameras:
  "bad name":
    ffmpeg:
      inputs:
        - path: rtsp://x
          roles: [detect, detect]
    motion:
      threshold: 0
"#;
    let report = config::check(&config::decode(text).unwrap());
    assert!(!report.valid);
    let paths: Vec<&str> = report.violations.iter().map(|v| v.path.as_str()).collect();
    for expected in [
        "mqtt.host",
        "mqtt.port",
        "cameras.bad name.name",
        "cameras.bad name.ffmpeg.inputs[0].roles[1]",
        "cameras.bad name.motion.threshold",
    ] {
        assert!(paths.contains(&expected), "missing {expected} in {paths:?}");
    }

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["valid"], false);
    assert!(json["error"].as_str().unwrap().contains("mqtt.host"));
}
