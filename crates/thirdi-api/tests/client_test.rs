// Integration tests for `DeviceClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use thirdi_api::transport::TransportConfig;
use thirdi_api::types::{ConfigPatch, DiskUsage};
use thirdi_api::{DeviceClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DeviceClient) {
    let server = MockServer::start().await;
    let base = server.uri().parse().expect("mock server URL");
    // Tests run unprefixed, like local development.
    let client =
        DeviceClient::with_prefix(base, "", &TransportConfig::default()).expect("client");
    (server, client)
}

// ── Portal / networks ───────────────────────────────────────────────

#[tokio::test]
async fn portal_in_access_point_mode() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "portal": true,
            "essid": null,
            "serial": "01111"
        })))
        .mount(&server)
        .await;

    let portal = client.portal().await.expect("portal");
    assert!(portal.portal);
    assert_eq!(portal.essid, None);
    assert_eq!(portal.serial, "01111");
}

#[tokio::test]
async fn portal_connected_to_network() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/portal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "portal": false,
            "essid": "eCafe",
            "serial": "01111"
        })))
        .mount(&server)
        .await;

    let portal = client.portal().await.expect("portal");
    assert!(!portal.portal);
    assert_eq!(portal.essid.as_deref(), Some("eCafe"));
}

#[tokio::test]
async fn api_prefix_is_applied() {
    let server = MockServer::start().await;
    let base = server.uri().parse().expect("mock server URL");
    let client = DeviceClient::new(base, &TransportConfig::default()).expect("client");

    Mock::given(method("GET"))
        .and(path("/api/portal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "portal": false,
            "essid": "MYHOME",
            "serial": "01111"
        })))
        .mount(&server)
        .await;

    let portal = client.portal().await.expect("portal");
    assert_eq!(portal.essid.as_deref(), Some("MYHOME"));
}

#[tokio::test]
async fn list_networks_preserves_duplicates() {
    let (server, client) = setup().await;

    // Two access points broadcasting the same essid: the device reports
    // both and the client must not merge them.
    Mock::given(method("GET"))
        .and(path("/list-networks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "essid": "MYHOME", "password": true },
            { "essid": "eCafe", "password": false },
            { "essid": "MYHOME", "password": true },
        ])))
        .mount(&server)
        .await;

    let networks = client.list_networks().await.expect("networks");
    assert_eq!(networks.len(), 3);
    assert_eq!(networks[0].essid, "MYHOME");
    assert!(networks[0].password);
    assert_eq!(networks[1].essid, "eCafe");
    assert!(!networks[1].password);
    assert_eq!(networks[2].essid, "MYHOME");
}

// ── Connect / access point ──────────────────────────────────────────

#[tokio::test]
async fn connect_with_password() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/connect"))
        .and(body_json(json!({ "essid": "MYHOME", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let password = SecretString::from("hunter2");
    client
        .connect("MYHOME", Some(&password))
        .await
        .expect("connect");
}

#[tokio::test]
async fn connect_open_network_omits_password() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/connect"))
        .and(body_json(json!({ "essid": "eCafe" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    client.connect("eCafe", None).await.expect("connect");
}

#[tokio::test]
async fn connect_rejected_maps_to_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "reason": "interface busy"
        })))
        .mount(&server)
        .await;

    let err = client.connect("MYHOME", None).await.expect_err("rejected");
    match err {
        Error::Rejected { reason } => assert_eq!(reason, "interface busy"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_a_hard_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/connect"))
        .respond_with(ResponseTemplate::new(500).set_body_string("wpa_supplicant crashed"))
        .mount(&server)
        .await;

    let err = client.connect("MYHOME", None).await.expect_err("server error");
    match err {
        Error::Server { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "wpa_supplicant crashed");
        }
        other => panic!("expected Server, got {other:?}"),
    }
    // A 5xx is not "unreachable" -- the device answered.
    // (classification matters to the join poll loops)
}

#[tokio::test]
async fn start_access_point() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/start-ap"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    client.start_access_point().await.expect("start-ap");
}

#[tokio::test]
async fn unreachable_device_classifies_as_transport() {
    // Point at a closed port; no server is listening.
    let base = "http://127.0.0.1:1".parse().expect("url");
    let client = DeviceClient::with_prefix(base, "", &TransportConfig::default()).expect("client");

    let err = client.portal().await.expect_err("unreachable");
    assert!(err.is_unreachable(), "expected unreachable, got {err:?}");
}

// ── Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn fetch_config() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "video_bitrate": "3000000",
            "exposure": "auto",
            "wifi_ssid": "MYHOME",
            "record_enabled": "1"
        })))
        .mount(&server)
        .await;

    let config = client.config().await.expect("config");
    assert_eq!(config.video_bitrate, "3000000");
    assert_eq!(config.exposure, "auto");
    assert_eq!(config.wifi_ssid, "MYHOME");
    // Fields the device omitted default to empty strings.
    assert_eq!(config.rtmp_url, "");
}

#[tokio::test]
async fn patch_config_sends_only_set_fields() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/config"))
        .and(body_json(json!({ "exposure": "sports" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "config": { "exposure": "sports" }
        })))
        .mount(&server)
        .await;

    let patch = ConfigPatch {
        exposure: Some("sports".into()),
        ..ConfigPatch::default()
    };
    let config = client.patch_config(&patch).await.expect("patch");
    assert_eq!(config.exposure, "sports");
}

// ── Files / storage ─────────────────────────────────────────────────

#[tokio::test]
async fn file_tree_round_trip() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "",
            "path": "/",
            "url": "/files/",
            "directory": true,
            "children": [
                {
                    "name": "photo_001.jpg",
                    "path": "/photo_001.jpg",
                    "url": "/files/photo_001.jpg",
                    "directory": false,
                    "children": []
                }
            ]
        })))
        .mount(&server)
        .await;

    let tree = client.files().await.expect("files");
    assert!(tree.directory);
    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].name, "photo_001.jpg");
    assert_eq!(tree.file_count(), 1);
}

#[tokio::test]
async fn rename_and_delete_address_the_entry_url() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/files/photo_001.jpg"))
        .and(body_json(json!({ "dst": "/keepers/photo_001.jpg" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/files/photo_002.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    client
        .rename_file("/files/photo_001.jpg", "/keepers/photo_001.jpg")
        .await
        .expect("rename");
    client
        .delete_file("/files/photo_002.jpg")
        .await
        .expect("delete");
}

#[tokio::test]
async fn disk_usage() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/disk-usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "used": 1_073_741_824_u64,
            "total": 31_914_983_424_u64
        })))
        .mount(&server)
        .await;

    let usage = client.disk_usage().await.expect("disk usage");
    assert_eq!(
        usage,
        DiskUsage {
            used: 1_073_741_824,
            total: 31_914_983_424
        }
    );
}

// ── Capture / presets ───────────────────────────────────────────────

#[tokio::test]
async fn make_photo_returns_filename() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/make-photo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "filename": "photo_042.jpg"
        })))
        .mount(&server)
        .await;

    let filename = client.make_photo().await.expect("photo");
    assert_eq!(filename, "photo_042.jpg");
}

#[tokio::test]
async fn preset_lifecycle() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/list-presets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["night", "timelapse"])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/preset/night"))
        .and(body_json(json!({ "exposure": "night" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/preset/timelapse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let presets = client.list_presets().await.expect("presets");
    assert_eq!(presets, vec!["night", "timelapse"]);

    let patch = ConfigPatch {
        exposure: Some("night".into()),
        ..ConfigPatch::default()
    };
    client.save_preset("night", &patch).await.expect("save");
    client.delete_preset("timelapse").await.expect("delete");
}

#[tokio::test]
async fn preset_names_are_encoded_as_one_path_segment() {
    let (server, client) = setup().await;

    // A space must not break the path application, and a slash must not
    // smuggle in an extra path segment.
    Mock::given(method("POST"))
        .and(path("/preset/night%20mode"))
        .and(body_json(json!({ "exposure": "night" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/preset/time%2Flapse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let patch = ConfigPatch {
        exposure: Some("night".into()),
        ..ConfigPatch::default()
    };
    client.save_preset("night mode", &patch).await.expect("save");
    client.delete_preset("time/lapse").await.expect("delete");
}
