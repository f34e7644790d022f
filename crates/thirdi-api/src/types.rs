// Wire types for the device REST API.
//
// Every body is a flat JSON object. The device's configuration file is
// string-typed throughout (it is `/boot/stereopi.conf` behind the scenes),
// so all config fields are strings here too, even the numeric-looking ones.

use serde::{Deserialize, Serialize};

// ── Network / portal ─────────────────────────────────────────────────

/// Response to `GET /portal` — the device's authoritative network state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portal {
    /// `true` while the device hosts its own access point.
    pub portal: bool,
    /// ESSID of the joined network, when there is one.
    pub essid: Option<String>,
    /// Device serial number.
    #[serde(default)]
    pub serial: String,
}

/// One nearby network from `GET /list-networks`.
///
/// A scan snapshot may carry the same essid more than once when several
/// access points broadcast it; the device does not merge them and neither
/// do we (dedup is an opt-in at the controller level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub essid: String,
    /// `true` if the network requires a password.
    pub password: bool,
}

// ── Generic command acknowledgement ──────────────────────────────────

/// Base response shape: every command endpoint returns at least this.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

// ── Configuration ────────────────────────────────────────────────────

/// The device configuration file, fetched whole via `GET /config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub photo_resolution: String,
    #[serde(default)]
    pub video_width: String,
    #[serde(default)]
    pub video_height: String,
    #[serde(default)]
    pub video_mode: String,
    #[serde(default)]
    pub video_fps: String,
    #[serde(default)]
    pub video_bitrate: String,
    #[serde(default)]
    pub video_profile: String,
    #[serde(default)]
    pub video_wb: String,
    #[serde(default)]
    pub exposure: String,
    #[serde(default)]
    pub contrast: String,
    #[serde(default)]
    pub sharpness: String,
    #[serde(default)]
    pub digitalgain: String,
    #[serde(default)]
    pub rtmp_url: String,
    #[serde(default)]
    pub rtmp_enabled: String,
    #[serde(default)]
    pub mpegts_clients: String,
    #[serde(default)]
    pub mpegts_enabled: String,
    #[serde(default)]
    pub rtsp_enabled: String,
    #[serde(default)]
    pub udp_clients: String,
    #[serde(default)]
    pub udp_enabled: String,
    #[serde(default)]
    pub usb_enabled: String,
    #[serde(default)]
    pub ws_enabled: String,
    #[serde(default)]
    pub audio_enabled: String,
    #[serde(default)]
    pub record_enabled: String,
    #[serde(default)]
    pub record_time: String,
    #[serde(default)]
    pub dec_enabled: String,
    #[serde(default)]
    pub up_down: String,
    #[serde(default)]
    pub swapcams: String,
    #[serde(default)]
    pub wifi_iface: String,
    #[serde(default)]
    pub wifi_ssid: String,
    #[serde(default)]
    pub wifi_psk: String,
}

/// Partial configuration for `PATCH /config` — only the set fields are
/// serialized, so a patch touches exactly what the caller changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_fps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_wb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digitalgain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtmp_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtmp_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpegts_clients: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpegts_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtsp_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp_clients: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usb_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dec_enabled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_down: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swapcams: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi_iface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi_psk: Option<String>,
}

impl ConfigPatch {
    /// `true` when no field is set (nothing to send).
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| v.as_object().is_some_and(serde_json::Map::is_empty))
            .unwrap_or(true)
    }

    /// Set a field by its wire name. Returns `false` for unknown names.
    ///
    /// Lets the CLI accept `key=value` pairs without enumerating fields.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let mut map = serde_json::to_value(&*self)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        map.insert(key.to_owned(), serde_json::Value::String(value.to_owned()));
        match serde_json::from_value::<Self>(serde_json::Value::Object(map)) {
            Ok(updated) => {
                *self = updated;
                true
            }
            Err(_) => false,
        }
    }
}

/// Response to `PATCH /config`: acknowledgement plus the updated file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigUpdate {
    pub success: bool,
    pub config: DeviceConfig,
}

// ── Files / storage ──────────────────────────────────────────────────

/// One node of the recursive file tree from `GET /files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    /// Endpoint for operations on this entry (rename, delete, download).
    pub url: String,
    pub directory: bool,
    #[serde(default)]
    pub children: Vec<FileEntry>,
}

impl FileEntry {
    /// Count of non-directory descendants, including self.
    pub fn file_count(&self) -> usize {
        if self.directory {
            self.children.iter().map(FileEntry::file_count).sum()
        } else {
            1
        }
    }
}

/// Response to `GET /disk-usage`, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub used: u64,
    pub total: u64,
}

// ── Capture ──────────────────────────────────────────────────────────

/// Response to `POST /make-photo`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoTaken {
    pub success: bool,
    #[serde(default)]
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn portal_with_null_essid() {
        let portal: Portal =
            serde_json::from_str(r#"{"portal":true,"essid":null,"serial":"01111"}"#)
                .expect("parse");
        assert!(portal.portal);
        assert_eq!(portal.essid, None);
        assert_eq!(portal.serial, "01111");
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        let patch = ConfigPatch::default();
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).expect("json"), "{}");
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = ConfigPatch {
            exposure: Some("sports".into()),
            ..ConfigPatch::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(
            serde_json::to_string(&patch).expect("json"),
            r#"{"exposure":"sports"}"#
        );
    }

    #[test]
    fn patch_set_by_wire_name() {
        let mut patch = ConfigPatch::default();
        assert!(patch.set("video_bitrate", "3000000"));
        assert_eq!(patch.video_bitrate.as_deref(), Some("3000000"));
        assert!(!patch.set("no_such_field", "1"));
    }

    #[test]
    fn file_tree_counts_leaves() {
        let tree = FileEntry {
            name: "DCIM".into(),
            path: "/DCIM".into(),
            url: "/files/DCIM".into(),
            directory: true,
            children: vec![
                FileEntry {
                    name: "a.jpg".into(),
                    path: "/DCIM/a.jpg".into(),
                    url: "/files/DCIM/a.jpg".into(),
                    directory: false,
                    children: vec![],
                },
                FileEntry {
                    name: "clips".into(),
                    path: "/DCIM/clips".into(),
                    url: "/files/DCIM/clips".into(),
                    directory: true,
                    children: vec![FileEntry {
                        name: "b.mp4".into(),
                        path: "/DCIM/clips/b.mp4".into(),
                        url: "/files/DCIM/clips/b.mp4".into(),
                        directory: false,
                        children: vec![],
                    }],
                },
            ],
        };
        assert_eq!(tree.file_count(), 2);
    }
}
