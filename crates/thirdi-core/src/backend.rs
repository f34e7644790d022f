// ── Device backend capability object ──
//
// Everything in core talks to the device through this trait, selected
// once at startup: a real device behind HTTP, or an in-memory simulation
// for local development. This replaces an ambient "is this a simulated
// backend" flag: the choice is made where the backend is constructed and
// nowhere else.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;

use thirdi_api::DeviceClient;
use thirdi_api::Error;
use thirdi_api::types::{ConfigPatch, DeviceConfig, DiskUsage, FileEntry, Network, Portal};

/// The device as seen by core logic.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    // ── Network / portal ─────────────────────────────────────────────
    async fn portal(&self) -> Result<Portal, Error>;
    async fn list_networks(&self) -> Result<Vec<Network>, Error>;
    async fn connect_network(
        &self,
        essid: &str,
        password: Option<&SecretString>,
    ) -> Result<(), Error>;
    async fn start_access_point(&self) -> Result<(), Error>;

    // ── Configuration ────────────────────────────────────────────────
    async fn config(&self) -> Result<DeviceConfig, Error>;
    async fn patch_config(&self, patch: &ConfigPatch) -> Result<DeviceConfig, Error>;

    // ── Files / storage / capture ────────────────────────────────────
    async fn files(&self) -> Result<FileEntry, Error>;
    async fn rename_file(&self, file_url: &str, dst: &str) -> Result<(), Error>;
    async fn delete_file(&self, file_url: &str) -> Result<(), Error>;
    async fn disk_usage(&self) -> Result<DiskUsage, Error>;
    async fn make_photo(&self) -> Result<String, Error>;

    // ── Presets ──────────────────────────────────────────────────────
    async fn list_presets(&self) -> Result<Vec<String>, Error>;
    async fn save_preset(&self, name: &str, config: &ConfigPatch) -> Result<(), Error>;
    async fn delete_preset(&self, name: &str) -> Result<(), Error>;

    /// `true` when network transitions complete instantly because there is
    /// no physical interface to tear down. The join controller then skips
    /// transition-detection polling entirely.
    fn instant_transition(&self) -> bool {
        false
    }
}

// ── Real device ──────────────────────────────────────────────────────

/// A physical Third-I reached over HTTP.
pub struct RealBackend {
    client: DeviceClient,
}

impl RealBackend {
    pub fn new(client: DeviceClient) -> Self {
        Self { client }
    }

    /// The wrapped API client.
    pub fn client(&self) -> &DeviceClient {
        &self.client
    }
}

#[async_trait]
impl DeviceBackend for RealBackend {
    async fn portal(&self) -> Result<Portal, Error> {
        self.client.portal().await
    }

    async fn list_networks(&self) -> Result<Vec<Network>, Error> {
        self.client.list_networks().await
    }

    async fn connect_network(
        &self,
        essid: &str,
        password: Option<&SecretString>,
    ) -> Result<(), Error> {
        self.client.connect(essid, password).await
    }

    async fn start_access_point(&self) -> Result<(), Error> {
        self.client.start_access_point().await
    }

    async fn config(&self) -> Result<DeviceConfig, Error> {
        self.client.config().await
    }

    async fn patch_config(&self, patch: &ConfigPatch) -> Result<DeviceConfig, Error> {
        self.client.patch_config(patch).await
    }

    async fn files(&self) -> Result<FileEntry, Error> {
        self.client.files().await
    }

    async fn rename_file(&self, file_url: &str, dst: &str) -> Result<(), Error> {
        self.client.rename_file(file_url, dst).await
    }

    async fn delete_file(&self, file_url: &str) -> Result<(), Error> {
        self.client.delete_file(file_url).await
    }

    async fn disk_usage(&self) -> Result<DiskUsage, Error> {
        self.client.disk_usage().await
    }

    async fn make_photo(&self) -> Result<String, Error> {
        self.client.make_photo().await
    }

    async fn list_presets(&self) -> Result<Vec<String>, Error> {
        self.client.list_presets().await
    }

    async fn save_preset(&self, name: &str, config: &ConfigPatch) -> Result<(), Error> {
        self.client.save_preset(name, config).await
    }

    async fn delete_preset(&self, name: &str) -> Result<(), Error> {
        self.client.delete_preset(name).await
    }
}

// ── Simulated device ─────────────────────────────────────────────────

/// In-memory stand-in for a device, for development without hardware.
///
/// Joins succeed instantly (there is nothing to tear down), the network
/// scan warms up like the real radio does (a configurable number of empty
/// scans before results appear), and configuration edits round-trip
/// through an in-memory file.
pub struct SimulatedBackend {
    portal: Mutex<Portal>,
    config: Mutex<DeviceConfig>,
    presets: Mutex<BTreeMap<String, ConfigPatch>>,
    photos_taken: AtomicUsize,
    /// Remaining scans that return no results.
    warmup_scans: AtomicUsize,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            portal: Mutex::new(Portal {
                portal: true,
                essid: None,
                serial: "SIM-01111".to_owned(),
            }),
            config: Mutex::new(DeviceConfig {
                video_width: "1280".to_owned(),
                video_height: "720".to_owned(),
                video_fps: "30".to_owned(),
                video_bitrate: "3000000".to_owned(),
                exposure: "auto".to_owned(),
                audio_enabled: "1".to_owned(),
                ..DeviceConfig::default()
            }),
            presets: Mutex::new(BTreeMap::new()),
            photos_taken: AtomicUsize::new(0),
            warmup_scans: AtomicUsize::new(1),
        }
    }

    /// Number of scans that come back empty before the simulated radio
    /// "warms up". Defaults to 1, which exercises the auto-rescan path.
    pub fn with_warmup_scans(self, scans: usize) -> Self {
        self.warmup_scans.store(scans, Ordering::SeqCst);
        self
    }

}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceBackend for SimulatedBackend {
    async fn portal(&self) -> Result<Portal, Error> {
        Ok(self.portal.lock().await.clone())
    }

    async fn list_networks(&self) -> Result<Vec<Network>, Error> {
        let remaining = self.warmup_scans.load(Ordering::SeqCst);
        if remaining > 0 {
            self.warmup_scans.store(remaining - 1, Ordering::SeqCst);
            return Ok(Vec::new());
        }

        // Duplicate essids on purpose: overlapping access points.
        Ok(vec![
            Network {
                essid: "Weyland".to_owned(),
                password: true,
            },
            Network {
                essid: "CyberCafeDuCoin".to_owned(),
                password: false,
            },
            Network {
                essid: "Weyland".to_owned(),
                password: true,
            },
        ])
    }

    async fn connect_network(
        &self,
        essid: &str,
        _password: Option<&SecretString>,
    ) -> Result<(), Error> {
        let mut portal = self.portal.lock().await;
        portal.portal = false;
        portal.essid = Some(essid.to_owned());
        Ok(())
    }

    async fn start_access_point(&self) -> Result<(), Error> {
        let mut portal = self.portal.lock().await;
        portal.portal = true;
        portal.essid = None;
        Ok(())
    }

    async fn config(&self) -> Result<DeviceConfig, Error> {
        Ok(self.config.lock().await.clone())
    }

    async fn patch_config(&self, patch: &ConfigPatch) -> Result<DeviceConfig, Error> {
        let mut config = self.config.lock().await;
        apply_patch(&mut config, patch);
        Ok(config.clone())
    }

    async fn files(&self) -> Result<FileEntry, Error> {
        let children = (0..self.photos_taken.load(Ordering::SeqCst))
            .map(|i| FileEntry {
                name: format!("photo_{i:03}.jpg"),
                path: format!("/photo_{i:03}.jpg"),
                url: format!("/files/photo_{i:03}.jpg"),
                directory: false,
                children: Vec::new(),
            })
            .collect();
        Ok(FileEntry {
            name: String::new(),
            path: "/".to_owned(),
            url: "/files/".to_owned(),
            directory: true,
            children,
        })
    }

    async fn rename_file(&self, _file_url: &str, _dst: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn delete_file(&self, _file_url: &str) -> Result<(), Error> {
        Ok(())
    }

    async fn disk_usage(&self) -> Result<DiskUsage, Error> {
        Ok(DiskUsage {
            used: 4_294_967_296,
            total: 31_914_983_424,
        })
    }

    async fn make_photo(&self) -> Result<String, Error> {
        let n = self.photos_taken.fetch_add(1, Ordering::SeqCst);
        Ok(format!("photo_{n:03}.jpg"))
    }

    async fn list_presets(&self) -> Result<Vec<String>, Error> {
        Ok(self.presets.lock().await.keys().cloned().collect())
    }

    async fn save_preset(&self, name: &str, config: &ConfigPatch) -> Result<(), Error> {
        self.presets.lock().await.insert(name.to_owned(), config.clone());
        Ok(())
    }

    async fn delete_preset(&self, name: &str) -> Result<(), Error> {
        self.presets.lock().await.remove(name);
        Ok(())
    }

    fn instant_transition(&self) -> bool {
        true
    }
}

/// Overlay the set fields of `patch` onto `config`.
fn apply_patch(config: &mut DeviceConfig, patch: &ConfigPatch) {
    macro_rules! apply {
        ($($field:ident),* $(,)?) => {
            $(if let Some(ref value) = patch.$field {
                config.$field.clone_from(value);
            })*
        };
    }
    apply!(
        photo_resolution,
        video_width,
        video_height,
        video_mode,
        video_fps,
        video_bitrate,
        video_profile,
        video_wb,
        exposure,
        contrast,
        sharpness,
        digitalgain,
        rtmp_url,
        rtmp_enabled,
        mpegts_clients,
        mpegts_enabled,
        rtsp_enabled,
        udp_clients,
        udp_enabled,
        usb_enabled,
        ws_enabled,
        audio_enabled,
        record_enabled,
        record_time,
        dec_enabled,
        up_down,
        swapcams,
        wifi_iface,
        wifi_ssid,
        wifi_psk,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_scan_warms_up() {
        let backend = SimulatedBackend::new().with_warmup_scans(2);
        assert!(backend.list_networks().await.expect("scan").is_empty());
        assert!(backend.list_networks().await.expect("scan").is_empty());
        let networks = backend.list_networks().await.expect("scan");
        assert_eq!(networks.len(), 3);
        // Duplicate essids survive.
        assert_eq!(networks[0].essid, networks[2].essid);
    }

    #[tokio::test]
    async fn simulated_join_flips_portal_state() {
        let backend = SimulatedBackend::new();
        assert!(backend.portal().await.expect("portal").portal);

        backend
            .connect_network("Weyland", None)
            .await
            .expect("connect");
        let portal = backend.portal().await.expect("portal");
        assert!(!portal.portal);
        assert_eq!(portal.essid.as_deref(), Some("Weyland"));

        backend.start_access_point().await.expect("start ap");
        assert!(backend.portal().await.expect("portal").portal);
    }

    #[tokio::test]
    async fn simulated_config_patch_round_trips() {
        let backend = SimulatedBackend::new();
        let patch = ConfigPatch {
            exposure: Some("night".to_owned()),
            ..ConfigPatch::default()
        };
        let config = backend.patch_config(&patch).await.expect("patch");
        assert_eq!(config.exposure, "night");
        // Untouched fields keep their values.
        assert_eq!(config.video_fps, "30");
    }
}
