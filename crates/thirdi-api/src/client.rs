// Device REST API client
//
// Wraps `reqwest::Client` with Third-I specific URL construction and
// response handling. Server-error statuses become hard failures; a body
// with `success: false` becomes `Error::Rejected`. Network-level failures
// surface as `Error::Transport` so callers can tell "device said no" from
// "device not reachable".

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::{API_PREFIX, TransportConfig};
use crate::types::{
    Ack, ConfigPatch, ConfigUpdate, DeviceConfig, DiskUsage, FileEntry, Network, PhotoTaken,
    Portal,
};

/// Client-side timeout on the portal status poll. During a network
/// transition the device is expected to be unreachable, so this bounds how
/// long one poll can hang.
pub const PORTAL_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Typed client for the device's REST API.
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    prefix: String,
}

impl DeviceClient {
    /// Create a client for a real device (endpoints prefixed `/api`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Self::with_prefix(base_url, API_PREFIX, transport)
    }

    /// Create a client with an explicit path prefix.
    ///
    /// Local development serves the API unprefixed; pass `""` there.
    pub fn with_prefix(
        base_url: Url,
        prefix: &str,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            prefix: prefix.trim_end_matches('/').to_owned(),
        })
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}{prefix}{path}`.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.prefix,
            path
        );
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::parse_json(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        Self::parse_json(resp).await
    }

    /// Parse a JSON response body, mapping server-error statuses to
    /// `Error::Server` before attempting deserialization.
    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if status.is_server_error() {
            return Err(Error::Server {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Unwrap a command acknowledgement, mapping `success: false` to
    /// `Error::Rejected`.
    fn check_ack(ack: Ack) -> Result<(), Error> {
        if ack.success {
            Ok(())
        } else {
            Err(Error::Rejected {
                reason: ack.reason.unwrap_or_else(|| "no reason given".to_owned()),
            })
        }
    }

    // ── Network / portal ─────────────────────────────────────────────

    /// `GET /portal` — the device's current network state.
    ///
    /// Carries its own short timeout independent of the client default:
    /// this is the endpoint the join controller polls while the device's
    /// network is expected to be down.
    pub async fn portal(&self) -> Result<Portal, Error> {
        let url = self.api_url("/portal")?;
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .timeout(PORTAL_POLL_TIMEOUT)
            .send()
            .await?;
        Self::parse_json(resp).await
    }

    /// `GET /list-networks` — one scan snapshot of nearby networks.
    pub async fn list_networks(&self) -> Result<Vec<Network>, Error> {
        self.get("/list-networks").await
    }

    /// `POST /connect` — ask the device to join a network.
    ///
    /// Note the device acknowledges optimistically: `success: true` only
    /// means the request was accepted, not that association worked. The
    /// actual outcome is read back from `portal()` once the device
    /// reappears.
    pub async fn connect(
        &self,
        essid: &str,
        password: Option<&SecretString>,
    ) -> Result<(), Error> {
        let body = match password {
            Some(password) => json!({ "essid": essid, "password": password.expose_secret() }),
            None => json!({ "essid": essid }),
        };
        let ack: Ack = self.post("/connect", &body).await?;
        Self::check_ack(ack)
    }

    /// `POST /start-ap` — revert the device to hosting its own network.
    pub async fn start_access_point(&self) -> Result<(), Error> {
        let ack: Ack = self.post("/start-ap", &json!({})).await?;
        Self::check_ack(ack)
    }

    // ── Configuration ────────────────────────────────────────────────

    /// `GET /config` — fetch the whole configuration file.
    pub async fn config(&self) -> Result<DeviceConfig, Error> {
        self.get("/config").await
    }

    /// `PATCH /config` — apply a partial update, returning the new file.
    pub async fn patch_config(&self, patch: &ConfigPatch) -> Result<DeviceConfig, Error> {
        let url = self.api_url("/config")?;
        debug!("PATCH {}", url);
        let resp = self.http.patch(url).json(patch).send().await?;
        let update: ConfigUpdate = Self::parse_json(resp).await?;
        if update.success {
            Ok(update.config)
        } else {
            Err(Error::Rejected {
                reason: "configuration update refused".to_owned(),
            })
        }
    }

    // ── Files / storage ──────────────────────────────────────────────

    /// `GET /files` — the user file tree.
    pub async fn files(&self) -> Result<FileEntry, Error> {
        self.get("/files").await
    }

    /// `PATCH {file.url}` — rename/move a file to `dst`.
    ///
    /// File operations address the `url` field of a [`FileEntry`], which
    /// is already prefixed by the device; it is resolved against the base
    /// URL, not run through the API prefix again.
    pub async fn rename_file(&self, file_url: &str, dst: &str) -> Result<(), Error> {
        let url = self.base_url.join(file_url)?;
        debug!("PATCH {}", url);
        let resp = self
            .http
            .patch(url)
            .json(&json!({ "dst": dst }))
            .send()
            .await?;
        let ack: Ack = Self::parse_json(resp).await?;
        Self::check_ack(ack)
    }

    /// `DELETE {file.url}` — delete a file.
    pub async fn delete_file(&self, file_url: &str) -> Result<(), Error> {
        let url = self.base_url.join(file_url)?;
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        let ack: Ack = Self::parse_json(resp).await?;
        Self::check_ack(ack)
    }

    /// `GET /disk-usage` — storage occupancy in bytes.
    pub async fn disk_usage(&self) -> Result<DiskUsage, Error> {
        self.get("/disk-usage").await
    }

    // ── Capture ──────────────────────────────────────────────────────

    /// `POST /make-photo` — take a still, returning its filename.
    pub async fn make_photo(&self) -> Result<String, Error> {
        let taken: PhotoTaken = self.post("/make-photo", &json!({})).await?;
        if taken.success {
            Ok(taken.filename)
        } else {
            Err(Error::Rejected {
                reason: "photo capture refused".to_owned(),
            })
        }
    }

    // ── Presets ──────────────────────────────────────────────────────

    /// `GET /list-presets` — names of saved configuration presets.
    pub async fn list_presets(&self) -> Result<Vec<String>, Error> {
        self.get("/list-presets").await
    }

    /// URL for a named preset. The name goes through the path-segment
    /// encoder, so slashes or spaces in it cannot escape the path.
    fn preset_url(&self, name: &str) -> Result<Url, Error> {
        let mut url = self.api_url("/preset")?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(name);
        Ok(url)
    }

    /// `POST /preset/{name}` — save a preset.
    pub async fn save_preset(&self, name: &str, config: &ConfigPatch) -> Result<(), Error> {
        let url = self.preset_url(name)?;
        debug!("POST {}", url);
        let resp = self.http.post(url).json(config).send().await?;
        let ack: Ack = Self::parse_json(resp).await?;
        Self::check_ack(ack)
    }

    /// `DELETE /preset/{name}` — delete a preset.
    pub async fn delete_preset(&self, name: &str) -> Result<(), Error> {
        let url = self.preset_url(name)?;
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        let ack: Ack = Self::parse_json(resp).await?;
        Self::check_ack(ack)
    }
}
