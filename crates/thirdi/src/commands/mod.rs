//! Command dispatch: bridges CLI args -> core operations -> output.

pub mod config_cmd;
pub mod disk;
pub mod files;
pub mod join;
pub mod monitor;
pub mod networks;
pub mod photo;
pub mod preset;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use thirdi_api::DeviceClient;
use thirdi_api::transport::TransportConfig;
use thirdi_core::backend::{DeviceBackend, RealBackend, SimulatedBackend};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// The resolved device for this invocation.
pub struct Session {
    pub backend: Arc<dyn DeviceBackend>,
    /// Base URL of a real device; `None` when simulating.
    pub base_url: Option<Url>,
}

impl Session {
    /// Build the backend once from the global flags: a real device behind
    /// HTTP, or the in-memory simulation.
    pub fn build(global: &GlobalOpts) -> Result<Self, CliError> {
        if global.simulate {
            return Ok(Self {
                backend: Arc::new(SimulatedBackend::new()),
                base_url: None,
            });
        }

        let url_str = global.device.as_deref().ok_or(CliError::NoDevice)?;
        let url: Url = url_str.parse().map_err(|_| CliError::Validation {
            field: "device".into(),
            reason: format!("invalid URL: {url_str}"),
        })?;

        let transport = TransportConfig {
            timeout: Duration::from_secs(global.timeout),
        };
        let client = DeviceClient::new(url.clone(), &transport)?;
        Ok(Self {
            backend: Arc::new(RealBackend::new(client)),
            base_url: Some(url),
        })
    }
}

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(session, global).await,
        Command::Networks(args) => networks::handle(session, args, global).await,
        Command::Join(args) => join::join(session, args, global).await,
        Command::Hotspot => join::hotspot(session, global).await,
        Command::Monitor(args) => monitor::handle(session, args, global).await,
        Command::Photo => photo::handle(session, global).await,
        Command::Config(args) => config_cmd::handle(session, args, global).await,
        Command::Files(args) => files::handle(session, args, global).await,
        Command::Disk => disk::handle(session, global).await,
        Command::Preset(args) => preset::handle(session, args, global).await,
    }
}

/// Parse `key=value` pairs into a config patch.
pub fn parse_pairs(pairs: &[String]) -> Result<thirdi_api::types::ConfigPatch, CliError> {
    let mut patch = thirdi_api::types::ConfigPatch::default();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| CliError::Validation {
            field: pair.clone(),
            reason: "expected key=value".into(),
        })?;
        if !patch.set(key, value) {
            return Err(CliError::Validation {
                field: key.to_owned(),
                reason: "unknown configuration field".into(),
            });
        }
    }
    Ok(patch)
}
