//! Top-level application state.
//!
//! The shell decides which of the two machines owns the session: when the
//! device boots in portal mode the join controller takes over and the
//! stream connector is held back; once a join settles successfully (or
//! the user opts to keep access-point mode) the connector starts and runs
//! for the rest of the session. The shell also tracks the small pieces of
//! UI state that belong to nobody else: photo vs. video capture mode, the
//! recording timer, and the stalling indicator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use thirdi_api::types::ConfigPatch;

use crate::backend::DeviceBackend;
use crate::debounce::Debouncer;
use crate::error::CoreError;
use crate::join::{JoinController, JoinEvent, JoinOutcome};
use crate::stream::{StreamConnector, StreamKind};

// ── Vocabulary ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    /// Before the initial status query resolves.
    Starting,
    /// The device hosts its own network; the join workflow owns the
    /// screen and the streams are held back.
    PortalSetup,
    /// Normal operation: live streams running.
    Operating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Photo,
    Video,
}

/// Snapshot of shell state, published through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellStatus {
    pub mode: ShellMode,
    pub capture: CaptureMode,
    /// Name of the network the device is on; `None` in hotspot mode.
    pub connected_essid: Option<String>,
    pub serial: String,
    /// When the running recording started, if one is running.
    pub recording_since: Option<Instant>,
    /// `true` while operating with either sub-stream down.
    pub stalling: bool,
}

impl ShellStatus {
    fn initial() -> Self {
        Self {
            mode: ShellMode::Starting,
            capture: CaptureMode::Video,
            connected_essid: None,
            serial: String::new(),
            recording_since: None,
            stalling: false,
        }
    }
}

// ── Shell ────────────────────────────────────────────────────────────

/// Sequences the join controller and the stream connector, and owns
/// session-level UI state.
pub struct Shell {
    backend: Arc<dyn DeviceBackend>,
    connector: Arc<StreamConnector>,
    join: JoinController,
    status_tx: watch::Sender<ShellStatus>,
    cancel: CancellationToken,
}

impl Shell {
    pub fn new(
        backend: Arc<dyn DeviceBackend>,
        connector: Arc<StreamConnector>,
        join: JoinController,
    ) -> Self {
        let (status_tx, _) = watch::channel(ShellStatus::initial());
        Self {
            backend,
            connector,
            join,
            status_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Query device status once and enter the right mode.
    ///
    /// Also spawns the listeners that react to join settlements and
    /// stream transitions for the rest of the session.
    pub async fn startup(&self) -> Result<(), CoreError> {
        self.spawn_join_listener();
        self.spawn_stream_listener();

        let portal = self.backend.portal().await?;
        self.status_tx.send_modify(|s| s.serial = portal.serial.clone());

        if portal.portal {
            info!("device is in portal mode; starting network setup");
            self.status_tx.send_modify(|s| s.mode = ShellMode::PortalSetup);
            if let Err(e) = self.join.scan().await {
                warn!(error = %e, "initial network scan failed");
            }
        } else {
            info!(essid = ?portal.essid, "device already on a network");
            self.enter_operating(portal.essid);
        }
        Ok(())
    }

    /// Watch shell state.
    pub fn status(&self) -> watch::Receiver<ShellStatus> {
        self.status_tx.subscribe()
    }

    /// The join controller driving the setup screen.
    pub fn join(&self) -> &JoinController {
        &self.join
    }

    /// The stream connector (for frame subscriptions).
    pub fn connector(&self) -> &Arc<StreamConnector> {
        &self.connector
    }

    /// User opted to stay on the device's own access point: proceed to
    /// normal operation without a join.
    pub fn keep_access_point(&self) {
        info!("keeping access-point mode");
        self.enter_operating(None);
    }

    /// Stop listeners and the connector.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.connector.stop();
        self.join.shutdown();
    }

    // ── Capture state ────────────────────────────────────────────────

    pub fn set_capture_mode(&self, capture: CaptureMode) {
        self.status_tx.send_modify(|s| {
            // Leaving video mode implicitly ends the recording timer.
            if capture == CaptureMode::Photo {
                s.recording_since = None;
            }
            s.capture = capture;
        });
    }

    /// Start the recording timer. No-op unless in video capture mode.
    pub fn start_recording(&self) {
        self.status_tx.send_modify(|s| {
            if s.capture == CaptureMode::Video && s.recording_since.is_none() {
                s.recording_since = Some(Instant::now());
            }
        });
    }

    /// Stop the recording timer, returning the recorded duration.
    pub fn stop_recording(&self) -> Option<Duration> {
        let mut elapsed = None;
        self.status_tx.send_modify(|s| {
            elapsed = s.recording_since.take().map(|since| since.elapsed());
        });
        elapsed
    }

    /// Elapsed time of the running recording, if any.
    pub fn recording_elapsed(&self) -> Option<Duration> {
        self.status_tx
            .borrow()
            .recording_since
            .map(|since| since.elapsed())
    }

    /// Take a still photo, returning its filename.
    pub async fn take_photo(&self) -> Result<String, CoreError> {
        Ok(self.backend.make_photo().await?)
    }

    /// Debounced configuration writes.
    ///
    /// Settings forms fire a patch per keystroke or slider tick; the
    /// returned handle coalesces them and sends one `PATCH /config` per
    /// quiet period. Write failures are logged, not surfaced — the next
    /// edit supersedes a lost one anyway.
    pub fn config_writer(&self, window: Duration) -> Debouncer<ConfigPatch> {
        let (debouncer, mut patches) = Debouncer::new(window);
        let backend = Arc::clone(&self.backend);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                let patch: ConfigPatch = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    patch = patches.recv() => match patch {
                        Some(patch) => patch,
                        None => break,
                    },
                };
                if patch.is_empty() {
                    continue;
                }
                if let Err(e) = backend.patch_config(&patch).await {
                    warn!(error = %e, "debounced configuration write failed");
                }
            }
        });
        debouncer
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_operating(&self, essid: Option<String>) {
        self.connector.start();
        let stalling = !(self.connector.is_connected(StreamKind::Video)
            && self.connector.is_connected(StreamKind::Audio));
        self.status_tx.send_modify(|s| {
            s.mode = ShellMode::Operating;
            s.connected_essid = essid;
            s.stalling = stalling;
        });
    }

    /// React to join settlements: success moves the session to normal
    /// operation. Failures leave the mode alone — the join screen stays
    /// up with a refreshed network list.
    fn spawn_join_listener(&self) {
        let mut events = self.join.events();
        let status_tx = self.status_tx.clone();
        let connector = Arc::clone(&self.connector);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(JoinEvent::Settled(JoinOutcome::Success { essid })) => {
                        let essid = (!essid.is_empty()).then_some(essid);
                        info!(essid = ?essid, "join settled; starting streams");
                        connector.start();
                        let stalling = !(connector.is_connected(StreamKind::Video)
                            && connector.is_connected(StreamKind::Audio));
                        status_tx.send_modify(|s| {
                            s.mode = ShellMode::Operating;
                            s.connected_essid = essid;
                            s.stalling = stalling;
                        });
                    }
                    Ok(JoinEvent::Settled(JoinOutcome::Failure { .. }))
                    | Ok(JoinEvent::SubmitFailed { .. }) => {
                        // Surfaced by the renderer from the same event
                        // stream; the shell has nothing to change.
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Keep the stalling flag in step with sub-stream state.
    fn spawn_stream_listener(&self) {
        let mut events = self.connector.events();
        let status_tx = self.status_tx.clone();
        let connector = Arc::clone(&self.connector);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(_) => {
                        let stalling = !(connector.is_connected(StreamKind::Video)
                            && connector.is_connected(StreamKind::Audio));
                        status_tx.send_modify(|s| {
                            s.stalling = s.mode == ShellMode::Operating && stalling;
                        });
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────────
