//! Live-stream lifecycle: the video and audio sub-streams.
//!
//! One [`StreamConnector`] owns both media transports for the lifetime of
//! a session. The sub-streams are fully independent: each reconnects on
//! its own fixed-delay schedule, and neither waits for the other. The
//! video elementary stream is republished whole for a rendering surface;
//! the audio bitstream is decoded frame by frame and scheduled for
//! gapless playback.
//!
//! The connector is an explicitly constructed, owned object — build one,
//! inject it where the presentation layer needs stream status, call
//! [`start`](StreamConnector::start) once the session is ready.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use thirdi_api::media::{MediaStream, RetryConfig};
use thirdi_api::transport::{audio_stream_url, video_stream_url};

use crate::audio::{AudioBlock, AudioPipeline};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const VIDEO_CHANNEL_CAPACITY: usize = 256;
const AUDIO_CHANNEL_CAPACITY: usize = 64;

// ── Vocabulary ───────────────────────────────────────────────────────

/// One of the two independent live transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

/// Fired whenever a sub-stream transitions up or down. The shell uses
/// the down state to show its stalling indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: StreamKind,
    pub connected: bool,
}

/// Endpoints and retry policy for a session's streams.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub video_url: Url,
    pub audio_url: Url,
    pub retry: RetryConfig,
}

impl StreamConfig {
    /// Derive both endpoints from the device base URL, the same way the
    /// page derives them from its own address bar.
    pub fn for_device(base: &Url) -> Self {
        Self {
            video_url: video_stream_url(base),
            audio_url: audio_stream_url(base),
            retry: RetryConfig::default(),
        }
    }
}

// ── Connector ────────────────────────────────────────────────────────

/// Owns the lifecycle of both live transports.
pub struct StreamConnector {
    config: StreamConfig,
    started: AtomicBool,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<StreamEvent>,
    video_tx: broadcast::Sender<Bytes>,
    audio_tx: broadcast::Sender<AudioBlock>,
    video_state: watch::Sender<bool>,
    audio_state: watch::Sender<bool>,
}

impl StreamConnector {
    pub fn new(config: StreamConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (video_tx, _) = broadcast::channel(VIDEO_CHANNEL_CAPACITY);
        let (audio_tx, _) = broadcast::channel(AUDIO_CHANNEL_CAPACITY);
        let (video_state, _) = watch::channel(false);
        let (audio_state, _) = watch::channel(false);

        Self {
            config,
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            event_tx,
            video_tx,
            audio_tx,
            video_state,
            audio_state,
        }
    }

    /// Begin the connect sequence for both sub-streams.
    ///
    /// Idempotent: the first call spawns the two reconnect loops, any
    /// further call is a no-op. There is exactly one active connection
    /// attempt per sub-stream at any time.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("stream connector already started");
            return;
        }

        let video = MediaStream::connect(
            self.config.video_url.clone(),
            self.config.retry.clone(),
            self.cancel.child_token(),
        );
        spawn_state_task(
            StreamKind::Video,
            video.connected(),
            self.video_state.clone(),
            self.event_tx.clone(),
            self.cancel.clone(),
        );
        spawn_video_task(video.frames(), self.video_tx.clone(), self.cancel.clone());

        let audio = MediaStream::connect(
            self.config.audio_url.clone(),
            self.config.retry.clone(),
            self.cancel.child_token(),
        );
        spawn_state_task(
            StreamKind::Audio,
            audio.connected(),
            self.audio_state.clone(),
            self.event_tx.clone(),
            self.cancel.clone(),
        );
        spawn_audio_task(
            audio.frames(),
            audio.connected(),
            self.audio_tx.clone(),
            self.cancel.clone(),
        );
    }

    /// Tear both transports down. Terminal: a stopped connector is not
    /// restarted, a new one is built for a new session.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Up/down transitions for both sub-streams.
    pub fn events(&self) -> broadcast::Receiver<StreamEvent> {
        self.event_tx.subscribe()
    }

    /// Raw video frames, handed through without application-level
    /// decoding.
    pub fn video_frames(&self) -> broadcast::Receiver<Bytes> {
        self.video_tx.subscribe()
    }

    /// Decoded, playback-scheduled audio blocks.
    pub fn audio_blocks(&self) -> broadcast::Receiver<AudioBlock> {
        self.audio_tx.subscribe()
    }

    /// Watch one sub-stream's up/down state.
    pub fn state(&self, kind: StreamKind) -> watch::Receiver<bool> {
        match kind {
            StreamKind::Video => self.video_state.subscribe(),
            StreamKind::Audio => self.audio_state.subscribe(),
        }
    }

    /// Snapshot of one sub-stream's state.
    pub fn is_connected(&self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Video => *self.video_state.borrow(),
            StreamKind::Audio => *self.audio_state.borrow(),
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Mirror a transport's connected state into the connector's own watch
/// channel and the event stream.
fn spawn_state_task(
    kind: StreamKind,
    mut source: watch::Receiver<bool>,
    state_tx: watch::Sender<bool>,
    event_tx: broadcast::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut last = *source.borrow_and_update();
        eprintln!("DBG state_task {kind:?} initial last={last}");
        loop {
            if last != *state_tx.borrow() {
                let _ = state_tx.send(last);
                let _ = event_tx.send(StreamEvent {
                    kind,
                    connected: last,
                });
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => { eprintln!("DBG state_task {kind:?} cancelled"); break },
                changed = source.changed() => {
                    if changed.is_err() {
                        eprintln!("DBG state_task {kind:?} sender dropped");
                        break;
                    }
                    last = *source.borrow_and_update();
                    eprintln!("DBG state_task {kind:?} changed last={last}");
                }
            }
        }
    });
}

/// Forward raw video frames to subscribers.
fn spawn_video_task(
    mut frames: broadcast::Receiver<Bytes>,
    video_tx: broadcast::Sender<Bytes>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                frame = frames.recv() => match frame {
                    Ok(frame) => {
                        let _ = video_tx.send(frame);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Live video: skipping ahead is the right move.
                        debug!(skipped = n, "video consumer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    });
}

/// Decode audio frames and schedule them on the playback timeline.
fn spawn_audio_task(
    mut frames: broadcast::Receiver<Bytes>,
    mut connected: watch::Receiver<bool>,
    audio_tx: broadcast::Sender<AudioBlock>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut pipeline = match AudioPipeline::new() {
            Ok(pipeline) => pipeline,
            Err(e) => {
                warn!(error = %e, "audio pipeline unavailable");
                return;
            }
        };
        let epoch = Instant::now();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = connected.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // Transport went down: the next connection starts a
                    // fresh bitstream, so drop decoder state. The cursor
                    // survives — the timeline never rewinds.
                    if !*connected.borrow_and_update() {
                        if let Err(e) = pipeline.reset() {
                            warn!(error = %e, "audio decoder reset failed");
                        }
                    }
                }
                frame = frames.recv() => match frame {
                    Ok(packet) => {
                        let now = epoch.elapsed().as_secs_f64();
                        match pipeline.push(&packet, now) {
                            Ok(block) => {
                                let _ = audio_tx.send(block);
                            }
                            Err(e) => debug!(error = %e, "dropping undecodable audio frame"),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "audio consumer lagged");
                        if let Err(e) = pipeline.reset() {
                            warn!(error = %e, "audio decoder reset failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    });
}
