//! Media WebSocket transport with unconditional auto-reconnect.
//!
//! One [`MediaStream`] owns one sub-stream (video or audio): it connects to
//! the device's media endpoint, fans binary frames out through a
//! [`tokio::sync::broadcast`] channel, and publishes up/down transitions
//! through a [`tokio::sync::watch`] channel. Any disconnect — refused
//! connection, abrupt close, clean close frame — schedules exactly one
//! reconnect attempt after a fixed delay, forever. There is no backoff and
//! no attempt cap: the live stream must always be trying to come back.
//!
//! # Example
//!
//! ```rust,ignore
//! use thirdi_api::media::{MediaStream, RetryConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let url = Url::parse("ws://192.168.1.23:8080/")?;
//!
//! let stream = MediaStream::connect(url, RetryConfig::default(), cancel.clone());
//! let mut frames = stream.frames();
//!
//! while let Ok(frame) = frames.recv().await {
//!     surface.push(frame);
//! }
//!
//! stream.shutdown();
//! ```

use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// Raw video frames arrive at camera rate; give consumers some slack
// before they start lagging.
const FRAME_CHANNEL_CAPACITY: usize = 256;

// ── RetryConfig ──────────────────────────────────────────────────────

/// Reconnection policy for a media sub-stream.
///
/// Deliberately a fixed delay rather than a backoff schedule: the device
/// is on the local network and the page wants the stream back the moment
/// it is available again.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay between a disconnect and the next connection attempt.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
        }
    }
}

// ── MediaStream ──────────────────────────────────────────────────────

/// Handle to one running media sub-stream.
pub struct MediaStream {
    frame_tx: broadcast::Sender<Bytes>,
    connected_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl MediaStream {
    /// Spawn the reconnection loop for `url`.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. Watch [`connected`](Self::connected) or subscribe to
    /// [`frames`](Self::frames) to observe progress.
    pub fn connect(url: Url, retry: RetryConfig, cancel: CancellationToken) -> Self {
        let (frame_tx, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (connected_tx, connected_rx) = watch::channel(false);

        let task_cancel = cancel.clone();
        let task_tx = frame_tx.clone();
        tokio::spawn(async move {
            stream_loop(url, task_tx, connected_tx, retry, task_cancel).await;
        });

        Self {
            frame_tx,
            connected_rx,
            cancel,
        }
    }

    /// Get a new receiver for the binary frame stream.
    ///
    /// A consumer that falls behind receives
    /// [`broadcast::error::RecvError::Lagged`] and resumes from the most
    /// recent frames — fine for live media, where stale frames are useless.
    pub fn frames(&self) -> broadcast::Receiver<Bytes> {
        self.frame_tx.subscribe()
    }

    /// Watch the sub-stream's up/down state.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// `true` while the transport is currently up.
    pub fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    /// Stop the reconnection loop and close the transport.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read until drop → fixed delay → reconnect.
///
/// Transport errors and clean disconnects take the same path; the retry
/// loop does not care why the stream went away.
async fn stream_loop(
    url: Url,
    frame_tx: broadcast::Sender<Bytes>,
    connected_tx: watch::Sender<bool>,
    retry: RetryConfig,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_read(&url, &frame_tx, &connected_tx, &cancel) => {
                let _ = connected_tx.send(false);
                match result {
                    Ok(()) => tracing::info!(url = %url, "media stream disconnected"),
                    Err(e) => tracing::debug!(url = %url, error = %e, "media stream error"),
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(retry.delay) => {}
                }
            }
        }
    }

    let _ = connected_tx.send(false);
    tracing::debug!(url = %url, "media stream loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection and read binary frames until it
/// drops.
async fn connect_and_read(
    url: &Url,
    frame_tx: &broadcast::Sender<Bytes>,
    connected_tx: &watch::Sender<bool>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::debug!(url = %url, "connecting media stream");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!(url = %url, "media stream connected");
    let _ = connected_tx.send(true);

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Binary(data))) => {
                        // No subscribers is fine; frames are simply dropped.
                        let _ = frame_tx.send(data);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite replies with pong automatically
                        tracing::trace!("media stream ping");
                    }
                    Some(Ok(tungstenite::Message::Close(_))) => {
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        return Ok(());
                    }
                    _ => {
                        // Text, Pong, Frame -- the device never sends these
                    }
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
