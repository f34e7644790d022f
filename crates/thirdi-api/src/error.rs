use thiserror::Error;

/// Top-level error type for the `thirdi-api` crate.
///
/// Covers every failure mode across both API surfaces: the REST API and the
/// media WebSockets. `thirdi-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── REST API ────────────────────────────────────────────────────
    /// The device answered with a server-error status. This is a hard
    /// failure, distinct from not being able to reach the device at all.
    #[error("Device returned HTTP {status}")]
    Server { status: u16, body: String },

    /// The device accepted the request but reported `success: false`.
    #[error("Device rejected the request: {reason}")]
    Rejected { reason: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// Media WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),
}

impl Error {
    /// Returns `true` when the device could not be reached at all:
    /// connection refused, DNS failure, or a request timeout.
    ///
    /// The network-join controller treats this as "device mid-transition"
    /// rather than a fault, so the classification matters.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::WebSocketConnect(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        self.is_unreachable()
    }
}
