// ── Core error types ──
//
// User-facing errors from thirdi-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<thirdi_api::Error>`
// impl translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the device: {reason}")]
    DeviceUnreachable { reason: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("The device rejected the request: {message}")]
    Rejected { message: String },

    // ── Media errors ─────────────────────────────────────────────────
    #[error("Audio decode error: {0}")]
    AudioDecode(String),

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Device API error: {message}")]
    Api { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<thirdi_api::Error> for CoreError {
    fn from(err: thirdi_api::Error) -> Self {
        match err {
            thirdi_api::Error::Rejected { reason } => CoreError::Rejected { message: reason },
            thirdi_api::Error::Server { status, .. } => CoreError::Api {
                message: format!("device returned HTTP {status}"),
            },
            thirdi_api::Error::Transport(ref e) if err.is_unreachable() => {
                CoreError::DeviceUnreachable {
                    reason: e.to_string(),
                }
            }
            thirdi_api::Error::WebSocketConnect(reason) => {
                CoreError::DeviceUnreachable { reason }
            }
            thirdi_api::Error::Transport(e) => CoreError::Api {
                message: e.to_string(),
            },
            thirdi_api::Error::InvalidUrl(e) => CoreError::Internal(format!("invalid URL: {e}")),
            thirdi_api::Error::Deserialization { message, .. } => {
                CoreError::Internal(format!("deserialization error: {message}"))
            }
        }
    }
}
