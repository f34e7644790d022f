//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use thirdi_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot reach the device: {reason}")]
    #[diagnostic(
        code(thirdi::unreachable),
        help(
            "Check that the camera is powered and on the same network.\n\
             In access-point mode the device is usually at http://192.168.42.1"
        )
    )]
    DeviceUnreachable { reason: String },

    #[error("No device URL configured")]
    #[diagnostic(
        code(thirdi::no_device),
        help(
            "Pass --device <url> or set THIRDI_DEVICE.\n\
             For local development without hardware, use --simulate."
        )
    )]
    NoDevice,

    // ── Device responses ─────────────────────────────────────────────
    #[error("The device rejected the request: {message}")]
    #[diagnostic(code(thirdi::rejected))]
    Rejected { message: String },

    #[error("Device API error: {message}")]
    #[diagnostic(
        code(thirdi::api_error),
        help("The device reported an internal fault. Try again; if it persists, reboot the camera.")
    )]
    Api { message: String },

    // ── Join workflow ────────────────────────────────────────────────
    #[error("Could not join '{essid}'")]
    #[diagnostic(
        code(thirdi::join_failed),
        help(
            "The device came back on its own access point instead of '{essid}'.\n\
             Check the password and that the network is in range, then retry."
        )
    )]
    JoinFailed { essid: String },

    #[error("Join attempt did not settle within {seconds}s")]
    #[diagnostic(
        code(thirdi::join_timeout),
        help(
            "The device never became reachable again. If it joined a different\n\
             network than this machine, reconnect to that network first."
        )
    )]
    JoinTimeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("File '{path}' not found on the device")]
    #[diagnostic(code(thirdi::not_found), help("Run: thirdi files ls"))]
    FileNotFound { path: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(thirdi::validation))]
    Validation { field: String, reason: String },

    #[error("'{operation}' needs a real device")]
    #[diagnostic(
        code(thirdi::simulated),
        help("The simulated backend has no media endpoints; drop --simulate.")
    )]
    NotSimulatable { operation: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceUnreachable { reason } => Self::DeviceUnreachable { reason },
            CoreError::Rejected { message } => Self::Rejected { message },
            CoreError::Api { message }
            | CoreError::AudioDecode(message)
            | CoreError::Internal(message) => Self::Api { message },
        }
    }
}

impl From<thirdi_api::Error> for CliError {
    fn from(err: thirdi_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DeviceUnreachable { .. } => exit_code::CONNECTION,
            Self::Rejected { .. } | Self::JoinFailed { .. } => exit_code::REJECTED,
            Self::JoinTimeout { .. } => exit_code::TIMEOUT,
            Self::FileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoDevice | Self::NotSimulatable { .. } => {
                exit_code::USAGE
            }
            Self::Api { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}
