//! Session logic for the Third-I control panel.
//!
//! This crate owns everything between the device API and a renderer:
//!
//! - **[`StreamConnector`]** — keeps the live video and audio transports
//!   open, independently retrying either sub-stream on disconnect with a
//!   fixed delay, forever.
//!
//! - **[`JoinController`]** — drives the multi-phase workflow of joining
//!   the device to a WiFi network (or reverting it to access-point mode)
//!   across the interval where the device's own network disappears and
//!   reappears.
//!
//! - **[`Shell`]** — top-level application state: portal-setup vs. normal
//!   operation, photo vs. video capture mode, the recording timer, and the
//!   stalling indicator. Sequences when the connector and the join
//!   controller run.
//!
//! - **[`DeviceBackend`]** — capability object selected once at startup:
//!   a real device behind HTTP, or an in-memory simulated device for local
//!   development and tests.

pub mod audio;
pub mod backend;
pub mod debounce;
pub mod error;
pub mod join;
pub mod shell;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use audio::{AudioBlock, AudioPipeline};
pub use backend::{DeviceBackend, RealBackend, SimulatedBackend};
pub use debounce::Debouncer;
pub use error::CoreError;
pub use join::{JoinConfig, JoinController, JoinEvent, JoinOutcome, JoinPhase, JoinTarget};
pub use shell::{CaptureMode, Shell, ShellMode, ShellStatus};
pub use stream::{StreamConfig, StreamConnector, StreamEvent, StreamKind};
