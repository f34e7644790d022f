// thirdi-api: Async Rust client for the Third-I camera device
//
// Two surfaces: the JSON REST API (configuration, network control, files)
// and the raw media WebSockets (video elementary stream, Opus audio).

pub mod client;
pub mod error;
pub mod media;
pub mod transport;
pub mod types;

pub use client::DeviceClient;
pub use error::Error;
pub use media::{MediaStream, RetryConfig};
