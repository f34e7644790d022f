// Shared transport configuration and endpoint derivation.
//
// The REST client and the media streams agree on one base URL (the address
// the control panel was served from). Media endpoints are derived from it:
// same host, `ws`/`wss` scheme matching `http`/`https`, a well-known port
// for video and a well-known path for audio.

use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Port the device serves the raw video elementary stream on.
pub const VIDEO_STREAM_PORT: u16 = 8080;

/// Path the device serves the Opus audio bitstream on.
pub const AUDIO_STREAM_PATH: &str = "/audio";

/// Path prefix for REST endpoints on a real device. Local development
/// serves the API unprefixed.
pub const API_PREFIX: &str = "/api";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("thirdi-panel/0.1.0")
            .build()?)
    }
}

/// Map an `http`/`https` base URL to its `ws`/`wss` counterpart.
fn to_ws_scheme(url: &mut Url) {
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    // set_scheme only fails for special-scheme conversions that can't
    // apply here (http(s) -> ws(s) is always representable).
    let _ = url.set_scheme(scheme);
}

/// Derive the video stream endpoint: `{ws|wss}://{host}:8080`.
pub fn video_stream_url(base: &Url) -> Url {
    let mut url = base.clone();
    to_ws_scheme(&mut url);
    let _ = url.set_port(Some(VIDEO_STREAM_PORT));
    url.set_path("/");
    url
}

/// Derive the audio stream endpoint: `{ws|wss}://{host}{:port}/audio`.
pub fn audio_stream_url(base: &Url) -> Url {
    let mut url = base.clone();
    to_ws_scheme(&mut url);
    url.set_path(AUDIO_STREAM_PATH);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_url_uses_ws_and_fixed_port() {
        let base = Url::parse("http://192.168.1.23/").expect("url");
        let url = video_stream_url(&base);
        assert_eq!(url.as_str(), "ws://192.168.1.23:8080/");
    }

    #[test]
    fn video_url_maps_https_to_wss() {
        let base = Url::parse("https://third-i.local/").expect("url");
        let url = video_stream_url(&base);
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.port(), Some(VIDEO_STREAM_PORT));
    }

    #[test]
    fn audio_url_keeps_port_and_sets_path() {
        let base = Url::parse("http://192.168.1.23:3000/").expect("url");
        let url = audio_stream_url(&base);
        assert_eq!(url.as_str(), "ws://192.168.1.23:3000/audio");
    }
}
