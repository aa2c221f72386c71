//! Service settings read from the `spotcast` key of the Rocket figment.
//!
//! ```toml
//! [default.spotcast]
//! live_stream_timeout_ms = 3000
//! playback_stale_after_secs = 300
//! event_channel_capacity = 256
//! ```

use std::time::Duration;

use rocket::figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotcastConfig {
    /// How long a live-stream request waits for the device to report.
    pub live_stream_timeout_ms: u64,
    /// Reports older than this count as "no active playback".
    pub playback_stale_after_secs: u64,
    /// Buffer of the real-time event channel per subscriber.
    pub event_channel_capacity: usize,
}

impl Default for SpotcastConfig {
    fn default() -> Self {
        Self {
            live_stream_timeout_ms: 3000,
            playback_stale_after_secs: 300,
            event_channel_capacity: 256,
        }
    }
}

impl SpotcastConfig {
    /// Extracts the settings, falling back to defaults when the key is
    /// absent or malformed.
    pub fn from_figment(figment: &Figment) -> Self {
        match figment.extract_inner::<SpotcastConfig>("spotcast") {
            Ok(config) => config,
            Err(e) if e.missing() => SpotcastConfig::default(),
            Err(e) => {
                warn!("Invalid spotcast configuration, using defaults: {}", e);
                SpotcastConfig::default()
            }
        }
    }

    pub fn live_stream_timeout(&self) -> Duration {
        Duration::from_millis(self.live_stream_timeout_ms)
    }

    pub fn playback_stale_after(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(self.playback_stale_after_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_key_missing() {
        let figment = Figment::from(rocket::Config::default());
        assert_eq!(SpotcastConfig::from_figment(&figment), SpotcastConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let figment = Figment::from(rocket::Config::default())
            .merge(("spotcast.live_stream_timeout_ms", 150));
        let config = SpotcastConfig::from_figment(&figment);
        assert_eq!(config.live_stream_timeout(), Duration::from_millis(150));
        assert_eq!(config.playback_stale_after_secs, 300);
    }
}
