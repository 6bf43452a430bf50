use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reader service connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Spacing between reconnect attempts never drops below this.
pub const MIN_RETRY_SPACING_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_5000")]
    pub version_timeout_ms: u64,
    #[serde(default = "d_15000")]
    pub card_list_timeout_ms: u64,
    /// Deadline for establishing a live-update connection.
    #[serde(default = "d_10000")]
    pub connect_timeout_ms: u64,
    /// Push interval requested on `open`, in seconds. `None` leaves the
    /// choice to the service.
    #[serde(default = "d_interval")]
    pub interval_secs: Option<u32>,
    /// Open without an interval so the service's own default applies.
    /// Takes precedence over `interval_secs`, which TOML cannot unset.
    #[serde(default)]
    pub server_default_interval: bool,
    /// Raises the reconnect floor; values below 1000 are ignored.
    #[serde(default = "d_1000")]
    pub min_retry_spacing_ms: u64,
    /// Consecutive reconnect attempts before giving up. `None` = unlimited.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            version_timeout_ms: 5000,
            card_list_timeout_ms: 15000,
            connect_timeout_ms: 10000,
            interval_secs: d_interval(),
            server_default_interval: false,
            min_retry_spacing_ms: MIN_RETRY_SPACING_MS,
            max_retries: None,
        }
    }
}

impl ReaderConfig {
    pub fn version_timeout(&self) -> Duration {
        Duration::from_millis(self.version_timeout_ms)
    }

    pub fn card_list_timeout(&self) -> Duration {
        Duration::from_millis(self.card_list_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Interval to request on `open`.
    pub fn open_interval(&self) -> Option<u32> {
        if self.server_default_interval {
            None
        } else {
            self.interval_secs
        }
    }

    pub fn min_retry_spacing(&self) -> Duration {
        Duration::from_millis(self.min_retry_spacing_ms.max(MIN_RETRY_SPACING_MS))
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "http://127.0.0.1:12345".into()
}
fn d_5000() -> u64 {
    5000
}
fn d_15000() -> u64 {
    15000
}
fn d_10000() -> u64 {
    10000
}
fn d_1000() -> u64 {
    MIN_RETRY_SPACING_MS
}
fn d_interval() -> Option<u32> {
    Some(3)
}
