//! Sync configuration
//!
//! Everything here is injectable so tests can run against a scripted remote
//! with a short poll interval and a throwaway base URL.

use std::time::Duration;

use serde::Deserialize;

/// Initial delta cursor: skip the historical change feed and start from the
/// drive's current state.
pub const CURSOR_LATEST: &str = "latest";

const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Configuration for the cache and its delta synchronizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// Base URL of the remote API. Delta links come back as absolute URLs;
	/// this prefix is stripped before a link is stored as the cursor.
	pub base_url: String,

	/// Seconds to sleep between full delta cycles.
	pub poll_interval_secs: u64,

	/// Cursor the delta feed starts from.
	pub initial_cursor: String,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.to_string(),
			poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
			initial_cursor: CURSOR_LATEST.to_string(),
		}
	}
}

impl SyncConfig {
	/// Parse a configuration from TOML. Missing keys fall back to defaults.
	pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(text)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}
}
