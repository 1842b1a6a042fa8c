use serde::{Deserialize, Serialize};

/// Connection-level options for realtime channels.
///
/// These control reconnection behavior shared by every channel a client
/// opens; per-channel state (attempt counters, retry timers) lives with the
/// channel's background task.
///
/// # Example
///
/// ```rust
/// use campus_link::ConnectionOptions;
///
/// let options = ConnectionOptions::default()
///     .with_reconnect_delay_ms(3000)
///     .with_max_reconnect_attempts(Some(10));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Enable automatic reconnection on transport loss.
    /// Default: true
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Base delay in milliseconds before the first reconnection attempt.
    /// Subsequent attempts back off exponentially up to
    /// `max_reconnect_delay_ms`.
    /// Default: 3000 ms
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Ceiling on the exponential backoff delay.
    /// Default: 30000 ms
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Maximum number of reconnection attempts before the channel gives up
    /// and closes with an error.
    /// Default: None (retry indefinitely)
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30000
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay_ms: 3000,
            max_reconnect_delay_ms: 30000,
            max_reconnect_attempts: None,
        }
    }
}

impl ConnectionOptions {
    /// Create new connection options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to automatically reconnect on transport loss.
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the base delay between reconnection attempts (in milliseconds).
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Set the maximum backoff delay (in milliseconds).
    pub fn with_max_reconnect_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_reconnect_delay_ms = max_delay_ms;
        self
    }

    /// Set the maximum number of reconnection attempts.
    /// Pass None for indefinite retries.
    pub fn with_max_reconnect_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }
}
