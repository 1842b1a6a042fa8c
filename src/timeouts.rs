//! Timeout configuration for campus-link client operations.
//!
//! Centralizes the time bounds for HTTP requests, WebSocket connection
//! establishment, initial view loads, and keepalive pings.

use std::time::Duration;

/// Timeout configuration for campus-link client operations.
///
/// All values have sensible defaults; use the builder for customization.
///
/// # Examples
///
/// ```rust
/// use campus_link::CampusLinkTimeouts;
/// use std::time::Duration;
///
/// // Use defaults (recommended for most cases)
/// let timeouts = CampusLinkTimeouts::default();
///
/// // Custom timeouts for high-latency environments
/// let timeouts = CampusLinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(30))
///     .request_timeout(Duration::from_secs(60))
///     .build();
///
/// // Aggressive timeouts for local development
/// let timeouts = CampusLinkTimeouts::fast();
/// ```
#[derive(Debug, Clone)]
pub struct CampusLinkTimeouts {
    /// Timeout for establishing connections (TCP + TLS handshake), applied
    /// to both HTTP and WebSocket dials.
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Total timeout for an individual HTTP request.
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Bound on the initial load of backing data for a view (messages,
    /// posts, polls). Distinct from subscription retry: an expired load is
    /// reported as a timeout error, it does not affect the channel.
    /// Default: 5 seconds
    pub initial_load_timeout: Duration,

    /// Keep-alive ping interval for WebSocket channels.
    /// Set to 0 to disable keep-alive pings.
    /// Default: 20 seconds
    pub keepalive_interval: Duration,
}

impl Default for CampusLinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            initial_load_timeout: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(20),
        }
    }
}

impl CampusLinkTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> CampusLinkTimeoutsBuilder {
        CampusLinkTimeoutsBuilder::new()
    }

    /// Timeouts optimized for fast local development.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            initial_load_timeout: Duration::from_secs(2),
            keepalive_interval: Duration::from_secs(15),
        }
    }

    /// Timeouts optimized for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            initial_load_timeout: Duration::from_secs(15),
            keepalive_interval: Duration::from_secs(30),
        }
    }

    /// Check if a duration represents "no timeout" (zero or absurdly large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for creating custom [`CampusLinkTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct CampusLinkTimeoutsBuilder {
    timeouts: CampusLinkTimeouts,
}

impl CampusLinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: CampusLinkTimeouts::default(),
        }
    }

    /// Set the connection timeout (TCP + TLS handshake).
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    /// Set the total HTTP request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request_timeout = timeout;
        self
    }

    /// Set the bound on initial view loads.
    pub fn initial_load_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.initial_load_timeout = timeout;
        self
    }

    /// Set the keepalive ping interval. Set to 0 to disable pings.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.timeouts.keepalive_interval = interval;
        self
    }

    /// Build the timeout configuration.
    pub fn build(self) -> CampusLinkTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = CampusLinkTimeouts::default();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.request_timeout, Duration::from_secs(30));
        assert_eq!(timeouts.initial_load_timeout, Duration::from_secs(5));
        assert_eq!(timeouts.keepalive_interval, Duration::from_secs(20));
    }

    #[test]
    fn test_builder() {
        let timeouts = CampusLinkTimeouts::builder()
            .connection_timeout(Duration::from_secs(60))
            .initial_load_timeout(Duration::from_secs(8))
            .build();

        assert_eq!(timeouts.connection_timeout, Duration::from_secs(60));
        assert_eq!(timeouts.initial_load_timeout, Duration::from_secs(8));
        // untouched fields keep their defaults
        assert_eq!(timeouts.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_fast_preset() {
        let timeouts = CampusLinkTimeouts::fast();
        assert!(timeouts.connection_timeout <= Duration::from_secs(5));
        assert!(timeouts.initial_load_timeout <= Duration::from_secs(5));
    }

    #[test]
    fn test_relaxed_preset() {
        let timeouts = CampusLinkTimeouts::relaxed();
        assert!(timeouts.connection_timeout >= Duration::from_secs(30));
        assert!(timeouts.request_timeout >= Duration::from_secs(60));
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(CampusLinkTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!CampusLinkTimeouts::is_no_timeout(Duration::from_secs(1)));
        assert!(!CampusLinkTimeouts::is_no_timeout(Duration::from_secs(3600)));
    }
}
