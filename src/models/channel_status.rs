use std::fmt;

/// Transport state of a channel, published on its status watch.
///
/// A channel starts in `Connecting`, reaches `Connected` once subscribed,
/// drops to `Error` on transport failure (reconnection continues in the
/// background, moving back through `Connecting`), and ends in `Closed`
/// after an explicit close, replacement, or exhausted retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Establishing (or re-establishing) the transport subscription.
    Connecting,

    /// The transport subscription is live.
    Connected,

    /// The transport failed; carries the failure description. Not fatal on
    /// its own: a reconnect attempt follows unless retries are capped.
    Error(String),

    /// The channel is permanently closed; no further events will arrive.
    Closed,
}

impl ChannelStatus {
    /// Returns `true` for the terminal state.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error(message) => write!(f, "error: {}", message),
            Self::Closed => write!(f, "closed"),
        }
    }
}
