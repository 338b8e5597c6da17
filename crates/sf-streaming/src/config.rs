//! Subscription configuration.

use std::time::Duration;

use crate::message::ReplayFrom;

/// Default cap on how long one long poll may block. The platform holds a
/// connect for up to 110 seconds.
pub const DEFAULT_POLL_WAIT: Duration = Duration::from_secs(120);

/// Default timeout for handshake, subscribe and disconnect messages.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`Subscription`](crate::Subscription).
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Longest time one `poll_once()` waits on a connect before returning
    /// `PollOutcome::Idle`.
    pub poll_wait: Duration,
    /// Overall lifetime of the subscription, measured from the first poll.
    /// Checked before each long poll; reaching it ends the stream without
    /// error.
    pub deadline: Option<Duration>,
    /// Timeout for the short control messages.
    pub handshake_timeout: Duration,
    /// Where a fresh subscription starts reading.
    pub replay: ReplayFrom,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            poll_wait: DEFAULT_POLL_WAIT,
            deadline: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            replay: ReplayFrom::New,
        }
    }
}

impl StreamingConfig {
    /// Create a new streaming config builder.
    pub fn builder() -> StreamingConfigBuilder {
        StreamingConfigBuilder::default()
    }
}

/// Builder for StreamingConfig.
#[derive(Debug, Default)]
pub struct StreamingConfigBuilder {
    config: StreamingConfig,
}

impl StreamingConfigBuilder {
    /// Set the per-poll wait cap.
    pub fn with_poll_wait(mut self, wait: Duration) -> Self {
        self.config.poll_wait = wait;
        self
    }

    /// Set an overall deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    /// Set the handshake/subscribe timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Set the replay starting point.
    pub fn with_replay(mut self, replay: ReplayFrom) -> Self {
        self.config.replay = replay;
        self
    }

    /// Build the config.
    pub fn build(self) -> StreamingConfig {
        self.config
    }
}
