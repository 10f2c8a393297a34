use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// Implement this trait to control how the client should
/// behave when reconnecting after a disconnection.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (0-indexed)
    /// * `elapsed` - Time spent reconnecting since the connection was lost
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize, elapsed: Duration) -> Option<Duration>;

    /// Reset the strategy state (called after successful connection)
    fn reset(&mut self);

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize, elapsed: Duration) -> bool;
}

/// Exponential backoff reconnection strategy
///
/// Delays between reconnection attempts grow exponentially:
/// initial_delay * 2^attempt, capped at max_delay. Gives up once
/// `max_elapsed` has passed since the connection was lost.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
    max_elapsed: Option<Duration>,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    ///
    /// # Arguments
    /// * `initial_delay` - The initial delay before first reconnect
    /// * `max_delay` - The maximum delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        max_attempts: Option<usize>,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
            max_elapsed: None,
        }
    }

    /// Backoff used for the odds feed broker: 500ms doubling, 16s cap, 1h horizon
    pub fn feed_default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(16), None)
            .with_max_elapsed(Duration::from_secs(3600))
    }

    /// Stop reconnecting once this much time has been spent retrying
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = Some(max_elapsed);
        self
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize, elapsed: Duration) -> Option<Duration> {
        if !self.should_reconnect(attempt, elapsed) {
            return None;
        }

        let factor = 2u64.saturating_pow(attempt.min(63) as u32);
        let delay = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let delay = Duration::from_millis(delay.min(self.max_delay.as_millis() as u64));
        Some(delay)
    }

    fn reset(&mut self) {
        // No state to reset for exponential backoff
    }

    fn should_reconnect(&self, attempt: usize, elapsed: Duration) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
            && self.max_elapsed.map_or(true, |max| elapsed < max)
    }
}

impl<S: ReconnectionStrategy + ?Sized> ReconnectionStrategy for Box<S> {
    fn next_delay(&self, attempt: usize, elapsed: Duration) -> Option<Duration> {
        (**self).next_delay(attempt, elapsed)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn should_reconnect(&self, attempt: usize, elapsed: Duration) -> bool {
        (**self).should_reconnect(attempt, elapsed)
    }
}

/// Constant pause between dials, optionally capped in attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize, elapsed: Duration) -> Option<Duration> {
        self.should_reconnect(attempt, elapsed).then_some(self.delay)
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, attempt: usize, _elapsed: Duration) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// The first lost session is terminal
///
/// `join()` then returns `ReconnectionFailed` with zero attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize, _elapsed: Duration) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, _attempt: usize, _elapsed: Duration) -> bool {
        false
    }
}
