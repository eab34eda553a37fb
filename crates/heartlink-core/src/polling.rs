//! The periodic poll timer.
//!
//! A [`Poller`] is a single cancellable periodic timer. Its first tick fires
//! one full interval after it starts. Cancelling its token (or dropping it)
//! clears the timer.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Options for periodic polling.
///
/// ```
/// use std::time::Duration;
/// use heartlink_core::PollOptions;
///
/// let options = PollOptions::with_interval(Duration::from_secs(2))
///     .write(true)
///     .max_consecutive_failures(Some(3));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Time between polls.
    pub interval: Duration,
    /// Write a simulated heart rate on each tick instead of only reading.
    pub write: bool,
    /// Stop polling after this many failures in a row. `None` never stops.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            write: false,
            max_consecutive_failures: None,
        }
    }
}

impl PollOptions {
    /// Create options with a specific interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Set whether each tick writes a simulated heart rate.
    #[must_use]
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Set the consecutive failure limit.
    #[must_use]
    pub fn max_consecutive_failures(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_failures = limit;
        self
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::invalid_config("poll interval must be > 0"));
        }
        if self.max_consecutive_failures == Some(0) {
            return Err(Error::invalid_config(
                "max_consecutive_failures must be > 0 when set",
            ));
        }
        Ok(())
    }
}

/// A running poll timer.
#[derive(Debug)]
pub struct Poller {
    interval: Interval,
    options: PollOptions,
    cancel_token: CancellationToken,
    ticks: u64,
    consecutive_failures: u32,
}

impl Poller {
    /// Start a timer with its own cancellation token.
    pub fn start(options: PollOptions) -> Result<Self> {
        Self::with_token(options, CancellationToken::new())
    }

    /// Start a timer that stops when `cancel_token` is cancelled.
    pub fn with_token(options: PollOptions, cancel_token: CancellationToken) -> Result<Self> {
        options.validate()?;
        let mut interval = interval_at(Instant::now() + options.interval, options.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval = ?options.interval, write = options.write, "Poll timer started");

        Ok(Self {
            interval,
            options,
            cancel_token,
            ticks: 0,
            consecutive_failures: 0,
        })
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// A handle that clears this timer when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Clear the timer.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Number of ticks fired so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Wait for the next tick. Returns `None` once the timer is cleared.
    pub async fn tick(&mut self) -> Option<u64> {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => None,
            _ = self.interval.tick() => {
                self.ticks += 1;
                Some(self.ticks)
            }
        }
    }

    /// Note a successful poll.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Note a failed poll. Returns `true` when the failure limit is reached.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        match self.options.max_consecutive_failures {
            Some(limit) if self.consecutive_failures >= limit => {
                warn!(
                    failures = self.consecutive_failures,
                    "Poll failure limit reached"
                );
                true
            }
            _ => false,
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Wait for the next tick of an optional timer; pends forever without one.
///
/// Useful as a `tokio::select!` branch next to a command channel.
pub async fn next_tick(poller: &mut Option<Poller>) -> Option<u64> {
    match poller {
        Some(poller) => poller.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_options_defaults() {
        let options = PollOptions::default();
        assert_eq!(options.interval, DEFAULT_POLL_INTERVAL);
        assert!(!options.write);
        assert!(options.max_consecutive_failures.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_poll_options_validate() {
        assert!(PollOptions::with_interval(Duration::ZERO).validate().is_err());
        assert!(
            PollOptions::default()
                .max_consecutive_failures(Some(0))
                .validate()
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_interval() {
        let start = Instant::now();
        let mut poller = Poller::start(PollOptions::with_interval(Duration::from_secs(2))).unwrap();

        assert_eq!(poller.tick().await, Some(1));
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(poller.tick().await, Some(2));
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let mut poller = Poller::start(PollOptions::default()).unwrap();
        poller.cancel();
        assert!(poller.is_cancelled());
        assert_eq!(poller.tick().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_token_clears_timer() {
        let token = CancellationToken::new();
        let mut poller = Poller::with_token(PollOptions::default(), token.clone()).unwrap();
        token.cancel();
        assert_eq!(poller.tick().await, None);
    }

    #[test]
    fn test_drop_cancels_token() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let token = rt.block_on(async {
            let poller = Poller::start(PollOptions::default()).unwrap();
            poller.cancel_token()
        });
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_limit() {
        let mut poller =
            Poller::start(PollOptions::default().max_consecutive_failures(Some(2))).unwrap();
        assert!(!poller.record_failure());
        poller.record_success();
        assert!(!poller.record_failure());
        assert!(poller.record_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_tick_without_timer_pends() {
        let mut none: Option<Poller> = None;
        let result =
            tokio::time::timeout(Duration::from_secs(5), next_tick(&mut none)).await;
        assert!(result.is_err());
    }
}
