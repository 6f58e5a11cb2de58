//! Wait Mechanisms
//!
//! Fixed-interval polling used by every `wait_until_*` operation.
//!
//! A wait never fails because time ran out: it reports whether the awaited
//! state was observed. `NotFound` and `StaleElement` errors raised while the
//! page is settling are retried; every other error stops the wait and is
//! returned unchanged.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::result::{PageError, PageResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Delay between clicking a link and looking for new windows (500ms)
pub const DEFAULT_LINK_SETTLE_MS: u64 = 500;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// How long to keep polling
    pub timeout: Duration,
    /// Pause between polls
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    /// Set the timeout exactly, sub-millisecond precision included
    #[must_use]
    pub const fn with_timeout_duration(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval = Duration::from_millis(poll_interval_ms);
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a polling loop
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Whether the awaited state was observed
    pub success: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of checks performed
    pub polls: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitResult {
    fn new(success: bool, elapsed: Duration, polls: u32, waited_for: &str) -> Self {
        Self {
            success,
            elapsed,
            polls,
            waited_for: waited_for.to_string(),
        }
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `check` until it returns `target` or the timeout elapses.
///
/// # Errors
///
/// `AssertionFailed` for a zero timeout or poll interval; any non-transient
/// error returned by `check`.
pub fn poll_until<F>(
    options: &WaitOptions,
    waited_for: &str,
    target: bool,
    mut check: F,
) -> PageResult<WaitResult>
where
    F: FnMut() -> PageResult<bool>,
{
    if options.timeout.is_zero() {
        return Err(PageError::assertion("wait timeout must be greater than zero"));
    }
    if options.poll_interval.is_zero() {
        return Err(PageError::assertion("poll interval must be greater than zero"));
    }

    let start = Instant::now();
    let timeout = options.timeout();
    let mut polls = 0;

    loop {
        polls += 1;
        match check() {
            Ok(observed) if observed == target => {
                trace!(waited_for, polls, elapsed_ms = start.elapsed().as_millis() as u64, "wait satisfied");
                return Ok(WaitResult::new(true, start.elapsed(), polls, waited_for));
            }
            Ok(_) => {}
            Err(err) if err.is_transient() => {
                trace!(waited_for, %err, "ignoring transient error while polling");
            }
            Err(err) => return Err(err),
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            trace!(waited_for, polls, "wait timed out");
            return Ok(WaitResult::new(false, elapsed, polls, waited_for));
        }
        std::thread::sleep(options.poll_interval().min(timeout - elapsed));
    }
}

/// Poll for `target`, then settle on a final answer.
///
/// Returns `true` as soon as the state is observed. After a timeout the
/// state is checked once more and that observation is returned; a stale
/// node on that last look counts as "not reached", while `NotFound` and
/// other errors propagate.
pub fn wait_for_state<F>(
    options: &WaitOptions,
    waited_for: &str,
    target: bool,
    mut check: F,
) -> PageResult<bool>
where
    F: FnMut() -> PageResult<bool>,
{
    if poll_until(options, waited_for, target, &mut check)?.success {
        return Ok(true);
    }

    match check() {
        Ok(observed) => Ok(observed == target),
        Err(PageError::StaleElement { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}

// =============================================================================
// TESTS
// =============================================================================
