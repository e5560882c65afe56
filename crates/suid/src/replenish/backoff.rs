use core::time::Duration;

use crate::{id::IDSIZE, replenish::ServiceError};

/// Attempts allowed after the first request of a cycle.
pub(crate) const RETRY_BUDGET: u32 = 3;

/// Wait before retrying when the service gives no hint.
pub(crate) const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

/// Cap on the wait while the pool is empty.
pub(crate) const POOL_EMPTY_CAP: Duration = Duration::from_secs(60);

/// Cap on the wait once the active block is more than half used.
pub(crate) const HALF_CONSUMED_CAP: Duration = Duration::from_secs(30);

/// Cap on the wait when there is no active block either.
pub(crate) const EXHAUSTED_CAP: Duration = Duration::from_secs(1);

/// A new trigger within this many milliseconds of a cycle start is ignored
/// unless the allocator is running low.
pub(crate) const THROTTLE_MILLIS: u64 = 5_000;

/// A snapshot of how close the allocator is to running dry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Urgency {
    /// Blocks left in the pool.
    pub(crate) pooled: usize,
    /// Identifiers issued from the active block, if there is one.
    pub(crate) issued: Option<u32>,
}

impl Urgency {
    const HALF: u32 = IDSIZE / 2;

    const fn past_half(self) -> bool {
        matches!(self.issued, Some(issued) if issued > Self::HALF)
    }

    const fn below_half(self) -> bool {
        matches!(self.issued, Some(issued) if issued < Self::HALF)
    }
}

/// What to do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Decision {
    /// Request again once `delay` has elapsed.
    Retry { delay: Duration, retries_left: u32 },
    /// Abandon the cycle; the next trigger starts a fresh one.
    GiveUp,
}

/// Per-cycle retry bookkeeping.
///
/// A cycle is in flight while `retries > 0`. Succeeding, giving up, or a
/// terminal failure all reset it, so the next trigger starts from scratch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Backoff {
    retries: u32,
    started: u64,
}

impl Backoff {
    /// Whether a trigger at `now` should be ignored because a cycle is already
    /// under way and nothing is urgent yet.
    pub(crate) const fn is_recent(&self, now: u64, urgency: Urgency) -> bool {
        self.retries > 0
            && (now.saturating_sub(self.started) < THROTTLE_MILLIS || urgency.below_half())
    }

    /// Starts a new cycle at `now` with a full retry budget.
    pub(crate) const fn start(&mut self, now: u64) {
        self.retries = RETRY_BUDGET;
        self.started = now;
    }

    /// Ends the current cycle.
    pub(crate) const fn reset(&mut self) {
        self.retries = 0;
        self.started = 0;
    }

    /// Consumes one retry for `err` if it is worth retrying.
    pub(crate) fn on_failure(&mut self, err: &ServiceError, urgency: Urgency) -> Decision {
        if !err.is_retryable() || self.retries == 0 {
            self.reset();
            return Decision::GiveUp;
        }
        self.retries -= 1;
        Decision::Retry {
            delay: retry_delay(err.retry_after(), urgency),
            retries_left: self.retries,
        }
    }
}

/// How long to wait before the next attempt.
///
/// Starts from the service's hint (or [`DEFAULT_RETRY_DELAY`]) and only ever
/// shortens it; every urgency cap that applies is enforced, so the tightest
/// one wins.
pub(crate) fn retry_delay(hint: Option<Duration>, urgency: Urgency) -> Duration {
    let mut delay = hint.unwrap_or(DEFAULT_RETRY_DELAY);
    if urgency.pooled == 0 {
        delay = delay.min(POOL_EMPTY_CAP);
    }
    if urgency.past_half() {
        delay = delay.min(HALF_CONSUMED_CAP);
    }
    if urgency.issued.is_none() {
        delay = delay.min(EXHAUSTED_CAP);
    }
    delay
}
