use std::time::Instant;

/// A source of elapsed milliseconds.
///
/// The allocator only compares readings taken from the same source (to throttle
/// replenishment triggers), so the origin is arbitrary. Plug in a manual clock
/// to drive the throttle deterministically in tests.
///
/// # Example
///
/// ```
/// use suid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource: Send + Sync {
    /// Returns the current time in milliseconds since the source's origin.
    fn current_millis(&self) -> u64;
}

/// A monotonic time source measuring milliseconds since its construction.
///
/// Backed by [`Instant`], so wall-clock adjustments (NTP, daylight savings)
/// never make it go backwards.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
