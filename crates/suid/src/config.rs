use crate::error::{Error, Result};

/// Pool size below which replenishment is triggered.
pub const DEFAULT_MIN_POOL: usize = 3;

/// Pool size a replenishment cycle tries to restore.
pub const DEFAULT_MAX_POOL: usize = 4;

/// Process-wide allocator settings.
///
/// Set once when building an [`Allocator`](crate::Allocator) and replaceable
/// later through [`Allocator::configure`](crate::Allocator::configure).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Endpoint of the block allocation service. Without it the allocator
    /// only drains what is already pooled.
    pub url: Option<String>,
    /// Replenish when fewer than this many blocks are pooled.
    pub min: usize,
    /// Number of pooled blocks a replenishment request aims for.
    pub max: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            min: DEFAULT_MIN_POOL,
            max: DEFAULT_MAX_POOL,
        }
    }
}

impl Config {
    /// Default thresholds, requesting blocks from `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self::default().with_url(url)
    }

    /// Replaces the server url.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the pool size below which replenishment is triggered.
    #[must_use]
    pub const fn with_min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Sets the pool size replenishment tops up to.
    #[must_use]
    pub const fn with_max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Checks that the thresholds are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `min` exceeds `max` or the URL is
    /// present but blank.
    pub fn validate(&self) -> Result<()> {
        if self.min > self.max {
            return Err(Error::InvalidConfig {
                reason: format!("min ({}) must not exceed max ({})", self.min, self.max),
            });
        }
        if self.url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            return Err(Error::InvalidConfig {
                reason: "server url must not be blank".into(),
            });
        }
        Ok(())
    }

    /// Blocks needed to bring a pool of `pooled` blocks up to `max`.
    pub(crate) const fn blocks_needed(&self, pooled: usize) -> usize {
        self.max.saturating_sub(pooled)
    }
}
