use crate::codec::EncodingError;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors `suid` surfaces to callers.
///
/// Allocation callers only ever observe [`Error::PoolExhausted`] from
/// [`Allocator::next`](crate::Allocator::next). Network and storage failures
/// are absorbed by the replenishment machinery and never reach this type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No active block and no pooled block is left to activate.
    ///
    /// This is backpressure, not a permanent failure: replenishment has been
    /// triggered and the caller should retry once the allocator is ready again.
    #[error("unable to generate ids: block pool exhausted")]
    PoolExhausted,

    /// Text could not be decoded into an identifier.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(#[from] EncodingError),

    /// A numeric value lies outside the safe identifier range.
    #[error("value {value} is outside the safe identifier range")]
    OutOfRange {
        /// The rejected value.
        value: u64,
    },

    /// The supplied configuration is inconsistent.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}
