#[cfg(feature = "async-smol")]
mod smol;
#[cfg(feature = "async-tokio")]
mod tokio;

use core::{future::Future, time::Duration};

#[cfg_attr(docsrs, doc(cfg(feature = "async-smol")))]
#[cfg(feature = "async-smol")]
pub use self::smol::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use self::tokio::*;

/// A trait that abstracts over how to sleep for a given [`Duration`] in async
/// contexts.
///
/// This allows the replenishment machinery to be generic over runtimes like
/// `Tokio` or `Smol`.
pub trait SleepProvider {
    /// The future is `Send` so retry waits can run on work-stealing runtimes.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}

/// An async runtime able to run replenishment in the background.
///
/// Replenishment requests and retry waits are spawned as detached tasks: the
/// allocation call that triggered them never awaits their completion.
pub trait Runtime: SleepProvider + Send + Sync + 'static {
    /// Runs `fut` to completion in the background.
    ///
    /// Returns whether the task was accepted. A rejected future is dropped
    /// without being polled.
    fn spawn<F>(fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static;
}
