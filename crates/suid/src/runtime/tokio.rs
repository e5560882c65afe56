use core::{future::Future, time::Duration};

use super::{Runtime, SleepProvider};

/// A [`Runtime`] backed by Tokio's timer and task spawner.
///
/// Tasks are spawned onto the runtime the caller is running in. Triggering a
/// replenishment from outside any Tokio runtime logs an error and drops the
/// request, so the next trigger from inside a runtime starts a fresh cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioRuntime;

impl SleepProvider for TokioRuntime {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(dur)
    }
}

impl Runtime for TokioRuntime {
    fn spawn<F>(fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(fut);
                true
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Unable to replenish suid blocks outside a tokio runtime: {_e}");
                false
            }
        }
    }
}
