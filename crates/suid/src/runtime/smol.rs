use core::{future::Future, time::Duration};

use smol::Timer;

use super::{Runtime, SleepProvider};

/// A [`Runtime`] backed by Smol's timer and global executor.
#[derive(Clone, Copy, Debug, Default)]
pub struct SmolRuntime;

impl SleepProvider for SmolRuntime {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        async move {
            Timer::after(dur).await;
        }
    }
}

impl Runtime for SmolRuntime {
    fn spawn<F>(fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        smol::spawn(fut).detach();
        true
    }
}
