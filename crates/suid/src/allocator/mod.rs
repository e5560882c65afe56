mod cursor;
#[cfg(all(test, feature = "async-tokio"))]
mod tests;

use core::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

pub(crate) use cursor::Cursor;

use crate::{
    config::Config,
    error::{Error, Result},
    id::{Block, Suid},
    replenish::{Backoff, Transport, Urgency},
    runtime::Runtime,
    store::{MemoryStorage, PoolStore, Storage},
    time::{MonotonicClock, TimeSource},
};

/// An [`Allocator`] replenishing on the Tokio runtime.
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub type TokioAllocator<T> = Allocator<T, crate::runtime::TokioRuntime>;

/// An [`Allocator`] replenishing on the Smol runtime.
#[cfg_attr(docsrs, doc(cfg(feature = "async-smol")))]
#[cfg(feature = "async-smol")]
pub type SmolAllocator<T> = Allocator<T, crate::runtime::SmolRuntime>;

/// The pool and the cursor into its active block.
///
/// Guarded by one lock so that activating a block and removing it from the
/// pool happen together: at most one block is ever active.
pub(crate) struct Pool {
    pub(crate) store: PoolStore,
    pub(crate) cursor: Cursor,
}

/// State shared between allocation calls and background replenishment.
pub(crate) struct Shared<T, R> {
    pub(crate) config: RwLock<Config>,
    pub(crate) pool: Mutex<Pool>,
    pub(crate) backoff: Mutex<Backoff>,
    pub(crate) transport: T,
    pub(crate) clock: Arc<dyn TimeSource>,
    readiness: watch::Sender<bool>,
    _runtime: PhantomData<fn() -> R>,
}

impl<T, R> Shared<T, R> {
    pub(crate) fn urgency(&self) -> Urgency {
        let mut pool = self.pool.lock();
        let pooled = pool.store.len();
        pool.cursor.urgency(pooled)
    }

    /// Recomputes readiness from the pool as it is now.
    fn update_readiness(&self) {
        let mut pool = self.pool.lock();
        let pooled = pool.store.len();
        self.publish_readiness(pooled);
    }

    /// Publishes readiness for a pool of `pooled` blocks.
    ///
    /// Must be called with the pool lock held, so that publications are
    /// ordered the same way as the pool changes they describe.
    pub(crate) fn publish_readiness(&self, pooled: usize) {
        let ready = pooled > 0 && self.config.read().url.is_some();
        self.readiness.send_if_modified(|current| {
            let changed = *current != ready;
            *current = ready;
            changed
        });
    }
}

/// Hands out [`Suid`]s from blocks reserved by a remote allocation service.
///
/// Each call to [`Allocator::next`] issues the next identifier of the active
/// block, activating the oldest pooled block when needed. When the pool runs
/// low a replenishment request is spawned on the runtime `R`; allocation
/// itself never waits on the network.
///
/// `Allocator` is a cheap handle: clones share the same pool, cursor and
/// replenishment state. Independent allocators are simply separate instances.
///
/// # Example
///
/// ```no_run
/// # #[cfg(all(feature = "async-tokio", feature = "http"))]
/// # async fn demo() -> suid::Result<()> {
/// use suid::{Config, FileStorage, HttpTransport, TokioAllocator};
///
/// let allocator = TokioAllocator::builder(HttpTransport::new())
///     .config(Config::new("https://ids.example.com/suid/suid.json"))
///     .storage(FileStorage::new("/var/lib/myapp/suid"))
///     .build()?;
///
/// allocator.ready().await;
/// let id = allocator.next()?;
/// println!("{id}");
/// # Ok(())
/// # }
/// ```
pub struct Allocator<T, R> {
    shared: Arc<Shared<T, R>>,
}

impl<T, R> Clone for Allocator<T, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A point-in-time view of an allocator's supply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolStatus {
    /// Pooled blocks, oldest first.
    pub pooled: Vec<Block>,
    /// The block identifiers are currently issued from.
    pub active: Option<Block>,
    /// Identifiers already issued from `active`.
    pub issued: u32,
    /// Whether the pool survives restarts.
    pub persistent: bool,
}

impl<T, R> Allocator<T, R>
where
    T: Transport,
    R: Runtime,
{
    /// Starts building an allocator that requests blocks through `transport`.
    pub fn builder(transport: T) -> AllocatorBuilder<T, R> {
        AllocatorBuilder {
            transport,
            storage: Arc::new(MemoryStorage::new()),
            clock: Arc::new(MonotonicClock::new()),
            config: Config::default(),
            _runtime: PhantomData,
        }
    }

    /// Issues the next identifier.
    ///
    /// Replenishment is triggered first when the pool is below the configured
    /// minimum, or at the minimum with no active block. It runs in the
    /// background; this call never waits for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if there is no active block and the
    /// pool is empty. Treat it as backpressure: wait for
    /// [`Allocator::ready`] and try again.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Result<Suid> {
        let min = self.shared.config.read().min;
        let (issued, trigger) = {
            let mut pool = self.shared.pool.lock();
            let Pool { store, cursor } = &mut *pool;

            let pooled = store.len();
            let idle = cursor.is_idle();
            let trigger = (pooled < min || (pooled == min && idle)).then(|| cursor.urgency(pooled));

            let mut remaining = pooled;
            if idle {
                if let Some(block) = store.pop_front() {
                    cursor.activate(block);
                    remaining -= 1;
                }
            }
            self.shared.publish_readiness(remaining);
            (cursor.issue(), trigger)
        };

        if let Some(urgency) = trigger {
            self.shared.trigger(urgency);
        }

        issued.ok_or_else(|| {
            #[cfg(feature = "tracing")]
            tracing::warn!("Unable to generate ids, suid block pool exhausted");
            Error::PoolExhausted
        })
    }

    /// Asks for more blocks if the pool is short.
    ///
    /// Does nothing while a recent cycle is still in flight and the allocator
    /// is not running low.
    pub fn fetch(&self) {
        let urgency = self.shared.urgency();
        self.shared.trigger(urgency);
    }

    /// Replaces the configuration, then re-checks readiness and pool health.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] and keeps the previous configuration
    /// if `config` is inconsistent.
    pub fn configure(&self, config: Config) -> Result<()> {
        config.validate()?;
        warn_if_unconfigured(&config);
        *self.shared.config.write() = config;
        self.check_pool();
        Ok(())
    }

    /// The current configuration.
    pub fn config(&self) -> Config {
        self.shared.config.read().clone()
    }

    /// Whether a server is configured and at least one block is pooled.
    pub fn is_ready(&self) -> bool {
        *self.shared.readiness.borrow()
    }

    /// Resolves once the allocator is ready, immediately if it already is.
    ///
    /// Every waiter is released exactly once, when readiness is first
    /// observed.
    pub async fn ready(&self) {
        let mut rx = self.shared.readiness.subscribe();
        // `self` keeps the sender alive, so the channel cannot close here.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// A snapshot of the pool and the active block.
    pub fn status(&self) -> PoolStatus {
        let mut pool = self.shared.pool.lock();
        PoolStatus {
            pooled: pool.store.load(),
            active: pool.cursor.active(),
            issued: pool.cursor.issued(),
            persistent: pool.store.is_persistent(),
        }
    }

    /// Step one of [`Allocator::next`] without issuing anything.
    fn check_pool(&self) {
        let min = self.shared.config.read().min;
        self.shared.update_readiness();
        let urgency = self.shared.urgency();
        if urgency.pooled < min || (urgency.pooled == min && urgency.issued.is_none()) {
            self.shared.trigger(urgency);
        }
    }
}

fn warn_if_unconfigured(_config: &Config) {
    #[cfg(feature = "tracing")]
    if _config.url.is_none() {
        tracing::error!("No suid server url configured, unable to fetch suids from the server");
    }
}

/// Builder for [`Allocator`].
///
/// Defaults: [`Config::default`] (no server), in-memory storage and a
/// [`MonotonicClock`].
pub struct AllocatorBuilder<T, R> {
    transport: T,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn TimeSource>,
    config: Config,
    _runtime: PhantomData<fn() -> R>,
}

impl<T, R> AllocatorBuilder<T, R>
where
    T: Transport,
    R: Runtime,
{
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Persists the pool in `storage`.
    #[must_use]
    pub fn storage(self, storage: impl Storage + 'static) -> Self {
        self.shared_storage(Arc::new(storage))
    }

    /// Persists the pool in a storage handle shared with other code.
    #[must_use]
    pub fn shared_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Uses `clock` to throttle replenishment triggers.
    #[must_use]
    pub fn clock(mut self, clock: impl TimeSource + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Builds the allocator and runs an initial pool health check, which
    /// may spawn a replenishment request on `R`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is inconsistent.
    pub fn build(self) -> Result<Allocator<T, R>> {
        self.config.validate()?;
        warn_if_unconfigured(&self.config);

        let (readiness, _) = watch::channel(false);
        let allocator = Allocator {
            shared: Arc::new(Shared {
                config: RwLock::new(self.config),
                pool: Mutex::new(Pool {
                    store: PoolStore::new(self.storage),
                    cursor: Cursor::default(),
                }),
                backoff: Mutex::new(Backoff::default()),
                transport: self.transport,
                clock: self.clock,
                readiness,
                _runtime: PhantomData,
            }),
        };
        allocator.check_pool();
        Ok(allocator)
    }
}
