use core::{future::Future, time::Duration};
use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use super::*;
use crate::{
    id::{IDSIZE, SHARDSIZE},
    replenish::{Response, TransportError},
    runtime::TokioRuntime,
    store::POOL_KEY,
    time::mock::ManualClock,
};

const URL: &str = "http://suid.test/suid/suid.json";

#[derive(Default)]
struct Script {
    requests: Vec<usize>,
    responses: VecDeque<Result<Response, TransportError>>,
}

/// Answers requests from a queue. Once the queue is empty every request
/// hangs, which keeps its cycle in flight.
#[derive(Clone, Default)]
struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    fn respond(&self, response: Response) -> &Self {
        self.script.lock().responses.push_back(Ok(response));
        self
    }

    fn fail(&self, message: &str) -> &Self {
        self.script
            .lock()
            .responses
            .push_back(Err(TransportError::new(message)));
        self
    }

    fn requests(&self) -> Vec<usize> {
        self.script.lock().requests.clone()
    }
}

impl Transport for ScriptedTransport {
    fn request_blocks(
        &self,
        url: &str,
        blocks: usize,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        assert_eq!(url, URL);
        let next = {
            let mut script = self.script.lock();
            script.requests.push(blocks);
            script.responses.pop_front()
        };
        async move {
            match next {
                Some(response) => response,
                None => core::future::pending().await,
            }
        }
    }
}

type TestAllocator = Allocator<ScriptedTransport, TokioRuntime>;

struct Harness {
    transport: ScriptedTransport,
    storage: Arc<MemoryStorage>,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        Self {
            transport: ScriptedTransport::default(),
            storage: Arc::new(MemoryStorage::new()),
            clock: ManualClock::default(),
        }
    }

    fn seed(&self, pool: &str) -> &Self {
        self.storage.set(POOL_KEY, pool).unwrap();
        self
    }

    fn build(&self, config: Config) -> TestAllocator {
        TestAllocator::builder(self.transport.clone())
            .shared_storage(self.storage.clone())
            .clock(self.clock.clone())
            .config(config)
            .build()
            .unwrap()
    }
}

/// Lets spawned replenishment tasks run without reaching any pending timer.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn empty_pool_reports_exhaustion_and_requests_max_blocks() {
    let harness = Harness::new();
    let allocator = harness.build(Config::new(URL));

    assert_eq!(allocator.next(), Err(Error::PoolExhausted));
    settle().await;
    assert_eq!(harness.transport.requests(), vec![4]);
    assert!(!allocator.is_ready());
}

#[tokio::test(start_paused = true)]
async fn repeated_calls_share_one_cycle() {
    let harness = Harness::new();
    let allocator = harness.build(Config::new(URL));

    for _ in 0..100 {
        assert_eq!(allocator.next(), Err(Error::PoolExhausted));
    }
    settle().await;
    assert_eq!(harness.transport.requests(), vec![4]);
}

#[tokio::test(start_paused = true)]
async fn stale_cycle_is_replaced_when_running_dry() {
    let harness = Harness::new();
    let allocator = harness.build(Config::new(URL));
    settle().await;
    assert_eq!(harness.transport.requests(), vec![4]);

    harness.clock.advance(4_999);
    assert!(allocator.next().is_err());
    settle().await;
    assert_eq!(harness.transport.requests(), vec![4]);

    harness.clock.advance(1);
    assert!(allocator.next().is_err());
    settle().await;
    assert_eq!(harness.transport.requests(), vec![4, 4]);
}

#[tokio::test(start_paused = true)]
async fn block_yields_idsize_ids_then_goes_idle() {
    let harness = Harness::new();
    harness.seed("36:rs");
    let allocator = harness.build(Config::default().with_min(0).with_max(0));

    let ids: Vec<u64> = (0..IDSIZE)
        .map(|_| allocator.next().unwrap().to_raw())
        .collect();
    let expected: Vec<u64> = (0..u64::from(IDSIZE)).map(|k| 1000 + k * SHARDSIZE).collect();
    assert_eq!(ids, expected);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let status = allocator.status();
    assert_eq!(status.active, None);
    assert_eq!(status.issued, 0);
    assert!(status.pooled.is_empty());
    assert_eq!(allocator.next(), Err(Error::PoolExhausted));
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn activation_persists_the_shrunk_pool() {
    let harness = Harness::new();
    harness.seed("36:rs,35s");
    let allocator = harness.build(Config::default().with_min(0).with_max(0));

    assert_eq!(allocator.next().unwrap().to_raw(), 1000);
    assert_eq!(
        harness.storage.get(POOL_KEY).unwrap().as_deref(),
        Some("36:35s")
    );

    // The active block is never persisted: a restart resumes from the pool.
    let restarted = harness.build(Config::default().with_min(0).with_max(0));
    assert_eq!(
        restarted.status().pooled,
        vec![Block::from_raw(4096).unwrap()]
    );
    assert_eq!(restarted.next().unwrap().to_raw(), 4096);
}

#[tokio::test(start_paused = true)]
async fn legacy_pools_are_read_and_rewritten_in_base36() {
    let harness = Harness::new();
    harness.seed("14ub,10");
    let allocator = harness.build(Config::default().with_min(0).with_max(0));

    assert_eq!(allocator.next().unwrap().to_raw(), 1_206_272);
    assert_eq!(
        harness.storage.get(POOL_KEY).unwrap().as_deref(),
        Some("36:w")
    );
}

#[tokio::test(start_paused = true)]
async fn transient_failure_with_empty_pool_waits_one_second() {
    let harness = Harness::new();
    harness
        .transport
        .respond(Response::status(503).with_retry_after("10"))
        .respond(Response::ok(1000));

    let start = tokio::time::Instant::now();
    let allocator = harness.build(Config::new(URL));
    allocator.ready().await;

    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(1), "{waited:?}");
    assert!(waited < Duration::from_secs(2), "{waited:?}");
    assert_eq!(harness.transport.requests(), vec![4, 4]);
    assert_eq!(allocator.next().unwrap().to_raw(), 1000);
}

#[tokio::test(start_paused = true)]
async fn retry_budget_allows_four_attempts() {
    let harness = Harness::new();
    for _ in 0..5 {
        harness.transport.respond(Response::status(500));
    }
    let allocator = harness.build(Config::new(URL));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.transport.requests(), vec![4; 4]);

    // The abandoned cycle no longer suppresses triggers.
    assert!(allocator.next().is_err());
    settle().await;
    assert_eq!(harness.transport.requests(), vec![4; 5]);
}

#[tokio::test(start_paused = true)]
async fn terminal_status_abandons_without_retry() {
    let harness = Harness::new();
    harness.transport.respond(Response::status(404));
    let allocator = harness.build(Config::new(URL));

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(harness.transport.requests(), vec![4]);

    assert!(allocator.next().is_err());
    settle().await;
    assert_eq!(harness.transport.requests(), vec![4, 4]);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_and_malformed_bodies_are_terminal() {
    let harness = Harness::new();
    harness.transport.fail("connection refused");
    let allocator = harness.build(Config::new(URL));
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(harness.transport.requests(), vec![4]);

    harness.transport.respond(Response {
        status: 200,
        retry_after: None,
        body: "\"rs\"".into(),
    });
    assert!(allocator.next().is_err());
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(harness.transport.requests(), vec![4, 4]);
    assert!(allocator.status().pooled.is_empty());
}

#[tokio::test(start_paused = true)]
async fn readiness_fires_when_the_first_block_arrives() {
    let harness = Harness::new();
    harness.transport.respond(Response::ok(1000));
    let allocator = harness.build(Config::new(URL));
    assert!(!allocator.is_ready());

    tokio::time::timeout(Duration::from_secs(1), allocator.ready())
        .await
        .unwrap();
    assert!(allocator.is_ready());
    // Resolves immediately once ready.
    allocator.ready().await;

    assert_eq!(allocator.next().unwrap().to_raw(), 1000);
    assert!(!allocator.is_ready());

    // The top-up is sized from the pool as it was before activation.
    settle().await;
    assert_eq!(harness.transport.requests(), vec![4, 3]);
}

#[tokio::test(start_paused = true)]
async fn readiness_requires_a_server() {
    let harness = Harness::new();
    harness.seed("36:rs");
    let allocator = harness.build(Config::default());
    assert!(!allocator.is_ready());

    allocator
        .configure(Config::new(URL).with_min(0).with_max(1))
        .unwrap();
    assert!(allocator.is_ready());
    assert_eq!(allocator.config().url.as_deref(), Some(URL));
    settle().await;
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn configure_rechecks_pool_health() {
    let harness = Harness::new();
    let allocator = harness.build(Config::default());
    settle().await;
    assert!(harness.transport.requests().is_empty());

    allocator.configure(Config::new(URL).with_max(6)).unwrap();
    settle().await;
    assert_eq!(harness.transport.requests(), vec![6]);
}

#[tokio::test(start_paused = true)]
async fn invalid_config_is_rejected_and_kept() {
    let harness = Harness::new();
    let allocator = harness.build(Config::default());

    let err = allocator
        .configure(Config::new(URL).with_min(5).with_max(1))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert_eq!(allocator.config(), Config::default());

    let rejected = TestAllocator::builder(ScriptedTransport::default())
        .config(Config::default().with_min(9))
        .build();
    assert!(rejected.is_err());
}

#[tokio::test(start_paused = true)]
async fn fetch_tops_up_a_short_pool() {
    let harness = Harness::new();
    harness.seed("36:rs,35s,8,14sg");
    harness.transport.respond(Response::ok(2048));
    let allocator = harness.build(Config::new(URL));
    settle().await;
    assert!(harness.transport.requests().is_empty());

    allocator.fetch();
    settle().await;
    assert!(harness.transport.requests().is_empty());

    assert!(allocator.next().is_ok());
    allocator.fetch();
    settle().await;
    assert_eq!(harness.transport.requests(), vec![1]);
    assert_eq!(allocator.status().pooled.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn clones_share_state() {
    let harness = Harness::new();
    harness.seed("36:rs");
    let allocator = harness.build(Config::default().with_min(0).with_max(0));
    let clone = allocator.clone();

    assert_eq!(allocator.next().unwrap().to_raw(), 1000);
    assert_eq!(clone.next().unwrap().to_raw(), 1004);
    assert_eq!(clone.status().issued, 2);
}

#[test]
fn unspawned_cycle_does_not_throttle_later_triggers() {
    let harness = Harness::new();
    // Built outside any runtime, so the cycle started by `build` is dropped.
    let allocator = harness.build(Config::new(URL));
    assert!(harness.transport.requests().is_empty());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    runtime.block_on(async {
        assert_eq!(allocator.next(), Err(Error::PoolExhausted));
        settle().await;
        assert_eq!(harness.transport.requests(), vec![4]);
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readiness_tracks_the_pool_under_contention() {
    let harness = Harness::new();
    for i in 0..64 {
        harness.transport.respond(Response::ok(1000 + i * 1000));
    }
    let allocator = harness.build(Config::new(URL));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let allocator = allocator.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    let _ = allocator.next();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap();
    }
    // Let any delivered block land before comparing.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let pooled = allocator.status().pooled.len();
    assert_eq!(allocator.is_ready(), pooled > 0);
}

#[cfg(feature = "async-smol")]
#[test]
fn replenishes_on_smol() {
    use crate::runtime::SmolRuntime;

    let transport = ScriptedTransport::default();
    transport.respond(Response::ok(1000));
    smol::block_on(async {
        let allocator = Allocator::<_, SmolRuntime>::builder(transport.clone())
            .config(Config::new(URL))
            .build()
            .unwrap();
        allocator.ready().await;
        assert_eq!(allocator.next().unwrap().to_raw(), 1000);
    });
}
