use std::sync::Arc;

use crate::{
    allocator::Shared,
    id::Block,
    replenish::{Decision, Transport, Urgency, classify},
    runtime::Runtime,
};

impl<T, R> Shared<T, R>
where
    T: Transport,
    R: Runtime,
{
    /// Starts a replenishment cycle in the background unless one is already
    /// under way and nothing is urgent yet.
    ///
    /// `urgency` is the state observed by the caller, before any block it
    /// activates is taken out of the pool.
    pub(crate) fn trigger(self: &Arc<Self>, urgency: Urgency) {
        let now = self.clock.current_millis();
        let (url, needed) = {
            let config = self.config.read();
            (config.url.clone(), config.blocks_needed(urgency.pooled))
        };
        if needed == 0 {
            return;
        }
        let Some(url) = url else {
            #[cfg(feature = "tracing")]
            tracing::debug!("No suid server url configured, skipping replenishment");
            return;
        };

        {
            let mut backoff = self.backoff.lock();
            if backoff.is_recent(now, urgency) {
                #[cfg(feature = "tracing")]
                tracing::debug!("Replenishment already in flight, ignoring trigger");
                return;
            }
            backoff.start(now);
        }

        if !R::spawn(Arc::clone(self).replenish(url, needed)) {
            // Nothing is in flight, so the next trigger must not be throttled.
            self.backoff.lock().reset();
        }
    }

    /// One replenishment cycle: request, then retry transient failures until
    /// a block arrives or the budget runs out.
    async fn replenish(self: Arc<Self>, mut url: String, mut blocks: usize) {
        loop {
            #[cfg(feature = "tracing")]
            tracing::debug!(blocks, "Requesting suid blocks");

            let outcome = match self.transport.request_blocks(&url, blocks).await {
                Ok(response) => classify(response),
                Err(e) => Err(e.into()),
            };
            let err = match outcome {
                Ok(block) => {
                    self.receive(block);
                    return;
                }
                Err(err) => err,
            };

            let urgency = self.urgency();
            let decision = self.backoff.lock().on_failure(&err, urgency);
            let delay = match decision {
                Decision::Retry {
                    delay,
                    retries_left: _retries_left,
                } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        retries_left = _retries_left,
                        "Suid replenishment failed, retrying: {err}"
                    );
                    delay
                }
                Decision::GiveUp => {
                    #[cfg(feature = "tracing")]
                    if err.is_retryable() {
                        tracing::warn!("Giving up on suid replenishment, retries exhausted: {err}");
                    } else {
                        tracing::error!("Unable to replenish suid blocks: {err}");
                    }
                    return;
                }
            };

            R::sleep_for(delay).await;

            // The pool may have been refilled or the server changed meanwhile.
            let pooled = self.pool.lock().store.len();
            let (next_url, needed) = {
                let config = self.config.read();
                (config.url.clone(), config.blocks_needed(pooled))
            };
            match next_url {
                Some(next_url) if needed > 0 => {
                    url = next_url;
                    blocks = needed;
                }
                _ => {
                    self.backoff.lock().reset();
                    return;
                }
            }
        }
    }

    /// Appends a granted block and ends the cycle.
    fn receive(&self, block: Block) {
        let pooled = {
            let mut pool = self.pool.lock();
            let pooled = pool.store.push_back(block);
            self.publish_readiness(pooled);
            pooled
        };
        self.backoff.lock().reset();

        #[cfg(feature = "tracing")]
        tracing::debug!(%block, pooled, "Received suid block");
    }
}
