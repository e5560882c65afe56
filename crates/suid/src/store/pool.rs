use std::sync::Arc;

use crate::{
    codec::Format,
    id::{Block, Suid},
    store::Storage,
};

/// Key the pool is persisted under.
pub(crate) const POOL_KEY: &str = "suidpool";

/// Key written and removed once to probe whether storage is usable.
const DETECT_KEY: &str = "suiddetect";

/// Tag prefixed to pools written in canonical base-36. Untagged values are
/// legacy compressed base-32.
const BASE36_TAG: &str = "36:";

/// The persisted FIFO of blocks reserved for this client but not yet
/// activated.
///
/// Every access re-reads or re-writes the whole pool; there are no partial
/// updates. Storage is a best-effort cache: when it is unusable the pool lives
/// in memory only, and [`PoolStore::load`] never fails.
pub(crate) struct PoolStore {
    storage: Option<Arc<dyn Storage>>,
    mirror: Vec<Block>,
}

impl PoolStore {
    /// Wraps `storage`, probing it once for usability.
    pub(crate) fn new(storage: Arc<dyn Storage>) -> Self {
        let usable = probe(storage.as_ref());
        Self {
            storage: usable.then_some(storage),
            mirror: Vec::new(),
        }
    }

    /// Whether blocks are persisted or only kept in memory.
    pub(crate) const fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Reads the pool, oldest block first.
    pub(crate) fn load(&mut self) -> Vec<Block> {
        if let Some(storage) = &self.storage {
            match storage.get(POOL_KEY) {
                Ok(Some(raw)) => self.mirror = parse_pool(&raw),
                Ok(None) => self.mirror.clear(),
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Unable to read suid pool, using in-memory copy: {_e}");
                }
            }
        }
        self.mirror.clone()
    }

    /// Replaces the pool with `blocks`.
    pub(crate) fn save(&mut self, blocks: Vec<Block>) {
        if let Some(storage) = &self.storage {
            if let Err(_e) = storage.set(POOL_KEY, &format_pool(&blocks)) {
                #[cfg(feature = "tracing")]
                tracing::warn!("Unable to persist suid pool, keeping in-memory copy: {_e}");
            }
        }
        self.mirror = blocks;
    }

    /// Number of pooled blocks.
    pub(crate) fn len(&mut self) -> usize {
        self.load().len()
    }

    /// Removes and returns the oldest block, persisting the remainder.
    pub(crate) fn pop_front(&mut self) -> Option<Block> {
        let mut blocks = self.load();
        if blocks.is_empty() {
            return None;
        }
        let block = blocks.remove(0);
        self.save(blocks);
        Some(block)
    }

    /// Appends `block` as the newest entry and returns the new pool size.
    pub(crate) fn push_back(&mut self, block: Block) -> usize {
        let mut blocks = self.load();
        blocks.push(block);
        let len = blocks.len();
        self.save(blocks);
        len
    }
}

fn probe(storage: &dyn Storage) -> bool {
    let result = storage
        .set(DETECT_KEY, DETECT_KEY)
        .and_then(|()| storage.get(DETECT_KEY))
        .and_then(|read| storage.remove(DETECT_KEY).map(|()| read));
    match result {
        Ok(Some(read)) if read == DETECT_KEY => true,
        Ok(_) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Suid storage does not retain writes, pool will not survive restarts");
            false
        }
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Suid storage unavailable, pool will not survive restarts: {_e}");
            false
        }
    }
}

/// Decodes a persisted pool. Malformed entries are skipped.
pub(crate) fn parse_pool(raw: &str) -> Vec<Block> {
    let (format, entries) = match raw.strip_prefix(BASE36_TAG) {
        Some(rest) => (Format::Base36, rest),
        None => (Format::Legacy, raw),
    };
    entries
        .split(',')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let block = Suid::decode_as(format, entry).and_then(Block::new);
            match block {
                Ok(block) => Some(block),
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Skipping malformed pooled block {entry:?}: {_e}");
                    None
                }
            }
        })
        .collect()
}

/// Encodes a pool in the current, tagged base-36 format.
pub(crate) fn format_pool(blocks: &[Block]) -> String {
    let entries: Vec<String> = blocks.iter().map(|b| b.first().encode()).collect();
    format!("{BASE36_TAG}{}", entries.join(","))
}
