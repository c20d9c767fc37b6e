//! ChunkCache: block-index keyed cache over a [`BlockSource`].
//!
//! Blocks are fetched on first use and kept until the cache is dropped; there
//! is no eviction. Concurrent misses on the same block share one fetch through
//! a per-block in-flight cell, so a block is fetched at most once unless a
//! fetch fails (failed fetches are not cached and the next `get` retries).

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::{Result, ViewError};
use crate::source::BlockSource;
use crate::stats::{CacheCounters, CacheStats};

/// One cached block: `[index * unit, (index + 1) * unit)` clipped to end of source.
pub type Block = Arc<[u8]>;

pub struct ChunkCache {
    source: Arc<dyn BlockSource>,
    unit: u64,
    blocks: DashMap<u64, Arc<OnceCell<Block>>>,
    counters: CacheCounters,
}

impl ChunkCache {
    pub fn new(source: Arc<dyn BlockSource>, unit_size: usize) -> Result<Self> {
        if unit_size == 0 {
            return Err(ViewError::InvalidConfig("unit_size must be non-zero".into()));
        }
        Ok(Self {
            source,
            unit: unit_size as u64,
            blocks: DashMap::new(),
            counters: CacheCounters::default(),
        })
    }

    pub fn unit_size(&self) -> u64 {
        self.unit
    }

    pub fn source(&self) -> &Arc<dyn BlockSource> {
        &self.source
    }

    pub async fn get(&self, index: u64) -> Result<Block> {
        // Clone the cell out so no map shard lock is held across the await.
        let cell = self.blocks.entry(index).or_default().value().clone();
        if let Some(block) = cell.get() {
            self.counters.hit();
            trace!(index, "block cache hit");
            return Ok(block.clone());
        }
        let block = cell.get_or_try_init(|| self.fetch(index)).await?;
        Ok(block.clone())
    }

    async fn fetch(&self, index: u64) -> Result<Block> {
        let start = index
            .checked_mul(self.unit)
            .ok_or_else(|| ViewError::InvalidRequest(format!("block {index} out of range")))?;
        let end = start.saturating_add(self.unit);
        let bytes = self.source.fetch_block(start, end).await?;
        if bytes.len() as u64 > self.unit {
            return Err(ViewError::BackingStore(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "block source returned {} bytes for block {index} (unit {})",
                    bytes.len(),
                    self.unit
                ),
            )));
        }
        self.counters.fetched(bytes.len());
        trace!(index, start, len = bytes.len(), "fetched block");
        Ok(Arc::from(bytes))
    }

    /// Whether block `index` has been materialized.
    pub fn contains(&self, index: u64) -> bool {
        self.blocks
            .get(&index)
            .is_some_and(|cell| cell.initialized())
    }

    pub fn stats(&self) -> CacheStats {
        let cached = self.blocks.iter().filter(|c| c.initialized()).count();
        self.counters.snapshot(cached)
    }
}
