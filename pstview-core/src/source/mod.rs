//! Block sources: the slow, range-oriented backing store under the chunk cache.

use async_trait::async_trait;

use crate::error::Result;

/// Injected I/O primitive the cache fetches whole blocks from.
///
/// `fetch_block(start, end)` returns the bytes of `[start, end)`; it may return
/// fewer bytes only when `end` lies past the end of the source.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn fetch_block(&self, start: u64, end: u64) -> Result<Vec<u8>>;

    /// Release the underlying handle. Called once, when the owning reader closes.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Human-readable name used in logs.
    fn describe(&self) -> String;
}

pub mod file;
pub mod memory;

pub use file::FileBlockSource;
pub use memory::MemoryBlockSource;
