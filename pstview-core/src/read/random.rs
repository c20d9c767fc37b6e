use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::archive::ArchiveSource;
use crate::cache::ChunkCache;
use crate::error::{Result, ViewError};
use crate::source::BlockSource;
use crate::state::StateChannel;
use crate::stats::CacheStats;

type CloseHook = Box<dyn FnOnce() + Send>;

/// Serves arbitrary `(position, length)` reads out of a [`ChunkCache`].
///
/// Reads are not serialized here; callers issuing overlapping reads that need
/// a strict order must serialize them themselves.
pub struct RandomAccessReader {
    cache: ChunkCache,
    unit: u64,
    activity: Option<StateChannel<String>>,
    on_close: Mutex<Option<CloseHook>>,
    closed: AtomicBool,
}

impl RandomAccessReader {
    pub fn new(source: Arc<dyn BlockSource>, unit_size: usize) -> Result<Self> {
        let cache = ChunkCache::new(source, unit_size)?;
        Ok(Self {
            unit: cache.unit_size(),
            cache,
            activity: None,
            on_close: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Publish `"reading block at N"` to `channel` on every read request.
    pub fn with_activity(mut self, channel: StateChannel<String>) -> Self {
        self.activity = Some(channel);
        self
    }

    /// Run `hook` once, after the block source has been closed.
    pub fn with_close_hook(self, hook: impl FnOnce() + Send + 'static) -> Self {
        *self.on_close.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
        self
    }

    pub fn unit_size(&self) -> u64 {
        self.unit
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Copy `length` bytes at `position` into `dest[offset..offset + length]`.
    /// Returns the number of bytes copied, which is always `length`.
    pub async fn read(
        &self,
        dest: &mut [u8],
        mut offset: usize,
        mut length: usize,
        mut position: u64,
    ) -> Result<usize> {
        if self.is_closed() {
            return Err(ViewError::Closed);
        }
        let fits = offset
            .checked_add(length)
            .is_some_and(|end| end <= dest.len());
        if !fits {
            return Err(ViewError::InvalidRequest(format!(
                "{length} bytes at offset {offset} do not fit a {}-byte buffer",
                dest.len()
            )));
        }
        if let Some(activity) = &self.activity {
            activity.next(format!("reading block at {}", group_thousands(position)));
        }
        trace!(position, length, "read request");

        let total = length;
        while length > 0 {
            let index = position / self.unit;
            let block_start = index * self.unit;
            let block_end = block_start.saturating_add(self.unit);
            let chunk = (length as u64).min(block_end - position) as usize;

            let block = self.cache.get(index).await?;
            let from = (position - block_start) as usize;
            let src = block.get(from..from + chunk).ok_or_else(|| {
                ViewError::BackingStore(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "short read: block {index} holds {} bytes, needed {}",
                        block.len(),
                        from + chunk
                    ),
                ))
            })?;
            dest[offset..offset + chunk].copy_from_slice(src);

            offset += chunk;
            length -= chunk;
            position += chunk as u64;
        }
        Ok(total)
    }

    /// Fill `buf` from `position`.
    pub async fn read_at(&self, buf: &mut [u8], position: u64) -> Result<usize> {
        let len = buf.len();
        self.read(buf, 0, len, position).await
    }

    /// Close the block source and run the close hook. Later calls are no-ops.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(source = %self.cache.source().describe(), stats = ?self.stats(), "closing reader");
        let result = self.cache.source().close().await;
        let hook = self
            .on_close
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(hook) = hook {
            hook();
        }
        result
    }
}

#[async_trait]
impl ArchiveSource for RandomAccessReader {
    async fn read(
        &self,
        dest: &mut [u8],
        offset: usize,
        length: usize,
        position: u64,
    ) -> Result<usize> {
        RandomAccessReader::read(self, dest, offset, length, position).await
    }

    async fn close(&self) -> Result<()> {
        RandomAccessReader::close(self).await
    }
}

/// `1048575` -> `"1,048,575"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
