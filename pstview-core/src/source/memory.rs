use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::BlockSource;
use crate::error::Result;

/// In-memory block source. Records every fetched range, which makes cache
/// behaviour observable in tests and benchmarks.
#[derive(Clone)]
pub struct MemoryBlockSource {
    data: Arc<[u8]>,
    latency: Option<Duration>,
    fetches: Arc<Mutex<Vec<Range<u64>>>>,
}

impl MemoryBlockSource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            latency: None,
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep this long inside every fetch, simulating a slow store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Ranges requested so far, in request order.
    pub fn fetches(&self) -> Vec<Range<u64>> {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl BlockSource for MemoryBlockSource {
    async fn fetch_block(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(start..end);
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }
        let len = self.data.len() as u64;
        let s = start.min(len) as usize;
        let e = end.min(len) as usize;
        if s >= e {
            return Ok(Vec::new());
        }
        Ok(self.data[s..e].to_vec())
    }

    fn describe(&self) -> String {
        format!("memory ({} bytes)", self.data.len())
    }
}
