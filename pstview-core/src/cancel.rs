//! Generation-guarded cooperative cancellation.
//!
//! Every run of a cancellable operation family takes a [`Generation`] from
//! [`GenerationGuard::start`] and calls [`GenerationGuard::checkpoint`] at its
//! natural progress points. Once a newer run has started, the older run's
//! checkpoint fails with [`ViewError::Cancelled`] and the run unwinds without
//! publishing anything. Nothing is interrupted mid-flight; staleness is only
//! observed at checkpoints.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, ViewError};

/// Epoch of one run, as handed out by [`GenerationGuard::start`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Generation(u64);

impl Generation {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Live counter for one operation family. Clones share the counter.
#[derive(Clone, Debug, Default)]
pub struct GenerationGuard {
    live: Arc<AtomicU64>,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run; every earlier token becomes stale.
    pub fn start(&self) -> Generation {
        Generation(self.live.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn current(&self) -> Generation {
        Generation(self.live.load(Ordering::Acquire))
    }

    pub fn is_current(&self, token: Generation) -> bool {
        self.live.load(Ordering::Acquire) == token.0
    }

    pub fn checkpoint(&self, token: Generation) -> Result<()> {
        if self.is_current(token) {
            Ok(())
        } else {
            Err(ViewError::Cancelled)
        }
    }
}
