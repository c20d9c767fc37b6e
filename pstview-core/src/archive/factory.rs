use std::sync::Arc;

use super::ArchiveOpener;
use crate::snapshot::SnapshotOpener;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Snapshot,
}

pub fn opener_for(backend: Backend) -> Arc<dyn ArchiveOpener> {
    match backend {
        Backend::Snapshot => Arc::new(SnapshotOpener),
    }
}
