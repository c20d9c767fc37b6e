//! Snapshot archive backend.
//!
//! A snapshot is a single file: a fixed superblock, the item bodies, then a
//! CBOR manifest describing the folder tree. The superblock carries the
//! manifest's location and BLAKE3 checksum.

pub mod codec;
pub mod manifest;
pub mod opened;
pub mod sample;
pub mod superblock;
pub mod writer;

pub use opened::SnapshotOpener;
pub use sample::sample_mailbox;
pub use writer::{FolderSpec, ItemSpec, WriteOptions, write_snapshot, write_snapshot_to};
