#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod stats;

pub mod source;

pub mod cache;

pub mod read;

pub mod cancel;
pub mod state;

pub mod archive;
pub mod domain;
pub mod walk;

pub mod snapshot;

pub mod browser;

// Re-exports: stable API surface
pub use archive::{ArchiveOpener, ArchiveSource, Backend, ConvertOptions, Folder, Item, opener_for};
pub use browser::{Browser, EntryListState, FolderListState, FolderSelection, SelectedFile};
pub use cache::ChunkCache;
pub use cancel::{Generation, GenerationGuard};
pub use config::{AnsiEncoding, OpenOptions};
pub use domain::{EntryDescriptor, EntryKind, FolderDescriptor};
pub use error::{Result, ViewError};
pub use read::RandomAccessReader;
pub use source::{BlockSource, FileBlockSource, MemoryBlockSource};
pub use state::{StateChannel, Subscription, throttle};
pub use walk::FolderTreeWalker;
