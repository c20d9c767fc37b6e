//! Archive API: the boundary between the browser core and an archive backend.
//!
//! A backend receives an [`ArchiveSource`] (normally the random-access reader)
//! and hands back the root [`Folder`]. Everything below the root is reached
//! through the trait objects defined here.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OpenOptions;
use crate::error::Result;

/// Progress report `(current, total)` during an item listing. An `Err` from
/// the sink must be propagated unchanged by the backend; that is how a
/// superseded listing unwinds.
pub type ProgressSink<'a> = dyn FnMut(u64, u64) -> Result<()> + Send + 'a;

/// What an archive backend reads from.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Copy `length` bytes starting at `position` into `dest[offset..]`.
    async fn read(&self, dest: &mut [u8], offset: usize, length: usize, position: u64)
    -> Result<usize>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait ArchiveOpener: Send + Sync {
    async fn open(
        &self,
        source: Arc<dyn ArchiveSource>,
        options: &OpenOptions,
    ) -> Result<Arc<dyn Folder>>;
}

#[async_trait]
pub trait Folder: Send + Sync {
    async fn display_name(&self) -> Result<String>;

    async fn sub_folders(&self) -> Result<Vec<Arc<dyn Folder>>>;

    async fn items(&self, progress: Option<&mut ProgressSink<'_>>) -> Result<Vec<Arc<dyn Item>>>;
}

#[async_trait]
pub trait Item: Send + Sync {
    async fn display_name(&self) -> Result<String>;

    /// MAPI message class, e.g. `IPM.Note` or `IPM.Contact`.
    fn message_class(&self) -> &str;

    async fn to_eml(&self, options: &ConvertOptions) -> Result<String>;

    async fn to_vcard(&self, options: &ConvertOptions) -> Result<String>;
}

/// Options record passed to item conversions. The snapshot backend takes no
/// switches; other backends may read the fields they understand.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct ConvertOptions {}

pub mod factory;

pub use factory::{Backend, opener_for};
