//! Browsing session: the controller that wires a selected file through the
//! random-access reader into an archive backend and publishes the results on
//! [`StateChannel`]s.
//!
//! Views only subscribe; every channel is written by [`Browser`] alone.

use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::archive::{ArchiveOpener, Backend, ConvertOptions, ProgressSink, opener_for};
use crate::cancel::GenerationGuard;
use crate::config::{AnsiEncoding, OpenOptions, parse_ansi_encoding};
use crate::domain::{EntryDescriptor, FolderDescriptor};
use crate::error::{Result, ViewError};
use crate::read::RandomAccessReader;
use crate::state::StateChannel;
use crate::stats::CacheStats;
use crate::walk::FolderTreeWalker;

pub mod state;

pub use state::{
    EMPTY_LABEL, EntryListState, FolderListState, FolderSelection, LOADING_LABEL,
    NOT_LOADED_LABEL, SelectedFile, items_count_label,
};

pub const LOADING_PREVIEW: &str = "Loading...";

#[derive(Clone)]
pub struct Browser {
    file: StateChannel<Option<SelectedFile>>,
    folders: StateChannel<FolderListState>,
    entries: StateChannel<EntryListState>,
    preview: StateChannel<String>,
    ansi_encoding: StateChannel<Option<AnsiEncoding>>,
    disk_access: StateChannel<String>,
    items_progress: StateChannel<String>,
    opener: Arc<dyn ArchiveOpener>,
    options: OpenOptions,
    generations: GenerationGuard,
    session: Arc<Mutex<Option<Arc<RandomAccessReader>>>>,
}

impl Browser {
    pub fn new(opener: Arc<dyn ArchiveOpener>, options: OpenOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            file: StateChannel::new("file", None),
            folders: StateChannel::new("folders", FolderListState::NotLoaded),
            entries: StateChannel::new("entries", EntryListState::Unselected),
            preview: StateChannel::new("preview", String::new()),
            ansi_encoding: StateChannel::new("ansi-encoding", options.ansi_encoding),
            disk_access: StateChannel::new("disk-access", "not yet".to_owned()),
            items_progress: StateChannel::new("items-progress", String::new()),
            opener,
            options,
            generations: GenerationGuard::new(),
            session: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_backend(backend: Backend, options: OpenOptions) -> Result<Self> {
        Self::new(opener_for(backend), options)
    }

    pub fn file(&self) -> &StateChannel<Option<SelectedFile>> {
        &self.file
    }

    pub fn folders(&self) -> &StateChannel<FolderListState> {
        &self.folders
    }

    pub fn entries(&self) -> &StateChannel<EntryListState> {
        &self.entries
    }

    pub fn preview(&self) -> &StateChannel<String> {
        &self.preview
    }

    pub fn ansi_encoding(&self) -> &StateChannel<Option<AnsiEncoding>> {
        &self.ansi_encoding
    }

    /// Last read position reported by the reader.
    pub fn disk_access(&self) -> &StateChannel<String> {
        &self.disk_access
    }

    /// `"{current} / {total}"` while a folder is being listed.
    pub fn items_progress(&self) -> &StateChannel<String> {
        &self.items_progress
    }

    /// Cache counters of the open session, if any.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.session().as_ref().map(|reader| reader.stats())
    }

    pub fn select_file(&self, file: Option<SelectedFile>) {
        self.file.next(file);
    }

    /// `""` clears the choice; anything else must name a known code page.
    pub fn set_ansi_encoding(&self, name: &str) -> Result<()> {
        let encoding = parse_ansi_encoding(name)?;
        self.ansi_encoding.next(encoding);
        Ok(())
    }

    /// Open the selected file and publish its folder list. Returns the number
    /// of folders found. Failures are also published as preview text. Any
    /// folder listing still running for the previous file is superseded.
    pub async fn open(&self) -> Result<usize> {
        self.generations.start();
        self.entries.next(EntryListState::Empty);
        let Some(file) = self.file.value() else {
            self.folders.next(FolderListState::NotLoaded);
            return Ok(0);
        };
        self.folders.next(FolderListState::Loading);

        match self.load(file).await {
            Ok(list) => {
                let count = list.len();
                debug!(folders = count, "archive opened");
                self.folders.next(if list.is_empty() {
                    FolderListState::Empty
                } else {
                    FolderListState::Ready(list)
                });
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "failed to open archive");
                self.folders.next(FolderListState::Empty);
                self.preview.next(err.to_string());
                Err(err)
            }
        }
    }

    async fn load(&self, file: SelectedFile) -> Result<Vec<FolderDescriptor>> {
        let mut options = self.options.clone();
        options.ansi_encoding = self.ansi_encoding.value();

        let file_channel = self.file.clone();
        let reader = Arc::new(
            RandomAccessReader::new(file.source.clone(), options.unit_size)?
                .with_activity(self.disk_access.clone())
                .with_close_hook(move || file_channel.next(None)),
        );
        *self.session() = Some(reader.clone());
        debug!(file = %file.label, unit_size = options.unit_size, "opening archive");

        let root = self.opener.open(reader, &options).await?;
        FolderTreeWalker::new(options.max_folder_depth)
            .walk(root)
            .await
    }

    /// List the entries of folder `index` (a row of the folder list). Each
    /// call supersedes any listing still in flight. A failed listing publishes
    /// its error text and returns the error itself.
    pub async fn select_folder(&self, index: Option<usize>) -> Result<FolderSelection> {
        let token = self.generations.start();
        let Some(index) = index else {
            self.entries.next(EntryListState::Unselected);
            return Ok(FolderSelection::Cleared);
        };
        self.entries.next(EntryListState::Loading);
        self.items_progress.next(String::new());

        let guard = self.generations.clone();
        let progress = self.items_progress.clone();
        let mut report = move |current: u64, total: u64| -> Result<()> {
            guard.checkpoint(token)?;
            progress.next(format!("{current} / {total}"));
            Ok(())
        };
        let sink: &mut ProgressSink<'_> = &mut report;

        let listed = match self.folders.value() {
            FolderListState::Ready(list) => match list.get(index) {
                Some(folder) => folder.list_entries(Some(sink)).await,
                None => Err(ViewError::InvalidRequest(format!(
                    "folder index {index} out of range ({} folders)",
                    list.len()
                ))),
            },
            // placeholder row
            _ => Ok(Vec::new()),
        };

        if self.generations.checkpoint(token).is_err() {
            debug!(%token, "folder listing superseded");
            return Ok(FolderSelection::Superseded);
        }
        match listed {
            Ok(list) if list.is_empty() => {
                self.entries.next(EntryListState::Empty);
                Ok(FolderSelection::Listed(0))
            }
            Ok(list) => {
                let count = list.len();
                self.entries.next(EntryListState::Ready(list));
                Ok(FolderSelection::Listed(count))
            }
            Err(err) => {
                warn!(error = %err, index, "failed to list folder");
                self.entries.next(EntryListState::Failed(err.to_string()));
                self.preview.next(err.to_string());
                Err(err)
            }
        }
    }

    /// Render `entry` into the preview. Rows without an item are ignored.
    /// A conversion failure is published as preview text and returned.
    pub async fn open_entry(&self, entry: &EntryDescriptor) -> Result<()> {
        if !entry.is_actionable() {
            return Ok(());
        }
        self.preview.next(LOADING_PREVIEW.to_owned());
        match entry.render(&ConvertOptions::default()).await {
            Ok(text) => {
                self.preview.next(text);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, entry = %entry.display, "conversion failed");
                self.preview.next(err.to_string());
                Err(err)
            }
        }
    }

    pub fn dismiss_preview(&self) {
        self.preview.next(String::new());
    }

    /// Write every listed entry to `dir` under its canonical file name, with a
    /// numbered suffix for names already used earlier in the same export.
    /// Stops at the first failure, which is also published as preview text.
    pub async fn export_entries(&self, dir: &Path) -> Result<usize> {
        let state = self.entries.value();
        let result = async {
            let mut written = 0;
            let mut taken = HashSet::new();
            for entry in state.entries().iter().filter(|e| e.is_actionable()) {
                let name = unique_file_name(entry, &mut taken);
                let mut parts = Path::new(&name).components();
                if !matches!(parts.next(), Some(Component::Normal(_))) || parts.next().is_some() {
                    return Err(ViewError::InvalidRequest(format!("unsafe export file name {name:?}")));
                }
                let text = entry.render(&ConvertOptions::default()).await?;
                tokio::fs::write(dir.join(&name), text).await?;
                written += 1;
            }
            Ok::<usize, ViewError>(written)
        }
        .await;
        if let Err(err) = &result {
            warn!(error = %err, dir = %dir.display(), "export failed");
            self.preview.next(err.to_string());
        }
        result
    }

    /// Close the session reader. Its close hook clears the selected file.
    pub async fn close(&self) -> Result<()> {
        self.generations.start();
        let reader = self.session().take();
        let result = match reader {
            Some(reader) => reader.close().await,
            None => Ok(()),
        };
        self.folders.next(FolderListState::NotLoaded);
        self.entries.next(EntryListState::Unselected);
        result
    }

    fn session(&self) -> MutexGuard<'_, Option<Arc<RandomAccessReader>>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Canonical name, or `"stem (2).ext"`, `"stem (3).ext"`... when an earlier
/// entry in the same export already claimed it. Compared case-insensitively.
fn unique_file_name(entry: &EntryDescriptor, taken: &mut HashSet<String>) -> String {
    let mut name = entry.canonical_file_name();
    let mut n = 2;
    while !taken.insert(name.to_lowercase()) {
        name = format!("{} ({n}).{}", entry.file_stem(), entry.kind.extension());
        n += 1;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{WriteOptions, sample_mailbox, write_snapshot_to};
    use crate::source::MemoryBlockSource;
    use std::io::Cursor;

    fn sample_file() -> SelectedFile {
        let mut buf = Cursor::new(Vec::new());
        write_snapshot_to(&mut buf, &sample_mailbox(), &WriteOptions::default()).unwrap();
        SelectedFile::new("sample", Arc::new(MemoryBlockSource::new(buf.into_inner())))
    }

    fn browser() -> Browser {
        Browser::with_backend(Backend::Snapshot, OpenOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn open_without_file_resets_folders() {
        let b = browser();
        assert_eq!(b.open().await.unwrap(), 0);
        assert!(matches!(b.folders().value(), FolderListState::NotLoaded));
        assert!(matches!(b.entries().value(), EntryListState::Empty));
    }

    #[tokio::test]
    async fn open_publishes_folders_and_disk_access() {
        let b = browser();
        b.select_file(Some(sample_file()));
        let count = b.open().await.unwrap();
        let rows = b.folders().value().rows();
        assert_eq!(rows.len(), count);
        assert_eq!(rows[0], "Personal Folders");
        assert_eq!(rows[1], "* Inbox");
        assert_eq!(rows[2], "** Receipts");
        assert!(b.disk_access().value().starts_with("reading block at "));
    }

    #[tokio::test]
    async fn placeholder_row_lists_as_empty() {
        let b = browser();
        assert_eq!(b.select_folder(Some(0)).await.unwrap(), FolderSelection::Listed(0));
        assert!(matches!(b.entries().value(), EntryListState::Empty));
        assert_eq!(b.select_folder(None).await.unwrap(), FolderSelection::Cleared);
        assert!(matches!(b.entries().value(), EntryListState::Unselected));
    }

    #[tokio::test]
    async fn out_of_range_folder_fails_with_text() {
        let b = browser();
        b.select_file(Some(sample_file()));
        b.open().await.unwrap();
        let err = b.select_folder(Some(99)).await.unwrap_err();
        assert!(matches!(err, ViewError::InvalidRequest(_)), "{err:?}");
        assert!(matches!(b.entries().value(), EntryListState::Failed(_)));
        assert!(b.preview().value().contains("out of range"));
    }

    #[tokio::test]
    async fn contact_renders_as_vcard() {
        let b = browser();
        b.select_file(Some(sample_file()));
        b.open().await.unwrap();
        let contacts = b
            .folders()
            .value()
            .rows()
            .iter()
            .position(|r| r == "* Contacts")
            .unwrap();
        assert_eq!(b.select_folder(Some(contacts)).await.unwrap(), FolderSelection::Listed(2));
        assert_eq!(b.items_progress().value(), "2 / 2");

        let entry = b.entries().value().entries()[0].clone();
        assert_eq!(entry.canonical_file_name(), "Ana Lima.vcf");
        b.open_entry(&entry).await.unwrap();
        assert!(b.preview().value().starts_with("BEGIN:VCARD"));
        b.dismiss_preview();
        assert_eq!(b.preview().value(), "");
    }

    #[tokio::test]
    async fn unknown_encoding_is_rejected() {
        let b = browser();
        assert!(matches!(
            b.set_ansi_encoding("klingon"),
            Err(ViewError::InvalidConfig(_))
        ));
        b.set_ansi_encoding("windows1251").unwrap();
        assert_eq!(b.ansi_encoding().value(), Some(AnsiEncoding::Windows1251));
        b.set_ansi_encoding("").unwrap();
        assert_eq!(b.ansi_encoding().value(), None);
    }

    #[tokio::test]
    async fn close_clears_file_and_lists() {
        let b = browser();
        b.select_file(Some(sample_file()));
        b.open().await.unwrap();
        b.close().await.unwrap();
        assert!(b.file().value().is_none());
        assert!(matches!(b.folders().value(), FolderListState::NotLoaded));
        assert!(matches!(b.entries().value(), EntryListState::Unselected));
        assert!(b.cache_stats().is_none());
    }
}
