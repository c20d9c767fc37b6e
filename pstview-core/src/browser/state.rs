use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::domain::{EntryDescriptor, FolderDescriptor};
use crate::error::Result;
use crate::source::{BlockSource, FileBlockSource};

pub const NOT_LOADED_LABEL: &str = "(PST is not loaded yet)";
pub const EMPTY_LABEL: &str = "(Currently no item is available to display)";
pub const LOADING_LABEL: &str = "(Loading)";

/// The archive file chosen by the user, not yet opened.
#[derive(Clone)]
pub struct SelectedFile {
    pub label: String,
    pub source: Arc<dyn BlockSource>,
}

impl SelectedFile {
    pub fn new(label: impl Into<String>, source: Arc<dyn BlockSource>) -> Self {
        Self {
            label: label.into(),
            source,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let source = FileBlockSource::open(path).await?;
        Ok(Self::new(path.display().to_string(), Arc::new(source)))
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("label", &self.label)
            .field("source", &self.source.describe())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub enum FolderListState {
    NotLoaded,
    Loading,
    /// Opened, but the walk produced nothing (or opening failed).
    Empty,
    Ready(Vec<FolderDescriptor>),
}

impl FolderListState {
    pub fn folders(&self) -> &[FolderDescriptor] {
        match self {
            FolderListState::Ready(list) => list,
            _ => &[],
        }
    }

    /// Rows as a selector shows them: one placeholder row unless `Ready`.
    pub fn rows(&self) -> Vec<String> {
        match self {
            FolderListState::NotLoaded => vec![NOT_LOADED_LABEL.to_owned()],
            FolderListState::Loading => vec![LOADING_LABEL.to_owned()],
            FolderListState::Empty => vec![EMPTY_LABEL.to_owned()],
            FolderListState::Ready(list) => list.iter().map(FolderDescriptor::display).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum EntryListState {
    Unselected,
    Empty,
    Loading,
    Failed(String),
    Ready(Vec<EntryDescriptor>),
}

impl EntryListState {
    pub fn entries(&self) -> &[EntryDescriptor] {
        match self {
            EntryListState::Ready(list) => list,
            _ => &[],
        }
    }

    /// Banner shown above the list, if any.
    pub fn alert(&self) -> Option<String> {
        match self {
            EntryListState::Unselected => Some("The folder is not selected yet".into()),
            EntryListState::Empty => {
                Some("The selected folder seems not to have good item to show".into())
            }
            EntryListState::Loading => Some("Listing items in this folder".into()),
            EntryListState::Failed(message) => Some(format!(
                "There is an error encountered while listing items in this folder\n\n{message}"
            )),
            EntryListState::Ready(_) => None,
        }
    }

    pub fn count_label(&self) -> String {
        items_count_label(self.entries().len())
    }
}

/// `"Items:"`, `"1 item:"`, `"N items:"`.
pub fn items_count_label(count: usize) -> String {
    match count {
        0 => "Items:".to_owned(),
        1 => "1 item:".to_owned(),
        n => format!("{n} items:"),
    }
}

/// Successful outcome of [`Browser::select_folder`](super::Browser::select_folder).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FolderSelection {
    /// No folder selected; entries reset to `Unselected`.
    Cleared,
    /// Entries published; the count may be zero.
    Listed(usize),
    /// A newer selection started; nothing was published.
    Superseded,
}
