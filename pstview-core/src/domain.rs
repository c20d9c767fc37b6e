use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::archive::{ConvertOptions, Folder, Item, ProgressSink};
use crate::error::Result;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identity of a listed row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u64);

impl Key {
    pub fn next() -> Self {
        Key(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const CONTACT_CLASS: &str = "IPM.Contact";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Rendered as vCard.
    Contact,
    /// Everything else; rendered as RFC 822 (.eml).
    Message,
}

impl EntryKind {
    pub fn from_message_class(class: &str) -> Self {
        if class == CONTACT_CLASS {
            EntryKind::Contact
        } else {
            EntryKind::Message
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            EntryKind::Contact => "vcf",
            EntryKind::Message => "eml",
        }
    }
}

/// One selectable folder produced by the tree walker.
#[derive(Clone)]
pub struct FolderDescriptor {
    pub key: Key,
    pub label: String,
    pub depth: usize,
    pub depth_prefix: String,
    pub(crate) folder: Arc<dyn Folder>,
}

impl FolderDescriptor {
    pub fn new(label: String, depth: usize, depth_prefix: String, folder: Arc<dyn Folder>) -> Self {
        Self {
            key: Key::next(),
            label,
            depth,
            depth_prefix,
            folder,
        }
    }

    /// `"** Inbox"` for nested folders. The root deliberately shows its bare
    /// label, without the leading space a joined empty prefix would give.
    pub fn display(&self) -> String {
        if self.depth_prefix.is_empty() {
            self.label.clone()
        } else {
            format!("{} {}", self.depth_prefix, self.label)
        }
    }

    /// Enumerate this folder's entries, forwarding `progress` to the archive.
    pub async fn list_entries(
        &self,
        progress: Option<&mut ProgressSink<'_>>,
    ) -> Result<Vec<EntryDescriptor>> {
        let items = self.folder.items(progress).await?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(EntryDescriptor::from_item(item).await?);
        }
        Ok(out)
    }
}

impl fmt::Debug for FolderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderDescriptor")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("depth", &self.depth)
            .finish()
    }
}

/// One listed item of a folder.
#[derive(Clone)]
pub struct EntryDescriptor {
    pub key: Key,
    pub display: String,
    pub message_class: String,
    pub kind: EntryKind,
    pub(crate) item: Option<Arc<dyn Item>>,
}

impl EntryDescriptor {
    pub async fn from_item(item: Arc<dyn Item>) -> Result<Self> {
        let display = item.display_name().await?;
        let message_class = item.message_class().to_owned();
        Ok(Self {
            key: Key::next(),
            kind: EntryKind::from_message_class(&message_class),
            display,
            message_class,
            item: Some(item),
        })
    }

    pub fn is_actionable(&self) -> bool {
        self.item.is_some()
    }

    /// File name used when exporting, e.g. `"Lunch plans.eml"`. Always a
    /// single plain path component, whatever the archive put in the subject.
    pub fn canonical_file_name(&self) -> String {
        format!("{}.{}", self.file_stem(), self.kind.extension())
    }

    pub fn file_stem(&self) -> String {
        safe_file_stem(&self.display)
    }

    /// Convert to vCard (contacts) or EML (everything else). An entry without
    /// an item renders as the empty string.
    pub async fn render(&self, options: &ConvertOptions) -> Result<String> {
        let Some(item) = &self.item else {
            return Ok(String::new());
        };
        match self.kind {
            EntryKind::Contact => item.to_vcard(options).await,
            EntryKind::Message => item.to_eml(options).await,
        }
    }
}

impl fmt::Debug for EntryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryDescriptor")
            .field("key", &self.key)
            .field("display", &self.display)
            .field("message_class", &self.message_class)
            .finish()
    }
}

const MAX_STEM_CHARS: usize = 200;
const FALLBACK_STEM: &str = "untitled";

/// Make an archive-supplied name usable as a file name stem: separators,
/// control characters and characters Windows rejects become `_`, surrounding
/// dots and whitespace are trimmed, and an empty result becomes `"untitled"`.
pub fn safe_file_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem: String = cleaned
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    if stem.is_empty() {
        FALLBACK_STEM.to_owned()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(display: &str, kind: EntryKind) -> EntryDescriptor {
        EntryDescriptor {
            key: Key::next(),
            display: display.to_owned(),
            message_class: String::new(),
            kind,
            item: None,
        }
    }

    #[test]
    fn file_names_stay_inside_the_export_dir() {
        use std::path::{Component, Path};

        for subject in ["../escaped", "/etc/passwd", "..", "a\\..\\b", "C:\\x", "nul\0byte", "  ", ""] {
            let name = entry(subject, EntryKind::Message).canonical_file_name();
            let mut parts = Path::new(&name).components();
            assert!(
                matches!(parts.next(), Some(Component::Normal(_))) && parts.next().is_none(),
                "{subject:?} became {name:?}"
            );
        }
        assert_eq!(entry("../escaped", EntryKind::Message).canonical_file_name(), "_escaped.eml");
        assert_eq!(entry("..", EntryKind::Contact).canonical_file_name(), "untitled.vcf");
        assert_eq!(entry("Lunch plans", EntryKind::Message).canonical_file_name(), "Lunch plans.eml");
    }

    #[test]
    fn contact_class_maps_to_vcard() {
        assert_eq!(EntryKind::from_message_class("IPM.Contact"), EntryKind::Contact);
        assert_eq!(EntryKind::from_message_class("IPM.Note"), EntryKind::Message);
        assert_eq!(EntryKind::Contact.extension(), "vcf");
    }

    #[test]
    fn keys_are_unique() {
        let a = Key::next();
        let b = Key::next();
        assert!(b > a);
    }
}
