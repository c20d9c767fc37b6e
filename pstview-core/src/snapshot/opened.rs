use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::codec::{self, CodecId};
use super::manifest::{FolderRecord, ItemRecord, Manifest};
use super::superblock::{HEADER_LEN, Superblock};
use crate::archive::{ArchiveOpener, ArchiveSource, ConvertOptions, Folder, Item, ProgressSink};
use crate::config::OpenOptions;
use crate::domain::CONTACT_CLASS;
use crate::error::{Result, ViewError};

/// Opens snapshot files through an [`ArchiveSource`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SnapshotOpener;

struct Shared {
    source: Arc<dyn ArchiveSource>,
    manifest: Manifest,
}

/// Largest manifest accepted; the header is untrusted input.
pub const MAX_MANIFEST_LEN: u64 = 64 * 1024 * 1024;
/// Largest item body accepted, compressed or plain.
pub const MAX_BODY_LEN: u64 = 256 * 1024 * 1024;

/// Read `len` bytes at `position`, refusing regions above `limit` before
/// allocating anything.
async fn read_exact_at(
    source: &dyn ArchiveSource,
    position: u64,
    len: u64,
    limit: u64,
) -> Result<Vec<u8>> {
    if len > limit {
        return Err(ViewError::Format(format!(
            "region of {len} bytes exceeds the {limit}-byte limit"
        )));
    }
    let len = usize::try_from(len)
        .map_err(|_| ViewError::Format(format!("region of {len} bytes is not addressable")))?;
    let mut buf = vec![0u8; len];
    source.read(&mut buf, 0, len, position).await?;
    Ok(buf)
}

fn check_bounds(folder: &FolderRecord, data_end: u64) -> Result<()> {
    let mut stack = vec![folder];
    while let Some(f) = stack.pop() {
        for item in &f.items {
            CodecId::try_from(item.codec)?;
            if item.c_len > MAX_BODY_LEN || item.u_len > MAX_BODY_LEN {
                return Err(ViewError::Format(format!(
                    "body of {:?} is too large",
                    item.subject
                )));
            }
            if item.body_off < HEADER_LEN || item.body_off.saturating_add(item.c_len) > data_end {
                return Err(ViewError::Format(format!(
                    "body of {:?} out of bounds",
                    item.subject
                )));
            }
        }
        stack.extend(f.folders.iter());
    }
    Ok(())
}

#[async_trait]
impl ArchiveOpener for SnapshotOpener {
    async fn open(
        &self,
        source: Arc<dyn ArchiveSource>,
        options: &OpenOptions,
    ) -> Result<Arc<dyn Folder>> {
        if let Some(enc) = options.ansi_encoding {
            // snapshot text is stored as UTF-8 already
            debug!(encoding = %enc, "ANSI encoding ignored by snapshot backend");
        }

        let header = match read_exact_at(source.as_ref(), 0, HEADER_LEN, HEADER_LEN).await {
            Err(ViewError::BackingStore(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ViewError::Format("file too short for a superblock".into()));
            }
            other => other?,
        };
        let sb = Superblock::read_from(&header[..]).map_err(|e| ViewError::Format(e.to_string()))?;
        if sb.manifest_off < HEADER_LEN {
            return Err(ViewError::Format("manifest overlaps superblock".into()));
        }

        if sb.manifest_off.checked_add(sb.manifest_len).is_none() {
            return Err(ViewError::Format("manifest extends past the address space".into()));
        }
        let mbytes = read_exact_at(
            source.as_ref(),
            sb.manifest_off,
            sb.manifest_len,
            MAX_MANIFEST_LEN,
        )
        .await?;
        if blake3::hash(&mbytes).as_bytes() != &sb.manifest_blake3 {
            return Err(ViewError::Format("manifest checksum mismatch".into()));
        }
        let manifest: Manifest = ciborium::de::from_reader(&mbytes[..])
            .map_err(|e| ViewError::Format(format!("manifest: {e}")))?;
        check_bounds(&manifest.root, sb.manifest_off)?;
        debug!(
            root = %manifest.root.name,
            tool = %manifest.meta.tool,
            "snapshot opened"
        );

        let shared = Arc::new(Shared { source, manifest });
        Ok(Arc::new(SnapshotFolder {
            shared,
            path: Vec::new(),
        }))
    }
}

/// A folder addressed by its child-index path from the root.
struct SnapshotFolder {
    shared: Arc<Shared>,
    path: Vec<usize>,
}

impl SnapshotFolder {
    fn record(&self) -> Result<&FolderRecord> {
        self.shared
            .manifest
            .folder_at(&self.path)
            .ok_or_else(|| ViewError::Format(format!("no folder at {:?}", self.path)))
    }
}

#[async_trait]
impl Folder for SnapshotFolder {
    async fn display_name(&self) -> Result<String> {
        Ok(self.record()?.name.clone())
    }

    async fn sub_folders(&self) -> Result<Vec<Arc<dyn Folder>>> {
        let count = self.record()?.folders.len();
        Ok((0..count)
            .map(|i| {
                let mut path = self.path.clone();
                path.push(i);
                Arc::new(SnapshotFolder {
                    shared: self.shared.clone(),
                    path,
                }) as Arc<dyn Folder>
            })
            .collect())
    }

    async fn items(
        &self,
        mut progress: Option<&mut ProgressSink<'_>>,
    ) -> Result<Vec<Arc<dyn Item>>> {
        let records = self.record()?.items.clone();
        let total = records.len() as u64;
        let mut out: Vec<Arc<dyn Item>> = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            if let Some(report) = progress.as_deref_mut() {
                report(i as u64 + 1, total)?;
            }
            out.push(Arc::new(SnapshotItem {
                shared: self.shared.clone(),
                record,
            }));
            tokio::task::yield_now().await;
        }
        trace!(path = ?self.path, items = out.len(), "listed items");
        Ok(out)
    }
}

struct SnapshotItem {
    shared: Arc<Shared>,
    record: ItemRecord,
}

impl SnapshotItem {
    async fn body(&self) -> Result<String> {
        let r = &self.record;
        let packed =
            read_exact_at(self.shared.source.as_ref(), r.body_off, r.c_len, MAX_BODY_LEN).await?;
        if r.u_len > MAX_BODY_LEN {
            return Err(ViewError::Format(format!("body of {} bytes is too large", r.u_len)));
        }
        let u_len = usize::try_from(r.u_len)
            .map_err(|_| ViewError::Format(format!("body of {} bytes is too large", r.u_len)))?;
        let plain = codec::decompress(CodecId::try_from(r.codec)?, &packed, u_len)?;
        Ok(String::from_utf8_lossy(&plain).into_owned())
    }
}

#[async_trait]
impl Item for SnapshotItem {
    async fn display_name(&self) -> Result<String> {
        Ok(self.record.subject.clone())
    }

    fn message_class(&self) -> &str {
        &self.record.message_class
    }

    async fn to_eml(&self, _options: &ConvertOptions) -> Result<String> {
        self.body().await
    }

    async fn to_vcard(&self, _options: &ConvertOptions) -> Result<String> {
        if self.record.message_class != CONTACT_CLASS {
            return Err(ViewError::Format(format!(
                "{} is not a contact ({})",
                self.record.subject, self.record.message_class
            )));
        }
        self.body().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::RandomAccessReader;
    use crate::snapshot::sample::sample_mailbox;
    use crate::snapshot::writer::{WriteOptions, write_snapshot_to};
    use crate::source::MemoryBlockSource;
    use std::io::Cursor;

    fn snapshot_bytes() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        write_snapshot_to(&mut buf, &sample_mailbox(), &WriteOptions::default()).unwrap();
        buf.into_inner()
    }

    async fn open(bytes: Vec<u8>) -> Result<Arc<dyn Folder>> {
        let reader = RandomAccessReader::new(Arc::new(MemoryBlockSource::new(bytes)), 64).unwrap();
        SnapshotOpener
            .open(Arc::new(reader), &OpenOptions::default())
            .await
    }

    #[tokio::test]
    async fn items_report_progress_and_convert() {
        let root = open(snapshot_bytes()).await.unwrap();
        let inbox = root.sub_folders().await.unwrap().remove(0);
        assert_eq!(inbox.display_name().await.unwrap(), "Inbox");

        let mut seen = Vec::new();
        let mut record = |cur: u64, total: u64| -> Result<()> {
            seen.push((cur, total));
            Ok(())
        };
        let sink: &mut ProgressSink<'_> = &mut record;
        let items = inbox.items(Some(sink)).await.unwrap();
        let total = items.len() as u64;
        assert_eq!(seen.last(), Some(&(total, total)));

        let eml = items[0].to_eml(&ConvertOptions::default()).await.unwrap();
        assert!(eml.starts_with("From: "));
        assert!(items[0].to_vcard(&ConvertOptions::default()).await.is_err());
    }

    #[tokio::test]
    async fn progress_error_aborts_listing() {
        let root = open(snapshot_bytes()).await.unwrap();
        let inbox = root.sub_folders().await.unwrap().remove(0);
        let mut refuse = |_: u64, _: u64| -> Result<()> { Err(ViewError::Cancelled) };
        let sink: &mut ProgressSink<'_> = &mut refuse;
        let Err(err) = inbox.items(Some(sink)).await else {
            panic!("listing should fail");
        };
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn corrupt_manifest_is_a_format_error() {
        let mut bytes = snapshot_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(open(bytes).await, Err(ViewError::Format(_))));
    }

    #[tokio::test]
    async fn oversized_manifest_is_rejected_before_reading() {
        let mut bytes = Vec::new();
        Superblock {
            version: crate::snapshot::superblock::VERSION,
            manifest_off: HEADER_LEN,
            manifest_len: 1 << 62,
            manifest_blake3: [0u8; 32],
        }
        .write_to(&mut bytes)
        .unwrap();
        bytes.extend_from_slice(&[0u8; 64]);
        let src = MemoryBlockSource::new(bytes);
        let reader = RandomAccessReader::new(Arc::new(src.clone()), 64).unwrap();

        let Err(err) = SnapshotOpener
            .open(Arc::new(reader), &OpenOptions::default())
            .await
        else {
            panic!("open should fail");
        };
        assert!(matches!(err, ViewError::Format(_)));
        // only the header block was touched
        assert_eq!(src.fetches(), vec![0..64]);
    }

    #[tokio::test]
    async fn manifest_range_overflow_is_a_format_error() {
        let mut bytes = Vec::new();
        Superblock {
            version: crate::snapshot::superblock::VERSION,
            manifest_off: u64::MAX - 4,
            manifest_len: 16,
            manifest_blake3: [0u8; 32],
        }
        .write_to(&mut bytes)
        .unwrap();
        assert!(matches!(open(bytes).await, Err(ViewError::Format(_))));
    }

    #[tokio::test]
    async fn foreign_file_is_a_format_error() {
        let bytes = b"!BDN this is not a snapshot file at all, just text padding it out".to_vec();
        assert!(matches!(open(bytes).await, Err(ViewError::Format(_))));
    }
}
