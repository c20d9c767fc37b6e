use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use time::OffsetDateTime;
use tracing::debug;

use super::codec::{self, CodecId};
use super::manifest::{FolderRecord, ItemRecord, Manifest, Meta};
use super::superblock::{HEADER_LEN, Superblock, VERSION};
use crate::error::Result;

/// In-memory description of a folder to be written.
#[derive(Clone, Debug, Default)]
pub struct FolderSpec {
    pub name: String,
    pub items: Vec<ItemSpec>,
    pub folders: Vec<FolderSpec>,
}

impl FolderSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn item(mut self, item: ItemSpec) -> Self {
        self.items.push(item);
        self
    }

    pub fn folder(mut self, folder: FolderSpec) -> Self {
        self.folders.push(folder);
        self
    }
}

#[derive(Clone, Debug)]
pub struct ItemSpec {
    pub subject: String,
    pub message_class: String,
    /// Rendered text: RFC 822 for messages, vCard for contacts.
    pub body: String,
}

impl ItemSpec {
    pub fn new(
        subject: impl Into<String>,
        message_class: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            message_class: message_class.into(),
            body: body.into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    /// When true, zero the creation timestamp for reproducible output.
    pub deterministic: bool,
    /// Only accept compression if it saves at least this fraction.
    pub min_gain: f32, // 0.05 if left as 0.0
}

fn effective_min_gain(opts: &WriteOptions) -> f32 {
    if opts.min_gain <= 0.0 { 0.05 } else { opts.min_gain }
}

struct BodyWriter<'a, W: Write> {
    out: &'a mut W,
    pos: u64,
    min_gain: f32,
}

impl<W: Write> BodyWriter<'_, W> {
    fn folder(&mut self, src: &FolderSpec) -> Result<FolderRecord> {
        let mut items = Vec::with_capacity(src.items.len());
        for item in &src.items {
            items.push(self.item(item)?);
        }
        let mut folders = Vec::with_capacity(src.folders.len());
        for child in &src.folders {
            folders.push(self.folder(child)?);
        }
        Ok(FolderRecord {
            name: src.name.clone(),
            items,
            folders,
        })
    }

    fn item(&mut self, src: &ItemSpec) -> Result<ItemRecord> {
        let plain = src.body.as_bytes();
        let packed = codec::compress(CodecId::Zstd, plain, 3)?;
        let (codec, bytes) = if codec::should_compress(plain.len(), packed.len(), self.min_gain) {
            (CodecId::Zstd, &packed[..])
        } else {
            (CodecId::Store, plain)
        };
        self.out.write_all(bytes)?;
        let record = ItemRecord {
            subject: src.subject.clone(),
            message_class: src.message_class.clone(),
            codec: codec as u8,
            body_off: self.pos,
            c_len: bytes.len() as u64,
            u_len: plain.len() as u64,
        };
        self.pos += bytes.len() as u64;
        Ok(record)
    }
}

/// Layout: superblock, item bodies, CBOR manifest. The superblock is patched
/// last, once the manifest position and checksum are known.
pub fn write_snapshot_to<W: Write + Seek>(
    out: &mut W,
    root: &FolderSpec,
    opts: &WriteOptions,
) -> Result<()> {
    out.seek(SeekFrom::Start(0))?;
    Superblock {
        version: VERSION,
        manifest_off: 0,
        manifest_len: 0,
        manifest_blake3: [0u8; 32],
    }
    .write_to(&mut *out)?;

    let mut bodies = BodyWriter {
        out: &mut *out,
        pos: HEADER_LEN,
        min_gain: effective_min_gain(opts),
    };
    let root = bodies.folder(root)?;
    let manifest_off = bodies.pos;

    let created = if opts.deterministic {
        0
    } else {
        OffsetDateTime::now_utc().unix_timestamp()
    };
    let manifest = Manifest {
        root,
        meta: Meta {
            created,
            tool: concat!("pstview-core/", env!("CARGO_PKG_VERSION")).to_string(),
        },
    };
    let mut manifest_buf = Vec::new();
    ciborium::ser::into_writer(&manifest, &mut manifest_buf)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    out.write_all(&manifest_buf)?;

    out.seek(SeekFrom::Start(0))?;
    Superblock {
        version: VERSION,
        manifest_off,
        manifest_len: manifest_buf.len() as u64,
        manifest_blake3: *blake3::hash(&manifest_buf).as_bytes(),
    }
    .write_to(&mut *out)?;
    out.flush()?;
    debug!(manifest_off, manifest_len = manifest_buf.len(), "snapshot written");
    Ok(())
}

pub fn write_snapshot(path: &Path, root: &FolderSpec, opts: &WriteOptions) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_snapshot_to(&mut out, root, opts)?;
    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(())
}
