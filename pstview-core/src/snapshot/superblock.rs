use std::io::{Read, Write};

pub const MAGIC: &[u8; 6] = b"MBXSNP";
pub const VERSION: u16 = 1;
/// magic + version + manifest_off + manifest_len + manifest_blake3
pub const HEADER_LEN: u64 = 6 + 2 + 8 + 8 + 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub version: u16,
    /// Absolute file offset of the CBOR manifest
    pub manifest_off: u64,
    /// Byte length of the manifest
    pub manifest_len: u64,
    pub manifest_blake3: [u8; 32],
}

impl Superblock {
    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&self.manifest_off.to_le_bytes())?;
        w.write_all(&self.manifest_len.to_le_bytes())?;
        w.write_all(&self.manifest_blake3)?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> std::io::Result<Self> {
        let mut magic = [0u8; 6];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "not a mailbox snapshot (bad magic)",
            ));
        }
        let mut v = [0u8; 2];
        r.read_exact(&mut v)?;
        let version = u16::from_le_bytes(v);
        if version != VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unsupported snapshot version {version}"),
            ));
        }
        let mut buf8 = [0u8; 8];
        r.read_exact(&mut buf8)?;
        let manifest_off = u64::from_le_bytes(buf8);
        r.read_exact(&mut buf8)?;
        let manifest_len = u64::from_le_bytes(buf8);
        let mut manifest_blake3 = [0u8; 32];
        r.read_exact(&mut manifest_blake3)?;
        Ok(Self {
            version,
            manifest_off,
            manifest_len,
            manifest_blake3,
        })
    }
}
