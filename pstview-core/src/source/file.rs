use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tracing::debug;

use super::BlockSource;
use crate::error::{Result, ViewError};

/// Block source over a local file; each fetch is a seek plus a bounded read.
pub struct FileBlockSource {
    path: PathBuf,
    len: u64,
    file: Mutex<Option<File>>,
}

impl FileBlockSource {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        debug!(path = %path.display(), len, "opened file block source");
        Ok(Self {
            path: path.to_path_buf(),
            len,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BlockSource for FileBlockSource {
    async fn fetch_block(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let end = end.min(self.len);
        if start >= end {
            return Ok(Vec::new());
        }
        let mut guard = self.file.lock().await;
        let f = guard.as_mut().ok_or(ViewError::Closed)?;
        f.seek(SeekFrom::Start(start)).await?;
        let mut buf = vec![0u8; (end - start) as usize];
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = f.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    async fn close(&self) -> Result<()> {
        if self.file.lock().await.take().is_some() {
            debug!(path = %self.path.display(), "closed file block source");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn fetch_is_clipped_to_file_length() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        let src = FileBlockSource::open(tmp.path()).await.unwrap();
        assert_eq!(src.len(), 10);
        assert_eq!(src.fetch_block(4, 8).await.unwrap(), b"4567");
        assert_eq!(src.fetch_block(8, 16).await.unwrap(), b"89");
        assert!(src.fetch_block(16, 32).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_after_close_fails() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"abc").unwrap();
        let src = FileBlockSource::open(tmp.path()).await.unwrap();
        src.close().await.unwrap();
        assert!(matches!(src.fetch_block(0, 3).await, Err(ViewError::Closed)));
    }
}
