use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pstview_core::browser::{EntryListState, items_count_label};
use pstview_core::config::OpenOptions;
use pstview_core::error::{Result, ViewError};
use pstview_core::snapshot::{WriteOptions, sample_mailbox, write_snapshot};
use pstview_core::{
    Backend, Browser, FileBlockSource, RandomAccessReader, SelectedFile, Subscription, throttle,
};
use tracing::{debug, info};

use crate::presentation::cli::OpenArgs;

/// Status lines are refreshed at most this often.
const STATUS_PERIOD: Duration = Duration::from_millis(333);

fn open_options(args: &OpenArgs) -> OpenOptions {
    OpenOptions {
        unit_size: args.unit_size,
        ..Default::default()
    }
}

/// An opened browser plus the status-line subscriptions feeding stderr.
struct Session {
    browser: Browser,
    status: Vec<Subscription>,
}

impl Session {
    async fn open(archive: &Path, args: &OpenArgs) -> Result<Self> {
        let browser = Browser::with_backend(Backend::Snapshot, open_options(args))?;
        browser.set_ansi_encoding(args.ansi_encoding.as_deref().unwrap_or(""))?;

        let status = vec![
            browser.disk_access().subscribe(throttle(STATUS_PERIOD, |s: &String| {
                debug!(target: "pstviewdev::status", "last disk access: {s}");
            })),
            browser.items_progress().subscribe(throttle(STATUS_PERIOD, |s: &String| {
                if !s.is_empty() {
                    eprint!("\rlisting items {s}");
                }
            })),
        ];

        browser.select_file(Some(SelectedFile::from_path(archive).await?));
        browser.open().await?;
        Ok(Self { browser, status })
    }

    async fn list(&self, folder: usize) -> Result<EntryListState> {
        let outcome = self.browser.select_folder(Some(folder)).await;
        eprint!("\r");
        outcome?;
        Ok(self.browser.entries().value())
    }

    async fn close(self) -> Result<()> {
        for sub in &self.status {
            sub.unsubscribe();
        }
        if let Some(stats) = self.browser.cache_stats() {
            debug!(?stats, "cache statistics");
        }
        self.browser.close().await
    }
}

pub fn handle_sample(out: PathBuf, deterministic: bool, min_gain: f32) -> Result<()> {
    let opts = WriteOptions {
        deterministic,
        min_gain,
    };
    write_snapshot(&out, &sample_mailbox(), &opts)?;
    info!(path = %out.display(), "sample snapshot written");
    Ok(())
}

pub async fn handle_folders(archive: PathBuf, args: &OpenArgs) -> Result<()> {
    let session = Session::open(&archive, args).await?;
    {
        let mut stdout = std::io::stdout().lock();
        for (i, row) in session.browser.folders().value().rows().iter().enumerate() {
            writeln!(stdout, "{i:>4}  {row}")?;
        }
    }
    session.close().await
}

pub async fn handle_entries(archive: PathBuf, folder: usize, args: &OpenArgs) -> Result<()> {
    let session = Session::open(&archive, args).await?;
    let state = session.list(folder).await?;
    if let Some(alert) = state.alert() {
        eprintln!("{alert}");
    }
    {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", items_count_label(state.entries().len()))?;
        for (i, entry) in state.entries().iter().enumerate() {
            writeln!(stdout, "{i:>4}  [{}] {}", entry.message_class, entry.display)?;
        }
    }
    session.close().await
}

pub async fn handle_show(
    archive: PathBuf,
    folder: usize,
    entry: usize,
    args: &OpenArgs,
) -> Result<()> {
    let session = Session::open(&archive, args).await?;
    let state = session.list(folder).await?;
    let chosen = state.entries().get(entry).ok_or_else(|| {
        ViewError::InvalidRequest(format!(
            "entry index {entry} out of range ({} entries)",
            state.entries().len()
        ))
    })?;
    session.browser.open_entry(chosen).await?;
    print!("{}", session.browser.preview().value());
    session.close().await
}

pub async fn handle_export(
    archive: PathBuf,
    folder: usize,
    dir: PathBuf,
    args: &OpenArgs,
) -> Result<()> {
    let session = Session::open(&archive, args).await?;
    session.list(folder).await?;
    std::fs::create_dir_all(&dir)?;
    let written = session.browser.export_entries(&dir).await?;
    info!(written, dir = %dir.display(), "export finished");
    session.close().await
}

pub async fn handle_cat(
    archive: PathBuf,
    start: u64,
    len: Option<u64>,
    args: &OpenArgs,
) -> Result<()> {
    let source = FileBlockSource::open(&archive).await?;
    let end = match len {
        Some(l) => start.saturating_add(l).min(source.len()),
        None => source.len(),
    };
    let reader = RandomAccessReader::new(Arc::new(source), args.unit_size)?;

    let mut out = std::io::stdout();
    let mut buf = vec![0u8; 64 * 1024];
    let mut pos = start;
    while pos < end {
        let n = buf.len().min((end - pos) as usize);
        reader.read(&mut buf, 0, n, pos).await?;
        out.write_all(&buf[..n])?;
        pos += n as u64;
    }
    out.flush()?;
    debug!(stats = ?reader.stats(), "cat finished");
    reader.close().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pstview_core::config::DEFAULT_UNIT_SIZE;
    use tempfile::tempdir;

    fn args() -> OpenArgs {
        OpenArgs {
            unit_size: 256,
            ansi_encoding: Some("windows1252".into()),
        }
    }

    #[tokio::test]
    async fn sample_then_export_contacts() {
        let dir = tempdir().unwrap();
        let snap = dir.path().join("sample.snap");
        handle_sample(snap.clone(), true, 0.05).unwrap();

        let session = Session::open(&snap, &args()).await.unwrap();
        let rows = session.browser.folders().value().rows();
        let contacts = rows.iter().position(|r| r == "* Contacts").unwrap();
        session.close().await.unwrap();

        let out = dir.path().join("export");
        handle_export(snap, contacts, out.clone(), &args()).await.unwrap();
        assert!(out.join("Ana Lima.vcf").exists());
        assert!(out.join("Wei Chen.vcf").exists());
    }

    #[tokio::test]
    async fn unknown_encoding_fails_before_opening() {
        let dir = tempdir().unwrap();
        let snap = dir.path().join("sample.snap");
        handle_sample(snap.clone(), true, 0.05).unwrap();
        let bad = OpenArgs {
            unit_size: DEFAULT_UNIT_SIZE,
            ansi_encoding: Some("ebcdic-klingon".into()),
        };
        let err = handle_folders(snap, &bad).await.unwrap_err();
        assert!(matches!(err, ViewError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn listing_a_missing_folder_is_an_error() {
        let dir = tempdir().unwrap();
        let snap = dir.path().join("sample.snap");
        handle_sample(snap.clone(), true, 0.05).unwrap();
        let session = Session::open(&snap, &args()).await.unwrap();
        let err = session.list(42).await.unwrap_err();
        assert!(matches!(err, ViewError::InvalidRequest(_)), "{err:?}");
    }
}
