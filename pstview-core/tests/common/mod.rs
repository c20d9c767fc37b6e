#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use pstview_core::archive::{ArchiveOpener, ArchiveSource, ConvertOptions, Folder, Item, ProgressSink};
use pstview_core::config::OpenOptions;
use pstview_core::{Result, SelectedFile, MemoryBlockSource};
use tokio::sync::Notify;

/// Parks a listing after its first item until `release` is notified.
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

pub struct FakeFolder {
    pub name: &'static str,
    pub children: Vec<Arc<dyn Folder>>,
    pub items: Vec<(&'static str, &'static str)>,
    pub gate: Option<Gate>,
}

impl FakeFolder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            children: Vec::new(),
            items: Vec::new(),
            gate: None,
        }
    }

    pub fn child(mut self, folder: FakeFolder) -> Self {
        self.children.push(Arc::new(folder));
        self
    }

    pub fn note(mut self, subject: &'static str) -> Self {
        self.items.push((subject, "IPM.Note"));
        self
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Folder for FakeFolder {
    async fn display_name(&self) -> Result<String> {
        Ok(self.name.to_owned())
    }

    async fn sub_folders(&self) -> Result<Vec<Arc<dyn Folder>>> {
        Ok(self.children.clone())
    }

    async fn items(
        &self,
        mut progress: Option<&mut ProgressSink<'_>>,
    ) -> Result<Vec<Arc<dyn Item>>> {
        let total = self.items.len() as u64;
        let mut out: Vec<Arc<dyn Item>> = Vec::new();
        for (i, (subject, class)) in self.items.iter().copied().enumerate() {
            if let Some(report) = progress.as_deref_mut() {
                report(i as u64 + 1, total)?;
            }
            out.push(Arc::new(FakeItem { subject, class }));
            if i == 0 {
                if let Some(gate) = &self.gate {
                    gate.entered.notify_one();
                    gate.release.notified().await;
                }
            }
        }
        Ok(out)
    }
}

pub struct FakeItem {
    subject: &'static str,
    class: &'static str,
}

#[async_trait]
impl Item for FakeItem {
    async fn display_name(&self) -> Result<String> {
        Ok(self.subject.to_owned())
    }

    fn message_class(&self) -> &str {
        self.class
    }

    async fn to_eml(&self, _options: &ConvertOptions) -> Result<String> {
        Ok(format!("Subject: {}\r\n\r\n", self.subject))
    }

    async fn to_vcard(&self, _options: &ConvertOptions) -> Result<String> {
        Ok(format!("BEGIN:VCARD\r\nFN:{}\r\nEND:VCARD\r\n", self.subject))
    }
}

/// Hands out a fixed tree after touching the first bytes of the source.
pub struct FakeOpener {
    pub root: Arc<dyn Folder>,
}

#[async_trait]
impl ArchiveOpener for FakeOpener {
    async fn open(
        &self,
        source: Arc<dyn ArchiveSource>,
        _options: &OpenOptions,
    ) -> Result<Arc<dyn Folder>> {
        let mut magic = [0u8; 4];
        source.read(&mut magic, 0, 4, 0).await?;
        Ok(self.root.clone())
    }
}

pub fn dummy_file() -> SelectedFile {
    SelectedFile::new("dummy.pst", Arc::new(MemoryBlockSource::new(vec![0u8; 64])))
}
