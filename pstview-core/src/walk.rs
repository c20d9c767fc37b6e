use std::sync::Arc;

use tracing::debug;

use crate::archive::Folder;
use crate::config::DEFAULT_MAX_FOLDER_DEPTH;
use crate::domain::FolderDescriptor;
use crate::error::{Result, ViewError};

pub const DEFAULT_DEPTH_MARKER: &str = "*";

/// Flattens an archive's folder hierarchy, depth-first pre-order.
#[derive(Clone, Debug)]
pub struct FolderTreeWalker {
    marker: String,
    max_depth: usize,
}

impl Default for FolderTreeWalker {
    fn default() -> Self {
        Self {
            marker: DEFAULT_DEPTH_MARKER.to_owned(),
            max_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}

impl FolderTreeWalker {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Errors from the archive propagate; traversal stops at the first one.
    pub async fn walk(&self, root: Arc<dyn Folder>) -> Result<Vec<FolderDescriptor>> {
        let mut out = Vec::new();
        // Explicit stack: archive depth is untrusted input.
        let mut stack: Vec<(Arc<dyn Folder>, usize)> = vec![(root, 0)];
        while let Some((folder, depth)) = stack.pop() {
            if depth > self.max_depth {
                return Err(ViewError::Format(format!(
                    "folder hierarchy deeper than {} levels",
                    self.max_depth
                )));
            }
            let name = folder.display_name().await?;
            let children = folder.sub_folders().await?;
            out.push(FolderDescriptor::new(
                name,
                depth,
                self.marker.repeat(depth),
                folder,
            ));
            for child in children.into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        debug!(folders = out.len(), "walked folder tree");
        Ok(out)
    }
}
