use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use super::{ContentSource, read_document, to_manifest_path, validate_relative_path};
use crate::{RagError, Result};

/// Recursively collects files with one extension below a root directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extension: String,
}

impl DirectorySource {
    #[inline]
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }
}

fn list_files(root: &Path, extension: &str) -> Result<Vec<String>> {
    match std::fs::metadata(root) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RagError::ContentSourceNotFound(root.to_path_buf()));
        }
        Err(e) => return Err(RagError::Io(e)),
        Ok(metadata) if !metadata.is_dir() => {
            return Err(RagError::ContentSource(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(_) => {}
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| RagError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(OsStr::to_str) != Some(extension) {
            continue;
        }

        let relative = path.strip_prefix(root).map_err(|e| {
            RagError::ContentSource(format!(
                "{} is outside {}: {}",
                path.display(),
                root.display(),
                e
            ))
        })?;
        files.push(to_manifest_path(relative));
    }

    files.sort();
    debug!(
        "Found {} .{} files below {}",
        files.len(),
        extension,
        root.display()
    );
    Ok(files)
}

#[async_trait]
impl ContentSource for DirectorySource {
    async fn list(&self) -> Result<Vec<String>> {
        let root = self.root.clone();
        let extension = self.extension.clone();
        tokio::task::spawn_blocking(move || list_files(&root, &extension))
            .await
            .map_err(|e| RagError::ContentSource(format!("Directory scan failed: {}", e)))?
    }

    async fn read(&self, relative_path: &str) -> Result<String> {
        validate_relative_path(relative_path)?;
        read_document(&self.root.join(relative_path)).await
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
