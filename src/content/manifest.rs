use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{ContentSource, read_document, validate_relative_path};
use crate::{RagError, Result};

/// Documents listed in a JSON manifest (an array of relative paths)
#[derive(Debug, Clone)]
pub struct ManifestSource {
    content_dir: PathBuf,
    manifest_path: PathBuf,
}

impl ManifestSource {
    #[inline]
    pub fn new(content_dir: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            manifest_path: manifest_path.into(),
        }
    }
}

#[async_trait]
impl ContentSource for ManifestSource {
    async fn list(&self) -> Result<Vec<String>> {
        let json = match tokio::fs::read_to_string(&self.manifest_path).await {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RagError::ContentSourceNotFound(self.manifest_path.clone()));
            }
            Err(e) => return Err(RagError::Io(e)),
        };

        let mut files: Vec<String> = serde_json::from_str(&json).map_err(|e| {
            RagError::ContentSource(format!(
                "Failed to parse manifest {}: {}",
                self.manifest_path.display(),
                e
            ))
        })?;

        for file in &files {
            validate_relative_path(file)?;
        }

        files.sort();
        files.dedup();
        debug!(
            "Manifest {} lists {} files",
            self.manifest_path.display(),
            files.len()
        );
        Ok(files)
    }

    async fn read(&self, relative_path: &str) -> Result<String> {
        validate_relative_path(relative_path)?;
        read_document(&self.content_dir.join(relative_path)).await
    }

    fn location(&self) -> String {
        format!(
            "{} (manifest {})",
            self.content_dir.display(),
            self.manifest_path.display()
        )
    }
}

/// Write the sorted list of documents in `source` to a JSON manifest
///
/// # Returns
/// * `Result<usize>` - Number of files written to the manifest
#[inline]
pub async fn write_manifest(source: &dyn ContentSource, output: &Path) -> Result<usize> {
    let files = source.list().await?;

    let mut json = serde_json::to_string_pretty(&files)
        .map_err(|e| RagError::ContentSource(format!("Failed to serialize manifest: {}", e)))?;
    json.push('\n');

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, json).await?;

    info!(
        "Discovered {} files in {} -> {}",
        files.len(),
        source.location(),
        output.display()
    );
    Ok(files.len())
}
