// Content sources
// Enumerate the documents that make up the knowledge base

pub mod directory;
pub mod manifest;


use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{RagError, Result};

pub use directory::DirectorySource;
pub use manifest::{ManifestSource, write_manifest};

const DEFAULT_CONTENT_DIR: &str = "./content";
const DEFAULT_MANIFEST: &str = "./content.json";
const DEFAULT_EXTENSION: &str = "md";

/// Provides `(relative_path, text)` documents for ingestion
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Relative paths of every document, sorted.
    ///
    /// Returns [`RagError::ContentSourceNotFound`] when the source itself does
    /// not exist. Any other failure is returned as-is.
    async fn list(&self) -> Result<Vec<String>>;

    /// Read one document by the relative path returned from [`ContentSource::list`]
    async fn read(&self, relative_path: &str) -> Result<String>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}

/// Where the knowledge base comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentConfig {
    /// Every file with the given extension below `path`, recursively
    Directory {
        path: PathBuf,
        #[serde(default = "default_extension")]
        extension: String,
    },
    /// Files listed in a JSON manifest, relative to `path`
    Manifest {
        path: PathBuf,
        #[serde(default = "default_manifest")]
        manifest: PathBuf,
    },
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_manifest() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST)
}

impl Default for ContentConfig {
    #[inline]
    fn default() -> Self {
        Self::Directory {
            path: PathBuf::from(DEFAULT_CONTENT_DIR),
            extension: default_extension(),
        }
    }
}

impl ContentConfig {
    /// The directory documents are read from
    #[inline]
    pub fn content_dir(&self) -> &Path {
        match self {
            Self::Directory { path, .. } | Self::Manifest { path, .. } => path,
        }
    }

    /// File extension to discover; manifests fall back to the default
    #[inline]
    pub fn extension(&self) -> &str {
        match self {
            Self::Directory { extension, .. } => extension,
            Self::Manifest { .. } => DEFAULT_EXTENSION,
        }
    }

    /// Manifest file to read or write; directories fall back to the default
    #[inline]
    pub fn manifest_path(&self) -> PathBuf {
        match self {
            Self::Directory { .. } => default_manifest(),
            Self::Manifest { manifest, .. } => manifest.clone(),
        }
    }

    #[inline]
    pub fn source(&self) -> Box<dyn ContentSource> {
        match self {
            Self::Directory { path, extension } => {
                Box::new(DirectorySource::new(path.clone(), extension.clone()))
            }
            Self::Manifest { path, manifest } => {
                Box::new(ManifestSource::new(path.clone(), manifest.clone()))
            }
        }
    }
}

/// Documents held in memory, keyed by relative path
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: BTreeMap<String, String>,
}

impl MemorySource {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_document(
        mut self,
        relative_path: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.documents.insert(relative_path.into(), text.into());
        self
    }
}

impl<P: Into<String>, T: Into<String>> FromIterator<(P, T)> for MemorySource {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        Self {
            documents: iter
                .into_iter()
                .map(|(path, text)| (path.into(), text.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.documents.keys().cloned().collect())
    }

    async fn read(&self, relative_path: &str) -> Result<String> {
        self.documents.get(relative_path).cloned().ok_or_else(|| {
            RagError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such document", relative_path),
            ))
        })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Render a relative path with `/` separators regardless of platform
pub(crate) fn to_manifest_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .join("/")
}

/// Reject paths that would escape the content directory
pub(crate) fn validate_relative_path(relative_path: &str) -> Result<()> {
    let path = Path::new(relative_path);
    let escapes = relative_path.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if escapes {
        return Err(RagError::ContentSource(format!(
            "Invalid document path '{}': must be relative to the content directory",
            relative_path
        )));
    }
    Ok(())
}

/// Read a document, keeping the error kind and naming the file
pub(crate) async fn read_document(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RagError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))
}
