//! Artifact-store seam.
//!
//! The pure pipeline never writes to disk; verdict artifacts go out
//! through this interface once the computation has finished. The bundled
//! [`DirectoryStore`] writes PNGs under `base/root/sub/`.

use std::path::{Path, PathBuf};

use image::DynamicImage;

/// Artifact persistence failure.
#[derive(Debug)]
pub enum StorageError {
    /// Directory creation failed.
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Encoding or writing an image failed.
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateDir { path, source } => {
                write!(f, "failed to create {}: {source}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Write { source, .. } => Some(source),
        }
    }
}

/// Persistent sink for inspection artifacts.
pub trait ArtifactStore {
    /// Save `images` under the `root/sub` category with the paired
    /// `names`. Extra names (or images) beyond the shorter list are
    /// ignored.
    fn save(
        &self,
        root: &str,
        sub: &str,
        images: &[DynamicImage],
        names: &[&str],
    ) -> Result<(), StorageError>;
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    base: PathBuf,
}

impl DirectoryStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl ArtifactStore for DirectoryStore {
    fn save(
        &self,
        root: &str,
        sub: &str,
        images: &[DynamicImage],
        names: &[&str],
    ) -> Result<(), StorageError> {
        let dir = self.base.join(root).join(sub);
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        for (image, name) in images.iter().zip(names.iter()) {
            let path = dir.join(name);
            image
                .save(&path)
                .map_err(|source| StorageError::Write { path, source })?;
        }
        Ok(())
    }
}
