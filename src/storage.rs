//! File storage boundary for uploaded documents.
//!
//! References are relative, slash-separated paths such as
//! `ocr/<player_id>/<millis>-<uuid>.pdf`. The local implementation maps
//! them under a root directory and refuses anything that would leave it.
//! An existing file is never replaced.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),
}

/// `<millis>-<nonce>.<ext>`, keeping the last extension of `filename`.
pub fn stored_name(filename: &str, millis: i64, nonce: &Uuid) -> String {
    let ext = filename.rsplit('.').next().unwrap_or(filename);
    format!("{millis}-{nonce}.{ext}")
}

pub trait FileStore: Send + Sync {
    /// Store `bytes` at `path`. Fails with `AlreadyExists` if the path is
    /// taken. Returns the reference to use for later access.
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError>;

    fn download(&self, reference: &str) -> Result<Vec<u8>, StorageError>;

    fn delete(&self, reference: &str) -> Result<(), StorageError>;
}

/// Directory-backed store.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(reference);
        if reference.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for LocalFileStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes)?;
        tracing::debug!(path, size = bytes.len(), "File stored");
        Ok(path.to_string())
    }

    fn download(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(reference)?;
        match std::fs::read(&target) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let target = self.resolve(reference)?;
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
