//! Named firmware artifacts (board data, calibration data, INI and QDSS
//! configuration files).

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::lock;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Firmware file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Source of named firmware files.
pub trait BlobStore: Send + Sync {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, BlobError>;

    fn exists(&self, name: &str) -> bool {
        self.fetch(name).is_ok()
    }
}

/// Files under a firmware directory.
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for DirBlobStore {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.root.join(name);
        debug!(path = %path.display(), "Loading firmware file");
        std::fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BlobError::NotFound(name.to_string()),
            _ => BlobError::Io(e),
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.root.join(name).is_file()
    }
}

/// In-memory files, for tests and simulation.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        lock(&self.blobs).insert(name.into(), data.into());
    }

    pub fn remove(&self, name: &str) {
        lock(&self.blobs).remove(name);
    }
}

impl BlobStore for MemoryBlobStore {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        lock(&self.blobs)
            .get(name)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryBlobStore::new().with("bdwlan.bin", vec![1, 2, 3]);
        assert_eq!(store.fetch("bdwlan.bin").unwrap(), vec![1, 2, 3]);
        assert!(store.exists("bdwlan.bin"));
        assert!(matches!(
            store.fetch("caldata.bin"),
            Err(BlobError::NotFound(n)) if n == "caldata.bin"
        ));
    }

    #[test]
    fn test_dir_store_missing_file() {
        let store = DirBlobStore::new(std::env::temp_dir().join("wlfw-no-such-dir"));
        assert!(matches!(store.fetch("bdwlan.bin"), Err(BlobError::NotFound(_))));
        assert!(!store.exists("bdwlan.bin"));
    }

    #[test]
    fn test_dir_store_reads_file() {
        let dir = std::env::temp_dir().join(format!("wlfw-blob-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("regdb.bin"), b"regdb").unwrap();

        let store = DirBlobStore::new(&dir);
        assert_eq!(store.fetch("regdb.bin").unwrap(), b"regdb");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
