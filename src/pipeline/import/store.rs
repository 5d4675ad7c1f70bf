use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::ImportError;

/// Flat directory holding the uploaded PDFs, keyed by sanitized filename.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ImportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_for(filename).is_file()
    }

    /// Write a new upload. Never overwrites an existing file.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ImportError> {
        let path = self.path_for(filename);
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ImportError::AlreadyExists(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        std::io::Write::write_all(&mut file, bytes)?;
        info!(filename, size = bytes.len(), "Stored upload");
        Ok(path)
    }

    /// Remove a stored file. Returns false when it was already gone.
    pub fn remove(&self, filename: &str) -> Result<bool, ImportError> {
        match std::fs::remove_file(self.path_for(filename)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(filename, "Upload already removed");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
