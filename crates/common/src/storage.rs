//! Local file storage for uploaded files and generated reports.

use std::path::PathBuf;

use ulid::Ulid;

use crate::{AppError, AppResult};

/// Metadata for a stored file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Storage key relative to the storage root.
    pub key: String,
    /// Filesystem path of the stored file.
    pub path: PathBuf,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write a file, creating parent directories as needed.
    async fn write(&self, key: &str, data: &[u8]) -> AppResult<StoredFile>;

    /// Read a file's contents.
    async fn read(&self, key: &str) -> AppResult<Vec<u8>>;

    /// Delete a file. Deleting a missing file is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Filesystem-backed storage rooted at a base directory.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Store files under `base_path`, serving them at `base_url`.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn write(&self, key: &str, data: &[u8]) -> AppResult<StoredFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        Ok(StoredFile {
            key: key.to_string(),
            path,
            url: self.public_url(key),
            size: data.len() as u64,
        })
    }

    async fn read(&self, key: &str) -> AppResult<Vec<u8>> {
        let path = self.base_path.join(key);
        tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read file: {e}")))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if path.exists() {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.base_path.join(key);
        Ok(path.exists())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// Generate a unique storage key for an uploaded file.
///
/// The original file name contributes only its extension; the stored name is
/// a fresh ULID so client-supplied names never reach the filesystem.
#[must_use]
pub fn generate_storage_key(dir: &str, original_name: &str) -> String {
    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| original_name[pos + 1..].to_lowercase())
        .filter(|ext| ext.len() <= 10 && !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string());

    format!(
        "{}/{}.{}",
        dir.trim_matches('/'),
        Ulid::new().to_string().to_lowercase(),
        extension
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("temp", "products.CSV");
        assert!(key.starts_with("temp/"));
        assert!(key.ends_with(".csv"));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key("temp", "file");
        assert!(key.ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_local_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), "/uploads".to_string());

        let stored = storage.write("reports/out.csv", b"a,b\n1,2\n").await.unwrap();
        assert_eq!(stored.url, "/uploads/reports/out.csv");
        assert_eq!(stored.size, 8);
        assert!(stored.path.exists());

        assert!(storage.exists("reports/out.csv").await.unwrap());
        let data = storage.read("reports/out.csv").await.unwrap();
        assert_eq!(data, b"a,b\n1,2\n");

        storage.delete("reports/out.csv").await.unwrap();
        assert!(!storage.exists("reports/out.csv").await.unwrap());

        // Deleting again is a no-op
        storage.delete("reports/out.csv").await.unwrap();
    }
}
