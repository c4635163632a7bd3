//! Upload storage for pictures, videos and voice recordings.
//!
//! Uploaded bytes are written below a root directory and exposed under a
//! URL prefix. Stored names carry a BLAKE3 content prefix so that two
//! uploads with the same original name never overwrite each other.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::validation::FieldErrors;

/// Number of hex characters of the content hash kept in stored names.
const HASH_PREFIX_LEN: usize = 12;

/// Longest sanitised original name kept in stored names.
const MAX_NAME_LEN: usize = 100;

/// Sub-directory an upload is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFolder {
    /// Pictures and videos from doctors.
    Media,
    /// Voice recordings from kids.
    Voice,
}

impl UploadFolder {
    /// Directory name below the upload root.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Voice => "voice",
        }
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Path relative to the upload root, e.g. `voice/1a2b3c4d5e6f_hello.mp3`.
    pub file: String,
    /// Public URL the file is served under.
    pub url: String,
    /// Size in bytes.
    pub size: usize,
}

/// Destination for uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug {
    /// Persist an upload and report where it was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is empty, exceeds the size limit or
    /// cannot be written.
    async fn save(&self, folder: UploadFolder, original_name: &str, bytes: &[u8])
        -> Result<StoredFile>;

    /// Map a public URL produced by [`FileStore::save`] back to its stored path.
    fn file_for_url(&self, url: &str) -> Option<String>;
}

/// File store writing to the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    url_prefix: String,
    max_file_size: usize,
}

impl LocalFileStore {
    /// Create a store rooted at `root`, serving files under `url_prefix`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            max_file_size,
        }
    }

    /// The directory uploads are written below.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload root and its folders if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        for folder in [UploadFolder::Media, UploadFolder::Voice] {
            let dir = self.root.join(folder.as_str());
            std::fs::create_dir_all(&dir)
                .map_err(|source| Error::DirectoryCreate { path: dir, source })?;
        }
        info!("Upload root ready at {}", self.root.display());
        Ok(())
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(
        &self,
        folder: UploadFolder,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile> {
        if bytes.is_empty() {
            return Err(FieldErrors::single("file", "The submitted file is empty.").into());
        }
        if bytes.len() > self.max_file_size {
            return Err(Error::UploadTooLarge {
                size: bytes.len(),
                limit: self.max_file_size,
            });
        }

        let hash = blake3::hash(bytes).to_hex();
        let stored_name = format!(
            "{}_{}",
            &hash.as_str()[..HASH_PREFIX_LEN],
            sanitize_file_name(original_name)
        );
        let relative = format!("{}/{stored_name}", folder.as_str());

        let dir = self.root.join(folder.as_str());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: dir.clone(),
                source,
            })?;
        tokio::fs::write(dir.join(&stored_name), bytes).await?;

        debug!(file = %relative, size = bytes.len(), "Stored upload");
        Ok(StoredFile {
            url: format!("{}/{relative}", self.url_prefix),
            file: relative,
            size: bytes.len(),
        })
    }

    fn file_for_url(&self, url: &str) -> Option<String> {
        let relative = url.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        let mut parts = relative.split('/');
        let folder = parts.next()?;
        let name = parts.next()?;
        let valid = parts.next().is_none()
            && (folder == UploadFolder::Media.as_str() || folder == UploadFolder::Voice.as_str())
            && !name.is_empty()
            && !name.starts_with('.');
        valid.then(|| relative.to_string())
    }
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory components are dropped and anything outside
/// `[A-Za-z0-9._-]` becomes `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    let mut safe: String = trimmed.chars().take(MAX_NAME_LEN).collect();
    if safe.is_empty() {
        safe.push_str("upload");
    }
    safe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path, limit: usize) -> LocalFileStore {
        LocalFileStore::new(dir, "/media", limit)
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("hello.mp3"), "hello.mp3");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\kid\\my song.wav"), "my_song.wav");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name("ünï.png"), "_n_.png");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(300);
        assert_eq!(sanitize_file_name(&long).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_folder_names() {
        assert_eq!(UploadFolder::Media.as_str(), "media");
        assert_eq!(UploadFolder::Voice.as_str(), "voice");
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1024);

        let stored = store
            .save(UploadFolder::Voice, "hello.mp3", b"RIFF-data")
            .await
            .unwrap();

        assert!(stored.file.starts_with("voice/"));
        assert!(stored.file.ends_with("_hello.mp3"));
        assert_eq!(stored.url, format!("/media/{}", stored.file));
        assert_eq!(stored.size, 9);
        let on_disk = std::fs::read(dir.path().join(&stored.file)).unwrap();
        assert_eq!(on_disk, b"RIFF-data");
    }

    #[tokio::test]
    async fn test_same_name_different_content_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 1024);

        let first = store.save(UploadFolder::Media, "a.png", b"one").await.unwrap();
        let second = store.save(UploadFolder::Media, "a.png", b"two").await.unwrap();

        assert_ne!(first.file, second.file);
        assert!(dir.path().join(&first.file).exists());
        assert!(dir.path().join(&second.file).exists());
    }

    #[tokio::test]
    async fn test_save_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path(), 1024)
            .save(UploadFolder::Media, "a.png", b"")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_save_rejects_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path(), 4)
            .save(UploadFolder::Media, "a.png", b"12345")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UploadTooLarge { size: 5, limit: 4 }));
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        let store = store(&root, 1024);
        store.ensure_dirs().unwrap();
        assert!(root.join("media").is_dir());
        assert!(root.join("voice").is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[test]
    fn test_file_for_url() {
        let store = LocalFileStore::new("/tmp/x", "/media/", 10);
        assert_eq!(
            store.file_for_url("/media/voice/abc_hello.mp3"),
            Some("voice/abc_hello.mp3".to_string())
        );
        assert_eq!(store.file_for_url("https://cdn.example.com/a.png"), None);
        assert_eq!(store.file_for_url("/media/other/a.png"), None);
        assert_eq!(store.file_for_url("/media/voice/../secret"), None);
        assert_eq!(store.file_for_url("/media/voice/.."), None);
        assert_eq!(store.file_for_url("/mediavoice/a.png"), None);
    }
}
