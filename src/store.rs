//! Plain file access inside a single managed directory
//!
//! Every operation reads or writes whole files. There is no locking: two
//! writers racing on the same file leave whichever content landed last.

use crate::error::{PanelError, Result};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// A regular file found in a managed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub modified_at: DateTime<Utc>,
}

/// Check that `name` is a bare file name that stays inside the directory
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PanelError::invalid_name(name, "name cannot be empty"));
    }
    if name == "." || name == ".." {
        return Err(PanelError::invalid_name(name, "relative directory names are not allowed"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(PanelError::invalid_name(name, "path separators are not allowed"));
    }
    if name.contains('\0') {
        return Err(PanelError::invalid_name(name, "NUL bytes are not allowed"));
    }
    Ok(())
}

/// Reads, writes, deletes and lists files in one directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve a validated file name to its path
    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Read the full contents of a file as text
    pub async fn read(&self, name: &str) -> Result<String> {
        let path = self.path_of(name)?;
        tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => PanelError::NotFound(format!("file {}", name)),
            _ => PanelError::io(path, e),
        })
    }

    /// Write the full contents of a file, creating or truncating it
    pub async fn write(&self, name: &str, content: &str) -> Result<()> {
        let path = self.path_of(name)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| PanelError::io(path, e))?;
        debug!(name, bytes = content.len(), "File written");
        Ok(())
    }

    /// Remove a file
    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        tokio::fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => PanelError::NotFound(format!("file {}", name)),
            _ => PanelError::io(path, e),
        })?;
        debug!(name, "File removed");
        Ok(())
    }

    /// Rename a file within the directory, replacing any existing target
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.path_of(from)?;
        let to_path = self.path_of(to)?;
        tokio::fs::rename(&from_path, &to_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => PanelError::NotFound(format!("file {}", from)),
            _ => PanelError::io(from_path, e),
        })?;
        debug!(from, to, "File renamed");
        Ok(())
    }

    /// Whether a regular file with this name exists
    pub async fn exists(&self, name: &str) -> bool {
        match self.path_of(name) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// List every regular file with its modification time.
    ///
    /// Subdirectories and other non-regular entries are skipped. Symlinks are
    /// followed, so a link to a regular file is listed.
    pub async fn list(&self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| PanelError::io(&self.dir, e))?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| PanelError::io(&self.dir, e))?
        {
            let path = entry.path();
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!(name = ?raw, "Skipping non UTF-8 file name");
                    continue;
                }
            };

            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .map_err(|e| PanelError::io(&path, e))?;

            entries.push(FileEntry { name, modified_at });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("example.com.conf").is_ok());
        assert!(validate_name("nginx.conf").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("sub/file.conf").is_err());
        assert!(validate_name("sub\\file.conf").is_err());
        assert!(validate_name("bad\0name").is_err());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("a.conf", "server {}\n").await.unwrap();
        assert_eq!(store.read("a.conf").await.unwrap(), "server {}\n");
        assert!(store.exists("a.conf").await);
    }

    #[tokio::test]
    async fn test_write_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("a.conf", "a much longer first version").await.unwrap();
        store.write("a.conf", "short").await.unwrap();
        assert_eq!(store.read("a.conf").await.unwrap(), "short");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let err = store.read("missing.conf").await.unwrap_err();
        assert!(matches!(err, PanelError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("a.conf", "x").await.unwrap();
        store.delete("a.conf").await.unwrap();
        assert!(!store.exists("a.conf").await);

        let err = store.delete("a.conf").await.unwrap_err();
        assert!(matches!(err, PanelError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("a.conf.disabled", "x").await.unwrap();
        store.rename("a.conf.disabled", "a.conf").await.unwrap();
        assert!(store.exists("a.conf").await);
        assert!(!store.exists("a.conf.disabled").await);
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("a.conf", "a").await.unwrap();
        store.write("b.conf.disabled", "b").await.unwrap();
        std::fs::create_dir(dir.path().join("snippets")).unwrap();

        let mut names: Vec<String> = store.list().await.unwrap().into_iter().map(|e| e.name).collect();
        names.sort();
        assert_eq!(names, vec!["a.conf", "b.conf.disabled"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.write("ok.conf", "ok").await.unwrap();
        let raw = dir.path().join(OsStr::from_bytes(b"\xff.conf"));
        if std::fs::write(&raw, "bad").is_err() {
            // some filesystems refuse non UTF-8 names outright
            return;
        }

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["ok.conf"]);
    }

    #[tokio::test]
    async fn test_list_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nope"));

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, PanelError::Io { .. }));
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let err = store.write("../outside.conf", "x").await.unwrap_err();
        assert!(matches!(err, PanelError::InvalidName { .. }));
        assert!(!store.exists("..").await);
    }
}
