//! Top-level Nginx configuration files

use crate::error::Result;
use crate::store::FileStore;
use tracing::info;

/// Reads and replaces files in the main Nginx configuration directory
#[derive(Debug, Clone)]
pub struct MainConfig {
    store: FileStore,
}

impl MainConfig {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Names of the regular files in the directory, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        names.sort();
        Ok(names)
    }

    pub async fn read(&self, name: &str) -> Result<String> {
        self.store.read(name).await
    }

    /// Replace a configuration file with new content
    pub async fn write(&self, name: &str, content: &str) -> Result<()> {
        self.store.write(name, content).await?;
        info!(file = name, bytes = content.len(), "Main configuration updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;

    #[tokio::test]
    async fn test_list_read_write() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nginx.conf"), "events {}\n").unwrap();
        std::fs::write(dir.path().join("mime.types"), "types {}\n").unwrap();
        std::fs::create_dir(dir.path().join("conf.d")).unwrap();

        let config = MainConfig::new(FileStore::new(dir.path()));
        assert_eq!(config.list().await.unwrap(), vec!["mime.types", "nginx.conf"]);
        assert_eq!(config.read("nginx.conf").await.unwrap(), "events {}\n");

        config.write("nginx.conf", "worker_processes 2;\n").await.unwrap();
        assert_eq!(config.read("nginx.conf").await.unwrap(), "worker_processes 2;\n");
    }

    #[tokio::test]
    async fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = MainConfig::new(FileStore::new(dir.path()));

        assert!(matches!(
            config.read("nginx.conf").await.unwrap_err(),
            PanelError::NotFound(_)
        ));
    }
}
