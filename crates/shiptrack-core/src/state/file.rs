// # File Tracked Store
//
// JSON-file implementation of TrackedStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write to `<path>.tmp`, then rename over the real file
// - Backup: the previous file is copied to `<path>.backup` before each write
// - Recovery: a file that fails to parse is replaced by its backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "packages": {
//     "S24DEMO456393": {
//       "tracking_number": "S24DEMO456393",
//       "custom_name": "Shoes",
//       "added_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::tracked_store::{TrackedPackage, TrackedStore};

/// Store file format version
const STORE_FILE_VERSION: &str = "1.0";

/// File-backed tracked store
///
/// Every mutation is written through to disk while the state lock is
/// held; a failed write leaves memory unchanged.
#[derive(Debug)]
pub struct FileTrackedStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    packages: BTreeMap<String, TrackedPackage>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    packages: BTreeMap<String, TrackedPackage>,
}

impl FileTrackedStore {
    /// Open or create a file store at `path`
    ///
    /// Parent directories are created if needed. A corrupted file is
    /// recovered from its backup; if the backup is unusable too the store
    /// starts empty.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let packages = Self::load_with_recovery(&path).await?;
        tracing::debug!(
            "Opened tracked store {} ({} packages)",
            path.display(),
            packages.len()
        );

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                packages,
            })),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<BTreeMap<String, TrackedPackage>, Error> {
        match Self::load(path).await {
            Ok(packages) => Ok(packages),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Tracked store {} is corrupted: {}. Trying backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty tracked set.");
                    return Ok(BTreeMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(packages) => {
                        tracing::info!("Recovered {} packages from backup", packages.len());
                        if let Err(e) = fs::copy(&backup_path, path).await {
                            tracing::error!("Failed to restore store file from backup: {}", e);
                        }
                        Ok(packages)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with empty tracked set.",
                            backup_err
                        );
                        Ok(BTreeMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<BTreeMap<String, TrackedPackage>, Error> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let file: StoreFileFormat = serde_json::from_str(&content)?;

        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Tracked store version mismatch: expected {}, got {}. Loading anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.packages)
    }

    /// Write `packages` to disk
    ///
    /// Callers hold the state write lock for the whole call, so only one
    /// writer touches the temp file at a time.
    async fn persist(&self, packages: &BTreeMap<String, TrackedPackage>) -> Result<(), Error> {
        let file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            packages: packages.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!("Failed to create {}: {}", temp_path.display(), e))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!("Failed to write {}: {}", temp_path.display(), e))
            })?;
            file.flush().await.map_err(|e| {
                Error::store(format!("Failed to flush {}: {}", temp_path.display(), e))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Tracked store written: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl TrackedStore for FileTrackedStore {
    async fn get_package(&self, tracking_number: &str) -> Result<Option<TrackedPackage>, Error> {
        Ok(self.state.read().await.packages.get(tracking_number).cloned())
    }

    async fn set_package(&self, package: &TrackedPackage) -> Result<(), Error> {
        let mut guard = self.state.write().await;
        let previous = guard
            .packages
            .insert(package.tracking_number.clone(), package.clone());

        match self.persist(&guard.packages).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Memory must not claim what the file does not hold
                match previous {
                    Some(previous) => {
                        guard.packages.insert(package.tracking_number.clone(), previous);
                    }
                    None => {
                        guard.packages.remove(&package.tracking_number);
                    }
                }
                Err(e)
            }
        }
    }

    async fn delete_package(&self, tracking_number: &str) -> Result<(), Error> {
        let mut guard = self.state.write().await;
        let Some(previous) = guard.packages.remove(tracking_number) else {
            return Ok(());
        };

        match self.persist(&guard.packages).await {
            Ok(()) => Ok(()),
            Err(e) => {
                guard.packages.insert(tracking_number.to_string(), previous);
                Err(e)
            }
        }
    }

    async fn list_packages(&self) -> Result<Vec<TrackedPackage>, Error> {
        Ok(self.state.read().await.packages.values().cloned().collect())
    }

    /// Writes the current set again if the file has gone missing
    async fn flush(&self) -> Result<(), Error> {
        let guard = self.state.write().await;
        if !self.path.exists() && !guard.packages.is_empty() {
            self.persist(&guard.packages).await?;
        }
        Ok(())
    }
}
