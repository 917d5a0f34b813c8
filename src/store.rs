use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use crate::ignore::IgnoreSet;
use crate::types::{FileArtifact, Fingerprint, FolderArtifact, StoreError};

/// Name of the aggregated artifact inside each mirrored folder.
pub const FOLDER_ARTIFACT_NAME: &str = "summary.json";

const TMP_SUFFIX: &str = ".tmp";

/// JSON artifact tree mirroring the input tree.
///
/// Owns all artifact IO: path mapping, reads, and writes. Writes are atomic
/// (temp file + rename in the same directory) and serialized per artifact
/// path, so two source files that map to the same artifact path cannot
/// interleave and a reader never observes a half-written file.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

/// One directory entry of the output tree, as seen by aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: ChildKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    File,
    Folder,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifact path for a source file: mirrored location with the last
    /// extension swapped for `.json` (extensionless names get `.json`
    /// appended).
    pub fn file_artifact_path(&self, rel: &Path) -> PathBuf {
        self.root.join(rel).with_extension("json")
    }

    /// Artifact path for a folder: `summary.json` inside its mirror.
    pub fn folder_artifact_path(&self, rel: &Path) -> PathBuf {
        self.root.join(rel).join(FOLDER_ARTIFACT_NAME)
    }

    /// The `checksum` field of whatever artifact sits at `path`, regardless
    /// of artifact kind. `None` when the file is absent or unreadable; the
    /// unreadable case is logged because it means a damaged output tree.
    pub async fn read_checksum(&self, path: &Path) -> Option<Fingerprint> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("could not read artifact {}: {}", path.display(), e);
                return None;
            }
        };
        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!("corrupt artifact {}: {}", path.display(), e);
                return None;
            }
        };
        value
            .get("checksum")
            .and_then(|c| c.as_str())
            .map(|c| Fingerprint::from_hex(c.to_string()))
    }

    pub async fn read_file_artifact(&self, path: &Path) -> Result<FileArtifact, StoreError> {
        self.read_json(path).await
    }

    pub async fn read_folder_artifact(&self, path: &Path) -> Result<FolderArtifact, StoreError> {
        self.read_json(path).await
    }

    pub async fn write_file_artifact(
        &self,
        path: &Path,
        artifact: &FileArtifact,
    ) -> Result<(), StoreError> {
        self.write_json(path, artifact).await
    }

    pub async fn write_folder_artifact(
        &self,
        path: &Path,
        artifact: &FolderArtifact,
    ) -> Result<(), StoreError> {
        self.write_json(path, artifact).await
    }

    /// Direct children of an output directory, sorted by name, with ignored
    /// names, in-progress temp files, and the directory's own `summary.json`
    /// filtered out.
    pub async fn list_children(
        &self,
        dir: &Path,
        ignore: &IgnoreSet,
    ) -> Result<Vec<ChildEntry>, StoreError> {
        let mut entries = Vec::new();
        let mut reader = fs::read_dir(dir).await.map_err(|e| StoreError::Io {
            action: "list",
            path: dir.to_path_buf(),
            source: e,
        })?;
        while let Some(entry) = reader.next_entry().await.map_err(|e| StoreError::Io {
            action: "list",
            path: dir.to_path_buf(),
            source: e,
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == FOLDER_ARTIFACT_NAME || name.ends_with(TMP_SUFFIX) || ignore.is_ignored(&name)
            {
                continue;
            }
            let path = entry.path();
            let meta = fs::metadata(&path).await.map_err(|e| StoreError::Io {
                action: "stat",
                path: path.clone(),
                source: e,
            })?;
            let kind = if meta.is_dir() {
                ChildKind::Folder
            } else {
                ChildKind::File
            };
            entries.push(ChildEntry { name, path, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = fs::read(path).await.map_err(|e| StoreError::Io {
            action: "read",
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let lock = self
            .locks
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| StoreError::Io {
                action: "create directory for",
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Encode {
            path: path.to_path_buf(),
            source: e,
        })?;
        let tmp = tmp_path(path);
        fs::write(&tmp, &json).await.map_err(|e| StoreError::Io {
            action: "write",
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).await.map_err(|e| StoreError::Io {
            action: "rename",
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(TMP_SUFFIX);
    PathBuf::from(os)
}
