use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::ignore::IgnoreSet;
use crate::types::WalkError;

/// A text file delivered to the file hook. `content` is the full decoded
/// file; the walker reads each file exactly once.
#[derive(Debug, Clone)]
pub struct FileVisit {
    pub file_name: String,
    pub rel_path: PathBuf,
    pub abs_path: PathBuf,
    pub content: String,
}

/// A directory delivered to the folder hook once its whole subtree has been
/// visited. The walk root itself is never delivered.
#[derive(Debug, Clone)]
pub struct FolderVisit {
    pub folder_name: String,
    pub rel_path: PathBuf,
    pub abs_path: PathBuf,
}

#[async_trait]
pub trait FileHandler: Send + Sync {
    /// Handlers own their failure handling; nothing they do can abort the
    /// walk.
    async fn on_file(&self, visit: FileVisit);
}

#[async_trait]
pub trait FolderHandler: Send + Sync {
    async fn on_folder(&self, visit: FolderVisit);
}

/// Hook set for one traversal pass. Either hook may be absent; files are not
/// even read when no file hook is installed.
#[derive(Clone, Default)]
pub struct TraversalHooks {
    pub on_file: Option<Arc<dyn FileHandler>>,
    pub on_folder: Option<Arc<dyn FolderHandler>>,
}

/// Post-order directory walker.
///
/// Per directory: ignored names are pruned, the rest visited in sorted name
/// order. Subfolders go first, siblings concurrently, each firing the folder
/// hook only after its own subtree completed; then the directory's files,
/// also concurrently, each read once and checked for UTF-8 (binary files are
/// skipped without a callback). A missing walk root is a no-op, and entries
/// that cannot be statted (dangling symlinks) are skipped; a directory
/// listing or file read failure aborts the whole walk.
pub struct Walker {
    shared: Arc<WalkShared>,
}

struct WalkShared {
    ignore: IgnoreSet,
    hooks: TraversalHooks,
}

impl Walker {
    pub fn new(ignore: IgnoreSet, hooks: TraversalHooks) -> Self {
        Self {
            shared: Arc::new(WalkShared { ignore, hooks }),
        }
    }

    pub async fn walk(&self, root: &Path) -> Result<(), WalkError> {
        match fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                warn!("walk root {} is not a directory, nothing to do", root.display());
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("walk root {} does not exist, nothing to do", root.display());
                return Ok(());
            }
            Err(e) => {
                return Err(WalkError::Stat {
                    path: root.to_path_buf(),
                    source: e,
                })
            }
        }
        visit_dir(self.shared.clone(), root.to_path_buf(), PathBuf::new()).await
    }
}

fn visit_dir(
    shared: Arc<WalkShared>,
    dir: PathBuf,
    rel: PathBuf,
) -> BoxFuture<'static, Result<(), WalkError>> {
    Box::pin(async move {
        let mut entries: Vec<(String, bool)> = Vec::new();
        let mut reader = fs::read_dir(&dir).await.map_err(|e| WalkError::List {
            path: dir.clone(),
            source: e,
        })?;
        while let Some(entry) = reader.next_entry().await.map_err(|e| WalkError::List {
            path: dir.clone(),
            source: e,
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if shared.ignore.is_ignored(&name) {
                debug!("ignoring {}", entry.path().display());
                continue;
            }
            // metadata() follows symlinks. Dangling links fail the stat;
            // sockets and pipes are neither file nor directory. Both kinds
            // are skipped as unwalkable; listing and read failures stay fatal.
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(e) => {
                    debug!("skipping unreadable entry {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if meta.is_dir() || meta.is_file() {
                entries.push((name, meta.is_dir()));
            } else {
                debug!("skipping special file {}", entry.path().display());
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let (folders, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(|(_, d)| *d);

        let mut tasks: JoinSet<Result<(), WalkError>> = JoinSet::new();
        for (name, _) in folders {
            let shared = shared.clone();
            let child_abs = dir.join(&name);
            let child_rel = rel.join(&name);
            tasks.spawn(async move {
                visit_dir(shared.clone(), child_abs.clone(), child_rel.clone()).await?;
                if let Some(on_folder) = &shared.hooks.on_folder {
                    on_folder
                        .on_folder(FolderVisit {
                            folder_name: name,
                            rel_path: child_rel,
                            abs_path: child_abs,
                        })
                        .await;
                }
                Ok(())
            });
        }
        // An error drops the set, aborting in-flight siblings.
        while let Some(joined) = tasks.join_next().await {
            joined??;
        }

        if let Some(on_file) = shared.hooks.on_file.clone() {
            let mut tasks: JoinSet<Result<(), WalkError>> = JoinSet::new();
            for (name, _) in files {
                let on_file = on_file.clone();
                let child_abs = dir.join(&name);
                let child_rel = rel.join(&name);
                tasks.spawn(async move {
                    let bytes = fs::read(&child_abs).await.map_err(|e| WalkError::Read {
                        path: child_abs.clone(),
                        source: e,
                    })?;
                    match String::from_utf8(bytes) {
                        Ok(content) => {
                            on_file
                                .on_file(FileVisit {
                                    file_name: name,
                                    rel_path: child_rel,
                                    abs_path: child_abs,
                                    content,
                                })
                                .await;
                        }
                        Err(_) => {
                            debug!("skipping binary file {}", child_abs.display());
                        }
                    }
                    Ok(())
                });
            }
            while let Some(joined) = tasks.join_next().await {
                joined??;
            }
        }

        Ok(())
    })
}
