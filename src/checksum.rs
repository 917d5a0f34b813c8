use std::path::Path;

use tracing::{debug, info};

use crate::store::ArtifactStore;
use crate::types::Fingerprint;

/// Digest an ordered list of content parts into one fingerprint.
///
/// Each part is hashed on its own, the hex digests are concatenated, and the
/// concatenation is hashed again, so reordering parts changes the result even
/// when the joined text would not.
pub fn fingerprint<S: AsRef<str>>(parts: &[S]) -> Fingerprint {
    let mut combined = String::with_capacity(parts.len() * 64);
    for part in parts {
        combined.push_str(blake3::hash(part.as_ref().as_bytes()).to_hex().as_str());
    }
    Fingerprint::from_hex(blake3::hash(combined.as_bytes()).to_hex().to_string())
}

/// Cache gate: should the artifact at `prior` be regenerated for `new`?
///
/// No readable prior artifact (absent or corrupt) always reindexes, so a
/// damaged output tree heals on the next run instead of erroring.
pub async fn should_reindex(store: &ArtifactStore, prior: &Path, new: &Fingerprint) -> bool {
    match store.read_checksum(prior).await {
        Some(old) if old == *new => {
            info!("skipping unchanged {}", prior.display());
            false
        }
        Some(_) => {
            info!("reindexing changed {}", prior.display());
            true
        }
        None => {
            debug!("no prior artifact at {}, indexing", prior.display());
            true
        }
    }
}
