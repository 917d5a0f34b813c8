use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex digest identifying the exact inputs an artifact was generated from.
///
/// Stored inside every artifact; later runs compare it against a freshly
/// computed digest to decide whether the artifact is stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the backend produced usable summary text for this item.
///
/// `Empty` replaces the old convention of writing a zero-byte artifact, which
/// later runs could not parse. Missing field deserializes as `Complete` so
/// artifacts written before the field existed stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    #[default]
    Complete,
    Empty,
}

/// Persisted summary for a single source file.
///
/// Written next to the mirrored position of the file in the output tree, with
/// the extension swapped to `.json`. `file_path` is relative to the input
/// root and `/`-separated regardless of platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileArtifact {
    pub file_name: String,
    pub file_path: String,
    pub url: String,
    pub summary: String,
    pub questions: String,
    pub checksum: Fingerprint,
    #[serde(default)]
    pub status: ArtifactStatus,
}

/// Persisted summary for a folder, written as `summary.json` inside the
/// folder's mirrored position in the output tree.
///
/// `files` and `folders` embed full copies of the direct children that had
/// readable artifacts at aggregation time, recursively, so one artifact
/// describes its entire subtree without further reads. Size grows with the
/// subtree; that trade is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderArtifact {
    pub folder_name: String,
    pub folder_path: String,
    pub url: String,
    pub files: Vec<FileArtifact>,
    pub folders: Vec<FolderArtifact>,
    pub summary: String,
    pub questions: String,
    pub checksum: Fingerprint,
    #[serde(default)]
    pub status: ArtifactStatus,
}
