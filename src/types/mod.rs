pub mod artifact;
pub mod error;

pub use artifact::{ArtifactStatus, FileArtifact, Fingerprint, FolderArtifact};
pub use error::{DocError, ItemError, LlmError, StoreError, WalkError};
