use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::types::DocError;

/// Compiled ignore patterns.
///
/// Patterns are globs matched against bare entry names ("node_modules",
/// "*.svg"), never against full paths. An ignored directory name prunes the
/// whole subtree during traversal.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    set: GlobSet,
}

impl IgnoreSet {
    /// Compile a pattern list. Invalid patterns are a configuration error.
    pub fn new<I, S>(patterns: I) -> Result<Self, DocError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|e| {
                DocError::Config(format!("invalid ignore pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| DocError::Config(format!("failed to compile ignore patterns: {}", e)))?;
        Ok(Self { set })
    }

    /// Whether a bare entry name matches any pattern.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.set.is_match(name)
    }
}
