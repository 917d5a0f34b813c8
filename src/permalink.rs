use std::path::Path;

use serde::{Deserialize, Serialize};

/// How artifact permalinks are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// `{repo}/{path}`, for hosted documentation sites.
    #[default]
    Hosted,
    /// GitHub blob/tree URLs on the default branch.
    Github,
}

/// Relative path rendered with forward slashes on every platform.
pub fn slash_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn file_url(repo_url: &str, rel: &Path, style: LinkStyle) -> String {
    let repo = repo_url.trim_end_matches('/');
    match style {
        LinkStyle::Hosted => format!("{}/{}", repo, slash_path(rel)),
        LinkStyle::Github => format!("{}/blob/master/{}", repo, slash_path(rel)),
    }
}

pub fn folder_url(repo_url: &str, rel: &Path, style: LinkStyle) -> String {
    let repo = repo_url.trim_end_matches('/');
    match style {
        LinkStyle::Hosted => format!("{}/{}", repo, slash_path(rel)),
        LinkStyle::Github => format!("{}/tree/master/{}", repo, slash_path(rel)),
    }
}
