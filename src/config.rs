use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::anthropic::{
    ClientOptions, DEFAULT_BASE_URL, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MAX_RETRIES,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECONDS,
};
use crate::permalink::LinkStyle;
use crate::pipeline::ProjectContext;
use crate::prompts::{DEFAULT_FILE_PROMPT, DEFAULT_FOLDER_PROMPT};
use crate::types::DocError;

pub const CONFIG_FILE_NAME: &str = "loredoc.toml";

/// Default cap on concurrent API calls.
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 25;

/// Project configuration, normally loaded from `loredoc.toml`.
///
/// The API key is never part of the file; it comes from the environment (or
/// a CLI flag) so configs can be committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoredocConfig {
    /// Project name used in prompts. Empty means "derive from the root
    /// directory name".
    pub name: String,
    pub repository_url: String,
    /// Input tree to document.
    pub root: PathBuf,
    /// Output directory; artifacts land under `<output>/docs/json`.
    pub output: PathBuf,
    /// Models the selector may hand out, by API name.
    pub llms: Vec<String>,
    /// Glob patterns matched against bare entry names.
    pub ignore: Vec<String>,
    pub file_prompt: String,
    pub folder_prompt: String,
    pub content_type: String,
    pub target_audience: String,
    pub link_style: LinkStyle,
    pub max_concurrent_calls: usize,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for LoredocConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            repository_url: String::new(),
            root: PathBuf::from("."),
            output: PathBuf::from(".loredoc"),
            llms: vec![
                "claude-3-haiku-20240307".to_string(),
                "claude-3-5-sonnet-20241022".to_string(),
            ],
            ignore: default_ignore_patterns(),
            file_prompt: DEFAULT_FILE_PROMPT.to_string(),
            folder_prompt: DEFAULT_FOLDER_PROMPT.to_string(),
            content_type: "code".to_string(),
            target_audience: "smart developer".to_string(),
            link_style: LinkStyle::Hosted,
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            api: ApiConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

pub fn default_ignore_patterns() -> Vec<String> {
    [
        ".*",
        "*package-lock.json",
        "*package.json",
        "node_modules",
        "target",
        "*dist*",
        "*build*",
        "*test*",
        "*.svg",
        "*.md",
        "*.mdx",
        "*.toml",
        "*loredoc*",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl LoredocConfig {
    pub fn load(path: &Path) -> Result<Self, DocError> {
        let raw = std::fs::read_to_string(path).map_err(|e| DocError::ConfigIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&raw).map_err(|e| DocError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `path` when it exists, fall back to defaults when it does not.
    pub fn load_or_default(path: &Path) -> Result<Self, DocError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String, DocError> {
        toml::to_string_pretty(self)
            .map_err(|e| DocError::Config(format!("failed to render config: {}", e)))
    }

    /// Where the JSON artifact tree lives under the output directory.
    pub fn artifact_root(&self) -> PathBuf {
        self.output.join("docs").join("json")
    }

    /// Project name with the empty-name fallback applied.
    pub fn resolved_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        self.root
            .canonicalize()
            .ok()
            .and_then(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "project".to_string())
    }

    pub fn client_options(&self, api_key: String) -> ClientOptions {
        ClientOptions {
            api_key,
            base_url: self.api.base_url.clone(),
            max_output_tokens: self.api.max_output_tokens,
            temperature: self.api.temperature,
            timeout_seconds: self.api.timeout_seconds,
            max_retries: self.api.max_retries,
        }
    }

    pub fn project_context(&self) -> ProjectContext {
        ProjectContext {
            project_name: self.resolved_name(),
            repository_url: self.repository_url.clone(),
            input_root: self.root.clone(),
            output_root: self.artifact_root(),
            content_type: self.content_type.clone(),
            target_audience: self.target_audience.clone(),
            file_prompt: self.file_prompt.clone(),
            folder_prompt: self.folder_prompt.clone(),
            link_style: self.link_style,
        }
    }
}
