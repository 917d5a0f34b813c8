use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for a documentation run.
#[derive(Debug, Error)]
pub enum DocError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file {path}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// Fatal traversal failures. A missing walk root is not one of these; the
/// walker logs it and returns cleanly.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("failed to list directory {path}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stat {path}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("traversal task failed")]
    Join(#[from] tokio::task::JoinError),
}

/// Artifact store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {path}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact at {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode artifact for {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures from the summarization backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("call limiter closed before the call could run")]
    LimiterClosed,
}

impl LlmError {
    /// Whether a retry with backoff could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Transport(_) | LlmError::RateLimited(_) | LlmError::Server { .. }
        )
    }
}

/// Why a single file or folder failed. Item errors are logged and counted at
/// the site that hit them; they never abort the surrounding walk.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
