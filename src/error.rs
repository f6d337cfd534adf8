use std::path::PathBuf;

use thiserror::Error;

/// Source text could not be turned into a document.
#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 text")]
    InvalidUtf8 { path: PathBuf },

    #[error("document is empty")]
    Empty,
}

/// Definition provider failure. Recovered inside the lookup session.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("provider returned no definition")]
    EmptyResponse,

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("{0} backend not enabled in this build")]
    BackendDisabled(&'static str),

    #[error("no definition provider configured")]
    NotConfigured,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },

    #[error("target word count must be greater than zero")]
    ZeroTargetWords,

    #[error("invalid speed bounds: min {min} ms, max {max} ms, overlap floor {floor} ms")]
    SpeedBounds { min: u64, max: u64, floor: u64 },

    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
