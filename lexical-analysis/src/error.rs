use std::path::PathBuf;
use std::sync::Arc;

/// Failures while loading a vocabulary dictionary or grammar table.
///
/// Cloneable so a single failed load can be handed to every caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DictionaryError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("{word:?} has unrecognized level {level:?}")]
    UnknownLevel { word: String, level: String },
    #[error("loader task failed: {0}")]
    Join(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenizerError {
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },
    #[error("{backend} failed to segment text: {reason}")]
    Segmentation {
        backend: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OverlayError {
    #[error("failed to read overlay file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("failed to parse overlay file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("overlay loader task failed: {0}")]
    Join(String),
}
