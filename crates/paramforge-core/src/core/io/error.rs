use super::arrays::SchemaError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("File I/O error for '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error for '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid content in '{}': {detail}", .path.display())]
    InvalidContent { path: PathBuf, detail: String },
    #[error("Schema error in '{}': {source}", .path.display())]
    Schema { path: PathBuf, source: SchemaError },
}

impl IoError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Json { path, .. }
            | Self::InvalidContent { path, .. }
            | Self::Schema { path, .. } => path,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::InvalidContent {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
