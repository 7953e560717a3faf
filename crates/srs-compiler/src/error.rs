use std::io;
use std::path::{Path, PathBuf};

use srs_core::{DecodeError, UpgradeError};

use crate::writer::EncodeError;

/// Failure of one stage of turning a rule source into a rule-set file.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("fetch failed for '{location}': {message}")]
    Fetch { location: String, message: String },
    #[error("failed to parse source document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("malformed source document: {0}")]
    Shape(String),
    #[error("failed to render rule-set source: {0}")]
    Render(#[source] serde_json::Error),
    #[error("failed to decode rule-set source: {0}")]
    Decode(#[from] DecodeError),
    #[error("upgrade failed: {0}")]
    UnsupportedVersion(#[from] UpgradeError),
    #[error("I/O error on '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode rule-set: {0}")]
    Encode(#[source] EncodeError),
}

impl CompileError {
    pub fn fetch(location: &str, message: impl ToString) -> Self {
        Self::Fetch {
            location: location.to_string(),
            message: message.to_string(),
        }
    }

    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Parse(_) | Self::Shape(_) | Self::Render(_) => "build",
            Self::Decode(_) | Self::UnsupportedVersion(_) => "decode",
            Self::Io { .. } | Self::Encode(_) => "write",
        }
    }
}
