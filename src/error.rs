use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Broad failure category, so callers can branch without matching on text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Filesystem,
    Service,
    Parse,
    Archive,
    Config,
}

#[derive(Error, Debug)]
pub enum DeclutterError {
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("categorization service error: {0}")]
    Service(String),

    #[error("could not parse service reply: {0}")]
    Parse(String),

    #[error("archive error at {}: {reason}", .path.display())]
    Archive { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl DeclutterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeclutterError::Filesystem { .. } => ErrorKind::Filesystem,
            DeclutterError::Service(_) => ErrorKind::Service,
            DeclutterError::Parse(_) => ErrorKind::Parse,
            DeclutterError::Archive { .. } => ErrorKind::Archive,
            DeclutterError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn fs(path: impl AsRef<Path>, source: io::Error) -> Self {
        DeclutterError::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn archive(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        DeclutterError::Archive {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for DeclutterError {
    fn from(err: reqwest::Error) -> Self {
        DeclutterError::Service(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeclutterError>;
