//! Error types for the status collector

use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Debug)]
pub enum CollectorError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP client or transport failure
    Http(reqwest::Error),

    /// YAML config decoding failed
    Yaml(serde_yaml::Error),

    /// JSON config decoding failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// Probe target answered with something other than 200, or timed out
    Probe(String),

    /// Existing entity log could not be parsed
    LogCorruption {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Entity log could not be created or replaced
    LogWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorError::Io(err) => write!(f, "IO error: {}", err),
            CollectorError::Http(err) => write!(f, "HTTP error: {}", err),
            CollectorError::Yaml(err) => write!(f, "YAML error: {}", err),
            CollectorError::Json(err) => write!(f, "JSON error: {}", err),
            CollectorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CollectorError::Probe(msg) => write!(f, "Probe error: {}", msg),
            CollectorError::LogCorruption { path, line, reason } => write!(
                f,
                "Corrupted log {} at line {}: {}",
                path.display(),
                line,
                reason
            ),
            CollectorError::LogWrite { path, source } => {
                write!(f, "Failed to write log {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectorError::Io(err) => Some(err),
            CollectorError::Http(err) => Some(err),
            CollectorError::Yaml(err) => Some(err),
            CollectorError::Json(err) => Some(err),
            CollectorError::LogWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CollectorError {
    fn from(err: std::io::Error) -> Self {
        CollectorError::Io(err)
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        CollectorError::Http(err)
    }
}

impl From<serde_yaml::Error> for CollectorError {
    fn from(err: serde_yaml::Error) -> Self {
        CollectorError::Yaml(err)
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        CollectorError::Json(err)
    }
}

impl CollectorError {
    pub(crate) fn log_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectorError::LogWrite {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corruption(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        CollectorError::LogCorruption {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}
