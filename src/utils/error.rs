use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoexError>;

#[derive(Debug, Error)]
pub enum CoexError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Schema error in '{source_name}': {message}")]
    Schema {
        source_name: String,
        message: String,
    },

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),
}

impl CoexError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CoexError::Io { path: path.into(), source }
    }

    pub fn schema(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        CoexError::Schema {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        CoexError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}
