pub mod collect;
pub mod summarize;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Core library error: {0}")]
    Core(#[from] rewatch_core::HistoryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Errors that should be followed by the usage text.
    pub fn wants_usage(&self) -> bool {
        match self {
            CommandError::InvalidArgs(_) => true,
            CommandError::Core(e) => e.is_configuration(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CommandError>;
