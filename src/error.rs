use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown team code '{code}' and no GENERIC fallback")]
    UnknownTeam { code: String },

    #[error("invalid matchup input: {0}")]
    InvalidInput(String),

    #[error("calculation error: {0}")]
    Calculation(String),

    #[error("unknown engine '{name}' (known engines: {known})")]
    UnknownEngine { name: String, known: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl ModelError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum MarketLogError {
    #[error("failed to read market log: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row} failed validation: {reason}")]
    Row { row: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("non-finite number at '{path}'")]
    NonFinite { path: String },
}
