use crate::subscriber::SourceSystem;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No column mapping configured for source '{system}'")]
    MissingSourceMapping { system: SourceSystem },

    #[error("Column mapping for source '{system}' has no entry for mandatory field '{field}'")]
    MissingMapping { system: SourceSystem, field: &'static str },

    #[error("No priority configured for source '{system}'")]
    MissingPriority { system: SourceSystem },

    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("Unknown stage '{name}' (expected one of {known})")]
    UnknownStage { name: String, known: String },

    #[error("Stage '{name}' requires output of an earlier stage that has not run")]
    StageOrder { name: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EtlResult<T> = Result<T, EtlError>;
