use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table '{table}' missing columns: {}", missing.join(", "))]
    Schema { table: String, missing: Vec<String> },

    #[error("Table '{table}' not found")]
    MissingTable { table: String },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlowError {
    /// The missing column names if this is a schema error.
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            Self::Schema { missing, .. } => Some(missing),
            _ => None,
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
