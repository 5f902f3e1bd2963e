use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiloError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("malformed record: {0}")]
    Decode(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("data directory is locked by another process: {0}")]
    Locked(String),
}

impl SiloError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type SiloResult<T> = Result<T, SiloError>;
