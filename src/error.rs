use thiserror::Error;

use crate::ai::AiError;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("duplicate node id `{0}`")]
    DuplicateId(String),

    #[error("link {from}-{to} ({label}) references missing node `{missing}`")]
    DanglingLink {
        from: String,
        to: String,
        label: String,
        missing: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("external service error: {0}")]
    ExternalService(#[from] AiError),

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ExplorerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_data_integrity(&self) -> bool {
        matches!(self, Self::DuplicateId(_) | Self::DanglingLink { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
