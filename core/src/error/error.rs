use thiserror::Error;

use super::store::StoreError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("mode error: {0}")]
    Mode(#[from] ModeError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Errors surfaced to the direct caller of a state manager operation.
///
/// Listener and persistence failures during a broadcast or a registration are
/// logged and counted, never returned through this type.
#[derive(Error, Debug)]
pub enum ModeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ModeError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
