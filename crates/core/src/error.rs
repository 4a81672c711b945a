//! Crate-level error type

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Errors from building or running a [`Toolkit`](crate::Toolkit)
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, Error>;
