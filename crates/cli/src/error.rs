//! CLI error types.

use crate::config::ConfigError;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Neither `--spend-limit` nor `--file` was given to `grant`.
    #[error("grant needs --spend-limit or --file")]
    MissingSpendLimit,

    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An error occurred in the authorization layer.
    #[error(transparent)]
    Authz(#[from] authz::Error),

    /// An error occurred in the keeper.
    #[error(transparent)]
    Keeper(#[from] keeper::Error),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// A simulation failed.
    #[error(transparent)]
    Sim(#[from] sim::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
