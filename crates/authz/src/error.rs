//! Authorization error types.

use crate::coin::Coins;
use crate::gas::OutOfGas;
use thiserror::Error;

/// Authorization errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The spend limit is empty or holds a non-positive amount.
    #[error("invalid spend limit: {0}")]
    InvalidLimit(String),

    /// The allow-list names the same recipient more than once.
    #[error("duplicate entry in allow list: {0}")]
    DuplicateAllowListEntry(String),

    /// A coin or coin set could not be parsed or constructed.
    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    /// Failed to parse a record file.
    #[error("failed to parse authorization: {0}")]
    Parse(String),

    /// A proposed transfer was turned down by the authorization.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Metering ran out of budget while evaluating.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(#[from] OutOfGas),
}

/// Why an evaluation turned a proposed transfer down.
///
/// Variants are listed in the order the evaluator checks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The instruction is not the kind this authorization governs.
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    /// The instruction asks for more than the remaining spend limit.
    #[error("requested amount {requested} is more than spend limit {remaining}")]
    InsufficientAuthorization { requested: Coins, remaining: Coins },

    /// The recipient is not on a non-empty allow-list.
    #[error("cannot send to {recipient} address")]
    RecipientNotAuthorized { recipient: String },
}

pub type Result<T> = std::result::Result<T, Error>;
