use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A stored grant broke an invariant the keeper must uphold.
    #[error("invariant violated after op {op}: {detail}")]
    InvariantViolated { op: usize, detail: String },

    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Authz(#[from] authz::Error),

    #[error(transparent)]
    Keeper(#[from] keeper::Error),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
