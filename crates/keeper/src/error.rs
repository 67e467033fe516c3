use authz::Coins;
use storage::GrantKey;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("granter and grantee cannot be the same: {0}")]
    SelfGrant(String),

    #[error("authorization not found: {0}")]
    GrantNotFound(GrantKey),

    #[error("message has no signer")]
    MissingSigner,

    #[error("input from {0} is not signed by the submitter")]
    ForeignInput(String),

    #[error("insufficient funds: {address} has '{balance}', needs '{required}'")]
    InsufficientFunds {
        address: String,
        balance: Coins,
        required: Coins,
    },

    #[error("multi-send inputs '{inputs}' do not match outputs '{outputs}'")]
    UnbalancedMultiSend { inputs: Coins, outputs: Coins },

    #[error("balance overflow for {0}")]
    Overflow(String),

    #[error(transparent)]
    Authz(#[from] authz::Error),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

impl From<authz::Rejection> for Error {
    fn from(rejection: authz::Rejection) -> Self {
        Error::Authz(rejection.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
