//! Delegated, consumable spend authorizations.
//!
//! Core principle: **a grantee can never spend more than the granter allowed,
//! and never to anyone the granter did not allow.**
//!
//! A [`SendAuthorization`] holds the remaining spend limit and an optional
//! recipient allow-list. Evaluating a proposed transfer against it with
//! [`SendAuthorization::accept`] yields a [`Decision`]: rejected, accepted
//! with a successor record, or accepted with the limit used up (the grant
//! must then be deleted). Evaluation never changes the record it is given.
//!
//! # Example
//!
//! ```
//! use authz::{Coins, Decision, InfiniteGasMeter, Msg, SendAuthorization};
//!
//! let limit: Coins = "100atom".parse()?;
//! let auth = SendAuthorization::new(limit, Vec::<String>::new());
//! auth.validate_basic()?;
//!
//! let amount: Coins = "40atom".parse()?;
//! let msg = Msg::send("granter", "recipient", amount);
//! let decision = auth.accept(&msg, &mut InfiniteGasMeter::new())?;
//! assert!(matches!(decision, Decision::AcceptedWithSuccessor(_)));
//! # Ok::<(), authz::Error>(())
//! ```

mod authorization;
mod coin;
mod error;
mod gas;
mod msg;

pub use authorization::{Decision, SendAuthorization};
pub use coin::{Coin, Coins};
pub use error::{Error, Rejection, Result};
pub use gas::{
    BasicGasMeter, GAS_COST_PER_ITERATION, GasMeter, InfiniteGasMeter, OutOfGas,
    SEND_AUTHORIZATION_DESCRIPTOR,
};
pub use msg::{Io, MSG_MULTI_SEND_TYPE_URL, MSG_SEND_TYPE_URL, Msg, MsgMultiSend, MsgSend};
