//! The grant keeper — stores grants and dispatches instructions through them.
//!
//! The keeper sits between a submitted instruction and the
//! [`authz::SendAuthorization`] that governs it:
//!
//! - **grant** validates a new authorization and stores it under
//!   (granter, grantee, instruction kind).
//! - **revoke** deletes a stored grant.
//! - **exec** loads the grant behind an instruction, asks it for a
//!   [`authz::Decision`], and then rejects, updates, or deletes the grant
//!   before moving funds.
//!
//! # Example
//!
//! ```
//! use authz::{Coins, InfiniteGasMeter, Msg, SendAuthorization};
//! use keeper::{ExecOutcome, Keeper};
//! use storage::Store;
//!
//! let mut keeper = Keeper::new(Store::in_memory()?);
//! let funds: Coins = "500atom".parse()?;
//! keeper.fund("sim1alice", &funds)?;
//!
//! let limit: Coins = "100atom".parse()?;
//! let auth = SendAuthorization::new(limit.clone(), Vec::<String>::new());
//! keeper.grant("sim1alice", "sim1bob", auth)?;
//!
//! let msg = Msg::send("sim1alice", "sim1carol", limit);
//! let outcome = keeper.exec("sim1bob", &msg, &mut InfiniteGasMeter::new())?;
//! assert_eq!(outcome, ExecOutcome::Exhausted);
//! # Ok::<(), keeper::Error>(())
//! ```

mod bank;
mod error;
mod keeper;

pub use error::{Error, Result};
pub use keeper::{ExecOutcome, Keeper};
