//! Seeded random operations over a keeper.
//!
//! A [`Simulation`] funds a set of random accounts, then repeatedly picks a
//! weighted operation (grant, revoke or exec) and applies it, checking the
//! stored grants after each step. The same seed always yields the same run.

mod config;
mod error;
mod operation;
mod simulation;

pub use config::{SimConfig, Weights};
pub use error::{Error, Result};
pub use operation::{Account, OpKind, OperationMsg, Status, random_accounts};
pub use simulation::{SimReport, Simulation};
