//! SQLite-backed storage for grants, balances and the grant audit log.
//!
//! This crate is the persistence layer under the keeper. It stores three
//! things:
//!
//! 1. **Grants** — the current [`SendAuthorization`](authz::SendAuthorization)
//!    for each (granter, grantee, instruction kind) key.
//!
//! 2. **Balances** — the coins each address holds.
//!
//! 3. **Events** — an append-only log of everything that happened to grants,
//!    so "why was this transfer refused?" can be answered after the fact.
//!
//! # Core Concepts
//!
//! ## Store
//!
//! The [`Store`] wraps a SQLite connection. Writes that must land together
//! go through [`Store::atomically`].
//!
//! ## Grant and GrantKey
//!
//! A [`Grant`] pairs an authorization with its [`GrantKey`]. At most one
//! grant exists per key; putting a second one replaces the first.
//!
//! ## GrantEvent
//!
//! A [`GrantEvent`] records one change, tagged with a [`GrantEventKind`].
//!
//! # Example
//!
//! ```no_run
//! use authz::SendAuthorization;
//! use storage::{Grant, GrantEvent, GrantEventKind, Store};
//!
//! let store = Store::open("grants.db")?;
//!
//! let auth = SendAuthorization::new("100atom".parse().unwrap(), ["sim1carol"]);
//! let grant = Grant::new("sim1alice", "sim1bob", auth.clone());
//! store.put_grant(&grant)?;
//! store.append(&GrantEvent::new(
//!     grant.key.clone(),
//!     GrantEventKind::Granted { authorization: auth },
//! ))?;
//!
//! for grant in store.grants_by_grantee("sim1bob")? {
//!     println!("{}: {}", grant.key, grant.authorization.spend_limit);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod grant;
mod store;

pub use error::{Error, Result};
pub use event::{GrantEvent, GrantEventKind};
pub use grant::{Grant, GrantKey};
pub use store::Store;
