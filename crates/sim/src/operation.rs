//! Random accounts and operation results.

use rand::Rng;
use std::fmt;

const ADDRESS_PREFIX: &str = "sim1";
const ADDRESS_CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const ADDRESS_DATA_LEN: usize = 38;

/// A simulated principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    pub address: String,
}

/// Generate `n` accounts with distinct canonical addresses.
pub fn random_accounts(rng: &mut impl Rng, n: usize) -> Vec<Account> {
    let mut accounts: Vec<Account> = Vec::with_capacity(n);
    while accounts.len() < n {
        let data: String = (0..ADDRESS_DATA_LEN)
            .map(|_| ADDRESS_CHARSET[rng.gen_range(0..ADDRESS_CHARSET.len())] as char)
            .collect();
        let address = format!("{ADDRESS_PREFIX}{data}");
        if accounts.iter().all(|a| a.address != address) {
            accounts.push(Account { address });
        }
    }
    accounts
}

/// The operations the simulator can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Grant,
    Revoke,
    Exec,
}

impl OpKind {
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Grant => "grant",
            OpKind::Revoke => "revoke",
            OpKind::Exec => "exec",
        }
    }
}

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    /// The instruction was delivered and succeeded.
    Ok,
    /// Preconditions were not met, so nothing was submitted.
    NoOp,
    /// The instruction was delivered and refused.
    Failed,
}

/// Result of one simulated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMsg {
    pub kind: OpKind,
    pub status: Status,
    pub comment: String,
}

impl OperationMsg {
    pub fn ok(kind: OpKind) -> Self {
        Self {
            kind,
            status: Status::Ok,
            comment: String::new(),
        }
    }

    pub fn no_op(kind: OpKind, comment: impl Into<String>) -> Self {
        Self {
            kind,
            status: Status::NoOp,
            comment: comment.into(),
        }
    }

    pub fn failed(kind: OpKind, comment: impl Into<String>) -> Self {
        Self {
            kind,
            status: Status::Failed,
            comment: comment.into(),
        }
    }
}

impl fmt::Display for OperationMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            Status::Ok => "ok",
            Status::NoOp => "no-op",
            Status::Failed => "failed",
        };
        write!(f, "{} {status}", self.kind.name())?;
        if !self.comment.is_empty() {
            write!(f, ": {}", self.comment)?;
        }
        Ok(())
    }
}
