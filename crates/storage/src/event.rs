//! Event types for the grant audit log.

use crate::GrantKey;
use authz::{Coins, Msg, SendAuthorization};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantEventKind {
    /// A grant was created or replaced.
    Granted { authorization: SendAuthorization },
    /// A grant was removed on request.
    Revoked,
    /// A transfer ran and the grant was replaced by its successor.
    Updated { spent: Coins, remaining: Coins },
    /// A transfer ran and used up the grant, which was deleted.
    Exhausted { spent: Coins },
    /// An instruction ran without needing a grant (the signer moved its own
    /// funds).
    Executed { msg: Msg },
    /// A transfer was refused by the grant.
    Rejected { reason: String },
}

impl GrantEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            GrantEventKind::Granted { .. } => "granted",
            GrantEventKind::Revoked => "revoked",
            GrantEventKind::Updated { .. } => "updated",
            GrantEventKind::Exhausted { .. } => "exhausted",
            GrantEventKind::Executed { .. } => "executed",
            GrantEventKind::Rejected { .. } => "rejected",
        }
    }
}

/// An entry in the grant audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub key: GrantKey,
    pub kind: GrantEventKind,
}

impl GrantEvent {
    pub fn new(key: GrantKey, kind: GrantEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            key,
            kind,
        }
    }
}
