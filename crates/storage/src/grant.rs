//! Grant records as the store keeps them.

use authz::SendAuthorization;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a grant: who granted, to whom, for which instruction kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantKey {
    pub granter: String,
    pub grantee: String,
    pub msg_type_url: String,
}

impl GrantKey {
    pub fn new(
        granter: impl Into<String>,
        grantee: impl Into<String>,
        msg_type_url: impl Into<String>,
    ) -> Self {
        Self {
            granter: granter.into(),
            grantee: grantee.into(),
            msg_type_url: msg_type_url.into(),
        }
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.granter, self.grantee, self.msg_type_url)
    }
}

/// A stored authorization with its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub key: GrantKey,
    pub authorization: SendAuthorization,
    pub created_at: DateTime<Utc>,
}

impl Grant {
    /// A grant keyed by the instruction kind the authorization governs.
    pub fn new(
        granter: impl Into<String>,
        grantee: impl Into<String>,
        authorization: SendAuthorization,
    ) -> Self {
        let key = GrantKey::new(granter, grantee, authorization.msg_type_url());
        Self {
            key,
            authorization,
            created_at: Utc::now(),
        }
    }
}
