//! The send authorization record and its evaluation.

use crate::gas::{GAS_COST_PER_ITERATION, GasMeter, SEND_AUTHORIZATION_DESCRIPTOR};
use crate::msg::{MSG_SEND_TYPE_URL, Msg};
use crate::{Coins, Error, Rejection, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A grant letting a grantee send the granter's funds.
///
/// `spend_limit` is what is still spendable. A non-empty `allow_list`
/// restricts recipients to the addresses it names; an empty one allows any
/// recipient. Addresses are compared as given, so both the list and the
/// recipient must already be in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAuthorization {
    pub spend_limit: Coins,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_list: Vec<String>,
}

/// Outcome of evaluating a proposed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The transfer is not permitted. The record stays as it was.
    Rejected(Rejection),
    /// The transfer is permitted and used up the whole limit. The grant must
    /// be deleted.
    AcceptedTerminal,
    /// The transfer is permitted. The grant must be replaced by this record.
    AcceptedWithSuccessor(SendAuthorization),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Decision::Rejected(_))
    }

    /// Whether the dispatcher must delete the grant.
    pub fn should_delete(&self) -> bool {
        matches!(self, Decision::AcceptedTerminal)
    }
}

impl SendAuthorization {
    pub fn new<I, S>(spend_limit: Coins, allow_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spend_limit,
            allow_list: allow_list.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a record from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Parse(format!("{}: {e}", path.as_ref().display())))?;
        Self::parse(&content)
    }

    /// Parse a record from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// The instruction kind this authorization governs.
    pub fn msg_type_url(&self) -> &'static str {
        MSG_SEND_TYPE_URL
    }

    /// Check the record is fit to be stored.
    pub fn validate_basic(&self) -> Result<()> {
        if self.spend_limit.is_empty() {
            return Err(Error::InvalidLimit("spend limit cannot be empty".into()));
        }
        if !self.spend_limit.is_all_positive() {
            return Err(Error::InvalidLimit(format!(
                "spend limit must be positive: {}",
                self.spend_limit
            )));
        }

        let mut seen = HashSet::with_capacity(self.allow_list.len());
        for addr in &self.allow_list {
            if !seen.insert(addr.as_str()) {
                return Err(Error::DuplicateAllowListEntry(addr.clone()));
            }
        }

        Ok(())
    }

    /// Decide whether `msg` may run under this authorization.
    ///
    /// Checks run in a fixed order: instruction kind, spend limit, then
    /// recipient. The allow-list scan charges `meter` once per entry it looks
    /// at and stops at the first match. Running out of gas is returned as
    /// [`Error::ResourceExhausted`]; every other refusal is a
    /// [`Decision::Rejected`].
    pub fn accept(&self, msg: &Msg, meter: &mut dyn GasMeter) -> Result<Decision> {
        let Msg::Send(send) = msg else {
            tracing::debug!(found = msg.type_url(), "send authorization: type mismatch");
            return Ok(Decision::Rejected(Rejection::TypeMismatch {
                expected: MSG_SEND_TYPE_URL.to_string(),
                found: msg.type_url().to_string(),
            }));
        };

        let Some(limit_left) = self.spend_limit.safe_sub(&send.amount) else {
            tracing::debug!(
                requested = %send.amount,
                remaining = %self.spend_limit,
                "send authorization: over limit"
            );
            return Ok(Decision::Rejected(Rejection::InsufficientAuthorization {
                requested: send.amount.clone(),
                remaining: self.spend_limit.clone(),
            }));
        };

        if !self.allow_list.is_empty() {
            let mut found = false;
            for addr in &self.allow_list {
                meter.consume_gas(GAS_COST_PER_ITERATION, SEND_AUTHORIZATION_DESCRIPTOR)?;
                if *addr == send.to_address {
                    found = true;
                    break;
                }
            }

            if !found {
                tracing::debug!(
                    recipient = %send.to_address,
                    "send authorization: recipient not allowed"
                );
                return Ok(Decision::Rejected(Rejection::RecipientNotAuthorized {
                    recipient: send.to_address.clone(),
                }));
            }
        }

        if limit_left.is_zero() {
            tracing::debug!("send authorization: limit exhausted");
            return Ok(Decision::AcceptedTerminal);
        }

        tracing::debug!(remaining = %limit_left, "send authorization: accepted");
        Ok(Decision::AcceptedWithSuccessor(SendAuthorization {
            spend_limit: limit_left,
            allow_list: self.allow_list.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::{BasicGasMeter, InfiniteGasMeter};
    use crate::msg::{Io, MsgMultiSend};

    fn coins(s: &str) -> Coins {
        s.parse().unwrap()
    }

    fn send(to: &str, amount: &str) -> Msg {
        Msg::send("granter", to, coins(amount))
    }

    fn open(limit: &str) -> SendAuthorization {
        SendAuthorization::new(coins(limit), Vec::<String>::new())
    }

    #[test]
    fn test_validate_rejects_empty_limit() {
        let err = open("").validate_basic().unwrap_err();
        assert!(matches!(err, Error::InvalidLimit(_)));
    }

    #[test]
    fn test_validate_rejects_zero_amount() {
        let err = open("100atom,0stake").validate_basic().unwrap_err();
        assert!(matches!(err, Error::InvalidLimit(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_allow_list_entry() {
        let auth = SendAuthorization::new(coins("10atom"), ["x", "y", "x"]);
        assert_eq!(
            auth.validate_basic(),
            Err(Error::DuplicateAllowListEntry("x".into()))
        );
    }

    #[test]
    fn test_validate_is_idempotent() {
        let auth = SendAuthorization::new(coins("10atom"), ["x", "y"]);
        assert!(auth.validate_basic().is_ok());
        assert!(auth.validate_basic().is_ok());

        let bad = SendAuthorization::new(coins("10atom"), ["x", "x"]);
        assert_eq!(bad.validate_basic(), bad.validate_basic());
    }

    #[test]
    fn test_accept_whole_limit_deletes() {
        let auth = open("100atom");
        let decision = auth.accept(&send("z", "100atom"), &mut InfiniteGasMeter::new()).unwrap();
        assert_eq!(decision, Decision::AcceptedTerminal);
        assert!(decision.should_delete());
    }

    #[test]
    fn test_accept_partial_spend_updates() {
        let auth = open("100atom");
        let decision = auth.accept(&send("z", "40atom"), &mut InfiniteGasMeter::new()).unwrap();
        assert_eq!(decision, Decision::AcceptedWithSuccessor(open("60atom")));
    }

    #[test]
    fn test_accept_over_limit_rejects_and_leaves_record() {
        let auth = open("100atom");
        let before = auth.clone();
        let decision = auth.accept(&send("z", "150atom"), &mut InfiniteGasMeter::new()).unwrap();
        assert!(matches!(
            decision,
            Decision::Rejected(Rejection::InsufficientAuthorization { .. })
        ));
        assert_eq!(auth, before);
    }

    #[test]
    fn test_accept_unknown_denom_rejects() {
        let auth = open("100atom");
        let decision = auth.accept(&send("z", "1stake"), &mut InfiniteGasMeter::new()).unwrap();
        assert!(matches!(
            decision,
            Decision::Rejected(Rejection::InsufficientAuthorization { .. })
        ));
    }

    #[test]
    fn test_accept_multi_denom_keeps_unspent_denoms() {
        let auth = open("100atom,5stake");
        let decision = auth.accept(&send("z", "5stake"), &mut InfiniteGasMeter::new()).unwrap();
        assert_eq!(decision, Decision::AcceptedWithSuccessor(open("100atom")));
    }

    #[test]
    fn test_accept_type_mismatch() {
        let auth = open("100atom");
        let msg = Msg::MultiSend(MsgMultiSend {
            inputs: vec![Io {
                address: "granter".into(),
                coins: coins("500atom"),
            }],
            outputs: vec![],
        });
        let decision = auth.accept(&msg, &mut InfiniteGasMeter::new()).unwrap();
        assert!(matches!(
            decision,
            Decision::Rejected(Rejection::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_allow_list_permits_listed_recipient() {
        let auth = SendAuthorization::new(coins("50atom"), ["b"]);
        let decision = auth.accept(&send("b", "10atom"), &mut InfiniteGasMeter::new()).unwrap();
        assert_eq!(
            decision,
            Decision::AcceptedWithSuccessor(SendAuthorization::new(coins("40atom"), ["b"]))
        );
    }

    #[test]
    fn test_allow_list_rejects_other_recipient() {
        let auth = SendAuthorization::new(coins("50atom"), ["b"]);
        let decision = auth.accept(&send("c", "10atom"), &mut InfiniteGasMeter::new()).unwrap();
        assert_eq!(
            decision,
            Decision::Rejected(Rejection::RecipientNotAuthorized {
                recipient: "c".into()
            })
        );
    }

    #[test]
    fn test_empty_allow_list_permits_anyone_without_metering() {
        let auth = open("50atom");
        let mut meter = InfiniteGasMeter::new();
        assert!(auth.accept(&send("anyone", "10atom"), &mut meter).unwrap().is_accepted());
        assert_eq!(meter.gas_consumed(), 0);
    }

    #[test]
    fn test_metering_full_scan_on_miss() {
        let auth = SendAuthorization::new(coins("50atom"), ["a", "b", "c", "d"]);
        let mut meter = InfiniteGasMeter::new();
        auth.accept(&send("e", "1atom"), &mut meter).unwrap();
        assert_eq!(meter.gas_consumed(), 4 * GAS_COST_PER_ITERATION);
    }

    #[test]
    fn test_metering_stops_at_match() {
        let auth = SendAuthorization::new(coins("50atom"), ["a", "b", "c", "d"]);
        let mut meter = InfiniteGasMeter::new();
        auth.accept(&send("b", "1atom"), &mut meter).unwrap();
        assert_eq!(meter.gas_consumed(), 2 * GAS_COST_PER_ITERATION);
    }

    #[test]
    fn test_limit_checked_before_allow_list() {
        let auth = SendAuthorization::new(coins("50atom"), ["a", "b"]);
        let mut meter = InfiniteGasMeter::new();
        let decision = auth.accept(&send("c", "99atom"), &mut meter).unwrap();
        assert!(matches!(
            decision,
            Decision::Rejected(Rejection::InsufficientAuthorization { .. })
        ));
        assert_eq!(meter.gas_consumed(), 0);
    }

    #[test]
    fn test_out_of_gas_aborts() {
        let auth = SendAuthorization::new(coins("50atom"), ["a", "b", "c"]);
        let mut meter = BasicGasMeter::new(GAS_COST_PER_ITERATION * 2);
        let err = auth.accept(&send("c", "1atom"), &mut meter).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted(_)));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
spend_limit = "100atom,40stake"
allow_list = ["sim1alice", "sim1bob"]
"#;
        let auth = SendAuthorization::parse(toml).unwrap();
        assert_eq!(auth.spend_limit.amount_of("stake"), 40);
        assert_eq!(auth.allow_list.len(), 2);
        assert!(auth.validate_basic().is_ok());

        let open = SendAuthorization::parse(r#"spend_limit = "1atom""#).unwrap();
        assert!(open.allow_list.is_empty());
    }
}
