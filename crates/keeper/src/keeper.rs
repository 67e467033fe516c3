//! Grant lifecycle and instruction dispatch.

use crate::bank;
use crate::{Error, Result};
use authz::{Coins, Decision, GasMeter, Msg, SendAuthorization};
use storage::{Grant, GrantEvent, GrantEventKind, GrantKey, Store};

/// What running an instruction did to the grant behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The signer ran the instruction itself; no grant was involved.
    Direct,
    /// The grant was replaced by this successor.
    Updated(SendAuthorization),
    /// The grant was used up and deleted.
    Exhausted,
}

/// Owns the grant store and applies grant, revoke and exec instructions.
///
/// Every method that changes state takes `&mut self`, so at most one
/// evaluation runs against a grant at a time.
pub struct Keeper {
    store: Store,
}

impl Keeper {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Store `authorization` as the grant from `granter` to `grantee`,
    /// replacing any existing grant for the same instruction kind.
    pub fn grant(
        &mut self,
        granter: &str,
        grantee: &str,
        authorization: SendAuthorization,
    ) -> Result<Grant> {
        if granter == grantee {
            return Err(Error::SelfGrant(granter.to_string()));
        }
        authorization.validate_basic()?;

        let grant = Grant::new(granter, grantee, authorization);
        self.store.atomically(|store| {
            store.put_grant(&grant)?;
            store.append(&GrantEvent::new(
                grant.key.clone(),
                GrantEventKind::Granted {
                    authorization: grant.authorization.clone(),
                },
            ))
        })?;

        tracing::info!(
            key = %grant.key,
            limit = %grant.authorization.spend_limit,
            "grant stored"
        );
        Ok(grant)
    }

    /// Delete the grant from `granter` to `grantee` for `msg_type_url`.
    pub fn revoke(&mut self, granter: &str, grantee: &str, msg_type_url: &str) -> Result<()> {
        let key = GrantKey::new(granter, grantee, msg_type_url);
        self.store.atomically(|store| {
            if !store.delete_grant(&key)? {
                return Err(Error::GrantNotFound(key.clone()));
            }
            store.append(&GrantEvent::new(key.clone(), GrantEventKind::Revoked))?;
            Ok(())
        })?;

        tracing::info!(%key, "grant revoked");
        Ok(())
    }

    /// Look up a grant.
    pub fn get_grant(
        &self,
        granter: &str,
        grantee: &str,
        msg_type_url: &str,
    ) -> Result<Option<Grant>> {
        Ok(self
            .store
            .get_grant(&GrantKey::new(granter, grantee, msg_type_url))?)
    }

    /// Run `msg` on behalf of its signer, submitted by `grantee`.
    ///
    /// When the grantee is the signer the instruction runs directly.
    /// Otherwise the grant for (signer, grantee, kind) must exist and accept
    /// the instruction; it is then updated or deleted and the transfer
    /// applied. Loading, evaluating and writing all happen in one write
    /// transaction, so a failed transfer leaves the grant as it was and two
    /// keepers sharing a database cannot both spend the same limit.
    pub fn exec(
        &mut self,
        grantee: &str,
        msg: &Msg,
        meter: &mut dyn GasMeter,
    ) -> Result<ExecOutcome> {
        let signer = msg.signer().ok_or(Error::MissingSigner)?;
        let key = GrantKey::new(signer, grantee, msg.type_url());

        if signer == grantee {
            if let Msg::MultiSend(multi) = msg {
                if let Some(io) = multi.inputs.iter().find(|io| io.address != signer) {
                    return Err(Error::ForeignInput(io.address.clone()));
                }
            }
            self.store.atomically(|store| {
                bank::apply(store, msg)?;
                store.append(&GrantEvent::new(
                    key.clone(),
                    GrantEventKind::Executed { msg: msg.clone() },
                ))?;
                Ok::<_, Error>(())
            })?;
            tracing::debug!(%key, "executed without grant");
            return Ok(ExecOutcome::Direct);
        }

        // Load, evaluate and write back under one write lock, so no other
        // connection can spend the same grant in between.
        let result: Result<ExecOutcome> = self.store.atomically(|store| {
            let grant = store
                .get_grant(&key)?
                .ok_or_else(|| Error::GrantNotFound(key.clone()))?;

            let outcome = match grant.authorization.accept(msg, meter)? {
                Decision::Rejected(rejection) => return Err(Error::from(rejection)),
                Decision::AcceptedTerminal => ExecOutcome::Exhausted,
                Decision::AcceptedWithSuccessor(next) => ExecOutcome::Updated(next),
            };

            let spent = spent_amount(msg);
            match &outcome {
                ExecOutcome::Exhausted => {
                    store.delete_grant(&key)?;
                    store.append(&GrantEvent::new(
                        key.clone(),
                        GrantEventKind::Exhausted { spent },
                    ))?;
                }
                ExecOutcome::Updated(next) => {
                    store.put_grant(&Grant {
                        key: key.clone(),
                        authorization: next.clone(),
                        created_at: grant.created_at,
                    })?;
                    store.append(&GrantEvent::new(
                        key.clone(),
                        GrantEventKind::Updated {
                            spent,
                            remaining: next.spend_limit.clone(),
                        },
                    ))?;
                }
                ExecOutcome::Direct => {}
            }
            bank::apply(store, msg)?;
            Ok(outcome)
        });

        match &result {
            Ok(ExecOutcome::Exhausted) => tracing::info!(%key, "grant exhausted and deleted"),
            Ok(_) => tracing::info!(%key, "grant updated"),
            Err(Error::Authz(authz::Error::Rejected(rejection))) => {
                tracing::warn!(%key, %rejection, "instruction rejected by grant");
                let event = GrantEvent::new(
                    key.clone(),
                    GrantEventKind::Rejected {
                        reason: rejection.to_string(),
                    },
                );
                if let Err(e) = self.store.append(&event) {
                    tracing::warn!(%key, error = %e, "failed to log rejection");
                }
            }
            Err(_) => {}
        }
        result
    }

    /// Credit `coins` to `address`, returning the new balance.
    pub fn fund(&mut self, address: &str, coins: &Coins) -> Result<Coins> {
        let balance = self
            .store
            .atomically(|store| bank::credit(store, address, coins))?;
        tracing::debug!(address, %balance, "funded");
        Ok(balance)
    }

    pub fn balance(&self, address: &str) -> Result<Coins> {
        Ok(self.store.balance(address)?)
    }
}

fn spent_amount(msg: &Msg) -> Coins {
    match msg {
        Msg::Send(send) => send.amount.clone(),
        Msg::MultiSend(_) => Coins::empty(),
    }
}
