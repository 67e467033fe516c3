//! Randomized grant, revoke and exec operations against a keeper.

use crate::operation::{Account, OpKind, OperationMsg, Status, random_accounts};
use crate::{Error, Result, SimConfig};
use authz::{BasicGasMeter, Coin, Coins, MSG_SEND_TYPE_URL, Msg, SendAuthorization};
use keeper::{ExecOutcome, Keeper};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use storage::{GrantKey, Store};

const FUND_DENOMS: [&str; 2] = ["stake", "atom"];
const MAX_FUNDING: u128 = 1_000_000;
const MAX_ALLOW_LIST: usize = 3;

/// Tally of a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimReport {
    pub ops: usize,
    pub counts: BTreeMap<(OpKind, Status), usize>,
}

impl SimReport {
    pub fn count(&self, kind: OpKind, status: Status) -> usize {
        self.counts.get(&(kind, status)).copied().unwrap_or(0)
    }

    fn record(&mut self, op: &OperationMsg) {
        self.ops += 1;
        *self.counts.entry((op.kind, op.status)).or_default() += 1;
    }
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<8}  {:>8}  {:>8}  {:>8}", "OP", "OK", "NO-OP", "FAILED")?;
        for kind in [OpKind::Grant, OpKind::Revoke, OpKind::Exec] {
            writeln!(
                f,
                "{:<8}  {:>8}  {:>8}  {:>8}",
                kind.name(),
                self.count(kind, Status::Ok),
                self.count(kind, Status::NoOp),
                self.count(kind, Status::Failed),
            )?;
        }
        write!(f, "total ops: {}", self.ops)
    }
}

/// A seeded run of random operations.
///
/// After every operation the stored grants are checked: each must still
/// pass validation, and no spend limit may exceed what it was after the last
/// grant or exec that touched it.
pub struct Simulation {
    rng: ChaCha8Rng,
    keeper: Keeper,
    accounts: Vec<Account>,
    config: SimConfig,
    limits: HashMap<GrantKey, Coins>,
    ops_run: usize,
}

impl Simulation {
    /// Start a simulation over an in-memory store.
    pub fn new(seed: u64, config: SimConfig) -> Result<Self> {
        Self::with_keeper(seed, config, Keeper::new(Store::in_memory()?))
    }

    /// Start a simulation over an existing keeper. Its grants must be empty.
    pub fn with_keeper(
        seed: u64,
        config: SimConfig,
        mut keeper: Keeper,
    ) -> Result<Self> {
        let w = &config.weights;
        if u64::from(w.grant) + u64::from(w.revoke) + u64::from(w.exec) == 0 {
            return Err(Error::InvalidConfig("all operation weights are zero".into()));
        }
        if config.accounts < 2 {
            return Err(Error::InvalidConfig("at least two accounts are needed".into()));
        }
        if !keeper.store().all_grants()?.is_empty() {
            return Err(Error::InvalidConfig("keeper already holds grants".into()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let accounts = random_accounts(&mut rng, config.accounts);
        for account in &accounts {
            let mut coins = vec![Coin::new(FUND_DENOMS[0], rng.gen_range(1..=MAX_FUNDING))?];
            if rng.gen_bool(0.5) {
                coins.push(Coin::new(FUND_DENOMS[1], rng.gen_range(1..=MAX_FUNDING))?);
            }
            keeper.fund(&account.address, &Coins::new(coins)?)?;
        }

        Ok(Self {
            rng,
            keeper,
            accounts,
            config,
            limits: HashMap::new(),
            ops_run: 0,
        })
    }

    /// Run `ops` operations.
    pub fn run(&mut self, ops: usize) -> Result<SimReport> {
        let mut report = SimReport::default();
        for _ in 0..ops {
            let op = self.step()?;
            report.record(&op);
        }
        tracing::info!(ops = report.ops, "simulation finished");
        Ok(report)
    }

    /// Run one operation and check invariants.
    pub fn step(&mut self) -> Result<OperationMsg> {
        self.ops_run += 1;
        let op = match self.pick_kind() {
            OpKind::Grant => self.simulate_grant()?,
            OpKind::Revoke => self.simulate_revoke()?,
            OpKind::Exec => self.simulate_exec()?,
        };
        tracing::debug!(op = self.ops_run, "{op}");
        self.check_invariants()?;
        Ok(op)
    }

    fn pick_kind(&mut self) -> OpKind {
        let w = &self.config.weights;
        let choices = [
            (OpKind::Grant, u64::from(w.grant)),
            (OpKind::Revoke, u64::from(w.revoke)),
            (OpKind::Exec, u64::from(w.exec)),
        ];
        let total: u64 = choices.iter().map(|(_, weight)| weight).sum();

        let mut roll = self.rng.gen_range(0..total);
        for (kind, weight) in choices {
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        OpKind::Exec
    }

    fn random_address(&mut self) -> String {
        let i = self.rng.gen_range(0..self.accounts.len());
        self.accounts[i].address.clone()
    }

    fn simulate_grant(&mut self) -> Result<OperationMsg> {
        let granter = self.random_address();
        let grantee = self.random_address();

        if granter == grantee {
            return Ok(OperationMsg::no_op(
                OpKind::Grant,
                "grantee and granter cannot be same",
            ));
        }
        if self
            .keeper
            .get_grant(&granter, &grantee, MSG_SEND_TYPE_URL)?
            .is_some()
        {
            return Ok(OperationMsg::no_op(OpKind::Grant, "authorization exists"));
        }

        let spendable = self.keeper.balance(&granter)?;
        if spendable.is_empty() {
            return Ok(OperationMsg::no_op(
                OpKind::Grant,
                "unable to grant empty coins as spend limit",
            ));
        }

        let spend_limit = self.random_sub_amount(&spendable)?;
        let n = self.rng.gen_range(0..=MAX_ALLOW_LIST);
        let allow_list: Vec<String> = self
            .accounts
            .choose_multiple(&mut self.rng, n)
            .map(|a| a.address.clone())
            .collect();

        let grant = self
            .keeper
            .grant(&granter, &grantee, SendAuthorization::new(spend_limit, allow_list))?;
        self.limits
            .insert(grant.key, grant.authorization.spend_limit);
        Ok(OperationMsg::ok(OpKind::Grant))
    }

    fn simulate_revoke(&mut self) -> Result<OperationMsg> {
        let grants = self.keeper.store().all_grants()?;
        let Some(grant) = grants.into_iter().next() else {
            return Ok(OperationMsg::no_op(OpKind::Revoke, "no grants"));
        };

        let key = grant.key;
        self.keeper
            .revoke(&key.granter, &key.grantee, &key.msg_type_url)?;
        self.limits.remove(&key);
        Ok(OperationMsg::ok(OpKind::Revoke))
    }

    fn simulate_exec(&mut self) -> Result<OperationMsg> {
        let grants = self.keeper.store().all_grants()?;
        let Some(grant) = grants.choose(&mut self.rng).cloned() else {
            return Ok(OperationMsg::no_op(OpKind::Exec, "no grants"));
        };

        // Sometimes over the limit, so rejections get exercised too.
        let mut amount = Vec::new();
        for (i, coin) in grant.authorization.spend_limit.iter().enumerate() {
            if i == 0 || self.rng.gen_bool(0.5) {
                let cap = coin.amount.saturating_add(coin.amount / 5 + 1);
                amount.push(Coin {
                    denom: coin.denom.clone(),
                    amount: self.rng.gen_range(1..=cap),
                });
            }
        }

        let allow_list = &grant.authorization.allow_list;
        let recipient = match allow_list.choose(&mut self.rng) {
            Some(addr) if self.rng.gen_bool(0.8) => addr.clone(),
            _ => self.random_address(),
        };

        let msg = Msg::send(&grant.key.granter, recipient, Coins::new(amount)?);
        let mut meter = BasicGasMeter::new(self.config.gas_limit);
        match self.keeper.exec(&grant.key.grantee, &msg, &mut meter) {
            Ok(ExecOutcome::Updated(next)) => {
                self.record_successor(grant.key, next.spend_limit)?;
                Ok(OperationMsg::ok(OpKind::Exec))
            }
            Ok(ExecOutcome::Exhausted) => {
                self.limits.remove(&grant.key);
                Ok(OperationMsg::ok(OpKind::Exec))
            }
            Ok(ExecOutcome::Direct) => Ok(OperationMsg::ok(OpKind::Exec)),
            Err(keeper::Error::Storage(e)) => Err(e.into()),
            Err(e) => Ok(OperationMsg::failed(OpKind::Exec, e.to_string())),
        }
    }

    /// Track the limit a successful exec left behind. It may never exceed
    /// the limit tracked before the exec.
    fn record_successor(&mut self, key: GrantKey, next: Coins) -> Result<()> {
        let Some(previous) = self.limits.get(&key) else {
            return Err(Error::InvariantViolated {
                op: self.ops_run,
                detail: format!("{key}: exec succeeded on an untracked grant"),
            });
        };
        if previous.safe_sub(&next).is_none() {
            return Err(Error::InvariantViolated {
                op: self.ops_run,
                detail: format!("{key}: exec grew spend limit from {previous} to {next}"),
            });
        }
        self.limits.insert(key, next);
        Ok(())
    }

    /// A random non-empty part of `coins`.
    fn random_sub_amount(&mut self, coins: &Coins) -> Result<Coins> {
        let mut picked = Vec::new();
        for (i, coin) in coins.iter().enumerate() {
            if i == 0 || self.rng.gen_bool(0.8) {
                picked.push(Coin {
                    denom: coin.denom.clone(),
                    amount: self.rng.gen_range(1..=coin.amount),
                });
            }
        }
        Ok(Coins::new(picked)?)
    }

    fn check_invariants(&self) -> Result<()> {
        let op = self.ops_run;
        let violated = |detail: String| Error::InvariantViolated { op, detail };

        let grants = self.keeper.store().all_grants()?;
        for grant in &grants {
            grant
                .authorization
                .validate_basic()
                .map_err(|e| violated(format!("{}: {e}", grant.key)))?;

            let current = &grant.authorization.spend_limit;
            let Some(previous) = self.limits.get(&grant.key) else {
                return Err(violated(format!("{} stored without being granted", grant.key)));
            };
            if previous.safe_sub(current).is_none() {
                return Err(violated(format!(
                    "{}: spend limit grew from {previous} to {current}",
                    grant.key
                )));
            }
        }

        if grants.len() != self.limits.len() {
            return Err(violated(format!(
                "{} grants stored, {} expected",
                grants.len(),
                self.limits.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Weights;
    use storage::Grant;

    fn config(grant: u32, revoke: u32, exec: u32) -> SimConfig {
        SimConfig {
            weights: Weights {
                grant,
                revoke,
                exec,
            },
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_run_holds_invariants() {
        let mut sim = Simulation::new(42, SimConfig::default()).unwrap();
        let report = sim.run(500).unwrap();
        assert_eq!(report.ops, 500);
        assert_eq!(report.counts.values().sum::<usize>(), 500);
        assert!(report.count(OpKind::Grant, Status::Ok) > 0);
    }

    #[test]
    fn test_same_seed_same_report() {
        let a = Simulation::new(9, SimConfig::default()).unwrap().run(200).unwrap();
        let b = Simulation::new(9, SimConfig::default()).unwrap().run(200).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_revoke_only_finds_no_grants() {
        let mut sim = Simulation::new(1, config(0, 1, 0)).unwrap();
        let report = sim.run(20).unwrap();
        assert_eq!(report.count(OpKind::Revoke, Status::NoOp), 20);
    }

    #[test]
    fn test_grant_heavy_run_exercises_exec() {
        let mut sim = Simulation::new(3, config(50, 5, 100)).unwrap();
        let report = sim.run(400).unwrap();
        let execs =
            report.count(OpKind::Exec, Status::Ok) + report.count(OpKind::Exec, Status::Failed);
        assert!(execs > 0);
    }

    fn coins(s: &str) -> Coins {
        s.parse().unwrap()
    }

    fn tracked_grant(sim: &mut Simulation, limit: &str) -> GrantKey {
        let granter = sim.accounts[0].address.clone();
        let grantee = sim.accounts[1].address.clone();
        let auth = SendAuthorization::new(coins(limit), Vec::<String>::new());
        let grant = sim.keeper.grant(&granter, &grantee, auth).unwrap();
        sim.limits.insert(grant.key.clone(), coins(limit));
        grant.key
    }

    #[test]
    fn test_grown_stored_limit_is_flagged() {
        let mut sim = Simulation::new(5, config(1, 0, 0)).unwrap();
        let key = tracked_grant(&mut sim, "10atom");
        sim.check_invariants().unwrap();

        let grown = Grant::new(
            &key.granter,
            &key.grantee,
            SendAuthorization::new(coins("20atom"), Vec::<String>::new()),
        );
        sim.keeper.store().put_grant(&grown).unwrap();
        assert!(matches!(
            sim.check_invariants(),
            Err(Error::InvariantViolated { .. })
        ));
    }

    #[test]
    fn test_exec_successor_may_not_grow() {
        let mut sim = Simulation::new(5, config(1, 0, 0)).unwrap();
        let key = tracked_grant(&mut sim, "10atom");

        assert!(matches!(
            sim.record_successor(key.clone(), coins("10atom,1stake")),
            Err(Error::InvariantViolated { .. })
        ));
        assert_eq!(sim.limits.get(&key), Some(&coins("10atom")));

        sim.record_successor(key.clone(), coins("4atom")).unwrap();
        assert_eq!(sim.limits.get(&key), Some(&coins("4atom")));
    }

    #[test]
    fn test_rejects_zero_weights() {
        assert!(matches!(
            Simulation::new(1, config(0, 0, 0)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_single_account() {
        let config = SimConfig {
            accounts: 1,
            ..SimConfig::default()
        };
        assert!(matches!(
            Simulation::new(1, config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
