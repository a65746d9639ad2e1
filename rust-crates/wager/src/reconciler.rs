use crate::{
    error::Result,
    ledger::{
        Address,
        LedgerReader,
        ObjectId,
        read_u64_field,
    },
};
use std::{
    sync::Arc,
    time::Duration,
};
use tracing::{
    debug,
    warn,
};

/// Field holding the token balance of the pool and faucet objects.
pub const BALANCE_FIELD: &str = "balance";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Display-only balances. Never consulted for a game decision.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub account: Option<Address>,
    pub token_balance: u64,
    pub pool_balance: Option<u64>,
    pub faucet_balance: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceTargets {
    pub token_type: String,
    pub pool: Option<ObjectId>,
    pub faucet: Option<ObjectId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub attempts: u32,
    /// A read differed from the baseline before the attempts ran out.
    pub converged: bool,
    pub latest: Option<BalanceSnapshot>,
}

/// Polls balances a bounded number of times after a write. Owns nothing
/// from the round, so it can run on its own task.
pub struct BalanceReconciler<L> {
    ledger: Arc<L>,
    account: Address,
    targets: BalanceTargets,
    policy: ReconcilePolicy,
}

impl<L: LedgerReader> BalanceReconciler<L> {
    pub fn new(
        ledger: Arc<L>,
        account: Address,
        targets: BalanceTargets,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            ledger,
            account,
            targets,
            policy,
        }
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    /// One read of every tracked figure. Pool and faucet reads are optional
    /// extras and degrade to `None`.
    pub async fn read(&self) -> Result<BalanceSnapshot> {
        let (token, pool, faucet) = futures::join!(
            self.ledger
                .get_balance(&self.account, &self.targets.token_type),
            self.object_balance(self.targets.pool.as_ref()),
            self.object_balance(self.targets.faucet.as_ref()),
        );
        Ok(BalanceSnapshot {
            account: Some(self.account.clone()),
            token_balance: token?,
            pool_balance: pool,
            faucet_balance: faucet,
        })
    }

    async fn object_balance(&self, id: Option<&ObjectId>) -> Option<u64> {
        let id = id?;
        let balance = match self.ledger.get_object_fields(id).await {
            Ok(fields) => read_u64_field(&fields, BALANCE_FIELD),
            Err(err) => Err(err),
        };
        match balance {
            Ok(balance) => Some(balance),
            Err(err) => {
                warn!(object = %id, ?err, "object balance unavailable");
                None
            }
        }
    }

    /// Reads right away, then up to `attempts - 1` more times `delay` apart,
    /// stopping once a read differs from `baseline`. A baseline without an
    /// account was never read from the ledger and is ignored. Every
    /// successful read is handed to `publish`.
    pub async fn reconcile(
        &self,
        baseline: Option<&BalanceSnapshot>,
        mut publish: impl FnMut(BalanceSnapshot),
    ) -> ReconcileReport {
        let baseline = baseline.filter(|base| base.account.is_some());
        let attempts = self.policy.attempts.max(1);
        let mut latest = None;
        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.policy.delay).await;
            }
            match self.read().await {
                Ok(snapshot) => {
                    debug!(attempt, balance = snapshot.token_balance, "balance read");
                    let changed = baseline.is_some_and(|base| *base != snapshot);
                    publish(snapshot.clone());
                    latest = Some(snapshot);
                    if changed {
                        return ReconcileReport {
                            attempts: attempt,
                            converged: true,
                            latest,
                        };
                    }
                }
                Err(err) => warn!(attempt, ?err, "balance read failed"),
            }
        }
        ReconcileReport {
            attempts,
            converged: false,
            latest,
        }
    }
}
