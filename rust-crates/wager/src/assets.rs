use crate::{
    error::{
        Error,
        Result,
    },
    ledger::{
        ObjectId,
        TokenObject,
    },
    transaction::{
        Argument,
        Command,
        PureValue,
        TransactionDescription,
    },
};

/// How a wager is funded from the player's token objects: every other object
/// is merged into `primary`, then `amount` is split off it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendPlan {
    pub primary: ObjectId,
    pub merged: Vec<ObjectId>,
    pub amount: u64,
    pub total: u64,
}

impl SpendPlan {
    /// What stays with the account after the split.
    pub fn remainder(&self) -> u64 {
        self.total - self.amount
    }

    /// Emits the merge (when needed) and split commands and returns the
    /// argument referring to the split-off coin.
    pub fn append_to(&self, tx: &mut TransactionDescription) -> Argument {
        let primary = Argument::object(&self.primary);
        if !self.merged.is_empty() {
            tx.push(Command::MergeCoins {
                destination: primary.clone(),
                sources: self.merged.iter().map(Argument::object).collect(),
            });
        }
        let split = tx.push(Command::SplitCoins {
            coin: primary,
            amounts: vec![Argument::pure(PureValue::U64(self.amount))],
        });
        Argument::NestedResult {
            command: split,
            index: 0,
        }
    }
}

/// Picks the token objects that fund `amount`. Fails before anything is
/// built when the holdings cannot cover it.
pub fn select(holdings: &[TokenObject], amount: u64) -> Result<SpendPlan> {
    if amount == 0 {
        return Err(Error::ZeroAmount);
    }
    let mut spendable: Vec<&TokenObject> =
        holdings.iter().filter(|coin| coin.balance > 0).collect();
    let total: u128 = spendable.iter().map(|coin| coin.balance as u128).sum();
    let total = u64::try_from(total).unwrap_or(u64::MAX);
    if total < amount {
        return Err(Error::InsufficientFunds {
            required: amount,
            available: total,
        });
    }

    spendable.sort_by(|a, b| b.balance.cmp(&a.balance));
    let (primary, rest) = spendable
        .split_first()
        .ok_or(Error::InsufficientFunds {
            required: amount,
            available: 0,
        })?;

    Ok(SpendPlan {
        primary: primary.id.clone(),
        merged: rest.iter().map(|coin| coin.id.clone()).collect(),
        amount,
        total,
    })
}
