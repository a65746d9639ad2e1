use crate::{
    error::{
        Error,
        Result,
    },
    reconciler::ReconcilePolicy,
    transaction::GameContract,
};
use std::time::Duration;

pub const DEFAULT_DECIMALS: u8 = 9;
pub const DEFAULT_STAKES: [u64; 5] = [1, 5, 10, 50, 100];
pub const DEFAULT_MINT_FEE: u64 = 150;
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

/// A stake the player picked, in whole tokens and in base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wager {
    pub whole: u64,
    pub base_units: u64,
}

/// The fixed set of stakes offered, in whole tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeTable {
    allowed: Vec<u64>,
    decimals: u8,
}

impl Default for StakeTable {
    fn default() -> Self {
        Self::new(DEFAULT_STAKES.to_vec(), DEFAULT_DECIMALS)
    }
}

impl StakeTable {
    pub fn new(mut allowed: Vec<u64>, decimals: u8) -> Self {
        allowed.retain(|stake| *stake > 0);
        allowed.sort_unstable();
        allowed.dedup();
        Self { allowed, decimals }
    }

    pub fn allowed(&self) -> &[u64] {
        &self.allowed
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn wager(&self, whole: u64) -> Result<Wager> {
        if !self.allowed.contains(&whole) {
            return Err(Error::StakeNotAllowed(whole));
        }
        Ok(Wager {
            whole,
            base_units: self.to_base_units(whole)?,
        })
    }

    pub fn to_base_units(&self, whole: u64) -> Result<u64> {
        10u64
            .checked_pow(self.decimals as u32)
            .and_then(|scale| whole.checked_mul(scale))
            .ok_or(Error::AmountOverflow(whole))
    }
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub contract: GameContract,
    pub stakes: StakeTable,
    /// Whole tokens charged to mint a collectible.
    pub mint_fee: u64,
    pub reconcile: ReconcilePolicy,
    pub submit_timeout: Duration,
}

impl GameConfig {
    pub fn new(contract: GameContract) -> Self {
        Self {
            contract,
            stakes: StakeTable::default(),
            mint_fee: DEFAULT_MINT_FEE,
            reconcile: ReconcilePolicy::default(),
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn wager__scales_allowed_stakes_by_decimals() {
        // given
        let table = StakeTable::default();

        // when
        let wager = table.wager(10).unwrap();

        // then
        assert_eq!(wager.whole, 10);
        assert_eq!(wager.base_units, 10_000_000_000);
    }

    #[test]
    fn wager__rejects_stakes_outside_the_table() {
        let table = StakeTable::new(vec![5, 1, 5, 0], 0);
        assert_eq!(table.allowed(), &[1, 5]);
        assert_eq!(table.wager(2), Err(Error::StakeNotAllowed(2)));
        assert_eq!(table.wager(0), Err(Error::StakeNotAllowed(0)));
    }

    #[test]
    fn to_base_units__reports_overflow() {
        let table = StakeTable::default();
        assert_eq!(
            table.to_base_units(u64::MAX),
            Err(Error::AmountOverflow(u64::MAX))
        );
    }
}
