use crate::core::account::AccountId;
use crate::math::{MathError, Wad};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vault share balances per holder.
///
/// Zero balances are dropped, so `holders()` only lists accounts that
/// still own part of the vault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareLedger {
    balances: BTreeMap<AccountId, Wad>,
    total_supply: Wad,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, account: &AccountId, shares: Wad) -> Result<(), MathError> {
        let total_supply = self.total_supply.checked_add(shares)?;
        let balance = self.balance_of(account).checked_add(shares)?;
        self.balances.insert(account.clone(), balance);
        self.total_supply = total_supply;
        Ok(())
    }

    pub fn burn(&mut self, account: &AccountId, shares: Wad) -> Result<(), MathError> {
        let balance = self.balance_of(account).checked_sub(shares)?;
        let total_supply = self.total_supply.checked_sub(shares)?;
        if balance.is_zero() {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.clone(), balance);
        }
        self.total_supply = total_supply;
        Ok(())
    }

    pub fn balance_of(&self, account: &AccountId) -> Wad {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> Wad {
        self.total_supply
    }

    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Wad)> {
        self.balances.iter()
    }

    /// Holder balances add up to the total supply.
    pub fn is_consistent(&self) -> bool {
        self.balances
            .values()
            .try_fold(Wad::ZERO, |acc, b| acc.checked_add(*b))
            .map(|sum| sum == self.total_supply)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mint_and_burn() {
        let lp = AccountId::new("lp-1");
        let mut ledger = ShareLedger::new();
        ledger.mint(&lp, Wad::from_units(10)).unwrap();
        ledger.mint(&AccountId::new("lp-2"), Wad::from_units(5)).unwrap();
        ledger.burn(&lp, Wad::from_units(4)).unwrap();
        assert_eq!(ledger.balance_of(&lp), Wad::from_units(6));
        assert_eq!(ledger.total_supply(), Wad::from_units(11));
        assert!(ledger.is_consistent());
    }

    #[test]
    fn test_burn_more_than_held_fails_without_effect() {
        let lp = AccountId::new("lp-1");
        let mut ledger = ShareLedger::new();
        ledger.mint(&lp, Wad::from_decimal(dec!(1.5)).unwrap()).unwrap();
        assert_eq!(ledger.burn(&lp, Wad::from_units(2)), Err(MathError::Underflow));
        assert_eq!(ledger.total_supply(), Wad::from_decimal(dec!(1.5)).unwrap());
    }

    #[test]
    fn test_burning_everything_drops_holder() {
        let lp = AccountId::new("lp-1");
        let mut ledger = ShareLedger::new();
        ledger.mint(&lp, Wad::ONE).unwrap();
        ledger.burn(&lp, Wad::ONE).unwrap();
        assert_eq!(ledger.holders().count(), 0);
        assert!(ledger.total_supply().is_zero());
    }
}
