use crate::core::account::AccountId;
use crate::core::ErrorKind;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The underlying asset a vault manages. Amounts are in native units,
/// i.e. with `decimals()` digits of precision.
pub trait FungibleAsset {
    fn decimals(&self) -> u8;
    fn balance_of(&self, account: &AccountId) -> u128;
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), TokenError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("{account} holds {balance}, cannot transfer {requested}")]
    InsufficientBalance {
        account: AccountId,
        balance: u128,
        requested: u128,
    },
    #[error("balance of {0} would overflow")]
    BalanceOverflow(AccountId),
}

impl TokenError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::External
    }
}

/// Plain balance map implementing [`FungibleAsset`], for simulations and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryToken {
    symbol: String,
    decimals: u8,
    balances: BTreeMap<AccountId, u128>,
}

impl InMemoryToken {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            balances: BTreeMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn mint(&mut self, account: &AccountId, amount: u128) -> Result<(), TokenError> {
        let balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TokenError::BalanceOverflow(account.clone()))?;
        Ok(())
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().sum()
    }
}

impl FungibleAsset for InMemoryToken {
    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), TokenError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: from.clone(),
                balance,
                requested: amount,
            });
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| TokenError::BalanceOverflow(to.clone()))?;
        if from != to {
            self.balances.insert(from.clone(), balance - amount);
            self.balances.insert(to.clone(), credited);
        }
        debug!("{} transfer {} -> {}: {}", self.symbol, from, to, amount);
        Ok(())
    }
}
