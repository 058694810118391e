use crate::core::account::AccountId;
use crate::core::ErrorKind;
use crate::math::{MathError, Wad};
use crate::oracle::index::accrue_ibt_price;
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Adapter to an external yield source. Amounts are in WAD.
///
/// `deposit` and `withdraw` return the amount actually moved, which may
/// be less than requested when the adapter is capacity-bound.
pub trait StrategyPort: fmt::Debug {
    fn deposit(&mut self, amount: Wad) -> Result<Wad, StrategyError>;
    fn withdraw(&mut self, amount: Wad) -> Result<Wad, StrategyError>;
    fn balance_of(&self) -> Wad;
    /// Current annual yield, e.g. 0.04 for 4%.
    fn get_apr(&self) -> Wad;

    /// Part of the balance that can be withdrawn right now.
    fn available_liquidity(&self) -> Wad {
        self.balance_of()
    }

    /// Sends accumulated reward tokens to `treasury`, returning the amount.
    fn claim(&mut self, treasury: &AccountId) -> Result<Wad, StrategyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("strategy holds {available} available, {requested} requested")]
    InsufficientLiquidity { requested: Wad, available: Wad },
    #[error("withdrew {received} of {requested}")]
    ShortWithdrawal { requested: Wad, received: Wad },
    #[error("strategy is paused")]
    Paused,
    #[error("strategy math failed: {0}")]
    Math(#[from] MathError),
}

impl StrategyError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::External
    }
}

#[derive(Debug, Default)]
struct SimulatedState {
    apr: Wad,
    balance: Wad,
    capacity: Option<Wad>,
    liquidity_cap: Option<Wad>,
    rewards: Wad,
    claimed: BTreeMap<AccountId, Wad>,
    paused: bool,
}

/// In-memory [`StrategyPort`].
///
/// Clones share state, so a test or simulation can keep a handle to a
/// strategy after handing it to a vault and move its APR, accrue yield
/// or pause it. Balances are bookkeeping only; the tokens themselves stay
/// on the vault's account.
#[derive(Debug, Clone, Default)]
pub struct SimulatedStrategy {
    state: Rc<RefCell<SimulatedState>>,
}

impl SimulatedStrategy {
    pub fn new(apr: Wad) -> Self {
        let strategy = Self::default();
        strategy.state.borrow_mut().apr = apr;
        strategy
    }

    /// Caps the total balance the strategy accepts.
    pub fn with_capacity(self, capacity: Wad) -> Self {
        self.state.borrow_mut().capacity = Some(capacity);
        self
    }

    /// Caps how much can be withdrawn at once.
    pub fn with_liquidity_cap(self, cap: Wad) -> Self {
        self.state.borrow_mut().liquidity_cap = Some(cap);
        self
    }

    pub fn set_apr(&self, apr: Wad) {
        self.state.borrow_mut().apr = apr;
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.borrow_mut().paused = paused;
    }

    pub fn balance(&self) -> Wad {
        self.state.borrow().balance
    }

    /// Grows the balance by `elapsed` seconds of simple interest at the
    /// current APR and returns the yield.
    pub fn accrue(&self, elapsed: u64) -> Result<Wad, MathError> {
        let mut state = self.state.borrow_mut();
        let grown = accrue_ibt_price(state.balance, state.apr, elapsed)?;
        let earned = grown.checked_sub(state.balance)?;
        state.balance = grown;
        Ok(earned)
    }

    pub fn add_rewards(&self, amount: Wad) -> Result<(), MathError> {
        let mut state = self.state.borrow_mut();
        state.rewards = state.rewards.checked_add(amount)?;
        Ok(())
    }

    pub fn claimed_by(&self, account: &AccountId) -> Wad {
        self.state
            .borrow()
            .claimed
            .get(account)
            .copied()
            .unwrap_or_default()
    }
}

impl StrategyPort for SimulatedStrategy {
    fn deposit(&mut self, amount: Wad) -> Result<Wad, StrategyError> {
        let mut state = self.state.borrow_mut();
        if state.paused {
            return Err(StrategyError::Paused);
        }
        let accepted = match state.capacity {
            Some(capacity) => amount.min(capacity.saturating_sub(state.balance)),
            None => amount,
        };
        state.balance = state.balance.checked_add(accepted)?;
        debug!("simulated strategy accepted {} of {}", accepted, amount);
        Ok(accepted)
    }

    fn withdraw(&mut self, amount: Wad) -> Result<Wad, StrategyError> {
        let available = self.available_liquidity();
        let mut state = self.state.borrow_mut();
        if state.paused {
            return Err(StrategyError::Paused);
        }
        if amount > available {
            return Err(StrategyError::InsufficientLiquidity {
                requested: amount,
                available,
            });
        }
        state.balance = state.balance.checked_sub(amount)?;
        Ok(amount)
    }

    fn balance_of(&self) -> Wad {
        self.state.borrow().balance
    }

    fn get_apr(&self) -> Wad {
        self.state.borrow().apr
    }

    fn available_liquidity(&self) -> Wad {
        let state = self.state.borrow();
        match state.liquidity_cap {
            Some(cap) => state.balance.min(cap),
            None => state.balance,
        }
    }

    fn claim(&mut self, treasury: &AccountId) -> Result<Wad, StrategyError> {
        let mut state = self.state.borrow_mut();
        let rewards = std::mem::take(&mut state.rewards);
        let claimed = state.claimed.entry(treasury.clone()).or_default();
        *claimed = claimed.checked_add(rewards)?;
        Ok(rewards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SECONDS_PER_YEAR;
    use rust_decimal_macros::dec;

    fn wad(d: rust_decimal::Decimal) -> Wad {
        Wad::from_decimal(d).unwrap()
    }

    #[test]
    fn test_handle_shares_state() {
        let strategy = SimulatedStrategy::new(wad(dec!(0.04)));
        let mut port: Box<dyn StrategyPort> = Box::new(strategy.clone());
        port.deposit(wad(dec!(100))).unwrap();
        assert_eq!(strategy.balance(), wad(dec!(100)));
        strategy.set_apr(wad(dec!(0.07)));
        assert_eq!(port.get_apr(), wad(dec!(0.07)));
    }

    #[test]
    fn test_capacity_limits_deposit() {
        let mut strategy = SimulatedStrategy::new(Wad::ZERO).with_capacity(wad(dec!(50)));
        assert_eq!(strategy.deposit(wad(dec!(80))).unwrap(), wad(dec!(50)));
        assert_eq!(strategy.deposit(wad(dec!(1))).unwrap(), Wad::ZERO);
    }

    #[test]
    fn test_liquidity_cap_limits_withdrawal() {
        let mut strategy = SimulatedStrategy::new(Wad::ZERO).with_liquidity_cap(wad(dec!(10)));
        strategy.deposit(wad(dec!(100))).unwrap();
        assert_eq!(strategy.available_liquidity(), wad(dec!(10)));
        assert!(matches!(
            strategy.withdraw(wad(dec!(11))),
            Err(StrategyError::InsufficientLiquidity { .. })
        ));
        assert_eq!(strategy.withdraw(wad(dec!(10))).unwrap(), wad(dec!(10)));
    }

    #[test]
    fn test_accrue_simple_interest() {
        let mut strategy = SimulatedStrategy::new(wad(dec!(0.04)));
        strategy.deposit(wad(dec!(1000))).unwrap();
        let earned = strategy.accrue(SECONDS_PER_YEAR / 2).unwrap();
        assert_eq!(earned, wad(dec!(20)));
        assert_eq!(strategy.balance_of(), wad(dec!(1020)));
    }

    #[test]
    fn test_paused_strategy_rejects_moves() {
        let mut strategy = SimulatedStrategy::new(Wad::ZERO);
        strategy.set_paused(true);
        assert_eq!(strategy.deposit(Wad::ONE), Err(StrategyError::Paused));
    }

    #[test]
    fn test_claim_drains_rewards() {
        let treasury = AccountId::new("treasury");
        let mut strategy = SimulatedStrategy::new(Wad::ZERO);
        strategy.add_rewards(wad(dec!(3.5))).unwrap();
        assert_eq!(strategy.claim(&treasury).unwrap(), wad(dec!(3.5)));
        assert_eq!(strategy.claim(&treasury).unwrap(), Wad::ZERO);
        assert_eq!(strategy.claimed_by(&treasury), wad(dec!(3.5)));
    }
}
