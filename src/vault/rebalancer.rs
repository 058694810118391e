use super::{FungibleAsset, ShareLedger, StrategyError, StrategyPort, VaultError};
use crate::auth::{ensure_owner, AccessRegistry, Authorizer};
use crate::config::VaultConfig;
use crate::core::account::AccountId;
use crate::core::strategy::StrategyId;
use crate::math::{from_wad, mul_div, to_wad, wad_mul, Rounding, Wad};
use ethnum::U256;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// What a call to [`VaultRebalancer::rebalance`] moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RebalanceOutcome {
    /// Working capital was already on target, to within one native unit.
    Unchanged,
    /// Assets left the vault to top up working capital.
    Withdrawn { amount: Wad, shares: Wad },
    /// Surplus working capital was deposited.
    Deposited { amount: Wad, shares: Wad },
}

#[derive(Debug, Clone, Copy)]
enum DrawOrder {
    /// Keeps capital in the best-yielding strategies.
    LowestAprFirst,
    HighestBalanceFirst,
}

#[derive(Debug, Default)]
struct WithdrawalPlan {
    from_buffer: Wad,
    legs: Vec<(StrategyId, Wad)>,
}

/// Share-based vault spreading one asset over several yield strategies.
///
/// All accounting is in WAD. Token movements between callers and the
/// vault's own account go through the [`FungibleAsset`] collaborator in
/// native units, and only the amount representable in native precision
/// is ever credited.
///
/// Every operation takes `&mut self` and either commits completely or
/// leaves the vault as it found it. Strategy legs that already ran when
/// a later external call fails are reverted.
#[derive(Debug)]
pub struct VaultRebalancer<T: FungibleAsset, A: Authorizer = AccessRegistry> {
    access: A,
    token: T,
    account: AccountId,
    target_utilization_ratio: Wad,
    treasury: Option<AccountId>,
    strategies: BTreeMap<StrategyId, Box<dyn StrategyPort>>,
    shares: ShareLedger,
    buffer: Wad,
}

impl<T: FungibleAsset, A: Authorizer> VaultRebalancer<T, A> {
    /// Creates an empty vault holding its tokens on `account`.
    pub fn new(config: &VaultConfig, account: AccountId, token: T, access: A) -> Result<Self, VaultError> {
        let target_utilization_ratio = Wad::from_decimal(config.target_utilization_ratio)?;
        if target_utilization_ratio > Wad::ONE {
            return Err(VaultError::InvalidRatio(target_utilization_ratio));
        }
        if config.asset_decimals != token.decimals() {
            return Err(VaultError::DecimalsMismatch {
                configured: config.asset_decimals,
                token: token.decimals(),
            });
        }
        Ok(Self {
            access,
            token,
            account,
            target_utilization_ratio,
            treasury: config.treasury.clone(),
            strategies: BTreeMap::new(),
            shares: ShareLedger::new(),
            buffer: Wad::ZERO,
        })
    }

    pub fn register_strategy(
        &mut self,
        caller: &AccountId,
        id: StrategyId,
        strategy: Box<dyn StrategyPort>,
    ) -> Result<(), VaultError> {
        ensure_owner(&self.access, caller)?;
        if self.strategies.contains_key(&id) {
            return Err(VaultError::StrategyAlreadyRegistered(id));
        }
        if !strategy.balance_of().is_zero() {
            return Err(VaultError::StrategyNotEmpty(id));
        }
        info!("registered strategy {} at apr {}", id, strategy.get_apr());
        self.strategies.insert(id, strategy);
        Ok(())
    }

    /// Pulls the strategy's whole balance into the buffer and forgets it.
    pub fn remove_strategy(&mut self, caller: &AccountId, id: &StrategyId) -> Result<Wad, VaultError> {
        ensure_owner(&self.access, caller)?;
        let strategy = self
            .strategies
            .get_mut(id)
            .ok_or_else(|| VaultError::UnknownStrategy(id.clone()))?;
        let balance = strategy.balance_of();
        let buffer = self.buffer.checked_add(balance)?;
        if !balance.is_zero() {
            let received = strategy
                .withdraw(balance)
                .map_err(|source| VaultError::Strategy { id: id.clone(), source })?;
            if received != balance {
                self.compensate(&[(id.clone(), received)]);
                return Err(VaultError::Strategy {
                    id: id.clone(),
                    source: StrategyError::ShortWithdrawal {
                        requested: balance,
                        received,
                    },
                });
            }
        }
        self.strategies.remove(id);
        self.buffer = buffer;
        info!("removed strategy {}, {} moved to the buffer", id, balance);
        Ok(balance)
    }

    pub fn set_target_utilization_ratio(&mut self, caller: &AccountId, ratio: Wad) -> Result<(), VaultError> {
        ensure_owner(&self.access, caller)?;
        if ratio > Wad::ONE {
            return Err(VaultError::InvalidRatio(ratio));
        }
        info!("target utilization ratio {} -> {}", self.target_utilization_ratio, ratio);
        self.target_utilization_ratio = ratio;
        Ok(())
    }

    pub fn set_treasury(&mut self, caller: &AccountId, treasury: Option<AccountId>) -> Result<(), VaultError> {
        ensure_owner(&self.access, caller)?;
        self.treasury = treasury;
        Ok(())
    }

    /// Deposits `amount` for `caller` and returns the shares minted.
    ///
    /// The assets go to the strategy with the highest APR (lowest id on a
    /// tie); whatever it does not accept stays in the buffer.
    pub fn deposit(&mut self, caller: &AccountId, amount: Wad) -> Result<Wad, VaultError> {
        self.deposit_for(caller, amount).map(|(_, minted)| minted)
    }

    /// Withdraws `amount` to `caller` and returns the shares burned.
    ///
    /// Draws on the buffer first, then on strategies from the lowest APR up.
    pub fn withdraw(&mut self, caller: &AccountId, amount: Wad) -> Result<Wad, VaultError> {
        self.withdraw_for(caller, amount, DrawOrder::LowestAprFirst)
            .map(|(_, burned)| burned)
    }

    /// Moves assets between the vault and `working_capital` so that the
    /// latter ends at `target_utilization_ratio` of the combined total.
    ///
    /// The caller is the holder of the working capital: a deficit is
    /// redeemed from its shares, drawing on the largest strategy balances
    /// first, and a surplus is deposited from its token balance.
    pub fn rebalance(&mut self, caller: &AccountId, working_capital: Wad) -> Result<RebalanceOutcome, VaultError> {
        ensure_owner(&self.access, caller)?;
        let total = working_capital.checked_add(self.total_managed_assets()?)?;
        let target = wad_mul(self.target_utilization_ratio, total)?;
        let decimals = self.token.decimals();

        let outcome = if working_capital < target {
            let deficit = target.checked_sub(working_capital)?;
            if from_wad(deficit, decimals)? == 0 {
                RebalanceOutcome::Unchanged
            } else {
                let (amount, shares) = self.withdraw_for(caller, deficit, DrawOrder::HighestBalanceFirst)?;
                RebalanceOutcome::Withdrawn { amount, shares }
            }
        } else {
            let surplus = working_capital.checked_sub(target)?;
            if from_wad(surplus, decimals)? == 0 {
                RebalanceOutcome::Unchanged
            } else {
                let (amount, shares) = self.deposit_for(caller, surplus)?;
                RebalanceOutcome::Deposited { amount, shares }
            }
        };
        info!(
            "rebalance: working capital {} against target {}: {:?}",
            working_capital, target, outcome
        );
        Ok(outcome)
    }

    /// Harvests the strategy's rewards to the treasury. Principal is untouched.
    pub fn claim(&mut self, caller: &AccountId, id: &StrategyId) -> Result<Wad, VaultError> {
        ensure_owner(&self.access, caller)?;
        let treasury = self.treasury.as_ref().ok_or(VaultError::TreasuryNotSet)?;
        let strategy = self
            .strategies
            .get_mut(id)
            .ok_or_else(|| VaultError::UnknownStrategy(id.clone()))?;
        let claimed = strategy
            .claim(treasury)
            .map_err(|source| VaultError::Strategy { id: id.clone(), source })?;
        info!("claimed {} from strategy {} to {}", claimed, id, treasury);
        Ok(claimed)
    }

    /// Buffer plus every strategy balance.
    pub fn total_managed_assets(&self) -> Result<Wad, VaultError> {
        let mut total = self.buffer;
        for strategy in self.strategies.values() {
            total = total.checked_add(strategy.balance_of())?;
        }
        Ok(total)
    }

    pub fn total_shares(&self) -> Wad {
        self.shares.total_supply()
    }

    pub fn shares_of(&self, account: &AccountId) -> Wad {
        self.shares.balance_of(account)
    }

    pub fn share_ledger(&self) -> &ShareLedger {
        &self.shares
    }

    /// Assets `account` could withdraw at the current exchange rate.
    pub fn redeemable_value(&self, account: &AccountId) -> Result<Wad, VaultError> {
        let total_shares = self.shares.total_supply();
        if total_shares.is_zero() {
            return Ok(Wad::ZERO);
        }
        let total = self.total_managed_assets()?;
        let value = mul_div(
            self.shares.balance_of(account).raw(),
            total.raw(),
            total_shares.raw(),
            Rounding::Down,
        )?;
        Ok(Wad::from_raw(value))
    }

    pub fn strategy_balances(&self) -> BTreeMap<StrategyId, Wad> {
        self.strategies
            .iter()
            .map(|(id, strategy)| (id.clone(), strategy.balance_of()))
            .collect()
    }

    pub fn buffer(&self) -> Wad {
        self.buffer
    }

    pub fn target_utilization_ratio(&self) -> Wad {
        self.target_utilization_ratio
    }

    pub fn treasury(&self) -> Option<&AccountId> {
        self.treasury.as_ref()
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    /// Share of the combined total held as working capital.
    pub fn utilization(&self, working_capital: Wad) -> Result<f64, VaultError> {
        let total = working_capital.checked_add(self.total_managed_assets()?)?;
        if total.is_zero() {
            return Ok(0.0);
        }
        Ok(working_capital.to_f64() / total.to_f64())
    }

    fn deposit_for(&mut self, caller: &AccountId, amount: Wad) -> Result<(Wad, Wad), VaultError> {
        let (native, credited) = self.native_amount(amount)?;
        let total_shares = self.shares.total_supply();
        let minted = if total_shares.is_zero() {
            credited
        } else {
            let total = self.total_managed_assets()?;
            Wad::from_raw(mul_div(
                credited.raw(),
                total_shares.raw(),
                total.raw(),
                Rounding::Down,
            )?)
        };
        if minted.is_zero() {
            return Err(VaultError::ZeroAmount);
        }
        let mut shares = self.shares.clone();
        shares.mint(caller, minted)?;
        let buffer_limit = self.buffer.checked_add(credited)?;

        self.token.transfer(caller, &self.account, native)?;
        let to_buffer = match self.place(credited) {
            Ok(rest) => rest,
            Err(e) => {
                self.refund(caller, native);
                return Err(e);
            }
        };
        // to_buffer never exceeds credited, so this is buffer + to_buffer
        self.buffer = buffer_limit.saturating_sub(credited.saturating_sub(to_buffer));
        self.shares = shares;
        info!(
            "{} deposited {} for {} shares ({} kept in buffer)",
            caller, credited, minted, to_buffer
        );
        Ok((credited, minted))
    }

    fn withdraw_for(
        &mut self,
        caller: &AccountId,
        amount: Wad,
        order: DrawOrder,
    ) -> Result<(Wad, Wad), VaultError> {
        let (_, requested) = self.native_amount(amount)?;
        let total_shares = self.shares.total_supply();
        let total = self.total_managed_assets()?;
        let redeemable = self.redeemable_value(caller)?;
        // minting rounds down, so a fresh deposit can redeem up to one
        // share's worth less than it brought in
        let within_reach = redeemable.checked_add(self.share_value(total, total_shares)?)?;
        if redeemable.is_zero() || requested > within_reach {
            return Err(VaultError::InsufficientShares {
                requested,
                redeemable,
            });
        }
        let requested = requested.min(redeemable);

        let burned = Wad::from_raw(mul_div(
            requested.raw(),
            total_shares.raw(),
            total.raw(),
            Rounding::Up,
        )?)
        .min(self.shares.balance_of(caller));
        // the last shares out take everything left
        let payout = if burned == total_shares { total } else { requested };
        let decimals = self.token.decimals();
        let native = from_wad(payout, decimals)?;
        if native == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let payout = to_wad(native, decimals)?;

        let plan = self.plan_withdrawal(payout, order)?;
        let mut shares = self.shares.clone();
        shares.burn(caller, burned)?;
        let buffer = self.buffer.checked_sub(plan.from_buffer)?;

        self.execute(&plan)?;
        if let Err(e) = self.token.transfer(&self.account, caller, native) {
            self.compensate(&plan.legs);
            return Err(e.into());
        }
        self.buffer = buffer;
        self.shares = shares;
        info!(
            "{} withdrew {} burning {} shares ({} legs)",
            caller,
            payout,
            burned,
            plan.legs.len()
        );
        Ok((payout, burned))
    }

    /// Assets backing one share wei, rounded up.
    fn share_value(&self, total: Wad, total_shares: Wad) -> Result<Wad, VaultError> {
        if total_shares.is_zero() {
            return Ok(Wad::ZERO);
        }
        let value = mul_div(U256::ONE, total.raw(), total_shares.raw(), Rounding::Up)?;
        Ok(Wad::from_raw(value))
    }

    /// Native amount and its exact WAD value; below one native unit is zero.
    fn native_amount(&self, amount: Wad) -> Result<(u128, Wad), VaultError> {
        let decimals = self.token.decimals();
        let native = from_wad(amount, decimals)?;
        if native == 0 {
            return Err(VaultError::ZeroAmount);
        }
        Ok((native, to_wad(native, decimals)?))
    }

    fn best_strategy(&self) -> Option<StrategyId> {
        let mut best: Option<(&StrategyId, Wad)> = None;
        for (id, strategy) in &self.strategies {
            let apr = strategy.get_apr();
            if best.map_or(true, |(_, top)| apr > top) {
                best = Some((id, apr));
            }
        }
        best.map(|(id, _)| id.clone())
    }

    /// Sends `amount` to the best strategy, returning what it left over.
    fn place(&mut self, amount: Wad) -> Result<Wad, VaultError> {
        let Some(id) = self.best_strategy() else {
            return Ok(amount);
        };
        let strategy = self
            .strategies
            .get_mut(&id)
            .ok_or_else(|| VaultError::UnknownStrategy(id.clone()))?;
        let moved = strategy
            .deposit(amount)
            .map_err(|source| VaultError::Strategy { id: id.clone(), source })?;
        debug!("placed {} of {} in strategy {}", moved, amount, id);
        Ok(amount.saturating_sub(moved))
    }

    fn plan_withdrawal(&self, amount: Wad, order: DrawOrder) -> Result<WithdrawalPlan, VaultError> {
        let from_buffer = self.buffer.min(amount);
        let mut remaining = amount.checked_sub(from_buffer)?;

        let mut candidates: Vec<(&StrategyId, Wad, Wad)> = self
            .strategies
            .iter()
            .map(|(id, s)| {
                let rank = match order {
                    DrawOrder::LowestAprFirst => s.get_apr(),
                    DrawOrder::HighestBalanceFirst => s.balance_of(),
                };
                (id, rank, s.available_liquidity())
            })
            .collect();
        match order {
            DrawOrder::LowestAprFirst => candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0))),
            DrawOrder::HighestBalanceFirst => {
                candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            }
        }

        let mut available = from_buffer;
        let mut legs = Vec::new();
        for (id, _, liquidity) in candidates {
            available = available.checked_add(liquidity)?;
            let take = liquidity.min(remaining);
            if take.is_zero() {
                continue;
            }
            legs.push((id.clone(), take));
            remaining = remaining.checked_sub(take)?;
        }
        if !remaining.is_zero() {
            return Err(VaultError::InsufficientLiquidity {
                requested: amount,
                available,
            });
        }
        Ok(WithdrawalPlan { from_buffer, legs })
    }

    fn execute(&mut self, plan: &WithdrawalPlan) -> Result<(), VaultError> {
        let mut done: Vec<(StrategyId, Wad)> = Vec::with_capacity(plan.legs.len());
        for (id, amount) in &plan.legs {
            let result = match self.strategies.get_mut(id) {
                Some(strategy) => strategy.withdraw(*amount),
                None => {
                    self.compensate(&done);
                    return Err(VaultError::UnknownStrategy(id.clone()));
                }
            };
            let failure = match result {
                Ok(received) if received == *amount => {
                    debug!("withdrew {} from strategy {}", received, id);
                    done.push((id.clone(), received));
                    continue;
                }
                Ok(received) => {
                    done.push((id.clone(), received));
                    StrategyError::ShortWithdrawal {
                        requested: *amount,
                        received,
                    }
                }
                Err(source) => source,
            };
            self.compensate(&done);
            return Err(VaultError::Strategy {
                id: id.clone(),
                source: failure,
            });
        }
        Ok(())
    }

    /// Puts already withdrawn legs back. Whatever a strategy refuses
    /// is parked in the buffer so the managed total is preserved.
    fn compensate(&mut self, legs: &[(StrategyId, Wad)]) {
        for (id, amount) in legs.iter().rev() {
            warn!("returning {} to strategy {} after a failed withdrawal", amount, id);
            let returned = match self.strategies.get_mut(id) {
                Some(strategy) => strategy.deposit(*amount).unwrap_or_else(|e| {
                    error!("strategy {} refused compensation: {}", id, e);
                    Wad::ZERO
                }),
                None => Wad::ZERO,
            };
            let leftover = amount.saturating_sub(returned);
            if leftover.is_zero() {
                continue;
            }
            match self.buffer.checked_add(leftover) {
                Ok(buffer) => self.buffer = buffer,
                Err(e) => error!("could not park {} in the buffer: {}", leftover, e),
            }
        }
    }

    fn refund(&mut self, caller: &AccountId, native: u128) {
        warn!("refunding {} native units to {}", native, caller);
        if let Err(e) = self.token.transfer(&self.account, caller, native) {
            error!("refund to {} failed: {}", caller, e);
        }
    }
}
