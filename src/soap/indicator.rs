use super::{SoapError, SwapDirection};
use crate::core::Timestamp;
use crate::math::{SignedWad, Wad, SECONDS_PER_YEAR, WAD};
use ethnum::U256;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Aggregate of every open swap on one side of one asset's market.
///
/// `quasi_hypothetical_interest_cumulative` is the fixed-leg interest
/// accrued so far, kept as `notional * rate * seconds` (scaled by
/// 10^36 · seconds) and only divided down when a valuation is taken.
///
/// All operations are pure: they return the next state and leave `self`
/// untouched, so a failed call has no effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapIndicatorState {
    pub rebalance_timestamp: Timestamp,
    pub total_notional: Wad,
    pub total_ibt_quantity: Wad,
    /// Notional-weighted fixed rate of the aggregate.
    pub average_interest_rate: Wad,
    pub quasi_hypothetical_interest_cumulative: Wad,
}

impl SoapIndicatorState {
    /// True when no position is open on this side.
    pub fn is_empty(&self) -> bool {
        self.total_notional.is_zero()
    }

    /// Canonical empty aggregate, rebalanced at `timestamp`.
    pub fn empty_at(timestamp: Timestamp) -> Self {
        Self {
            rebalance_timestamp: timestamp,
            ..Self::default()
        }
    }

    /// Cumulative fixed-leg interest advanced to `timestamp`.
    pub fn quasi_hypothetical_interest_total(&self, timestamp: Timestamp) -> Result<Wad, SoapError> {
        let elapsed = self.elapsed_until(timestamp)?;
        let delta = quasi_hypothetical_interest(self.total_notional, self.average_interest_rate, elapsed)?;
        Ok(self.quasi_hypothetical_interest_cumulative.checked_add(delta)?)
    }

    /// Adds a freshly opened position to the aggregate.
    pub fn rebalance_when_open_position(
        &self,
        timestamp: Timestamp,
        notional: Wad,
        fixed_rate: Wad,
        ibt_quantity: Wad,
    ) -> Result<Self, SoapError> {
        if notional.is_zero() {
            return Err(SoapError::ZeroNotional);
        }
        if ibt_quantity.is_zero() {
            return Err(SoapError::ZeroIbtQuantity);
        }
        let quasi_cumulative = self.quasi_hypothetical_interest_total(timestamp)?;

        let total_notional = self.total_notional.checked_add(notional)?;
        let weighted = self
            .rate_weight()?
            .checked_add(position_weight(notional, fixed_rate)?)
            .ok_or(crate::math::MathError::Overflow)?;
        let average_interest_rate = Wad::from_raw(weighted / total_notional.raw());

        let next = Self {
            rebalance_timestamp: timestamp,
            total_notional,
            total_ibt_quantity: self.total_ibt_quantity.checked_add(ibt_quantity)?,
            average_interest_rate,
            quasi_hypothetical_interest_cumulative: quasi_cumulative,
        };
        debug!(
            "soap open: notional {} at {} -> aggregate {} at average {}",
            notional, fixed_rate, next.total_notional, next.average_interest_rate
        );
        Ok(next)
    }

    /// Removes a position opened at `open_timestamp` from the aggregate,
    /// including the fixed-leg interest it accrued while open.
    pub fn rebalance_when_close_position(
        &self,
        timestamp: Timestamp,
        notional: Wad,
        fixed_rate: Wad,
        ibt_quantity: Wad,
        open_timestamp: Timestamp,
    ) -> Result<Self, SoapError> {
        if open_timestamp > timestamp {
            return Err(SoapError::TimestampBeforeLastRebalance {
                timestamp,
                last_rebalance: open_timestamp,
            });
        }
        let quasi_cumulative = self.quasi_hypothetical_interest_total(timestamp)?;

        let total_notional = self
            .total_notional
            .checked_sub(notional)
            .map_err(|_| SoapError::InsufficientAggregateBalance { field: "notional" })?;
        let total_ibt_quantity = self
            .total_ibt_quantity
            .checked_sub(ibt_quantity)
            .map_err(|_| SoapError::InsufficientAggregateBalance { field: "IBT quantity" })?;

        match (total_notional.is_zero(), total_ibt_quantity.is_zero()) {
            (true, true) => {
                debug!("soap close: aggregate emptied at {}", timestamp);
                return Ok(Self::empty_at(timestamp));
            }
            (false, false) => {}
            _ => return Err(SoapError::InconsistentAggregate),
        }

        // truncating the average loses under one wei of rate per unit of notional
        let weighted = subtract_within_drift(
            self.rate_weight()?,
            position_weight(notional, fixed_rate)?,
            self.total_notional.raw(),
            "rate weight",
        )?;
        let average_interest_rate = Wad::from_raw(weighted / total_notional.raw());

        let held_for = timestamp - open_timestamp;
        let position_interest = quasi_hypothetical_interest(notional, fixed_rate, held_for)?;
        let interest_drift = self
            .total_notional
            .raw()
            .checked_mul(U256::from(held_for))
            .ok_or(crate::math::MathError::Overflow)?;
        let remaining_interest = Wad::from_raw(subtract_within_drift(
            quasi_cumulative.raw(),
            position_interest.raw(),
            interest_drift,
            "hypothetical interest",
        )?);

        let next = Self {
            rebalance_timestamp: timestamp,
            total_notional,
            total_ibt_quantity,
            average_interest_rate,
            quasi_hypothetical_interest_cumulative: remaining_interest,
        };
        debug!(
            "soap close: notional {} at {} -> aggregate {} at average {}",
            notional, fixed_rate, next.total_notional, next.average_interest_rate
        );
        Ok(next)
    }

    /// Mark-to-market of the side scaled by WAD · YEAR, i.e. before the
    /// final division by the year length.
    pub fn calculate_quasi_soap(
        &self,
        direction: SwapDirection,
        timestamp: Timestamp,
        ibt_price: Wad,
    ) -> Result<SignedWad, SoapError> {
        let year = U256::from(SECONDS_PER_YEAR);
        let quasi_cumulative = self.quasi_hypothetical_interest_total(timestamp)?;

        let floating_leg = self
            .total_ibt_quantity
            .raw()
            .checked_mul(ibt_price.raw())
            .and_then(|v| v.checked_mul(year))
            .ok_or(crate::math::MathError::Overflow)?;
        let fixed_leg = self
            .total_notional
            .raw()
            .checked_mul(U256::new(WAD))
            .and_then(|v| v.checked_mul(year))
            .and_then(|v| v.checked_add(quasi_cumulative.raw()))
            .ok_or(crate::math::MathError::Overflow)?;

        let payoff = match direction {
            SwapDirection::PayFixed => SignedWad::difference(floating_leg, fixed_leg)?,
            SwapDirection::ReceiveFixed => SignedWad::difference(fixed_leg, floating_leg)?,
        };
        Ok(payoff.checked_div_raw(U256::new(WAD))?)
    }

    /// Mark-to-market of the side in WAD. Positive means the protocol owes
    /// the traders on this side.
    pub fn calculate_soap(
        &self,
        direction: SwapDirection,
        timestamp: Timestamp,
        ibt_price: Wad,
    ) -> Result<SignedWad, SoapError> {
        let quasi = self.calculate_quasi_soap(direction, timestamp, ibt_price)?;
        Ok(quasi.checked_div_raw(U256::from(SECONDS_PER_YEAR))?)
    }

    fn rate_weight(&self) -> Result<U256, SoapError> {
        position_weight(self.total_notional, self.average_interest_rate)
    }

    fn elapsed_until(&self, timestamp: Timestamp) -> Result<u64, SoapError> {
        timestamp
            .checked_sub(self.rebalance_timestamp)
            .ok_or(SoapError::TimestampBeforeLastRebalance {
                timestamp,
                last_rebalance: self.rebalance_timestamp,
            })
    }
}

/// `aggregate - removed`, saturating at zero when the shortfall is no more
/// than `tolerance`, the most truncation can have lost. A larger shortfall
/// means the position was never part of the aggregate.
fn subtract_within_drift(
    aggregate: U256,
    removed: U256,
    tolerance: U256,
    field: &'static str,
) -> Result<U256, SoapError> {
    if let Some(rest) = aggregate.checked_sub(removed) {
        return Ok(rest);
    }
    let excess = removed - aggregate;
    if excess > tolerance {
        return Err(SoapError::InsufficientAggregateBalance { field });
    }
    warn!("soap close: {} short by {}, clamping to zero", field, excess);
    Ok(U256::ZERO)
}

/// `notional * rate`, scaled by 10^36.
fn position_weight(notional: Wad, rate: Wad) -> Result<U256, SoapError> {
    Ok(notional
        .raw()
        .checked_mul(rate.raw())
        .ok_or(crate::math::MathError::Overflow)?)
}

/// `notional * rate * elapsed`, scaled by 10^36 · seconds.
fn quasi_hypothetical_interest(notional: Wad, rate: Wad, elapsed: u64) -> Result<Wad, SoapError> {
    let interest = position_weight(notional, rate)?
        .checked_mul(U256::from(elapsed))
        .ok_or(crate::math::MathError::Overflow)?;
    Ok(Wad::from_raw(interest))
}
