use crate::core::Timestamp;
use crate::math::{mul_div, wad_mul, MathError, Rounding, Wad, SECONDS_PER_YEAR, WAD};
use ethnum::U256;
use serde::{Deserialize, Serialize};

/// Rate index of one asset.
///
/// `ibt_price` starts at 1.0 and accrues at the previously published
/// `index_value` for the time that passes between two publications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateIndexState {
    /// Published annual rate, e.g. 0.05 for 5%.
    pub index_value: Wad,
    pub ibt_price: Wad,
    pub exponential_moving_average: Wad,
    pub exponential_weighted_moving_variance: Wad,
    pub last_update_timestamp: Timestamp,
}

impl RateIndexState {
    /// State of a freshly registered asset.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            index_value: Wad::ZERO,
            ibt_price: Wad::ONE,
            exponential_moving_average: Wad::ZERO,
            exponential_weighted_moving_variance: Wad::ZERO,
            last_update_timestamp: timestamp,
        }
    }

    /// IBT price projected to `timestamp` at the current index value.
    pub fn accrued_ibt_price(&self, timestamp: Timestamp) -> Result<Wad, MathError> {
        let elapsed = self.elapsed_until(timestamp)?;
        accrue_ibt_price(self.ibt_price, self.index_value, elapsed)
    }

    /// Applies a new publication: accrue the IBT price at the old rate,
    /// fold the new value into the EMA and EWMV, then replace the index.
    pub fn updated(
        &self,
        new_index_value: Wad,
        timestamp: Timestamp,
        decay_time_constant: u64,
    ) -> Result<Self, MathError> {
        let elapsed = self.elapsed_until(timestamp)?;
        let ibt_price = accrue_ibt_price(self.ibt_price, self.index_value, elapsed)?;
        let decay = decay_factor(elapsed, decay_time_constant)?;
        let ema = exponential_moving_average(self.exponential_moving_average, new_index_value, decay)?;
        let variance = exponential_weighted_moving_variance(
            self.exponential_weighted_moving_variance,
            ema,
            new_index_value,
            decay,
        )?;
        Ok(Self {
            index_value: new_index_value,
            ibt_price,
            exponential_moving_average: ema,
            exponential_weighted_moving_variance: variance,
            last_update_timestamp: timestamp,
        })
    }

    fn elapsed_until(&self, timestamp: Timestamp) -> Result<u64, MathError> {
        timestamp
            .checked_sub(self.last_update_timestamp)
            .ok_or(MathError::Underflow)
    }
}

/// `ibt * (1 + index * elapsed / YEAR)` with a single final division.
pub fn accrue_ibt_price(ibt_price: Wad, index_value: Wad, elapsed: u64) -> Result<Wad, MathError> {
    if elapsed == 0 || index_value.is_zero() {
        return Ok(ibt_price);
    }
    let weighted = ibt_price
        .raw()
        .checked_mul(index_value.raw())
        .ok_or(MathError::Overflow)?;
    let interest = mul_div(
        weighted,
        U256::from(elapsed),
        U256::new(WAD) * U256::from(SECONDS_PER_YEAR),
        Rounding::Down,
    )?;
    ibt_price.checked_add(Wad::from_raw(interest))
}

/// Weight kept by the previous average: `elapsed / (elapsed + tau)`.
///
/// Zero for back-to-back publications, strictly increasing in `elapsed`
/// and always below one.
pub fn decay_factor(elapsed: u64, time_constant: u64) -> Result<Wad, MathError> {
    if elapsed == 0 {
        return Ok(Wad::ZERO);
    }
    let denominator = U256::from(elapsed) + U256::from(time_constant);
    mul_div(U256::from(elapsed), U256::new(WAD), denominator, Rounding::Down).map(Wad::from_raw)
}

/// `d * ema + (1 - d) * value`.
pub fn exponential_moving_average(last_ema: Wad, value: Wad, decay: Wad) -> Result<Wad, MathError> {
    let kept = wad_mul(decay, last_ema)?;
    let fresh = wad_mul(Wad::ONE.checked_sub(decay)?, value)?;
    kept.checked_add(fresh)
}

/// `d * variance + (1 - d) * (value - ema)^2`, `ema` being the already
/// updated average.
pub fn exponential_weighted_moving_variance(
    last_variance: Wad,
    ema: Wad,
    value: Wad,
    decay: Wad,
) -> Result<Wad, MathError> {
    let deviation = if value > ema {
        value.checked_sub(ema)?
    } else {
        ema.checked_sub(value)?
    };
    let squared = wad_mul(deviation, deviation)?;
    let kept = wad_mul(decay, last_variance)?;
    let fresh = wad_mul(Wad::ONE.checked_sub(decay)?, squared)?;
    kept.checked_add(fresh)
}
