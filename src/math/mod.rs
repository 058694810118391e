//! Fixed-point arithmetic.
//!
//! All monetary quantities and ratios are integers scaled by 10^18
//! ("WAD") and backed by 256-bit integers so that the intermediate
//! products of the accrual and SOAP formulas never leave the checked
//! range. Every operation fails with [`MathError`] instead of wrapping,
//! and every truncation rounds toward zero unless a caller explicitly
//! asks for [`Rounding::Up`].

pub mod signed;
pub mod wad;

pub use signed::SignedWad;
pub use wad::Wad;

use ethnum::U256;
use thiserror::Error;

/// 10^18 as a plain integer.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Seconds in a 365-day year.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Largest number of decimals a native asset amount may carry.
/// 10^77 is the largest power of ten below 2^256.
pub const MAX_DECIMALS: u8 = 77;

/// Errors raised by fixed-point operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("negative value where an unsigned amount is required")]
    NegativeValue,
    #[error("unsupported decimal precision: {0}")]
    UnsupportedDecimals(u8),
}

/// Direction of truncation for [`mul_div`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Computes `a * b / denominator` with a single final division.
pub fn mul_div(a: U256, b: U256, denominator: U256, rounding: Rounding) -> Result<U256, MathError> {
    if denominator == U256::ZERO {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let quotient = product / denominator;
    match rounding {
        Rounding::Down => Ok(quotient),
        Rounding::Up => {
            if product % denominator == U256::ZERO {
                Ok(quotient)
            } else {
                quotient.checked_add(U256::ONE).ok_or(MathError::Overflow)
            }
        }
    }
}

/// `floor(a * b / 1e18)`.
///
/// ```
/// use rate_engine::math::{wad_mul, Wad};
/// use rust_decimal_macros::dec;
///
/// let a = Wad::from_decimal(dec!(1.5)).unwrap();
/// let b = Wad::from_decimal(dec!(0.03)).unwrap();
/// assert_eq!(wad_mul(a, b).unwrap(), Wad::from_decimal(dec!(0.045)).unwrap());
/// ```
pub fn wad_mul(a: Wad, b: Wad) -> Result<Wad, MathError> {
    mul_div(a.raw(), b.raw(), U256::new(WAD), Rounding::Down).map(Wad::from_raw)
}

/// `floor(a * 1e18 / b)`. Fails with [`MathError::DivisionByZero`] when `b` is zero.
pub fn wad_div(a: Wad, b: Wad) -> Result<Wad, MathError> {
    mul_div(a.raw(), U256::new(WAD), b.raw(), Rounding::Down).map(Wad::from_raw)
}

/// Scales a native amount with `source_decimals` of precision up (or down) to WAD.
///
/// Precision beyond 18 decimals is truncated toward zero.
pub fn to_wad(value: u128, source_decimals: u8) -> Result<Wad, MathError> {
    let value = U256::new(value);
    let raw = match source_decimals {
        18 => value,
        d if d < 18 => value
            .checked_mul(pow10(18 - d)?)
            .ok_or(MathError::Overflow)?,
        d => value / pow10(d - 18)?,
    };
    Ok(Wad::from_raw(raw))
}

/// Converts a WAD amount to a native amount with `target_decimals` of precision.
///
/// Truncates toward zero, so `to_wad(from_wad(x)) <= x` always holds.
pub fn from_wad(value: Wad, target_decimals: u8) -> Result<u128, MathError> {
    let raw = match target_decimals {
        18 => value.raw(),
        d if d < 18 => value.raw() / pow10(18 - d)?,
        d => value
            .raw()
            .checked_mul(pow10(d - 18)?)
            .ok_or(MathError::Overflow)?,
    };
    if raw > U256::new(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(raw.as_u128())
}

fn pow10(exp: u8) -> Result<U256, MathError> {
    if exp > MAX_DECIMALS {
        return Err(MathError::UnsupportedDecimals(exp));
    }
    U256::new(10)
        .checked_pow(u32::from(exp))
        .ok_or(MathError::Overflow)
}
