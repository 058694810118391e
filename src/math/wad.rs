use super::{MathError, WAD};
use ethnum::U256;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Unsigned 18-decimal fixed-point number.
///
/// The raw integer is the value scaled by 10^18, so `Wad::ONE` is
/// `1_000_000_000_000_000_000`. Serialised as the raw integer in a
/// JSON string to keep every digit.
///
/// # Examples
///
/// ```
/// use rate_engine::math::Wad;
/// use rust_decimal_macros::dec;
///
/// let rate = Wad::from_decimal(dec!(0.05)).unwrap();
/// assert_eq!(rate, Wad::new(50_000_000_000_000_000));
/// assert_eq!(rate.to_string(), "0.050000000000000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wad(U256);

impl Wad {
    pub const ZERO: Wad = Wad(U256::ZERO);
    pub const ONE: Wad = Wad(U256::new(WAD));

    /// Wraps a raw scaled integer.
    pub const fn new(raw: u128) -> Self {
        Self(U256::new(raw))
    }

    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Whole units, e.g. `from_units(100)` is 100.0.
    pub fn from_units(units: u64) -> Self {
        Self(U256::new(u128::from(units) * WAD))
    }

    /// Exact conversion from a decimal; digits past the 18th are truncated.
    pub fn from_decimal(value: Decimal) -> Result<Self, MathError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MathError::NegativeValue);
        }
        let mantissa = U256::new(value.mantissa().unsigned_abs());
        let scale = value.scale();
        let raw = if scale <= 18 {
            let factor = U256::new(10).pow(18 - scale);
            mantissa.checked_mul(factor).ok_or(MathError::Overflow)?
        } else {
            mantissa / U256::new(10).pow(scale - 18)
        };
        Ok(Self(raw))
    }

    /// Lossless conversion into a decimal, `None` when the value exceeds
    /// the 96-bit decimal mantissa.
    pub fn to_decimal(self) -> Option<Decimal> {
        if self.0 > U256::new(i128::MAX as u128) {
            return None;
        }
        Decimal::try_from_i128_with_scale(self.0.as_u128() as i128, 18)
            .ok()
            .map(|d| d.normalize())
    }

    /// Approximate float value, for reporting only.
    pub fn to_f64(self) -> f64 {
        self.to_string().parse::<f64>().unwrap_or(0.0)
    }

    pub const fn raw(self) -> U256 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == U256::ZERO
    }

    pub fn checked_add(self, other: Wad) -> Result<Wad, MathError> {
        self.0
            .checked_add(other.0)
            .map(Wad)
            .ok_or(MathError::Overflow)
    }

    pub fn checked_sub(self, other: Wad) -> Result<Wad, MathError> {
        self.0
            .checked_sub(other.0)
            .map(Wad)
            .ok_or(MathError::Underflow)
    }

    pub fn saturating_sub(self, other: Wad) -> Wad {
        Wad(self.0.saturating_sub(other.0))
    }

    pub fn min(self, other: Wad) -> Wad {
        if self <= other {
            self
        } else {
            other
        }
    }
}

impl Default for Wad {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / U256::new(WAD);
        let frac = self.0 % U256::new(WAD);
        write!(f, "{}.{:0>18}", whole, frac.to_string())
    }
}

impl FromStr for Wad {
    type Err = std::num::ParseIntError;

    /// Parses the raw scaled integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str_radix(s, 10).map(Wad)
    }
}

impl From<u128> for Wad {
    fn from(raw: u128) -> Self {
        Self::new(raw)
    }
}

impl Serialize for Wad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Wad {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = Wad;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a raw 18-decimal integer as a string or number")
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Wad, E> {
                v.parse()
                    .map_err(|e| de::Error::custom(format!("invalid wad {v:?}: {e}")))
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Wad, E> {
                Ok(Wad::new(u128::from(v)))
            }
        }
        deserializer.deserialize_any(V)
    }
}
