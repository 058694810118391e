use super::{MathError, Wad};
use ethnum::{I256, U256};
use serde::{Serialize, Serializer};
use std::fmt;

/// Signed 18-decimal fixed-point number, used for valuations that may
/// go either way (SOAP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignedWad(I256);

impl SignedWad {
    pub const ZERO: SignedWad = SignedWad(I256::ZERO);

    pub const fn from_raw(raw: I256) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> I256 {
        self.0
    }

    /// `a - b` for two unsigned raw integers.
    pub fn difference(a: U256, b: U256) -> Result<Self, MathError> {
        let a = to_signed(a)?;
        let b = to_signed(b)?;
        a.checked_sub(b).map(Self).ok_or(MathError::Overflow)
    }

    pub fn checked_neg(self) -> Result<Self, MathError> {
        self.0.checked_neg().map(Self).ok_or(MathError::Overflow)
    }

    pub fn checked_add(self, other: SignedWad) -> Result<Self, MathError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    /// Division truncating toward zero.
    pub fn checked_div_raw(self, divisor: U256) -> Result<Self, MathError> {
        if divisor == U256::ZERO {
            return Err(MathError::DivisionByZero);
        }
        let divisor = to_signed(divisor)?;
        self.0
            .checked_div(divisor)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    pub fn is_negative(self) -> bool {
        self.0 < I256::ZERO
    }

    pub fn unsigned_abs(self) -> Wad {
        Wad::from_raw(self.0.unsigned_abs())
    }

    pub fn to_f64(self) -> f64 {
        self.to_string().parse::<f64>().unwrap_or(0.0)
    }
}

fn to_signed(value: U256) -> Result<I256, MathError> {
    if value > I256::MAX.as_u256() {
        return Err(MathError::Overflow);
    }
    Ok(value.as_i256())
}

impl From<Wad> for SignedWad {
    /// Values above `I256::MAX` cannot be produced by the engine's formulas;
    /// they saturate.
    fn from(value: Wad) -> Self {
        Self(to_signed(value.raw()).unwrap_or(I256::MAX))
    }
}

impl Default for SignedWad {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for SignedWad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.unsigned_abs())
        } else {
            write!(f, "{}", self.unsigned_abs())
        }
    }
}

impl Serialize for SignedWad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}
