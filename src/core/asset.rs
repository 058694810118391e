use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol of a supported underlying asset (USDC, DAI, USDT, ...).
///
/// Each registered asset carries its own rate index and its own pair of
/// SOAP aggregates.
///
/// # Examples
///
/// ```
/// use rate_engine::core::asset::AssetId;
///
/// let usdc = AssetId::new("USDC");
/// assert_eq!(usdc.as_str(), "USDC");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
