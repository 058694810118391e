use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a caller or holder: liquidity providers, the protocol
/// owner, index updaters, the treasury.
///
/// # Examples
///
/// ```
/// use rate_engine::core::account::AccountId;
///
/// let owner = AccountId::new("protocol-owner");
/// let lp = AccountId::new("lp-1");
/// assert_ne!(owner, lp);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this account.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_equality() {
        assert_eq!(AccountId::new("owner"), AccountId::from("owner"));
        assert_ne!(AccountId::new("owner"), AccountId::new("updater"));
    }

    #[test]
    fn test_account_display() {
        assert_eq!(format!("{}", AccountId::new("treasury")), "treasury");
    }
}
