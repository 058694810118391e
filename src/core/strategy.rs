use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a yield strategy registered with a vault.
///
/// Ordering is lexicographic and is the tie-break whenever two
/// strategies report the same APR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(String);

impl StrategyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StrategyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_ordering_is_tie_break() {
        let mut ids = vec![StrategyId::new("compound"), StrategyId::new("aave")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "aave");
    }
}
