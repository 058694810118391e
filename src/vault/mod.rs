//! Multi-strategy liquidity vault.
//!
//! Depositors receive shares of the managed assets. The assets sit either
//! in an uninvested buffer or in one of the registered yield strategies,
//! and the owner periodically rebalances between the vault and the
//! external working capital to hold a target utilization ratio.

pub mod rebalancer;
pub mod shares;
pub mod strategy;
pub mod token;

pub use rebalancer::{RebalanceOutcome, VaultRebalancer};
pub use shares::ShareLedger;
pub use strategy::{SimulatedStrategy, StrategyError, StrategyPort};
pub use token::{FungibleAsset, InMemoryToken, TokenError};

use crate::auth::AccessError;
use crate::core::strategy::StrategyId;
use crate::core::ErrorKind;
use crate::math::{MathError, Wad};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error(transparent)]
    NotAuthorized(#[from] AccessError),
    #[error("amount must be at least one native unit")]
    ZeroAmount,
    #[error("redeemable value {redeemable} is below the requested {requested}")]
    InsufficientShares { requested: Wad, redeemable: Wad },
    #[error("only {available} can be withdrawn, {requested} requested")]
    InsufficientLiquidity { requested: Wad, available: Wad },
    #[error("strategy {0} is not registered")]
    UnknownStrategy(StrategyId),
    #[error("strategy {0} is already registered")]
    StrategyAlreadyRegistered(StrategyId),
    #[error("strategy {0} must be empty when registered")]
    StrategyNotEmpty(StrategyId),
    #[error("no treasury configured for reward claims")]
    TreasuryNotSet,
    #[error("utilization ratio {0} is above 1")]
    InvalidRatio(Wad),
    #[error("vault configured for {configured} decimals but the token has {token}")]
    DecimalsMismatch { configured: u8, token: u8 },
    #[error("strategy {id} failed: {source}")]
    Strategy {
        id: StrategyId,
        #[source]
        source: StrategyError,
    },
    #[error("token transfer failed: {0}")]
    Token(#[from] TokenError),
    #[error("vault math failed: {0}")]
    Math(#[from] MathError),
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::NotAuthorized(_) => ErrorKind::Authorization,
            VaultError::ZeroAmount
            | VaultError::UnknownStrategy(_)
            | VaultError::StrategyAlreadyRegistered(_)
            | VaultError::StrategyNotEmpty(_)
            | VaultError::TreasuryNotSet
            | VaultError::InvalidRatio(_)
            | VaultError::DecimalsMismatch { .. } => ErrorKind::Validation,
            VaultError::InsufficientShares { .. } | VaultError::InsufficientLiquidity { .. } => {
                ErrorKind::BusinessRule
            }
            VaultError::Strategy { .. } | VaultError::Token(_) => ErrorKind::External,
            VaultError::Math(_) => ErrorKind::Arithmetic,
        }
    }
}
