//! # rate-engine
//!
//! Fixed-point pricing and settlement core for interest rate swaps.
//!
//! Tracks a benchmark floating rate per asset, values every open swap on
//! each side of the market in aggregate, and spreads idle liquidity over
//! yield strategies while holding a target working capital ratio.
//!
//! ## Architecture
//!
//! - **math**: 18-decimal fixed point (`Wad`) over 256-bit integers
//! - **core**: Identifiers and the shared error taxonomy
//! - **auth**: Owner / index updater predicates
//! - **oracle**: Rate index, IBT price accrual, EMA and variance
//! - **soap**: Sum Of All Payoffs aggregates and valuation
//! - **vault**: Multi-strategy vault, share accounting, rebalancing
//! - **config**: JSON protocol configuration
//! - **simulation**: Scenario replay and random stress paths

pub mod auth;
pub mod config;
pub mod core;
pub mod math;
pub mod oracle;
pub mod simulation;
pub mod soap;
pub mod vault;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::auth::{AccessRegistry, Authorizer};
    pub use crate::config::ProtocolConfig;
    pub use crate::core::account::AccountId;
    pub use crate::core::asset::AssetId;
    pub use crate::core::strategy::StrategyId;
    pub use crate::core::{ErrorKind, Timestamp};
    pub use crate::math::{SignedWad, Wad, SECONDS_PER_YEAR};
    pub use crate::oracle::{RateIndexOracle, RateIndexState};
    pub use crate::soap::{SoapEngine, SoapIndicatorState, SwapDirection, SwapPosition};
    pub use crate::vault::{SimulatedStrategy, StrategyPort, VaultRebalancer};
}
