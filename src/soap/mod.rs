//! Sum Of All Payoffs.
//!
//! Swap positions are never valued one by one. Each side of the market
//! keeps a single aggregate ([`SoapIndicatorState`]) that is rebalanced
//! on every open and close, and the mark-to-market of the whole side is
//! derived from it at any timestamp.

pub mod book;
pub mod indicator;

pub use book::{ibt_quantity_for, SoapBook, SoapEngine, SoapValuation, SwapPosition};
pub use indicator::SoapIndicatorState;

use crate::core::asset::AssetId;
use crate::core::{ErrorKind, Timestamp};
use crate::math::MathError;
use crate::oracle::OracleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Side of a swap from the trader's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    /// Trader pays the fixed rate and receives the floating index.
    PayFixed,
    /// Trader receives the fixed rate and pays the floating index.
    ReceiveFixed,
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::PayFixed => f.write_str("pay-fixed"),
            SwapDirection::ReceiveFixed => f.write_str("receive-fixed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoapError {
    #[error("timestamp {timestamp} is before the last rebalance at {last_rebalance}")]
    TimestampBeforeLastRebalance {
        timestamp: Timestamp,
        last_rebalance: Timestamp,
    },
    #[error("closing more {field} than the aggregate holds")]
    InsufficientAggregateBalance { field: &'static str },
    #[error("closing would leave notional and IBT quantity inconsistent")]
    InconsistentAggregate,
    #[error("position notional must be positive")]
    ZeroNotional,
    #[error("position IBT quantity must be positive")]
    ZeroIbtQuantity,
    #[error("no SOAP book for asset {0}")]
    UnknownAsset(AssetId),
    #[error("SOAP book for asset {0} already exists")]
    AlreadyInitialized(AssetId),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("SOAP math failed: {0}")]
    Math(#[from] MathError),
}

impl SoapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SoapError::TimestampBeforeLastRebalance { .. } => ErrorKind::TemporalOrdering,
            SoapError::InsufficientAggregateBalance { .. } => ErrorKind::BusinessRule,
            SoapError::InconsistentAggregate
            | SoapError::ZeroNotional
            | SoapError::ZeroIbtQuantity
            | SoapError::UnknownAsset(_)
            | SoapError::AlreadyInitialized(_) => ErrorKind::Validation,
            SoapError::Oracle(e) => e.kind(),
            SoapError::Math(_) => ErrorKind::Arithmetic,
        }
    }
}
