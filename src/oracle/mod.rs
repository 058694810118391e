//! Benchmark rate index oracle.
//!
//! Tracks one [`RateIndexState`] per registered asset: the published
//! index, the interest bearing token (IBT) price accrued from it, and the
//! exponentially weighted mean and variance of the published values.

pub mod index;
pub mod registry;

pub use index::RateIndexState;
pub use registry::RateIndexOracle;

use crate::auth::AccessError;
use crate::core::asset::AssetId;
use crate::core::{ErrorKind, Timestamp};
use crate::math::MathError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error(transparent)]
    NotAuthorized(#[from] AccessError),
    #[error("asset {0} is already registered")]
    AlreadyRegistered(AssetId),
    #[error("asset {0} is not registered")]
    UnknownAsset(AssetId),
    #[error("stale timestamp for {asset}: {timestamp} < last update {last_update}")]
    StaleTimestamp {
        asset: AssetId,
        timestamp: Timestamp,
        last_update: Timestamp,
    },
    #[error("timestamp {timestamp} is before the last update {last_update} of {asset}")]
    TimestampInPast {
        asset: AssetId,
        timestamp: Timestamp,
        last_update: Timestamp,
    },
    #[error("{assets} assets but {values} index values")]
    LengthMismatch { assets: usize, values: usize },
    #[error("index math failed: {0}")]
    Math(#[from] MathError),
}

impl OracleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OracleError::NotAuthorized(_) => ErrorKind::Authorization,
            OracleError::AlreadyRegistered(_)
            | OracleError::UnknownAsset(_)
            | OracleError::LengthMismatch { .. } => ErrorKind::Validation,
            OracleError::StaleTimestamp { .. } | OracleError::TimestampInPast { .. } => {
                ErrorKind::TemporalOrdering
            }
            OracleError::Math(_) => ErrorKind::Arithmetic,
        }
    }
}
