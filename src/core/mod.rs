//! Identifiers and the error taxonomy shared by every component.

pub mod account;
pub mod asset;
pub mod strategy;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch, as supplied by the host ledger.
pub type Timestamp = u64;

/// Classification of every failure the engine can report.
///
/// Nothing is retried internally; the class tells the caller what kind
/// of correction (if any) makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Zero amounts, length mismatches, unknown or duplicate entries.
    Validation,
    /// Stale or past timestamps; resubmit with a corrected timestamp.
    TemporalOrdering,
    Authorization,
    /// Overflow or division by zero. The call has no effect.
    Arithmetic,
    /// Insufficient shares, liquidity or aggregate balance; a smaller
    /// amount may succeed.
    BusinessRule,
    /// A strategy adapter or token collaborator refused the call.
    External,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::TemporalOrdering => "temporal-ordering",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::BusinessRule => "business-rule",
            ErrorKind::External => "external",
        };
        f.write_str(s)
    }
}
