//! Replay of scripted market histories.
//!
//! A scenario is a JSON list of timestamped events (asset registration,
//! index publications, swap opens and closes, valuations) that is run
//! against a fresh oracle and SOAP engine.

use crate::auth::AccessRegistry;
use crate::config::ProtocolConfig;
use crate::core::account::AccountId;
use crate::core::asset::AssetId;
use crate::core::{ErrorKind, Timestamp};
use crate::math::{MathError, Wad};
use crate::oracle::{OracleError, RateIndexOracle, RateIndexState};
use crate::soap::{ibt_quantity_for, SoapEngine, SoapError, SoapValuation, SwapDirection, SwapPosition};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioEvent {
    RegisterAsset {
        at: DateTime<Utc>,
        asset: AssetId,
    },
    UpdateIndex {
        at: DateTime<Utc>,
        asset: AssetId,
        value: Decimal,
    },
    Open {
        at: DateTime<Utc>,
        id: String,
        asset: AssetId,
        direction: SwapDirection,
        notional: Decimal,
        fixed_rate: Decimal,
    },
    Close {
        at: DateTime<Utc>,
        id: String,
    },
    Value {
        at: DateTime<Utc>,
        asset: AssetId,
    },
}

impl ScenarioEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            ScenarioEvent::RegisterAsset { at, .. }
            | ScenarioEvent::UpdateIndex { at, .. }
            | ScenarioEvent::Open { at, .. }
            | ScenarioEvent::Close { at, .. }
            | ScenarioEvent::Value { at, .. } => *at,
        }
    }
}

/// Scripted history. `owner` registers assets, `updater` publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_owner")]
    pub owner: AccountId,
    #[serde(default = "default_updater")]
    pub updater: AccountId,
    pub events: Vec<ScenarioEvent>,
}

fn default_owner() -> AccountId {
    AccountId::new("owner")
}

fn default_updater() -> AccountId {
    AccountId::new("keeper")
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("error reading scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("event {index}: {source}")]
    Oracle {
        index: usize,
        #[source]
        source: OracleError,
    },
    #[error("event {index}: {source}")]
    Soap {
        index: usize,
        #[source]
        source: SoapError,
    },
    #[error("event {index}: invalid amount: {source}")]
    Amount {
        index: usize,
        #[source]
        source: MathError,
    },
    #[error("event {index}: timestamp {at} is before the Unix epoch")]
    TimestampBeforeEpoch { index: usize, at: DateTime<Utc> },
    #[error("event {index}: position {id} is already open")]
    DuplicatePosition { index: usize, id: String },
    #[error("event {index}: no open position {id}")]
    UnknownPosition { index: usize, id: String },
}

impl ScenarioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScenarioError::Oracle { source, .. } => source.kind(),
            ScenarioError::Soap { source, .. } => source.kind(),
            ScenarioError::Amount { .. } => ErrorKind::Arithmetic,
            ScenarioError::TimestampBeforeEpoch { .. } => ErrorKind::TemporalOrdering,
            ScenarioError::Io { .. }
            | ScenarioError::Parse(_)
            | ScenarioError::DuplicatePosition { .. }
            | ScenarioError::UnknownPosition { .. } => ErrorKind::Validation,
        }
    }
}

impl Scenario {
    pub fn from_json_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub events_applied: usize,
    pub positions_opened: usize,
    pub positions_closed: usize,
    pub open_positions: usize,
    pub valuations: Vec<SoapValuation>,
    pub final_indexes: BTreeMap<AssetId, RateIndexState>,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Scenario Replay ===")?;
        writeln!(f, "Events applied:   {}", self.events_applied)?;
        writeln!(
            f,
            "Positions:        {} opened, {} closed, {} still open",
            self.positions_opened, self.positions_closed, self.open_positions
        )?;
        writeln!(f)?;
        writeln!(f, "Final indexes:")?;
        for (asset, state) in &self.final_indexes {
            writeln!(
                f,
                "  {:<6} index {}  ibt {}  ema {}",
                asset, state.index_value, state.ibt_price, state.exponential_moving_average
            )?;
        }
        if !self.valuations.is_empty() {
            writeln!(f)?;
            writeln!(f, "Valuations:")?;
        }
        for v in &self.valuations {
            writeln!(
                f,
                "  {} {:<6} pay-fixed {:>28}  receive-fixed {:>28}  total {:>28}",
                v.timestamp, v.asset, v.pay_fixed, v.receive_fixed, v.total
            )?;
        }
        Ok(())
    }
}

/// Replays `scenario` against a fresh oracle and SOAP engine.
///
/// Stops at the first failing event; the error carries its index.
pub fn run_scenario(scenario: &Scenario, config: &ProtocolConfig) -> Result<ScenarioReport, ScenarioError> {
    let mut access = AccessRegistry::new(scenario.owner.clone());
    access
        .add_updater(&scenario.owner, scenario.updater.clone())
        .map_err(|e| ScenarioError::Oracle {
            index: 0,
            source: e.into(),
        })?;
    let mut oracle = RateIndexOracle::new(&config.oracle, access);
    let mut engine = SoapEngine::new();
    let mut open: BTreeMap<String, (AssetId, SwapPosition)> = BTreeMap::new();
    let mut report = ScenarioReport {
        events_applied: 0,
        positions_opened: 0,
        positions_closed: 0,
        open_positions: 0,
        valuations: Vec::new(),
        final_indexes: BTreeMap::new(),
    };

    for (index, event) in scenario.events.iter().enumerate() {
        let now = timestamp(index, event.at())?;
        let oracle_err = |source| ScenarioError::Oracle { index, source };
        let soap_err = |source| ScenarioError::Soap { index, source };
        let amount = |value: Decimal| Wad::from_decimal(value).map_err(|source| ScenarioError::Amount { index, source });

        match event {
            ScenarioEvent::RegisterAsset { asset, .. } => {
                oracle
                    .register_asset(&scenario.owner, asset.clone(), now)
                    .map_err(oracle_err)?;
                engine.initialize_asset(asset.clone(), now).map_err(soap_err)?;
            }
            ScenarioEvent::UpdateIndex { asset, value, .. } => {
                oracle
                    .update_index(&scenario.updater, asset, amount(*value)?, now)
                    .map_err(oracle_err)?;
            }
            ScenarioEvent::Open {
                id,
                asset,
                direction,
                notional,
                fixed_rate,
                ..
            } => {
                if open.contains_key(id) {
                    return Err(ScenarioError::DuplicatePosition {
                        index,
                        id: id.clone(),
                    });
                }
                let notional = amount(*notional)?;
                let position = SwapPosition {
                    direction: *direction,
                    notional,
                    fixed_rate: amount(*fixed_rate)?,
                    ibt_quantity: ibt_quantity_for(&oracle, asset, notional, now).map_err(soap_err)?,
                    open_timestamp: now,
                };
                engine.open_position(asset, now, &position).map_err(soap_err)?;
                open.insert(id.clone(), (asset.clone(), position));
                report.positions_opened += 1;
            }
            ScenarioEvent::Close { id, .. } => {
                let (asset, position) = open.get(id).ok_or_else(|| ScenarioError::UnknownPosition {
                    index,
                    id: id.clone(),
                })?;
                engine.close_position(asset, now, position).map_err(soap_err)?;
                open.remove(id);
                report.positions_closed += 1;
            }
            ScenarioEvent::Value { asset, .. } => {
                let valuation = engine.soap(&oracle, asset, now).map_err(soap_err)?;
                debug!("valued {} at {}: total {}", asset, now, valuation.total);
                report.valuations.push(valuation);
            }
        }
        report.events_applied += 1;
    }

    for asset in oracle.assets() {
        let state = oracle.get_index(asset).map_err(|source| ScenarioError::Oracle {
            index: scenario.events.len(),
            source,
        })?;
        report.final_indexes.insert(asset.clone(), state);
    }
    report.open_positions = open.len();
    info!(
        "replayed {} events, {} valuations",
        report.events_applied,
        report.valuations.len()
    );
    Ok(report)
}

fn timestamp(index: usize, at: DateTime<Utc>) -> Result<Timestamp, ScenarioError> {
    Timestamp::try_from(at.timestamp()).map_err(|_| ScenarioError::TimestampBeforeEpoch { index, at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SignedWad;
    use rust_decimal_macros::dec;

    const SCRIPT: &str = r#"{
        "events": [
            { "type": "register_asset", "at": "2024-01-01T00:00:00Z", "asset": "USDC" },
            { "type": "update_index", "at": "2024-01-01T00:00:00Z", "asset": "USDC", "value": "0.05" },
            { "type": "open", "at": "2024-01-01T00:00:00Z", "id": "s1", "asset": "USDC",
              "direction": "pay_fixed", "notional": "100", "fixed_rate": "0.03" },
            { "type": "value", "at": "2024-12-31T00:00:00Z", "asset": "USDC" }
        ]
    }"#;

    #[test]
    fn test_replay_values_book() {
        let scenario = Scenario::from_json_str(SCRIPT).unwrap();
        let report = run_scenario(&scenario, &ProtocolConfig::default()).unwrap();
        assert_eq!(report.events_applied, 4);
        assert_eq!(report.open_positions, 1);
        assert_eq!(report.valuations.len(), 1);
        // 2024 is a leap year: 2024-12-31 is exactly 365 days in
        let valuation = &report.valuations[0];
        assert_eq!(valuation.ibt_price, Wad::from_decimal(dec!(1.05)).unwrap());
        assert_eq!(valuation.pay_fixed, SignedWad::from(Wad::from_units(2)));
    }

    #[test]
    fn test_close_unknown_position_reports_index() {
        let mut scenario = Scenario::from_json_str(SCRIPT).unwrap();
        scenario.events.push(ScenarioEvent::Close {
            at: scenario.events[3].at(),
            id: "missing".to_string(),
        });
        let err = run_scenario(&scenario, &ProtocolConfig::default()).unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownPosition { index: 4, .. }));
    }

    #[test]
    fn test_stale_update_fails_with_temporal_kind() {
        let mut scenario = Scenario::from_json_str(SCRIPT).unwrap();
        scenario.events.push(ScenarioEvent::UpdateIndex {
            at: "2023-06-01T00:00:00Z".parse().unwrap(),
            asset: AssetId::new("USDC"),
            value: dec!(0.04),
        });
        let err = run_scenario(&scenario, &ProtocolConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemporalOrdering);
    }

    #[test]
    fn test_open_close_round_trip() {
        let mut scenario = Scenario::from_json_str(SCRIPT).unwrap();
        let at = scenario.events[3].at();
        scenario.events.push(ScenarioEvent::Close { at, id: "s1".to_string() });
        scenario.events.push(ScenarioEvent::Value { at, asset: AssetId::new("USDC") });
        let report = run_scenario(&scenario, &ProtocolConfig::default()).unwrap();
        assert_eq!(report.positions_closed, 1);
        assert_eq!(report.open_positions, 0);
        assert_eq!(report.valuations[1].total, SignedWad::ZERO);
    }

    #[test]
    fn test_malformed_event() {
        let err = Scenario::from_json_str(r#"{ "events": [ { "type": "teleport" } ] }"#).unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }
}
