//! Protocol configuration.
//!
//! Loaded from JSON. Ratios are written as decimal strings (`"0.85"`) and
//! converted to [`Wad`] exactly.

use crate::core::account::AccountId;
use crate::math::{MathError, Wad, MAX_DECIMALS};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default time constant of the EMA decay factor: 30 days.
pub const DEFAULT_DECAY_TIME_CONSTANT: u64 = 30 * 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("config value out of range: {0}")]
    Math(#[from] MathError),
}

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// use rate_engine::config::ProtocolConfig;
///
/// let config = ProtocolConfig::from_json_str(r#"{
///     "oracle": { "decay_time_constant": 86400 },
///     "vault": { "target_utilization_ratio": "0.9", "asset_decimals": 6 }
/// }"#).unwrap();
/// assert_eq!(config.oracle.decay_time_constant, 86400);
/// assert_eq!(config.vault.asset_decimals, 6);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub vault: VaultConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Seconds after which the previous average and the new publication
    /// carry equal weight.
    #[serde(default = "default_decay_time_constant")]
    pub decay_time_constant: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            decay_time_constant: DEFAULT_DECAY_TIME_CONSTANT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Share of total assets that should stay as working capital.
    #[serde(default = "default_target_utilization_ratio")]
    pub target_utilization_ratio: Decimal,
    /// Native precision of the vault's asset.
    #[serde(default = "default_asset_decimals")]
    pub asset_decimals: u8,
    /// Receiver of harvested strategy rewards.
    #[serde(default)]
    pub treasury: Option<AccountId>,
}

impl VaultConfig {
    pub fn target_utilization_ratio_wad(&self) -> Result<Wad, ConfigError> {
        Ok(Wad::from_decimal(self.target_utilization_ratio)?)
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            target_utilization_ratio: default_target_utilization_ratio(),
            asset_decimals: default_asset_decimals(),
            treasury: None,
        }
    }
}

fn default_decay_time_constant() -> u64 {
    DEFAULT_DECAY_TIME_CONSTANT
}

fn default_target_utilization_ratio() -> Decimal {
    dec!(0.85)
}

fn default_asset_decimals() -> u8 {
    18
}

impl ProtocolConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: ProtocolConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.decay_time_constant == 0 {
            return Err(ConfigError::Invalid {
                field: "oracle.decay_time_constant",
                reason: "must be positive".to_string(),
            });
        }
        let ratio = self.vault.target_utilization_ratio;
        if ratio < Decimal::ZERO || ratio > Decimal::ONE {
            return Err(ConfigError::Invalid {
                field: "vault.target_utilization_ratio",
                reason: format!("{ratio} is outside [0, 1]"),
            });
        }
        if self.vault.asset_decimals > MAX_DECIMALS {
            return Err(ConfigError::Invalid {
                field: "vault.asset_decimals",
                reason: format!("{} exceeds {}", self.vault.asset_decimals, MAX_DECIMALS),
            });
        }
        Ok(())
    }
}
