use super::{OracleError, RateIndexState};
use crate::auth::{ensure_owner, ensure_updater, AccessRegistry, Authorizer};
use crate::config::OracleConfig;
use crate::core::account::AccountId;
use crate::core::asset::AssetId;
use crate::core::Timestamp;
use crate::math::Wad;
use log::{debug, info};
use std::collections::BTreeMap;

/// Registry of rate indexes, one per supported asset.
///
/// Publications come from authorized updaters only; every write is
/// computed on a copy and committed once it fully succeeds.
///
/// # Examples
///
/// ```
/// use rate_engine::auth::AccessRegistry;
/// use rate_engine::config::OracleConfig;
/// use rate_engine::core::account::AccountId;
/// use rate_engine::core::asset::AssetId;
/// use rate_engine::math::{Wad, SECONDS_PER_YEAR};
/// use rate_engine::oracle::RateIndexOracle;
/// use rust_decimal_macros::dec;
///
/// let owner = AccountId::new("owner");
/// let usdc = AssetId::new("USDC");
/// let mut oracle = RateIndexOracle::new(&OracleConfig::default(), AccessRegistry::new(owner.clone()));
/// oracle.add_updater(&owner, owner.clone()).unwrap();
/// oracle.register_asset(&owner, usdc.clone(), 0).unwrap();
/// oracle.update_index(&owner, &usdc, Wad::from_decimal(dec!(0.05)).unwrap(), 0).unwrap();
///
/// let price = oracle.get_accrued_index(&usdc, SECONDS_PER_YEAR).unwrap();
/// assert_eq!(price, Wad::from_decimal(dec!(1.05)).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct RateIndexOracle<A: Authorizer = AccessRegistry> {
    access: A,
    decay_time_constant: u64,
    indexes: BTreeMap<AssetId, RateIndexState>,
}

impl<A: Authorizer> RateIndexOracle<A> {
    pub fn new(config: &OracleConfig, access: A) -> Self {
        Self {
            access,
            decay_time_constant: config.decay_time_constant,
            indexes: BTreeMap::new(),
        }
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    pub fn decay_time_constant(&self) -> u64 {
        self.decay_time_constant
    }

    /// Starts tracking `asset` with an IBT price of 1.0 and a zero index.
    pub fn register_asset(
        &mut self,
        caller: &AccountId,
        asset: AssetId,
        now: Timestamp,
    ) -> Result<(), OracleError> {
        ensure_owner(&self.access, caller)?;
        if self.indexes.contains_key(&asset) {
            return Err(OracleError::AlreadyRegistered(asset));
        }
        info!("registered rate index for {} at {}", asset, now);
        self.indexes.insert(asset, RateIndexState::new(now));
        Ok(())
    }

    /// Stops tracking `asset`, returning its final state.
    pub fn remove_asset(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<RateIndexState, OracleError> {
        ensure_owner(&self.access, caller)?;
        let state = self
            .indexes
            .remove(asset)
            .ok_or_else(|| OracleError::UnknownAsset(asset.clone()))?;
        info!("removed rate index for {}", asset);
        Ok(state)
    }

    /// Publishes a new index value for one asset.
    pub fn update_index(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        index_value: Wad,
        timestamp: Timestamp,
    ) -> Result<RateIndexState, OracleError> {
        ensure_updater(&self.access, caller)?;
        let current = self.get_index(asset)?;
        let next = self.next_state(asset, &current, index_value, timestamp)?;
        self.indexes.insert(asset.clone(), next);
        Ok(next)
    }

    /// Publishes a batch; either every pair is applied or none is.
    pub fn update_indexes(
        &mut self,
        caller: &AccountId,
        assets: &[AssetId],
        index_values: &[Wad],
        timestamp: Timestamp,
    ) -> Result<(), OracleError> {
        ensure_updater(&self.access, caller)?;
        if assets.len() != index_values.len() {
            return Err(OracleError::LengthMismatch {
                assets: assets.len(),
                values: index_values.len(),
            });
        }

        let mut pending: BTreeMap<AssetId, RateIndexState> = BTreeMap::new();
        for (asset, value) in assets.iter().zip(index_values) {
            let current = match pending.get(asset) {
                Some(state) => *state,
                None => self.get_index(asset)?,
            };
            let next = self.next_state(asset, &current, *value, timestamp)?;
            pending.insert(asset.clone(), next);
        }
        self.indexes.extend(pending);
        Ok(())
    }

    pub fn get_index(&self, asset: &AssetId) -> Result<RateIndexState, OracleError> {
        self.indexes
            .get(asset)
            .copied()
            .ok_or_else(|| OracleError::UnknownAsset(asset.clone()))
    }

    /// IBT price of `asset` projected to `timestamp` without touching state.
    pub fn get_accrued_index(&self, asset: &AssetId, timestamp: Timestamp) -> Result<Wad, OracleError> {
        Ok(self.accrued_state(asset, timestamp)?.ibt_price)
    }

    /// Full state projected to `timestamp`: the IBT price accrues, the
    /// published index and its statistics stay as they are.
    pub fn accrued_state(
        &self,
        asset: &AssetId,
        timestamp: Timestamp,
    ) -> Result<RateIndexState, OracleError> {
        let state = self.get_index(asset)?;
        if timestamp < state.last_update_timestamp {
            return Err(OracleError::TimestampInPast {
                asset: asset.clone(),
                timestamp,
                last_update: state.last_update_timestamp,
            });
        }
        let ibt_price = state.accrued_ibt_price(timestamp)?;
        Ok(RateIndexState {
            ibt_price,
            ..state
        })
    }

    pub fn is_registered(&self, asset: &AssetId) -> bool {
        self.indexes.contains_key(asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.indexes.keys()
    }

    fn next_state(
        &self,
        asset: &AssetId,
        current: &RateIndexState,
        index_value: Wad,
        timestamp: Timestamp,
    ) -> Result<RateIndexState, OracleError> {
        if timestamp < current.last_update_timestamp {
            return Err(OracleError::StaleTimestamp {
                asset: asset.clone(),
                timestamp,
                last_update: current.last_update_timestamp,
            });
        }
        let next = current.updated(index_value, timestamp, self.decay_time_constant)?;
        debug!(
            "{} index {} -> {}, ibt price {} -> {}",
            asset, current.index_value, next.index_value, current.ibt_price, next.ibt_price
        );
        Ok(next)
    }
}

impl RateIndexOracle<AccessRegistry> {
    pub fn add_updater(&mut self, caller: &AccountId, updater: AccountId) -> Result<(), OracleError> {
        self.access.add_updater(caller, updater).map_err(OracleError::from)
    }

    pub fn remove_updater(&mut self, caller: &AccountId, updater: &AccountId) -> Result<(), OracleError> {
        self.access.remove_updater(caller, updater).map_err(OracleError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::math::SECONDS_PER_YEAR;
    use rust_decimal_macros::dec;

    fn wad(d: rust_decimal::Decimal) -> Wad {
        Wad::from_decimal(d).unwrap()
    }

    fn setup() -> (RateIndexOracle, AccountId, AccountId) {
        let owner = AccountId::new("owner");
        let keeper = AccountId::new("keeper");
        let mut oracle = RateIndexOracle::new(&OracleConfig::default(), AccessRegistry::new(owner.clone()));
        oracle.add_updater(&owner, keeper.clone()).unwrap();
        for asset in ["USDC", "DAI", "USDT"] {
            oracle.register_asset(&owner, AssetId::new(asset), 1_000).unwrap();
        }
        (oracle, owner, keeper)
    }

    #[test]
    fn test_register_initial_state() {
        let (oracle, _, _) = setup();
        let state = oracle.get_index(&AssetId::new("USDC")).unwrap();
        assert_eq!(state, RateIndexState::new(1_000));
        assert_eq!(state.ibt_price, Wad::ONE);
    }

    #[test]
    fn test_register_twice_fails() {
        let (mut oracle, owner, _) = setup();
        let err = oracle.register_asset(&owner, AssetId::new("DAI"), 5).unwrap_err();
        assert_eq!(err, OracleError::AlreadyRegistered(AssetId::new("DAI")));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_update_requires_updater() {
        let (mut oracle, owner, _) = setup();
        let err = oracle
            .update_index(&owner, &AssetId::new("USDC"), wad(dec!(0.03)), 2_000)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_update_unknown_asset() {
        let (mut oracle, _, keeper) = setup();
        let err = oracle
            .update_index(&keeper, &AssetId::new("WETH"), wad(dec!(0.03)), 2_000)
            .unwrap_err();
        assert_eq!(err, OracleError::UnknownAsset(AssetId::new("WETH")));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let (mut oracle, _, keeper) = setup();
        let usdc = AssetId::new("USDC");
        oracle.update_index(&keeper, &usdc, wad(dec!(0.03)), 5_000).unwrap();
        let err = oracle.update_index(&keeper, &usdc, wad(dec!(0.04)), 4_999).unwrap_err();
        assert!(matches!(err, OracleError::StaleTimestamp { timestamp: 4_999, last_update: 5_000, .. }));
        assert_eq!(err.kind(), ErrorKind::TemporalOrdering);
        assert_eq!(oracle.get_index(&usdc).unwrap().index_value, wad(dec!(0.03)));
    }

    #[test]
    fn test_ibt_price_accrues_at_previous_rate() {
        let (mut oracle, _, keeper) = setup();
        let usdc = AssetId::new("USDC");
        oracle.update_index(&keeper, &usdc, wad(dec!(0.05)), 1_000).unwrap();
        let state = oracle
            .update_index(&keeper, &usdc, wad(dec!(0.50)), 1_000 + SECONDS_PER_YEAR)
            .unwrap();
        // the 50% publication only affects accrual from now on
        assert_eq!(state.ibt_price, wad(dec!(1.05)));
        assert_eq!(state.index_value, wad(dec!(0.50)));
    }

    #[test]
    fn test_accrued_index_is_pure() {
        let (mut oracle, _, keeper) = setup();
        let dai = AssetId::new("DAI");
        oracle.update_index(&keeper, &dai, wad(dec!(0.10)), 1_000).unwrap();
        let before = oracle.get_index(&dai).unwrap();
        let projected = oracle.get_accrued_index(&dai, 1_000 + SECONDS_PER_YEAR / 2).unwrap();
        assert_eq!(projected, wad(dec!(1.05)));
        assert_eq!(oracle.get_index(&dai).unwrap(), before);
    }

    #[test]
    fn test_accrued_index_in_past_fails() {
        let (oracle, _, _) = setup();
        let err = oracle.get_accrued_index(&AssetId::new("DAI"), 999).unwrap_err();
        assert!(matches!(err, OracleError::TimestampInPast { .. }));
    }

    #[test]
    fn test_batch_length_mismatch_leaves_state_untouched() {
        let (mut oracle, _, keeper) = setup();
        let assets = vec![AssetId::new("USDC"), AssetId::new("DAI")];
        let err = oracle
            .update_indexes(&keeper, &assets, &[wad(dec!(0.03))], 2_000)
            .unwrap_err();
        assert_eq!(err, OracleError::LengthMismatch { assets: 2, values: 1 });
        for asset in &assets {
            assert_eq!(oracle.get_index(asset).unwrap(), RateIndexState::new(1_000));
        }
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let (mut oracle, _, keeper) = setup();
        let assets = vec![AssetId::new("USDC"), AssetId::new("WETH")];
        let values = vec![wad(dec!(0.03)), wad(dec!(0.04))];
        assert!(oracle.update_indexes(&keeper, &assets, &values, 2_000).is_err());
        assert_eq!(
            oracle.get_index(&AssetId::new("USDC")).unwrap(),
            RateIndexState::new(1_000)
        );
    }

    #[test]
    fn test_batch_applies_every_pair() {
        let (mut oracle, _, keeper) = setup();
        let assets = vec![AssetId::new("USDC"), AssetId::new("DAI"), AssetId::new("USDT")];
        let values = vec![wad(dec!(0.03)), wad(dec!(0.04)), wad(dec!(0.05))];
        oracle.update_indexes(&keeper, &assets, &values, 2_000).unwrap();
        for (asset, value) in assets.iter().zip(&values) {
            let state = oracle.get_index(asset).unwrap();
            assert_eq!(state.index_value, *value);
            assert_eq!(state.last_update_timestamp, 2_000);
        }
    }

    #[test]
    fn test_remove_asset() {
        let (mut oracle, owner, keeper) = setup();
        let usdt = AssetId::new("USDT");
        oracle.remove_asset(&owner, &usdt).unwrap();
        assert!(!oracle.is_registered(&usdt));
        assert!(oracle.update_index(&keeper, &usdt, wad(dec!(0.01)), 2_000).is_err());
        assert_eq!(oracle.assets().count(), 2);
    }
}
