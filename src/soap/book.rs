use super::{SoapError, SoapIndicatorState, SwapDirection};
use crate::auth::Authorizer;
use crate::core::asset::AssetId;
use crate::core::Timestamp;
use crate::math::{wad_div, SignedWad, Wad};
use crate::oracle::RateIndexOracle;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The two SOAP aggregates of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapBook {
    pub asset: AssetId,
    pub pay_fixed: SoapIndicatorState,
    pub receive_fixed: SoapIndicatorState,
}

impl SoapBook {
    pub fn new(asset: AssetId, timestamp: Timestamp) -> Self {
        Self {
            asset,
            pay_fixed: SoapIndicatorState::empty_at(timestamp),
            receive_fixed: SoapIndicatorState::empty_at(timestamp),
        }
    }

    pub fn side(&self, direction: SwapDirection) -> &SoapIndicatorState {
        match direction {
            SwapDirection::PayFixed => &self.pay_fixed,
            SwapDirection::ReceiveFixed => &self.receive_fixed,
        }
    }

    fn side_mut(&mut self, direction: SwapDirection) -> &mut SoapIndicatorState {
        match direction {
            SwapDirection::PayFixed => &mut self.pay_fixed,
            SwapDirection::ReceiveFixed => &mut self.receive_fixed,
        }
    }

    /// Values both sides at one timestamp and IBT price.
    pub fn valuation(&self, timestamp: Timestamp, ibt_price: Wad) -> Result<SoapValuation, SoapError> {
        let pay_fixed = self
            .pay_fixed
            .calculate_soap(SwapDirection::PayFixed, timestamp, ibt_price)?;
        let receive_fixed = self
            .receive_fixed
            .calculate_soap(SwapDirection::ReceiveFixed, timestamp, ibt_price)?;
        Ok(SoapValuation {
            asset: self.asset.clone(),
            timestamp,
            ibt_price,
            pay_fixed,
            receive_fixed,
            total: pay_fixed.checked_add(receive_fixed)?,
        })
    }
}

/// Mark-to-market of one asset's swap book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoapValuation {
    pub asset: AssetId,
    pub timestamp: Timestamp,
    pub ibt_price: Wad,
    pub pay_fixed: SignedWad,
    pub receive_fixed: SignedWad,
    pub total: SignedWad,
}

/// Position entering or leaving a SOAP aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPosition {
    pub direction: SwapDirection,
    pub notional: Wad,
    pub fixed_rate: Wad,
    pub ibt_quantity: Wad,
    pub open_timestamp: Timestamp,
}

/// SOAP books of every asset, valued against a [`RateIndexOracle`].
///
/// The engine only ever reads the oracle. Each open or close replaces one
/// side of one book after the new state has been fully computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoapEngine {
    books: BTreeMap<AssetId, SoapBook>,
}

impl SoapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the empty pair of aggregates for `asset`.
    pub fn initialize_asset(&mut self, asset: AssetId, timestamp: Timestamp) -> Result<(), SoapError> {
        if self.books.contains_key(&asset) {
            return Err(SoapError::AlreadyInitialized(asset));
        }
        info!("initialized SOAP book for {} at {}", asset, timestamp);
        self.books.insert(asset.clone(), SoapBook::new(asset, timestamp));
        Ok(())
    }

    pub fn book(&self, asset: &AssetId) -> Result<&SoapBook, SoapError> {
        self.books
            .get(asset)
            .ok_or_else(|| SoapError::UnknownAsset(asset.clone()))
    }

    pub fn books(&self) -> impl Iterator<Item = &SoapBook> {
        self.books.values()
    }

    /// Adds a position to the matching side of `asset`'s book.
    pub fn open_position(
        &mut self,
        asset: &AssetId,
        timestamp: Timestamp,
        position: &SwapPosition,
    ) -> Result<SoapIndicatorState, SoapError> {
        let book = self
            .books
            .get_mut(asset)
            .ok_or_else(|| SoapError::UnknownAsset(asset.clone()))?;
        let side = book.side_mut(position.direction);
        let next = side.rebalance_when_open_position(
            timestamp,
            position.notional,
            position.fixed_rate,
            position.ibt_quantity,
        )?;
        *side = next;
        debug!("{} {} book after open: {:?}", asset, position.direction, next);
        Ok(next)
    }

    /// Removes a previously opened position from `asset`'s book.
    pub fn close_position(
        &mut self,
        asset: &AssetId,
        timestamp: Timestamp,
        position: &SwapPosition,
    ) -> Result<SoapIndicatorState, SoapError> {
        let book = self
            .books
            .get_mut(asset)
            .ok_or_else(|| SoapError::UnknownAsset(asset.clone()))?;
        let side = book.side_mut(position.direction);
        let next = side.rebalance_when_close_position(
            timestamp,
            position.notional,
            position.fixed_rate,
            position.ibt_quantity,
            position.open_timestamp,
        )?;
        *side = next;
        debug!("{} {} book after close: {:?}", asset, position.direction, next);
        Ok(next)
    }

    /// Values `asset`'s book at the IBT price the oracle projects to `timestamp`.
    pub fn soap<A: Authorizer>(
        &self,
        oracle: &RateIndexOracle<A>,
        asset: &AssetId,
        timestamp: Timestamp,
    ) -> Result<SoapValuation, SoapError> {
        let book = self.book(asset)?;
        let ibt_price = oracle.get_accrued_index(asset, timestamp)?;
        book.valuation(timestamp, ibt_price)
    }
}

/// IBT quantity bought by `notional` at the oracle's current price.
pub fn ibt_quantity_for<A: Authorizer>(
    oracle: &RateIndexOracle<A>,
    asset: &AssetId,
    notional: Wad,
    timestamp: Timestamp,
) -> Result<Wad, SoapError> {
    let price = oracle.get_accrued_index(asset, timestamp)?;
    Ok(wad_div(notional, price)?)
}
