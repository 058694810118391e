use ethnum::U256;
use proptest::prelude::*;
use rate_engine::auth::AccessRegistry;
use rate_engine::config::{OracleConfig, VaultConfig};
use rate_engine::core::account::AccountId;
use rate_engine::core::asset::AssetId;
use rate_engine::core::strategy::StrategyId;
use rate_engine::math::{from_wad, Wad, WAD};
use rate_engine::oracle::{RateIndexOracle, RateIndexState};
use rate_engine::soap::{SoapIndicatorState, SwapDirection};
use rate_engine::vault::{InMemoryToken, SimulatedStrategy, VaultRebalancer};

const T0: u64 = 1_700_000_000;
const MICRO: u128 = 1_000_000_000_000;

/// Notional between 0.000001 and 10,000,000 units.
fn arb_notional() -> impl Strategy<Value = Wad> {
    (1u128..10_000_000_000_000u128).prop_map(|micros| Wad::new(micros * MICRO))
}

/// Annual rate between 0% and 20% in 1e-6 steps.
fn arb_rate() -> impl Strategy<Value = Wad> {
    (0u128..200_000u128).prop_map(|micros| Wad::new(micros * MICRO))
}

/// Up to 90 days.
fn arb_elapsed() -> impl Strategy<Value = u64> {
    0u64..7_776_000u64
}

/// Price between 0.5 and 5.0.
fn arb_price() -> impl Strategy<Value = Wad> {
    (500_000u128..5_000_000u128).prop_map(|micros| Wad::new(micros * MICRO))
}

fn arb_direction() -> impl Strategy<Value = SwapDirection> {
    prop_oneof![Just(SwapDirection::PayFixed), Just(SwapDirection::ReceiveFixed)]
}

fn oracle_with(assets: &[&str]) -> (RateIndexOracle, AccountId) {
    let owner = AccountId::new("owner");
    let mut oracle = RateIndexOracle::new(&OracleConfig::default(), AccessRegistry::new(owner.clone()));
    oracle.add_updater(&owner, owner.clone()).unwrap();
    for asset in assets {
        oracle.register_asset(&owner, AssetId::new(*asset), T0).unwrap();
    }
    (oracle, owner)
}

fn open_state(notional: Wad, rate: Wad) -> SoapIndicatorState {
    SoapIndicatorState::empty_at(T0)
        .rebalance_when_open_position(T0, notional, rate, notional)
        .unwrap()
}

proptest! {
    // ===================================================================
    // INVARIANT 1: The IBT price never decreases.
    //
    // For any sequence of publications with non-decreasing timestamps and
    // non-negative values, each update accrues at a rate >= 0.
    // ===================================================================
    #[test]
    fn ibt_price_is_non_decreasing(
        updates in prop::collection::vec((arb_rate(), arb_elapsed()), 1..40)
    ) {
        let (mut oracle, owner) = oracle_with(&["USDC"]);
        let usdc = AssetId::new("USDC");
        let mut now = T0;
        let mut last_price = Wad::ONE;
        for (rate, elapsed) in updates {
            now += elapsed;
            let state = oracle.update_index(&owner, &usdc, rate, now).unwrap();
            prop_assert!(state.ibt_price >= last_price);
            prop_assert!(state.exponential_moving_average <= Wad::new(200_000 * MICRO));
            last_price = state.ibt_price;
        }
    }

    // ===================================================================
    // INVARIANT 2: SOAP valuation is pure.
    //
    // Valuing twice gives the same number and leaves the aggregate as it was.
    // ===================================================================
    #[test]
    fn soap_is_side_effect_free(
        notional in arb_notional(),
        rate in arb_rate(),
        elapsed in arb_elapsed(),
        price in arb_price(),
        direction in arb_direction(),
    ) {
        let state = open_state(notional, rate);
        let snapshot = state;
        let first = state.calculate_soap(direction, T0 + elapsed, price).unwrap();
        let second = state.calculate_soap(direction, T0 + elapsed, price).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(state, snapshot);
        prop_assert_eq!(state.rebalance_timestamp, T0);
    }

    // ===================================================================
    // INVARIANT 3: Open then immediately close restores the aggregate.
    //
    // Notional, IBT quantity and the accumulator come back exactly; the
    // average rate only drifts by the truncation of the two divisions.
    // ===================================================================
    #[test]
    fn open_close_round_trip(
        base_notional in arb_notional(),
        base_rate in arb_rate(),
        notional in arb_notional(),
        rate in arb_rate(),
        elapsed in arb_elapsed(),
    ) {
        let base = open_state(base_notional, base_rate);
        let at = T0 + elapsed;
        let after = base
            .rebalance_when_open_position(at, notional, rate, notional)
            .unwrap()
            .rebalance_when_close_position(at, notional, rate, notional, at)
            .unwrap();

        prop_assert_eq!(after.total_notional, base.total_notional);
        prop_assert_eq!(after.total_ibt_quantity, base.total_ibt_quantity);
        prop_assert_eq!(
            after.quasi_hypothetical_interest_cumulative,
            base.quasi_hypothetical_interest_total(at).unwrap()
        );
        let (a, b) = (base.average_interest_rate.raw(), after.average_interest_rate.raw());
        let drift = if a > b { a - b } else { b - a };
        let total = base.total_notional.raw() + notional.raw();
        let tolerance = total / base.total_notional.raw() + U256::ONE;
        prop_assert!(drift <= tolerance, "drift {} above {}", drift, tolerance);
    }

    // ===================================================================
    // INVARIANT 4: An empty aggregate is the canonical zero state.
    //
    // Whatever sequence of opens and closes leads there, zero notional
    // means zero IBT quantity and a zero average rate.
    // ===================================================================
    #[test]
    fn empty_aggregate_has_zero_average(
        ops in prop::collection::vec((any::<bool>(), arb_notional(), arb_rate(), arb_elapsed()), 1..30)
    ) {
        let mut state = SoapIndicatorState::empty_at(T0);
        let mut open: Vec<(Wad, Wad, u64)> = Vec::new();
        let mut now = T0;
        for (opening, notional, rate, elapsed) in ops {
            now += elapsed;
            if opening || open.is_empty() {
                state = state.rebalance_when_open_position(now, notional, rate, notional).unwrap();
                open.push((notional, rate, now));
            } else if let Some((n, r, opened)) = open.pop() {
                state = state.rebalance_when_close_position(now, n, r, n, opened).unwrap();
            }
            prop_assert_eq!(state.total_notional.is_zero(), state.total_ibt_quantity.is_zero());
            if state.total_notional.is_zero() {
                prop_assert!(state.average_interest_rate.is_zero());
                prop_assert!(state.quasi_hypothetical_interest_cumulative.is_zero());
            }
        }
        while let Some((n, r, opened)) = open.pop() {
            state = state.rebalance_when_close_position(now, n, r, n, opened).unwrap();
        }
        prop_assert_eq!(state, SoapIndicatorState::empty_at(now));
    }

    // ===================================================================
    // INVARIANT 5: Opposite sides mirror each other.
    //
    // Equal positions on both sides value to exact negatives.
    // ===================================================================
    #[test]
    fn opposite_sides_are_negatives(
        notional in arb_notional(),
        rate in arb_rate(),
        elapsed in arb_elapsed(),
        price in arb_price(),
    ) {
        let state = open_state(notional, rate);
        let pf = state.calculate_soap(SwapDirection::PayFixed, T0 + elapsed, price).unwrap();
        let rf = state.calculate_soap(SwapDirection::ReceiveFixed, T0 + elapsed, price).unwrap();
        prop_assert_eq!(pf, rf.checked_neg().unwrap());
    }

    // ===================================================================
    // INVARIANT 6: A mismatched batch changes nothing.
    // ===================================================================
    #[test]
    fn batch_length_mismatch_is_atomic(
        values in prop::collection::vec(arb_rate(), 0..6),
        asset_count in 0usize..6,
    ) {
        prop_assume!(values.len() != asset_count);
        let symbols = ["A", "B", "C", "D", "E", "F"];
        let (mut oracle, owner) = oracle_with(&symbols);
        let assets: Vec<AssetId> = symbols[..asset_count].iter().map(|s| AssetId::new(*s)).collect();
        prop_assert!(oracle.update_indexes(&owner, &assets, &values, T0 + 1).is_err());
        for symbol in symbols {
            prop_assert_eq!(oracle.get_index(&AssetId::new(symbol)).unwrap(), RateIndexState::new(T0));
        }
    }

    // ===================================================================
    // INVARIANT 7: Deposit then withdraw of the same amount always succeeds
    // and returns the depositor's share balance to where it was, give or
    // take one wei.
    // ===================================================================
    #[test]
    fn vault_round_trip_restores_shares(
        seed in 1u128..1_000_000u128,
        amount in 1u128..1_000_000u128,
        elapsed in 0u64..31_536_000u64,
    ) {
        let owner = AccountId::new("owner");
        let lp = AccountId::new("lp");
        let mut token = InMemoryToken::new("DAI", 18);
        token.mint(&owner, 10_000_000 * WAD).unwrap();
        token.mint(&lp, 10_000_000 * WAD).unwrap();
        let mut vault = VaultRebalancer::new(
            &VaultConfig::default(),
            AccountId::new("vault"),
            token,
            AccessRegistry::new(owner.clone()),
        )
        .unwrap();
        let strategy = SimulatedStrategy::new(Wad::new(40_000 * MICRO));
        vault.register_strategy(&owner, StrategyId::new("s"), Box::new(strategy.clone())).unwrap();

        vault.deposit(&owner, Wad::new(seed * WAD)).unwrap();
        // yield moves the exchange rate away from 1:1
        let earned = strategy.accrue(elapsed).unwrap();
        let account = vault.account().clone();
        vault.token_mut().mint(&account, from_wad(earned, 18).unwrap()).unwrap();

        let before = vault.shares_of(&lp);
        let value = Wad::new(amount * WAD);
        vault.deposit(&lp, value).unwrap();
        let withdrawn = vault.withdraw(&lp, value);
        prop_assert!(withdrawn.is_ok(), "round trip withdrawal failed: {:?}", withdrawn);
        let after = vault.shares_of(&lp);
        let drift = if after > before { after.raw() - before.raw() } else { before.raw() - after.raw() };
        prop_assert!(drift <= U256::ONE, "shares moved from {} to {}", before, after);
        prop_assert!(vault.share_ledger().is_consistent());
    }
}
