//! Swap book walkthrough.
//!
//! Publishes a rate index, opens swaps on both sides of one market and
//! values the aggregate book as the IBT price accrues.

use rate_engine::prelude::*;
use rate_engine::soap::ibt_quantity_for;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const T0: u64 = 1_704_067_200; // 2024-01-01T00:00:00Z
const DAY: u64 = 86_400;

fn wad(value: Decimal) -> Wad {
    Wad::from_decimal(value).expect("demo literal fits in a wad")
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔══════════════════════════════════════════╗");
    println!("║  rate-engine: Swap Book Example          ║");
    println!("╚══════════════════════════════════════════╝\n");

    let owner = AccountId::new("governance");
    let keeper = AccountId::new("index-keeper");
    let usdc = AssetId::new("USDC");

    let config = ProtocolConfig::default();
    let mut oracle = RateIndexOracle::new(&config.oracle, AccessRegistry::new(owner.clone()));
    oracle.add_updater(&owner, keeper.clone()).unwrap();
    oracle.register_asset(&owner, usdc.clone(), T0).unwrap();
    let mut engine = SoapEngine::new();
    engine.initialize_asset(usdc.clone(), T0).unwrap();

    // --- Step 1: Benchmark rate ---
    println!("━━━ Step 1: Publish the USDC index ━━━\n");
    let state = oracle.update_index(&keeper, &usdc, wad(dec!(0.042)), T0).unwrap();
    println!("Index:    {}", state.index_value);
    println!("IBT:      {}", state.ibt_price);
    println!("EMA:      {}\n", state.exponential_moving_average);

    // --- Step 2: Open swaps ---
    println!("━━━ Step 2: Open swaps ━━━\n");
    let trades = [
        (SwapDirection::PayFixed, dec!(250_000), dec!(0.040), 0),
        (SwapDirection::ReceiveFixed, dec!(180_000), dec!(0.047), 2),
        (SwapDirection::PayFixed, dec!(75_000), dec!(0.044), 5),
    ];
    let mut positions = Vec::new();
    for (direction, notional, rate, day) in trades {
        let at = T0 + day * DAY;
        let notional = wad(notional);
        let position = SwapPosition {
            direction,
            notional,
            fixed_rate: wad(rate),
            ibt_quantity: ibt_quantity_for(&oracle, &usdc, notional, at).unwrap(),
            open_timestamp: at,
        };
        let side = engine.open_position(&usdc, at, &position).unwrap();
        println!(
            "day {:>2}  {:<13} {:>12} @ {}  -> side average {}",
            day,
            direction.to_string(),
            notional.to_string(),
            rate,
            side.average_interest_rate
        );
        positions.push(position);
    }
    println!();

    // --- Step 3: The index moves ---
    println!("━━━ Step 3: Rates rise ━━━\n");
    for (day, rate) in [(10, dec!(0.048)), (20, dec!(0.055)), (30, dec!(0.061))] {
        let state = oracle.update_index(&keeper, &usdc, wad(rate), T0 + day * DAY).unwrap();
        println!(
            "day {:>2}  index {}  ibt {}  ema {}",
            day, state.index_value, state.ibt_price, state.exponential_moving_average
        );
    }
    println!();

    // --- Step 4: Value the book ---
    println!("━━━ Step 4: SOAP ━━━\n");
    for day in [30, 60, 90] {
        let valuation = engine.soap(&oracle, &usdc, T0 + day * DAY).unwrap();
        println!(
            "day {:>2}  pay-fixed {:>28}  receive-fixed {:>28}  total {:>28}",
            day,
            valuation.pay_fixed.to_string(),
            valuation.receive_fixed.to_string(),
            valuation.total.to_string()
        );
    }
    println!();

    // --- Step 5: Close the receive-fixed swap ---
    println!("━━━ Step 5: Close a position ━━━\n");
    let closing = &positions[1];
    let at = T0 + 90 * DAY;
    let side = engine.close_position(&usdc, at, closing).unwrap();
    println!("Receive-fixed side after close: empty = {}", side.is_empty());
    let valuation = engine.soap(&oracle, &usdc, at).unwrap();
    println!("Remaining book: {}", serde_json::to_string_pretty(&valuation).unwrap());
}
