//! Vault rebalancing walkthrough.
//!
//! An AMM treasury keeps a target share of its liquidity as working
//! capital and parks the rest across two yield strategies.

use rate_engine::config::VaultConfig;
use rate_engine::prelude::*;
use rate_engine::vault::{FungibleAsset, InMemoryToken, RebalanceOutcome};
use rust_decimal_macros::dec;

fn print_vault(vault: &VaultRebalancer<InMemoryToken>, working_capital: Wad) {
    println!("  buffer:      {}", vault.buffer());
    for (id, balance) in vault.strategy_balances() {
        println!("  {:<12} {}", format!("{id}:"), balance);
    }
    println!("  managed:     {}", vault.total_managed_assets().unwrap());
    println!("  shares:      {}", vault.total_shares());
    println!(
        "  utilization: {:.2}%\n",
        vault.utilization(working_capital).unwrap() * 100.0
    );
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔══════════════════════════════════════════╗");
    println!("║  rate-engine: Vault Rebalance Example    ║");
    println!("╚══════════════════════════════════════════╝\n");

    let amm = AccountId::new("amm-treasury");
    let vault_account = AccountId::new("vault");
    let mut token = InMemoryToken::new("USDC", 6);
    token.mint(&amm, 5_000_000_000_000).unwrap();

    let config = VaultConfig {
        target_utilization_ratio: dec!(0.15),
        asset_decimals: 6,
        treasury: Some(AccountId::new("dao-treasury")),
    };
    let mut vault = VaultRebalancer::new(&config, vault_account.clone(), token, AccessRegistry::new(amm.clone())).unwrap();

    let aave = SimulatedStrategy::new(Wad::new(32_000_000_000_000_000));
    let compound = SimulatedStrategy::new(Wad::new(41_000_000_000_000_000)).with_liquidity_cap(Wad::from_units(250_000));
    vault
        .register_strategy(&amm, StrategyId::new("aave"), Box::new(aave.clone()))
        .unwrap();
    vault
        .register_strategy(&amm, StrategyId::new("compound"), Box::new(compound.clone()))
        .unwrap();

    // --- Step 1: Park the surplus ---
    println!("━━━ Step 1: Rebalance with 2,000,000 idle ━━━\n");
    let mut working_capital = Wad::from_units(2_000_000);
    let outcome = vault.rebalance(&amm, working_capital).unwrap();
    if let RebalanceOutcome::Deposited { amount, .. } = outcome {
        working_capital = working_capital.saturating_sub(amount);
    }
    println!("  outcome:     {:?}", outcome);
    print_vault(&vault, working_capital);

    // --- Step 2: Strategy rates flip ---
    println!("━━━ Step 2: Aave now pays more; a new deposit follows the rate ━━━\n");
    aave.set_apr(Wad::new(52_000_000_000_000_000));
    vault.deposit(&amm, Wad::from_units(100_000)).unwrap();
    working_capital = working_capital.saturating_sub(Wad::from_units(100_000));
    print_vault(&vault, working_capital);

    // --- Step 3: A quarter of yield ---
    println!("━━━ Step 3: 90 days of yield ━━━\n");
    for strategy in [&aave, &compound] {
        let earned = strategy.accrue(90 * 86_400).unwrap();
        let raw = rate_engine::math::from_wad(earned, 6).unwrap();
        vault.token_mut().mint(&vault_account, raw).unwrap();
        println!("  earned {}", earned);
    }
    println!("  redeemable:  {}\n", vault.redeemable_value(&amm).unwrap());

    // --- Step 4: Traders drain the pool ---
    println!("━━━ Step 4: Working capital drops to 50,000 ━━━\n");
    working_capital = Wad::from_units(50_000);
    let outcome = vault.rebalance(&amm, working_capital).unwrap();
    if let RebalanceOutcome::Withdrawn { amount, .. } = outcome {
        working_capital = working_capital.checked_add(amount).unwrap();
    }
    println!("  outcome:     {:?}", outcome);
    print_vault(&vault, working_capital);

    // --- Step 5: Harvest rewards ---
    println!("━━━ Step 5: Claim incentives ━━━\n");
    compound.add_rewards(Wad::from_units(1_250)).unwrap();
    let claimed = vault.claim(&amm, &StrategyId::new("compound")).unwrap();
    println!("  claimed {} to dao-treasury", claimed);
    println!("  AMM token balance: {}", vault.token().balance_of(&amm));
}
