use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rate_engine::prelude::*;
use rate_engine::simulation::{generate_scenario_with, run_scenario, PathConfig};

const T0: u64 = 1_704_067_200;

fn oracle_with_assets(count: usize) -> (RateIndexOracle, AccountId, Vec<AssetId>) {
    let owner = AccountId::new("owner");
    let mut oracle = RateIndexOracle::new(&ProtocolConfig::default().oracle, AccessRegistry::new(owner.clone()));
    oracle.add_updater(&owner, owner.clone()).unwrap();
    let assets: Vec<AssetId> = (0..count).map(|i| AssetId::new(format!("ASSET{i}"))).collect();
    for asset in &assets {
        oracle.register_asset(&owner, asset.clone(), T0).unwrap();
    }
    (oracle, owner, assets)
}

fn bench_index_update(c: &mut Criterion) {
    let (mut oracle, owner, assets) = oracle_with_assets(1);
    let rate = Wad::new(45_000_000_000_000_000);
    let mut now = T0;

    c.bench_function("index_update_single", |b| {
        b.iter(|| {
            now += 3_600;
            oracle.update_index(&owner, black_box(&assets[0]), black_box(rate), now).unwrap()
        })
    });
}

fn bench_index_batch_50(c: &mut Criterion) {
    let (mut oracle, owner, assets) = oracle_with_assets(50);
    let values = vec![Wad::new(30_000_000_000_000_000); assets.len()];
    let mut now = T0;

    c.bench_function("index_update_batch_50", |b| {
        b.iter(|| {
            now += 3_600;
            oracle.update_indexes(&owner, black_box(&assets), black_box(&values), now).unwrap()
        })
    });
}

fn bench_soap_valuation(c: &mut Criterion) {
    let (mut oracle, owner, assets) = oracle_with_assets(1);
    let asset = assets[0].clone();
    oracle.update_index(&owner, &asset, Wad::new(50_000_000_000_000_000), T0).unwrap();

    let mut engine = SoapEngine::new();
    engine.initialize_asset(asset.clone(), T0).unwrap();
    for i in 0..1_000u64 {
        let position = SwapPosition {
            direction: if i % 2 == 0 { SwapDirection::PayFixed } else { SwapDirection::ReceiveFixed },
            notional: Wad::from_units(1_000 + i),
            fixed_rate: Wad::new(40_000_000_000_000_000),
            ibt_quantity: Wad::from_units(1_000 + i),
            open_timestamp: T0 + i,
        };
        engine.open_position(&asset, T0 + i, &position).unwrap();
    }

    // one aggregate per side: cost does not grow with the position count
    c.bench_function("soap_valuation_1000_positions", |b| {
        b.iter(|| engine.soap(&oracle, black_box(&asset), T0 + 86_400).unwrap())
    });
}

fn bench_scenario_replay(c: &mut Criterion) {
    let config = PathConfig {
        steps: 90,
        ..Default::default()
    };
    let scenario = generate_scenario_with(&config, &mut StdRng::seed_from_u64(7));
    let protocol = ProtocolConfig::default();

    c.bench_function("scenario_replay_90_steps", |b| {
        b.iter(|| run_scenario(black_box(&scenario), &protocol).unwrap())
    });
}

criterion_group!(
    benches,
    bench_index_update,
    bench_index_batch_50,
    bench_soap_valuation,
    bench_scenario_replay
);
criterion_main!(benches);
