//! rate-engine CLI
//!
//! Replay market scenarios and inspect accrual from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Replay a scenario file
//! rate-engine replay --input scenario.json
//!
//! # Output as JSON, with a custom protocol config
//! rate-engine replay --input scenario.json --format json --config protocol.json
//!
//! # Project an IBT price
//! rate-engine accrue --rate 0.05 --days 365
//!
//! # Generate a random scenario for testing
//! rate-engine generate --steps 90 --output scenario.json
//! ```

use rate_engine::config::ProtocolConfig;
use rate_engine::core::asset::AssetId;
use rate_engine::math::Wad;
use rate_engine::oracle::index::accrue_ibt_price;
use rate_engine::simulation::{generate_random_scenario, run_scenario, PathConfig, Scenario};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::process;

const SECONDS_PER_DAY: u64 = 86_400;

fn print_usage() {
    eprintln!(
        r#"rate-engine: interest rate index, SOAP and vault engine

USAGE:
    rate-engine <COMMAND> [OPTIONS]

COMMANDS:
    replay      Replay a JSON scenario and report SOAP valuations
    accrue      Project an IBT price at a constant index rate
    generate    Generate a random scenario (for testing)
    help        Show this message

OPTIONS (replay):
    --input <FILE>      Path to JSON scenario file
    --format <FORMAT>   Output format: text (default) or json
    --config <FILE>     Protocol config (defaults apply when omitted)

OPTIONS (accrue):
    --rate <DEC>        Annual index rate, e.g. 0.05
    --days <N>          Days of accrual
    --price <DEC>       Starting IBT price (default: 1)

OPTIONS (generate):
    --steps <N>         Index publications per asset (default: 30)
    --assets <LIST>     Comma-separated asset symbols (default: USDC,DAI)
    --output <FILE>     Write to file instead of stdout

Set RUST_LOG=debug to trace every state transition.

EXAMPLES:
    rate-engine replay --input scenario.json
    rate-engine replay --input scenario.json --format json
    rate-engine accrue --rate 0.05 --days 30 --price 1.02
    rate-engine generate --steps 90 --assets USDC,DAI,USDT --output scenario.json"#
    );
}

fn option_value(args: &[String], i: usize, name: &str, expected: &str) -> String {
    args.get(i).cloned().unwrap_or_else(|| {
        eprintln!("{} requires {}", name, expected);
        process::exit(1);
    })
}

fn parse_decimal(value: &str, name: &str) -> Decimal {
    value.parse().unwrap_or_else(|e| {
        eprintln!("Invalid {} '{}': {}", name, value, e);
        process::exit(1);
    })
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing output: {}", e);
        process::exit(1);
    })
}

fn cmd_replay(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(option_value(args, i, "--input", "a file path"));
            }
            "--config" => {
                i += 1;
                config_path = Some(option_value(args, i, "--config", "a file path"));
            }
            "--format" => {
                i += 1;
                format = option_value(args, i, "--format", "'text' or 'json'");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let config = match config_path {
        Some(p) => ProtocolConfig::load(&p).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        }),
        None => ProtocolConfig::default(),
    };

    let scenario = Scenario::load(&path).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "events": [
    {{ "type": "register_asset", "at": "2024-01-01T00:00:00Z", "asset": "USDC" }},
    {{ "type": "update_index", "at": "2024-01-01T00:00:00Z", "asset": "USDC", "value": "0.05" }},
    {{ "type": "open", "at": "2024-01-02T00:00:00Z", "id": "s1", "asset": "USDC",
      "direction": "pay_fixed", "notional": "1000", "fixed_rate": "0.04" }},
    {{ "type": "value", "at": "2024-02-01T00:00:00Z", "asset": "USDC" }}
  ]
}}"#
        );
        process::exit(1);
    });

    let report = run_scenario(&scenario, &config).unwrap_or_else(|e| {
        eprintln!("Replay failed ({}): {}", e.kind(), e);
        process::exit(1);
    });

    if format == "json" {
        println!("{}", to_json(&report));
    } else {
        println!("{}", report);
    }
}

fn cmd_accrue(args: &[String]) {
    let mut rate = None;
    let mut days = None;
    let mut price = Decimal::ONE;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--rate" => {
                i += 1;
                rate = Some(parse_decimal(&option_value(args, i, "--rate", "a decimal"), "rate"));
            }
            "--days" => {
                i += 1;
                days = Some(
                    args.get(i)
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or_else(|| {
                            eprintln!("--days requires a number");
                            process::exit(1);
                        }),
                );
            }
            "--price" => {
                i += 1;
                price = parse_decimal(&option_value(args, i, "--price", "a decimal"), "price");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let (rate, days) = match (rate, days) {
        (Some(r), Some(d)) => (r, d),
        _ => {
            eprintln!("Error: --rate <DEC> and --days <N> are required");
            process::exit(1);
        }
    };

    let to_wad = |value: Decimal, name: &str| {
        Wad::from_decimal(value).unwrap_or_else(|e| {
            eprintln!("Invalid {}: {}", name, e);
            process::exit(1);
        })
    };
    let start = to_wad(price, "price");
    let elapsed = days.saturating_mul(SECONDS_PER_DAY);
    let accrued = accrue_ibt_price(start, to_wad(rate, "rate"), elapsed).unwrap_or_else(|e| {
        eprintln!("Accrual failed: {}", e);
        process::exit(1);
    });

    println!("Rate:          {}", rate);
    println!("Elapsed:       {} days ({} s)", days, elapsed);
    println!("Start price:   {}", start);
    println!("Accrued price: {}", accrued);
    println!("Raw:           {}", accrued.raw());
}

fn cmd_generate(args: &[String]) {
    let mut config = PathConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--steps" => {
                i += 1;
                config.steps = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--steps requires a number");
                        process::exit(1);
                    });
            }
            "--assets" => {
                i += 1;
                config.assets = option_value(args, i, "--assets", "a comma-separated list")
                    .split(',')
                    .map(|s| AssetId::new(s.trim()))
                    .collect();
            }
            "--output" => {
                i += 1;
                output_path = Some(option_value(args, i, "--output", "a file path"));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let scenario = generate_random_scenario(&config);
    let json = to_json(&scenario);

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} events across {} assets → {}",
            scenario.events.len(),
            config.assets.len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "replay" => cmd_replay(rest),
        "accrue" => cmd_accrue(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
