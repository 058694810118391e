//! Scenario replay and random stress paths.

pub mod scenario;

pub use scenario::{run_scenario, Scenario, ScenarioError, ScenarioEvent, ScenarioReport};
pub use stress_test::{generate_random_scenario, generate_scenario_with, PathConfig};
