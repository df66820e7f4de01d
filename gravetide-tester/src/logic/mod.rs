pub mod brains;
pub mod policy;
pub mod reports;
pub mod scenarios;
pub mod soak;
pub mod tester;
pub mod world_builder;

pub use scenarios::{TestScenario, get_scenario, list_scenarios};
pub use tester::{ScenarioResult, SoakTester};
