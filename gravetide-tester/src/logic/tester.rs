use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::scenarios::TestScenario;
use super::soak::{SoakSummary, run_soak};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_millis")]
    pub average_duration: Duration,
    pub summaries: Vec<SoakSummary>,
}

pub struct SoakTester {
    verbose: bool,
}

impl SoakTester {
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧟 Soaking {} (mode {:?}, player {}, seed {seed})",
                        scenario.key.bright_white(),
                        scenario.plan.mode,
                        scenario.plan.strategy.label()
                    );
                }
                self.run_single(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_single(&self, scenario: &TestScenario, seed: u64, iterations: usize) -> ScenarioResult {
        let mut failures = Vec::new();
        let mut summaries = Vec::new();
        let mut durations = Vec::new();
        let mut successes = 0;

        for i in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let start = Instant::now();
            match run_iteration(scenario, iteration_seed) {
                Ok(summary) => {
                    if summary.violations.is_empty() {
                        successes += 1;
                    } else {
                        for violation in &summary.violations {
                            failures.push(format!("Iteration {} (seed {iteration_seed}): {violation}", i + 1));
                        }
                    }
                    if self.verbose {
                        println!(
                            "   seed {iteration_seed}: {} turns, {} actors left, digest {:016x}",
                            summary.turns_played, summary.actors_left, summary.state_digest
                        );
                    }
                    summaries.push(summary);
                }
                Err(err) => failures.push(format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1)),
            }
            durations.push(start.elapsed());
        }

        let average_duration = if durations.is_empty() {
            Duration::ZERO
        } else {
            durations.iter().sum::<Duration>() / u32::try_from(durations.len()).unwrap_or(1)
        };
        ScenarioResult {
            scenario_name: scenario.key.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            summaries,
        }
    }
}

fn run_iteration(scenario: &TestScenario, seed: u64) -> anyhow::Result<SoakSummary> {
    let summary = run_soak(&scenario.plan, seed)?;
    if scenario.replay_check && scenario.plan.is_reproducible() {
        let replay = run_soak(&scenario.plan, seed)?;
        anyhow::ensure!(
            replay.state_digest == summary.state_digest && replay.trace_digest == summary.trace_digest,
            "replay diverged: state {:016x} vs {:016x}, trace {:016x} vs {:016x}",
            summary.state_digest,
            replay.state_digest,
            summary.trace_digest,
            replay.trace_digest
        );
    }
    Ok(summary)
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::get_scenario;

    #[test]
    fn background_scenario_skips_the_replay() {
        let mut scenario = get_scenario("background").expect("scenario");
        scenario.plan.turns = 5;
        scenario.replay_check = true;
        let summary = run_iteration(&scenario, 4).expect("iteration");
        assert!(summary.background.is_some());
    }
}
