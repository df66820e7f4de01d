use gravetide_sim::GameMode;

use super::policy::PlayerStrategy;
use super::soak::SoakPlan;

/// A named soak plan.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub description: &'static str,
    pub plan: SoakPlan,
    /// Run every iteration twice and require identical digests.
    pub replay_check: bool,
}

impl TestScenario {
    const fn new(key: &'static str, description: &'static str, plan: SoakPlan) -> Self {
        Self {
            key,
            description,
            plan,
            replay_check: false,
        }
    }

    const fn with_replay_check(mut self) -> Self {
        self.replay_check = true;
        self
    }
}

#[must_use]
pub fn catalog() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "smoke",
            "Short standard-mode run with a cautious player",
            SoakPlan::new(GameMode::Standard, PlayerStrategy::Turtle).with_turns(50),
        ),
        TestScenario::new(
            "standard",
            "Long standard-mode soak with a hunting player",
            SoakPlan::new(GameMode::Standard, PlayerStrategy::Hunter).with_turns(400),
        )
        .with_replay_check(),
        TestScenario::new(
            "infection",
            "Corpses-and-infection soak with a drifting player",
            SoakPlan::new(GameMode::CorpsesInfection, PlayerStrategy::Drifter).with_turns(400),
        )
        .with_replay_check(),
        TestScenario::new(
            "vintage",
            "Vintage rules, no corpses",
            SoakPlan::new(GameMode::Vintage, PlayerStrategy::Hunter).with_turns(300),
        )
        .with_replay_check(),
        TestScenario::new(
            "background",
            "Play with the background simulator keeping neighbours in step",
            SoakPlan::new(GameMode::Standard, PlayerStrategy::Turtle)
                .with_turns(200)
                .with_background()
                .with_entry_checks(None),
        ),
        TestScenario::new(
            "entry",
            "Synchronous catch-up of every district after play",
            SoakPlan::new(GameMode::CorpsesInfection, PlayerStrategy::Turtle)
                .with_turns(150)
                .with_entry_checks(None),
        )
        .with_replay_check(),
        TestScenario::new(
            "entry-abort",
            "Catch-ups abandoned early must still land on the world clock",
            SoakPlan::new(GameMode::Standard, PlayerStrategy::Turtle)
                .with_turns(150)
                .with_entry_checks(Some(20)),
        ),
    ]
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<TestScenario> {
    catalog().into_iter().find(|s| s.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog().iter().map(|s| (s.key, s.description)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_scenarios_never_ask_for_replays() {
        for scenario in catalog() {
            assert!(
                !scenario.replay_check || scenario.plan.is_reproducible(),
                "{} cannot replay",
                scenario.key
            );
        }
    }

    #[test]
    fn lookup_by_key() {
        assert!(get_scenario("smoke").is_some());
        assert!(get_scenario("nope").is_none());
        assert_eq!(list_scenarios().len(), catalog().len());
    }
}
