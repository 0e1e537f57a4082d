//! Named parameter presets for localization runs.

use std::str::FromStr;

use swarmframe_core::SwarmConfig;

/// Scenario identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SF-001: 50 well-connected agents, noiseless ranges.
    Baseline,

    /// SF-002: 300 agents over a 300-unit world with sensor range 50.
    LargeSwarm,

    /// SF-003: baseline geometry with Gaussian range noise (5% of the
    /// sensor range).
    NoisyRanges,

    /// SF-004: low connectivity — agents often lack the three neighbors
    /// trilateration needs, exercising the skip-and-retry paths.
    SparseRange,

    /// SF-005: aggressive seeding, so many competing frames form and the
    /// invasion protocol has to merge them.
    SeedStorm,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::LargeSwarm,
            ScenarioId::NoisyRanges,
            ScenarioId::SparseRange,
            ScenarioId::SeedStorm,
        ]
    }

    /// Short name, used by the CLI and reports.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::LargeSwarm => "large_swarm",
            ScenarioId::NoisyRanges => "noisy_ranges",
            ScenarioId::SparseRange => "sparse_range",
            ScenarioId::SeedStorm => "seed_storm",
        }
    }

    /// The swarm configuration this scenario runs with (seed still to be
    /// applied by the caller).
    pub fn config(&self) -> SwarmConfig {
        match self {
            ScenarioId::Baseline => SwarmConfig::default(),
            ScenarioId::LargeSwarm => SwarmConfig::default()
                .with_agents(300)
                .with_world_size(300.0)
                .with_sensor_range(50.0)
                .with_seed_probability(1.0 / 400.0)
                .with_alpha(0.001),
            ScenarioId::NoisyRanges => SwarmConfig::default().with_range_noise(1.0),
            ScenarioId::SparseRange => SwarmConfig::default()
                .with_world_size(120.0)
                .with_sensor_range(18.0),
            ScenarioId::SeedStorm => SwarmConfig::default().with_seed_probability(0.1),
        }
    }

    /// Minimum fraction of agents the dominant frame must hold for the
    /// scenario to pass.
    pub fn min_dominant_fraction(&self) -> f64 {
        match self {
            ScenarioId::Baseline => 0.9,
            ScenarioId::LargeSwarm => 0.5,
            ScenarioId::NoisyRanges => 0.75,
            ScenarioId::SparseRange => 0.25,
            ScenarioId::SeedStorm => 0.6,
        }
    }
}

impl FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(ScenarioId::Baseline),
            "large_swarm" => Ok(ScenarioId::LargeSwarm),
            "noisy_ranges" => Ok(ScenarioId::NoisyRanges),
            "sparse_range" => Ok(ScenarioId::SparseRange),
            "seed_storm" => Ok(ScenarioId::SeedStorm),
            other => Err(format!("unknown scenario '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        assert!("chaos_storm".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_configs_keep_warmup_before_convergence() {
        for scenario in ScenarioId::all() {
            let config = scenario.config();
            assert!(config.warmup_ticks < config.convergence_ticks);
        }
    }
}
