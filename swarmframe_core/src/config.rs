//! Simulation configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a localization run.
///
/// The defaults describe a well-connected 50-agent swarm: roughly ten
/// neighbors per agent, with the chance that two *random* local estimates
/// land within sensor range of each other staying below the density
/// floor, so unassigned agents are cheap to absorb into real frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Master seed for determinism.
    pub seed: u64,

    /// Number of agents in the swarm.
    pub num_agents: usize,

    /// Sensor radius: agents farther apart are mutually invisible.
    pub sensor_range: f64,

    /// Side length of the square world the agents are scattered in.
    pub world_size: f64,

    /// Learning rate for gradient refinement.
    pub alpha: f64,

    /// Per-tick probability that an unassigned agent attempts to seed a
    /// new frame.
    pub seed_probability: f64,

    /// Per-candidate probability of selecting an invasion target while
    /// scanning a foreign neighborhood.
    pub invasion_pick_probability: f64,

    /// Per-neighbor probability that a besieged agent relays the invasion
    /// into its own frame.
    pub propagation_probability: f64,

    /// Local density below which an agent abandons its frame; frames this
    /// weak are also easy prey for invasions.
    pub density_floor: f64,

    /// Upper bound on the invasion acceptance probability.
    pub invasion_chance_cap: f64,

    /// Ticks reserved for independent frame formation before the invasion
    /// protocol activates.
    pub warmup_ticks: u64,

    /// Tick at which the run finalizes (dominant frame fixed, refinement
    /// begins).
    pub convergence_ticks: u64,

    /// Ticks after which an unresolved invasion is unconditionally
    /// abandoned.
    pub invasion_timeout: u32,

    /// Standard deviation of the Gaussian noise applied to sensed ranges;
    /// 0 disables noise entirely.
    pub range_noise_std: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_agents: 50,
            sensor_range: 20.0,
            world_size: 80.0,
            alpha: 0.05,
            seed_probability: 0.01,
            invasion_pick_probability: 0.25,
            propagation_probability: 0.5,
            density_floor: 0.25,
            invasion_chance_cap: 0.8,
            warmup_ticks: 10,
            convergence_ticks: 50,
            invasion_timeout: 10,
            range_noise_std: 0.0,
        }
    }
}

impl SwarmConfig {
    /// Sets the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the agent count.
    pub fn with_agents(mut self, num_agents: usize) -> Self {
        self.num_agents = num_agents;
        self
    }

    /// Sets the sensor radius.
    pub fn with_sensor_range(mut self, sensor_range: f64) -> Self {
        self.sensor_range = sensor_range;
        self
    }

    /// Sets the world side length.
    pub fn with_world_size(mut self, world_size: f64) -> Self {
        self.world_size = world_size;
        self
    }

    /// Sets the gradient learning rate.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the per-tick seeding probability.
    pub fn with_seed_probability(mut self, seed_probability: f64) -> Self {
        self.seed_probability = seed_probability;
        self
    }

    /// Sets the convergence tick budget.
    pub fn with_convergence_ticks(mut self, convergence_ticks: u64) -> Self {
        self.convergence_ticks = convergence_ticks;
        self
    }

    /// Sets the range-noise standard deviation.
    pub fn with_range_noise(mut self, range_noise_std: f64) -> Self {
        self.range_noise_std = range_noise_std;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_consistent() {
        let config = SwarmConfig::default();

        assert!(config.num_agents >= 4);
        assert!(config.sensor_range < config.world_size);
        assert!(config.density_floor > 0.0 && config.density_floor < 1.0);
        assert!(config.warmup_ticks < config.convergence_ticks);
    }

    #[test]
    fn test_builders_override_fields() {
        let config = SwarmConfig::default()
            .with_seed(7)
            .with_agents(300)
            .with_world_size(300.0)
            .with_sensor_range(50.0)
            .with_range_noise(1.0);

        assert_eq!(config.seed, 7);
        assert_eq!(config.num_agents, 300);
        assert_eq!(config.world_size, 300.0);
        assert_eq!(config.sensor_range, 50.0);
        assert_eq!(config.range_noise_std, 1.0);
    }
}
