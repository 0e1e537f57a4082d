//! Per-tick range observations between nearby agents.

use nalgebra::Vector2;

use crate::agent::AgentId;

/// One observation of a nearby agent, valid for a single tick.
///
/// Measurements are recomputed from scratch every tick and must never be
/// reused across ticks. The neighbor is stored as an arena index, keeping
/// the arena free of ownership cycles. Observations are symmetric: if A
/// and B are within sensor range, each holds a measurement of the other
/// with the same sensed range.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Arena index of the observed agent.
    pub neighbor: AgentId,

    /// The neighbor's estimated position at observation time.
    pub observed_position: Vector2<f64>,

    /// Distance between the two agents' position estimates.
    pub estimated_distance: f64,

    /// Sensed inter-agent range: the ground-truth distance, perturbed by
    /// Gaussian noise when the simulation is configured with any.
    pub range: f64,
}
