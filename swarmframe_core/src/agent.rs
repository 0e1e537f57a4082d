//! Per-agent state for the localization swarm.

use nalgebra::Vector2;

use crate::measurement::Measurement;

/// Index of an agent in the swarm arena.
pub type AgentId = usize;

/// A frame is identified by the id of the agent that seeded it. The id is
/// immutable for the lifetime of the frame; only membership changes.
pub type FrameId = AgentId;

/// Conflict state of one agent in the invasion protocol.
///
/// An agent is never simultaneously invading and being invaded; encoding
/// the state as an enum makes the combination unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvasionState {
    /// No conflict.
    #[default]
    Neutral,

    /// Trying to conquer a foreign frame.
    Invading {
        /// The frame under attack.
        target_frame: FrameId,
        /// Ticks spent in this state; the attack is abandoned on timeout.
        ticks: u32,
    },

    /// Under attack by a foreign frame.
    BeingInvaded {
        /// The frame trying to conquer this agent.
        enemy_frame: FrameId,
        /// The specific aggressor, used when relaying the invasion.
        invader: AgentId,
        /// Ticks spent besieged; the siege is forgotten on timeout.
        ticks: u32,
    },
}

impl InvasionState {
    /// Whether the agent is free of any conflict.
    pub fn is_neutral(&self) -> bool {
        matches!(self, InvasionState::Neutral)
    }
}

/// One agent of the swarm.
///
/// The ground-truth position is fixed at creation and is used only to
/// synthesize range measurements and to score the final error; the
/// decision logic never reads it.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Arena index, unique and immutable.
    pub id: AgentId,

    /// Actual position in the world.
    pub true_position: Vector2<f64>,

    /// Displayed position estimate: synced from the frame-local position
    /// during convergence, refined by gradient descent afterwards.
    pub estimate: Vector2<f64>,

    /// Position in the agent's current frame.
    pub local_position: Vector2<f64>,

    /// Current frame assignment; `None` until the agent is localized.
    pub frame: Option<FrameId>,

    /// Current-tick observations of nearby agents.
    pub measurements: Vec<Measurement>,

    /// Invasion-protocol state.
    pub invasion: InvasionState,

    /// Whether the agent ended the run inside the dominant frame.
    pub finalized: bool,
}

impl Agent {
    /// Creates an unassigned agent with the given ground truth and an
    /// initial (random) estimate.
    pub fn new(id: AgentId, true_position: Vector2<f64>, initial_estimate: Vector2<f64>) -> Self {
        Self {
            id,
            true_position,
            estimate: initial_estimate,
            local_position: initial_estimate,
            frame: None,
            measurements: Vec::new(),
            invasion: InvasionState::Neutral,
            finalized: false,
        }
    }

    /// One least-squares refinement step over the given measurements.
    ///
    /// Accumulates the partial derivative of the squared residual
    /// `(range - estimated_distance)^2` with respect to each coordinate
    /// and steps the estimate by `-alpha * gradient`. Zero-distance
    /// measurements carry no gradient and are skipped. The caller decides
    /// which of this tick's measurements participate (refinement only
    /// trusts peers that share the finalized frame).
    pub fn gradient_step<'a, I>(&self, alpha: f64, measurements: I) -> Vector2<f64>
    where
        I: IntoIterator<Item = &'a Measurement>,
    {
        let mut gradient = Vector2::zeros();
        for m in measurements {
            if m.estimated_distance == 0.0 {
                continue;
            }

            let residual = (m.range - m.estimated_distance) / m.estimated_distance;
            gradient += (self.estimate - m.observed_position) * (-2.0 * residual);
        }

        self.estimate - gradient * alpha
    }
}
