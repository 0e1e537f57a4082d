//! The agent arena and the asynchronous frame-convergence orchestrator.
//!
//! Asynchrony is simulated: every tick visits the whole population in a
//! freshly shuffled order, approximating the unordered update pattern of a
//! real distributed system without concurrency primitives. Each agent's
//! state is mutated only during its own turn; an invasion writes only to
//! the target's conflict state, never to its position or frame.
//!
//! Every failure inside the orchestrator (degenerate geometry, too few
//! neighbors, timed-out invasions) degrades to "no state change this
//! tick", so a tick is always a finite, bounded computation and the
//! simulation always progresses.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use nalgebra::Vector2;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentId, FrameId, InvasionState};
use crate::config::SwarmConfig;
use crate::geometry::{distance, random_position};
use crate::measurement::Measurement;
use crate::neighborhood::{valid_neighborhoods, Neighborhood, NeighborhoodMode, MIN_MEMBERS};
use crate::trilateration::{intersect_two_circles, locate_from_three, CircleIntersection};

/// Update phase, derived from the tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Independent frame formation; invasions are not yet allowed.
    Warmup,

    /// Frame formation plus the invasion protocol.
    SteadyState,

    /// Post-finalization gradient refinement of the dominant frame.
    Refinement,
}

/// Read-only per-agent snapshot for display and reporting layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentStatus {
    /// Arena index.
    pub id: AgentId,
    /// Displayed position estimate.
    pub estimate: Vector2<f64>,
    /// Current frame assignment.
    pub frame: Option<FrameId>,
    /// Whether the agent ended inside the dominant frame.
    pub finalized: bool,
}

/// Event counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmMetrics {
    /// Frames bootstrapped by seeding.
    pub frames_seeded: u64,

    /// Successful trilateration placements (joins, re-assignments and
    /// invasion defections alike).
    pub joins: u64,

    /// Trilateration attempts abandoned on degenerate geometry.
    pub degenerate_attempts: u64,

    /// Invasions engaged (acceptance test passed and drawn).
    pub invasions_launched: u64,

    /// Agents that defected to an invading frame.
    pub agents_converted: u64,

    /// Invasions abandoned by timeout, on either side.
    pub invasion_timeouts: u64,
}

/// The swarm arena plus all orchestration state.
///
/// Agents live in a dense arena indexed by [`AgentId`]; measurements and
/// invasion fields store ids and resolve through the arena.
pub struct Swarm {
    config: SwarmConfig,
    agents: Vec<Agent>,

    /// Protocol decisions: visitation order, seeding, target picks,
    /// acceptance draws, trilateration triples.
    rng: ChaCha8Rng,

    /// Range-noise stream, split from the master seed so that enabling
    /// noise does not perturb protocol decisions or placement.
    noise_rng: ChaCha8Rng,
    noise: Option<Normal<f64>>,

    /// Agents whose id already identifies a frame; a frame id is never
    /// bound to a second, unrelated seed trio.
    spent_seeders: HashSet<AgentId>,

    tick: u64,
    dominant: Option<(FrameId, usize)>,
    metrics: SwarmMetrics,
}

impl Swarm {
    /// Builds the arena: every agent gets a random ground-truth position
    /// and a random initial estimate, no frame, and no measurements.
    pub fn new(config: SwarmConfig) -> Self {
        // Subsystem seeds are split off the master seed so that, e.g.,
        // turning noise on does not reshuffle agent placement.
        let placement_seed = config.seed;
        let protocol_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let noise_seed = config.seed.wrapping_mul(0x517cc1b727220a95);

        let mut placement_rng = ChaCha8Rng::seed_from_u64(placement_seed);
        let agents: Vec<Agent> = (0..config.num_agents)
            .map(|id| {
                let true_position = random_position(config.world_size, &mut placement_rng);
                let initial_estimate = random_position(config.world_size, &mut placement_rng);
                Agent::new(id, true_position, initial_estimate)
            })
            .collect();

        let noise = if config.range_noise_std > 0.0 {
            Some(
                Normal::new(0.0, config.range_noise_std)
                    .expect("range_noise_std must be finite and non-negative"),
            )
        } else {
            None
        };

        info!(
            "swarm initialized: {} agents, sensor range {}, world size {}",
            config.num_agents, config.sensor_range, config.world_size
        );

        Self {
            agents,
            rng: ChaCha8Rng::seed_from_u64(protocol_seed),
            noise_rng: ChaCha8Rng::seed_from_u64(noise_seed),
            noise,
            spent_seeders: HashSet::new(),
            tick: 0,
            dominant: None,
            metrics: SwarmMetrics::default(),
            config,
        }
    }

    /// Executes one asynchronous update round.
    pub fn advance_one_tick(&mut self) {
        self.tick += 1;
        self.collect_measurements();

        match self.phase_for(self.tick) {
            Phase::Warmup | Phase::SteadyState => self.convergence_round(),
            Phase::Refinement => self.refine_estimates(),
        }

        if self.tick == self.config.convergence_ticks {
            self.finalize_run();
        }
    }

    /// Phase of the most recently executed tick.
    pub fn phase(&self) -> Phase {
        self.phase_for(self.tick)
    }

    fn phase_for(&self, tick: u64) -> Phase {
        if tick > self.config.convergence_ticks {
            Phase::Refinement
        } else if tick > self.config.warmup_ticks {
            Phase::SteadyState
        } else {
            Phase::Warmup
        }
    }

    // ------------------------------------------------------------------
    // Measurement collection
    // ------------------------------------------------------------------

    /// Rebuilds every agent's measurement set for this tick.
    ///
    /// Ranges are synthesized from ground truth (there is no transport
    /// layer); one noise draw per pair keeps the observation symmetric.
    fn collect_measurements(&mut self) {
        for agent in &mut self.agents {
            agent.measurements.clear();
        }

        for i in 0..self.agents.len() {
            for j in (i + 1)..self.agents.len() {
                let true_distance =
                    distance(&self.agents[i].true_position, &self.agents[j].true_position);
                if true_distance >= self.config.sensor_range {
                    continue;
                }

                let range = self.perturb(true_distance);
                let estimated_distance =
                    distance(&self.agents[i].estimate, &self.agents[j].estimate);
                let (pos_i, pos_j) = (self.agents[i].estimate, self.agents[j].estimate);

                self.agents[i].measurements.push(Measurement {
                    neighbor: j,
                    observed_position: pos_j,
                    estimated_distance,
                    range,
                });
                self.agents[j].measurements.push(Measurement {
                    neighbor: i,
                    observed_position: pos_i,
                    estimated_distance,
                    range,
                });
            }
        }
    }

    /// Applies the configured sensor noise to a true distance.
    fn perturb(&mut self, true_distance: f64) -> f64 {
        match &self.noise {
            Some(noise) => (true_distance + noise.sample(&mut self.noise_rng)).max(0.0),
            None => true_distance,
        }
    }

    /// Sensed range between two agents, outside the per-tick measurement
    /// tables (used when anchoring a seed trio).
    fn sensed_range(&mut self, a: AgentId, b: AgentId) -> f64 {
        let true_distance = distance(&self.agents[a].true_position, &self.agents[b].true_position);
        self.perturb(true_distance)
    }

    // ------------------------------------------------------------------
    // Convergence round
    // ------------------------------------------------------------------

    fn convergence_round(&mut self) {
        let invasions_active = self.phase_for(self.tick) == Phase::SteadyState;

        let mut order: Vec<AgentId> = (0..self.agents.len()).collect();
        order.shuffle(&mut self.rng);

        for id in order {
            if invasions_active {
                self.check_besieged(id);
                self.check_to_invade(id);
            }
            self.frame_decision(id);

            // The displayed position follows the frame-local one while the
            // frames are still converging.
            let agent = &mut self.agents[id];
            agent.estimate = agent.local_position;
        }
    }

    /// Seed / join / density re-assignment decision for one agent.
    fn frame_decision(&mut self, id: AgentId) {
        if self.agents[id].frame.is_none()
            && self.rng.gen::<f64>() < self.config.seed_probability
            && self.try_seed(id)
        {
            return;
        }

        let candidates = valid_neighborhoods(&self.agents[id], &self.agents, NeighborhoodMode::Join);
        let Some(largest) = candidates.into_iter().max_by_key(|n| n.len()) else {
            return;
        };

        if self.local_density(id) < self.config.density_floor {
            // Inconsistent or minority placement: dissolve into the most
            // popular nearby frame.
            self.join_via_trilateration(id, &largest);
        }
    }

    /// Attempts to bootstrap a brand-new frame around `id`.
    ///
    /// Three unassigned candidates are anchored from their mutual sensed
    /// ranges: the first at the local origin, the second on the local
    /// x-axis, the third by two-circle intersection. Either intersection
    /// solution is acceptable; nothing constrains orientation yet, so the
    /// chirality is an arbitrary but consistent choice.
    fn try_seed(&mut self, id: AgentId) -> bool {
        if self.spent_seeders.contains(&id) {
            return false;
        }

        let pools = valid_neighborhoods(&self.agents[id], &self.agents, NeighborhoodMode::Seed);
        let Some(pool) = pools.first() else {
            return false;
        };
        let (a, b, c) = (pool.members[0], pool.members[1], pool.members[2]);

        let base = self.sensed_range(a, b);
        let range_a = self.sensed_range(a, c);
        let range_b = self.sensed_range(b, c);

        let third = match intersect_two_circles(
            Vector2::zeros(),
            range_a,
            Vector2::new(base, 0.0),
            range_b,
        ) {
            CircleIntersection::Degenerate => {
                self.metrics.degenerate_attempts += 1;
                debug!("agent {} seed attempt failed: degenerate anchor geometry", id);
                return false;
            }
            CircleIntersection::Tangent(p) => p,
            CircleIntersection::Crossing(p, _) => p,
        };

        let frame = Some(id);
        self.agents[a].local_position = Vector2::zeros();
        self.agents[a].frame = frame;
        self.agents[b].local_position = Vector2::new(base, 0.0);
        self.agents[b].frame = frame;
        self.agents[c].local_position = third;
        self.agents[c].frame = frame;

        self.spent_seeders.insert(id);
        self.metrics.frames_seeded += 1;
        debug!("agent {} seeded frame {} around agents {}, {}, {}", id, id, a, b, c);
        true
    }

    /// Re-localizes `id` inside `neighborhood`'s frame by trilateration
    /// against three members chosen uniformly at random.
    ///
    /// Random triple selection spreads estimation noise across repeated
    /// calls instead of pinning every join to the same three landmarks.
    fn join_via_trilateration(&mut self, id: AgentId, neighborhood: &Neighborhood) -> bool {
        debug_assert!(
            neighborhood.len() >= MIN_MEMBERS,
            "trilateration needs at least {} landmarks",
            MIN_MEMBERS
        );

        let picks = rand::seq::index::sample(&mut self.rng, neighborhood.len(), MIN_MEMBERS);
        let mut anchors = [(Vector2::zeros(), 0.0); MIN_MEMBERS];
        for (slot, pick) in anchors.iter_mut().zip(picks.iter()) {
            let landmark = neighborhood.members[pick];
            let Some(m) = self.agents[id].measurements.iter().find(|m| m.neighbor == landmark)
            else {
                // Membership implies a same-tick measurement.
                return false;
            };
            *slot = (self.agents[landmark].local_position, m.range);
        }

        match locate_from_three(
            anchors[0].0, anchors[0].1,
            anchors[1].0, anchors[1].1,
            anchors[2].0, anchors[2].1,
        ) {
            Ok(position) => {
                let agent = &mut self.agents[id];
                agent.local_position = position;
                agent.frame = neighborhood.frame;
                self.metrics.joins += 1;
                true
            }
            Err(err) => {
                self.metrics.degenerate_attempts += 1;
                debug!("agent {} trilateration failed ({}); keeping previous frame", id, err);
                false
            }
        }
    }

    /// Fraction of measured neighbors that share the agent's frame and sit
    /// within sensor range of it in *local* coordinates — a consistency
    /// check between local and measured geometry, and the proxy for local
    /// frame health.
    fn local_density(&self, id: AgentId) -> f64 {
        let agent = &self.agents[id];
        if agent.measurements.is_empty() {
            return 0.0;
        }

        let consistent = agent
            .measurements
            .iter()
            .filter(|m| {
                let other = &self.agents[m.neighbor];
                other.frame == agent.frame
                    && (other.local_position - agent.local_position).norm()
                        < self.config.sensor_range
            })
            .count();

        consistent as f64 / agent.measurements.len() as f64
    }

    // ------------------------------------------------------------------
    // Invasion protocol
    // ------------------------------------------------------------------

    /// Per-tick conflict bookkeeping for one agent: relaying a siege into
    /// its frame, expiring stale conflicts, and attempting to defect.
    fn check_besieged(&mut self, id: AgentId) {
        // A besieged agent relays the aggressor's signal to same-frame
        // neighbors that are not themselves in a conflict yet.
        if let InvasionState::BeingInvaded { invader, .. } = self.agents[id].invasion {
            let frame = self.agents[id].frame;
            let neighbors: Vec<AgentId> =
                self.agents[id].measurements.iter().map(|m| m.neighbor).collect();

            for neighbor in neighbors {
                if self.agents[neighbor].frame != frame
                    || !self.agents[neighbor].invasion.is_neutral()
                {
                    continue;
                }
                if self.rng.gen::<f64>() < self.config.propagation_probability {
                    self.attempt_invasion(invader, neighbor);
                }
            }
        }

        // Unresolved conflicts are abandoned after a fixed number of
        // ticks, on either side; livelock is not an option.
        let timeout = self.config.invasion_timeout;
        let expired = match &mut self.agents[id].invasion {
            InvasionState::Invading { ticks, .. } | InvasionState::BeingInvaded { ticks, .. } => {
                *ticks += 1;
                *ticks > timeout
            }
            InvasionState::Neutral => false,
        };
        if expired {
            self.agents[id].invasion = InvasionState::Neutral;
            self.metrics.invasion_timeouts += 1;
            debug!("agent {} invasion conflict timed out, resetting", id);
        }

        // A besieged agent tries to defect: when the invading frame has a
        // valid neighborhood here, trilateration completes the takeover.
        if let InvasionState::BeingInvaded { enemy_frame, .. } = self.agents[id].invasion {
            let candidates =
                valid_neighborhoods(&self.agents[id], &self.agents, NeighborhoodMode::Join);
            if let Some(target) = candidates.into_iter().find(|n| n.frame == Some(enemy_frame)) {
                if self.join_via_trilateration(id, &target) {
                    self.agents[id].invasion = InvasionState::Neutral;
                    self.metrics.agents_converted += 1;
                    debug!("agent {} fell to frame {}", id, enemy_frame);
                }
            }
        }
    }

    /// Scans for an invasion target on the edge of the weakest visible
    /// foreign frame.
    fn check_to_invade(&mut self, id: AgentId) {
        if !self.agents[id].invasion.is_neutral() || self.agents[id].frame.is_none() {
            return;
        }

        let mut candidates =
            valid_neighborhoods(&self.agents[id], &self.agents, NeighborhoodMode::Join);
        if candidates.is_empty() {
            return;
        }

        // The smallest foreign neighborhood is the most promising prey.
        candidates.sort_by_key(Neighborhood::len);
        let prey = &candidates[0];

        // Members ordered by squared distance from their frame origin; a
        // fixed per-candidate acceptance keeps the *last* accepted member,
        // biasing the pick toward the frame's edge.
        let mut members = prey.members.clone();
        members.sort_by(|&a, &b| {
            let key_a = self.agents[a].local_position.norm_squared();
            let key_b = self.agents[b].local_position.norm_squared();
            key_a.total_cmp(&key_b)
        });

        let mut target = None;
        for &member in &members {
            if self.rng.gen::<f64>() < self.config.invasion_pick_probability {
                target = Some(member);
            }
        }

        if let Some(target) = target {
            self.attempt_invasion(id, target);
        }
    }

    /// One frame-vs-frame conquest attempt of `target` by `invader`.
    ///
    /// Only a fully neutral agent can be targeted, and an agent fending
    /// off a siege cannot press an attack of its own: anything else would
    /// let invading and besieged state coexist on one agent.
    fn attempt_invasion(&mut self, invader: AgentId, target: AgentId) {
        let (Some(invading_frame), Some(target_frame)) =
            (self.agents[invader].frame, self.agents[target].frame)
        else {
            return;
        };
        if invading_frame == target_frame
            || !self.agents[target].invasion.is_neutral()
            || matches!(self.agents[invader].invasion, InvasionState::BeingInvaded { .. })
        {
            return;
        }

        let invader_density = self.local_density(invader);
        let target_density = self.local_density(target);
        if invader_density < self.config.density_floor || target_density > invader_density {
            return;
        }

        // Acceptance follows the ratio of the two agents' squared
        // distances from their frame origins; frames below the density
        // floor are easy prey.
        let invader_spread = self.agents[invader].local_position.norm_squared();
        let target_spread = self.agents[target].local_position.norm_squared();
        let mut chance = logistic(invader_spread / target_spread - 1.0);
        if target_density < self.config.density_floor {
            chance = self.config.invasion_chance_cap;
        }
        chance = chance.min(self.config.invasion_chance_cap);

        if self.rng.gen::<f64>() < chance {
            self.agents[target].invasion = InvasionState::BeingInvaded {
                enemy_frame: invading_frame,
                invader,
                ticks: 0,
            };
            self.agents[invader].invasion = InvasionState::Invading {
                target_frame,
                ticks: 0,
            };
            self.metrics.invasions_launched += 1;
            debug!(
                "agent {} (frame {}) invades agent {} (frame {})",
                invader, invading_frame, target, target_frame
            );
        }
    }

    // ------------------------------------------------------------------
    // Refinement and scoring
    // ------------------------------------------------------------------

    /// Least-squares refinement of finalized agents' estimates.
    ///
    /// Only measurements of finalized peers participate: neighbors left
    /// behind in abandoned frames report positions in a foreign
    /// coordinate system, so their residuals are meaningless here.
    fn refine_estimates(&mut self) {
        let alpha = self.config.alpha;
        for id in 0..self.agents.len() {
            let agent = &self.agents[id];
            if !agent.finalized || agent.frame.is_none() {
                continue;
            }

            let peers = agent
                .measurements
                .iter()
                .filter(|m| self.agents[m.neighbor].finalized);
            let refined = agent.gradient_step(alpha, peers);
            self.agents[id].estimate = refined;
        }
    }

    /// Fixes the dominant frame and marks its members finalized.
    fn finalize_run(&mut self) {
        let census = self.frame_census();
        let dominant = census
            .into_iter()
            .max_by_key(|&(frame, count)| (count, Reverse(frame)));

        match dominant {
            Some((frame, size)) => {
                for agent in &mut self.agents {
                    agent.finalized = agent.frame == Some(frame);
                }
                self.dominant = Some((frame, size));
                info!(
                    "run finalized: dominant frame {} holds {}/{} agents",
                    frame,
                    size,
                    self.agents.len()
                );
            }
            None => {
                self.dominant = None;
                warn!("run finalized with no frames seeded");
            }
        }
    }

    fn frame_census(&self) -> HashMap<FrameId, usize> {
        let mut census = HashMap::new();
        for agent in &self.agents {
            if let Some(frame) = agent.frame {
                *census.entry(frame).or_insert(0) += 1;
            }
        }
        census
    }

    /// Mean pairwise |estimated − true| distance error across finalized
    /// agents, normalized by the finalized-agent count. Pairs where either
    /// side is not finalized are excluded.
    pub fn mean_error(&self) -> f64 {
        let finalized: Vec<&Agent> = self.agents.iter().filter(|a| a.finalized).collect();
        if finalized.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        for (k, a) in finalized.iter().enumerate() {
            for b in &finalized[k + 1..] {
                let estimated = (a.estimate - b.estimate).norm();
                let actual = (a.true_position - b.true_position).norm();
                total += (estimated - actual).abs();
            }
        }
        total / finalized.len() as f64
    }

    // ------------------------------------------------------------------
    // Query surface
    // ------------------------------------------------------------------

    /// Ticks executed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of agents in the arena.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The run configuration.
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Full agent state, read-only.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// One agent by id.
    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id]
    }

    /// Per-agent snapshots for display and reporting layers.
    pub fn agent_states(&self) -> impl Iterator<Item = AgentStatus> + '_ {
        self.agents.iter().map(|a| AgentStatus {
            id: a.id,
            estimate: a.estimate,
            frame: a.frame,
            finalized: a.finalized,
        })
    }

    /// The dominant frame id: fixed at finalization, the live largest
    /// frame before that.
    pub fn dominant_frame(&self) -> Option<FrameId> {
        match self.dominant {
            Some((frame, _)) => Some(frame),
            None => self
                .frame_census()
                .into_iter()
                .max_by_key(|&(frame, count)| (count, Reverse(frame)))
                .map(|(frame, _)| frame),
        }
    }

    /// Member count of the dominant frame.
    pub fn dominant_frame_size(&self) -> usize {
        match self.dominant {
            Some((_, size)) => size,
            None => self
                .frame_census()
                .into_values()
                .max()
                .unwrap_or(0),
        }
    }

    /// Agents inside the dominant frame at finalization.
    pub fn finalized_count(&self) -> usize {
        self.agents.iter().filter(|a| a.finalized).count()
    }

    /// Event counters accumulated so far.
    pub fn metrics(&self) -> SwarmMetrics {
        self.metrics
    }
}

/// Standard logistic curve, used for invasion acceptance.
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
