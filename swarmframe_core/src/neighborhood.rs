//! Same-frame agent groupings, the minimal unit usable for trilateration.

use std::collections::HashMap;

use crate::agent::{Agent, AgentId, FrameId};

/// Minimum neighborhood size for trilateration: fewer than three landmarks
/// is geometrically underdetermined and must be skipped, not attempted.
pub const MIN_MEMBERS: usize = 3;

/// Candidate filter for the neighborhood search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborhoodMode {
    /// Only unassigned peers qualify (frame bootstrap).
    Seed,

    /// Only peers of frames other than the searcher's own qualify.
    Join,
}

/// A transient grouping of measured neighbors sharing one frame.
///
/// Computed fresh for every decision rather than cached: frame membership
/// is volatile from tick to tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    /// Shared frame of the members; `None` only for seed pools.
    pub frame: Option<FrameId>,

    /// Arena indices of the members, at least [`MIN_MEMBERS`] of them.
    pub members: Vec<AgentId>,
}

impl Neighborhood {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Never true for a validly constructed neighborhood.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Partitions `agent`'s measured neighbors into valid neighborhoods.
///
/// Neighbors are grouped by frame, groups below [`MIN_MEMBERS`] are
/// dropped, and the result is sorted by frame id so that callers iterate
/// deterministically. Returns an empty vector when no qualifying
/// neighborhood exists.
pub fn valid_neighborhoods(
    agent: &Agent,
    agents: &[Agent],
    mode: NeighborhoodMode,
) -> Vec<Neighborhood> {
    if agent.measurements.len() < MIN_MEMBERS {
        return Vec::new();
    }

    let mut groups: HashMap<Option<FrameId>, Vec<AgentId>> = HashMap::new();
    for m in &agent.measurements {
        let other = &agents[m.neighbor];
        let qualifies = match mode {
            NeighborhoodMode::Seed => other.frame.is_none(),
            NeighborhoodMode::Join => other.frame.is_some() && other.frame != agent.frame,
        };
        if qualifies {
            groups.entry(other.frame).or_default().push(other.id);
        }
    }

    let mut neighborhoods: Vec<Neighborhood> = groups
        .into_iter()
        .filter(|(_, members)| members.len() >= MIN_MEMBERS)
        .map(|(frame, members)| Neighborhood { frame, members })
        .collect();
    neighborhoods.sort_by_key(|n| n.frame);
    neighborhoods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Measurement;
    use nalgebra::Vector2;

    /// Builds an arena where agent 0 measures every other agent, and the
    /// others carry the given frame assignments.
    fn arena(frames: &[Option<FrameId>]) -> Vec<Agent> {
        let mut agents = vec![Agent::new(0, Vector2::zeros(), Vector2::zeros())];
        for (i, frame) in frames.iter().enumerate() {
            let id = i + 1;
            let mut other = Agent::new(id, Vector2::zeros(), Vector2::zeros());
            other.frame = *frame;
            agents.push(other);
        }
        for id in 1..agents.len() {
            let m = Measurement {
                neighbor: id,
                observed_position: Vector2::zeros(),
                estimated_distance: 1.0,
                range: 1.0,
            };
            agents[0].measurements.push(m);
        }
        agents
    }

    #[test]
    fn test_groups_below_three_members_are_dropped() {
        let agents = arena(&[Some(9), Some(9), Some(8), Some(8), Some(8)]);

        let found = valid_neighborhoods(&agents[0], &agents, NeighborhoodMode::Join);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].frame, Some(8));
        assert_eq!(found[0].len(), 3);
    }

    #[test]
    fn test_seed_mode_keeps_only_unassigned_peers() {
        let agents = arena(&[None, None, None, Some(7), Some(7), Some(7)]);

        let found = valid_neighborhoods(&agents[0], &agents, NeighborhoodMode::Seed);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].frame, None);
        assert_eq!(found[0].members, vec![1, 2, 3]);
    }

    #[test]
    fn test_join_mode_excludes_own_frame_and_unassigned() {
        let mut agents = arena(&[Some(5), Some(5), Some(5), None, None, None]);
        agents[0].frame = Some(5);

        let found = valid_neighborhoods(&agents[0], &agents, NeighborhoodMode::Join);

        assert!(found.is_empty());
    }

    #[test]
    fn test_too_few_measurements_yield_nothing() {
        let mut agents = arena(&[Some(4), Some(4), Some(4)]);
        agents[0].measurements.truncate(2);

        let found = valid_neighborhoods(&agents[0], &agents, NeighborhoodMode::Join);

        assert!(found.is_empty());
    }

    #[test]
    fn test_result_is_sorted_by_frame() {
        let agents = arena(&[
            Some(9),
            Some(9),
            Some(9),
            Some(2),
            Some(2),
            Some(2),
            Some(2),
        ]);

        let found = valid_neighborhoods(&agents[0], &agents, NeighborhoodMode::Join);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].frame, Some(2));
        assert_eq!(found[1].frame, Some(9));
    }
}
