//! JSON export of a run's query surface.
//!
//! Captures parameters, per-interval frames of per-agent state, and the
//! final summary for external reporting and visualization tooling.

use std::fs::File;
use std::io::Write;

use serde::{Deserialize, Serialize};
use swarmframe_core::{Swarm, SwarmConfig, SwarmMetrics};
use thiserror::Error;

/// Failure while writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One agent's state as seen through the query surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<usize>,
    pub finalized: bool,
}

/// A single captured tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFrame {
    /// Tick this frame was captured at.
    pub tick: u64,

    /// Per-agent state.
    pub agents: Vec<AgentSnapshot>,
}

/// Final aggregate results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Members of the dominant frame.
    pub dominant_frame_size: usize,

    /// Agents that ended outside the dominant frame.
    pub unlocalized: usize,

    /// Mean pairwise localization error over finalized agents.
    pub mean_error: f64,

    /// Whether the run met its scenario's pass criteria.
    pub passed: bool,

    /// Event counters collected during the run.
    pub metrics: SwarmMetrics,
}

/// Complete export of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Scenario name.
    pub scenario: String,

    /// Seed used.
    pub seed: u64,

    /// Full run configuration.
    pub config: SwarmConfig,

    /// Captured frames.
    pub frames: Vec<RunFrame>,

    /// Final results, present once the run finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

impl RunExport {
    /// Creates an empty export container.
    pub fn new(scenario: &str, config: &SwarmConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed: config.seed,
            config: config.clone(),
            frames: Vec::new(),
            summary: None,
        }
    }

    /// Captures the swarm's current query surface as one frame.
    pub fn capture(&mut self, swarm: &Swarm) {
        let agents = swarm
            .agent_states()
            .map(|status| AgentSnapshot {
                id: status.id,
                x: status.estimate.x,
                y: status.estimate.y,
                frame: status.frame,
                finalized: status.finalized,
            })
            .collect();

        self.frames.push(RunFrame {
            tick: swarm.tick(),
            agents,
        });
    }

    /// Records the final results.
    pub fn finalize(&mut self, summary: RunSummary) {
        self.summary = Some(summary);
    }

    /// Writes the export as pretty-printed JSON.
    pub fn write_to_file(&self, path: &str) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmframe_core::SwarmConfig;

    #[test]
    fn test_capture_records_every_agent() {
        let config = SwarmConfig::default().with_agents(6).with_seed(5);
        let mut swarm = Swarm::new(config.clone());
        let mut export = RunExport::new("baseline", &config);

        swarm.advance_one_tick();
        export.capture(&swarm);

        assert_eq!(export.frames.len(), 1);
        assert_eq!(export.frames[0].tick, 1);
        assert_eq!(export.frames[0].agents.len(), 6);
    }

    #[test]
    fn test_export_round_trips_through_json() {
        let config = SwarmConfig::default().with_agents(4);
        let mut swarm = Swarm::new(config.clone());
        swarm.advance_one_tick();

        let mut export = RunExport::new("baseline", &config);
        export.capture(&swarm);
        export.finalize(RunSummary {
            dominant_frame_size: 0,
            unlocalized: 4,
            mean_error: 0.0,
            passed: false,
            metrics: swarm.metrics(),
        });

        let json = serde_json::to_string(&export).unwrap();
        let parsed: RunExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scenario, "baseline");
        assert_eq!(parsed.frames.len(), 1);
        assert!(parsed.summary.is_some());
    }
}
