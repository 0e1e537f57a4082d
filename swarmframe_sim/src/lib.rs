//! SwarmFrame scenario harness.
//!
//! Drives the localization core to completion under named parameter
//! presets, evaluates pass criteria, and exports the query surface as
//! JSON for external reporting and visualization. Everything here only
//! *reads* the core's query surface; the core never depends on it.
//!
//! # Usage
//!
//! ```ignore
//! use swarmframe_sim::{Runner, ScenarioId};
//!
//! let result = Runner::new(ScenarioId::Baseline, 42).run();
//! assert!(result.passed);
//! ```

pub mod exporter;
pub mod runner;
pub mod scenarios;

pub use exporter::{AgentSnapshot, ExportError, RunExport, RunFrame, RunSummary};
pub use runner::{RunResult, Runner};
pub use scenarios::ScenarioId;
