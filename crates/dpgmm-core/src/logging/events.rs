//! Stage and event names shared by the engine and the CLI.
//!
//! Events are emitted as `tracing` fields (`event = ..., stage = ...`) so the
//! JSONL output can be filtered without parsing messages.

use serde::{Deserialize, Serialize};

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Configuration and input loading.
    Load,
    /// Prior construction.
    Prior,
    /// Point-level fitting.
    Fit,
    /// Event-level (hierarchical) fitting.
    Hierarchical,
    /// Density evaluation and sampling of persisted draws.
    Evaluate,
    /// Writing results.
    Output,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Load => "load",
            Stage::Prior => "prior",
            Stage::Fit => "fit",
            Stage::Hierarchical => "hierarchical",
            Stage::Evaluate => "evaluate",
            Stage::Output => "output",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names.
pub mod event_names {
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const SAMPLES_LOADED: &str = "samples.loaded";
    pub const EVENTS_LOADED: &str = "events.loaded";

    pub const PRIOR_BUILT: &str = "prior.built";

    pub const POINT_ASSIGNED: &str = "fit.point_assigned";
    pub const POINT_OUT_OF_BOUNDS: &str = "fit.point_out_of_bounds";
    pub const DRAW_COMPLETE: &str = "fit.draw_complete";
    pub const HISTORY_COMPLETE: &str = "fit.history_complete";

    pub const EVENT_ASSIGNED: &str = "hier.event_assigned";
    pub const CLUSTER_FALLBACK_PRIOR: &str = "hier.cluster_fallback_prior";
    pub const HIER_DRAW_COMPLETE: &str = "hier.draw_complete";

    pub const POINT_EVALUATED: &str = "evaluate.point";
    pub const PREDICTIVE_SAMPLED: &str = "evaluate.sampled";

    pub const OUTPUT_WRITTEN: &str = "output.written";
}
