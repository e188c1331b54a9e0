//! Observable run state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the engine is in its run cycle.
///
/// `Idle → Waiting → Running → Completed → Idle`; stopping forces
/// `Waiting`/`Running` straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No run armed.
    Idle,
    /// Armed, waiting out the start delay. No clicks yet.
    Waiting,
    /// Clicking at the configured cadence.
    Running,
    /// Duration budget spent; auto-resets to `Idle` after a short grace
    /// period so observers can render a "finished" affordance.
    Completed,
}

/// Snapshot published to observers on every state change.
///
/// `remaining` is meaningful while `Running` (and in `Waiting`, where it is
/// preset to the full duration budget); it reads zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub phase: Phase,
    pub remaining: Duration,
}

impl EngineStatus {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            remaining: Duration::ZERO,
        }
    }
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self::idle()
    }
}
