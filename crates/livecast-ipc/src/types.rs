//! Common types shared by the engine and the app.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::state::SessionState;

/// Timer intervals driving the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// First idle period before a replay (default: 5 minutes).
    pub idle_initial: Duration,

    /// Idle period between subsequent replays (default: 2 minutes).
    pub idle_recurring: Duration,

    /// Period between broadcast restarts (default: 5 hours).
    pub restart: Duration,

    /// Period between injected prompts (default: 10 minutes).
    pub prompt: Duration,

    /// Upper bound on a single timer handler's run time.
    pub handler_budget: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            idle_initial: Duration::from_secs(5 * 60),
            idle_recurring: Duration::from_secs(2 * 60),
            restart: Duration::from_secs(5 * 60 * 60),
            prompt: Duration::from_secs(10 * 60),
            handler_budget: Duration::from_secs(90),
        }
    }
}

/// Point-in-time counters served by the status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Current broadcast session state.
    pub session: SessionState,

    /// Prompts accepted into the prompt queue.
    pub prompts_accepted: u64,

    /// Prompts discarded because the queue was full.
    pub prompts_dropped: u64,

    /// Prompts rejected by the content filter.
    pub prompts_refused: u64,

    /// Prompts abandoned after a collaborator failure.
    pub pipeline_failures: u64,

    /// Clips produced by the generation pipeline.
    pub clips_generated: u64,

    /// Clips discarded because the ready-clip queue was full.
    pub clips_dropped: u64,

    /// Completed playlist switches.
    pub switches: u64,

    /// Failed playlist switches.
    pub switch_failures: u64,

    /// Clips re-enqueued by the idle timer.
    pub replays: u64,

    /// Scheduled broadcast restarts.
    pub restarts: u64,

    /// Items currently waiting in the prompt queue.
    pub prompt_queue_len: usize,

    /// Items currently waiting in the ready-clip queue.
    pub clip_queue_len: usize,

    /// Clips remembered for idle replay.
    pub history_len: usize,

    /// Context reinitializations reported by the broadcast process.
    pub reinit_count: u64,

    /// Seconds since the engine started.
    pub uptime_seconds: u64,
}
