//! Engine counters and status reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use livecast_ipc::StatusSnapshot;

/// Collects pipeline and playback counters.
pub struct MetricsCollector {
    start_time: Instant,
    prompts_accepted: AtomicU64,
    prompts_dropped: AtomicU64,
    prompts_refused: AtomicU64,
    pipeline_failures: AtomicU64,
    clips_generated: AtomicU64,
    clips_dropped: AtomicU64,
    switches: AtomicU64,
    switch_failures: AtomicU64,
    replays: AtomicU64,
    restarts: AtomicU64,
}

impl MetricsCollector {
    /// Create a collector; uptime is measured from now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            prompts_accepted: AtomicU64::new(0),
            prompts_dropped: AtomicU64::new(0),
            prompts_refused: AtomicU64::new(0),
            pipeline_failures: AtomicU64::new(0),
            clips_generated: AtomicU64::new(0),
            clips_dropped: AtomicU64::new(0),
            switches: AtomicU64::new(0),
            switch_failures: AtomicU64::new(0),
            replays: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
        }
    }

    /// Record a prompt entering the prompt queue, or being dropped at it.
    pub fn record_prompt(&self, accepted: bool) {
        let counter = if accepted {
            &self.prompts_accepted
        } else {
            &self.prompts_dropped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refusal(&self) {
        self.prompts_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pipeline_failure(&self) {
        self.pipeline_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a generated clip and whether the ready-clip queue took it.
    pub fn record_clip(&self, queued: bool) {
        self.clips_generated.fetch_add(1, Ordering::Relaxed);
        if !queued {
            self.clips_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the outcome of a playlist switch.
    pub fn record_switch(&self, ok: bool) {
        let counter = if ok {
            &self.switches
        } else {
            &self.switch_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replay(&self) {
        self.replays.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_restart(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    /// Counter snapshot. Session state and queue lengths are left at their
    /// defaults for the caller to fill in.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            prompts_accepted: self.prompts_accepted.load(Ordering::Relaxed),
            prompts_dropped: self.prompts_dropped.load(Ordering::Relaxed),
            prompts_refused: self.prompts_refused.load(Ordering::Relaxed),
            pipeline_failures: self.pipeline_failures.load(Ordering::Relaxed),
            clips_generated: self.clips_generated.load(Ordering::Relaxed),
            clips_dropped: self.clips_dropped.load(Ordering::Relaxed),
            switches: self.switches.load(Ordering::Relaxed),
            switch_failures: self.switch_failures.load(Ordering::Relaxed),
            replays: self.replays.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            ..StatusSnapshot::default()
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
