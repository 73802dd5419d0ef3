//! Idle-replay, restart and prompt timers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use livecast_ipc::ScheduleConfig;

/// Work triggered by the scheduler's timers.
#[async_trait]
pub trait TimerHandler: Send + Sync {
    /// Nothing new was produced for a while.
    async fn on_idle_replay(&self);

    /// Time for the periodic broadcast restart.
    async fn on_restart(&self);

    /// Time to inject a generated prompt.
    async fn on_prompt(&self);
}

/// Cloneable handle used to push the idle timer back.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    idle_reset: Arc<Notify>,
}

impl SchedulerHandle {
    /// Re-arm the idle-replay timer with its initial interval.
    ///
    /// A reset sent while a handler is running is applied once it returns.
    pub fn reset_idle(&self) {
        self.idle_reset.notify_one();
    }
}

/// Watches the three timers from one place.
///
/// Handlers run one at a time and each is bounded by the handler budget, so
/// a stuck external call delays the other timers by at most that budget.
/// Every timer is re-armed explicitly after its handler returns.
pub struct Scheduler {
    config: ScheduleConfig,
    handle: SchedulerHandle,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config,
            handle: SchedulerHandle::default(),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Run the timers forever.
    pub async fn run(self, handler: Arc<dyn TimerHandler>) {
        let config = self.config;
        info!(
            idle_initial = ?config.idle_initial,
            idle_recurring = ?config.idle_recurring,
            restart = ?config.restart,
            prompt = ?config.prompt,
            "Scheduler started"
        );

        let idle = sleep(config.idle_initial);
        let restart = sleep(config.restart);
        let prompt = sleep(config.prompt);
        tokio::pin!(idle, restart, prompt);

        loop {
            tokio::select! {
                _ = self.handle.idle_reset.notified() => {
                    debug!("Idle timer reset");
                    idle.as_mut().reset(Instant::now() + config.idle_initial);
                }
                _ = &mut idle => {
                    self.bounded("idle_replay", handler.on_idle_replay()).await;
                    idle.as_mut().reset(Instant::now() + config.idle_recurring);
                }
                _ = &mut restart => {
                    self.bounded("restart", handler.on_restart()).await;
                    restart.as_mut().reset(Instant::now() + config.restart);
                }
                _ = &mut prompt => {
                    self.bounded("prompt", handler.on_prompt()).await;
                    prompt.as_mut().reset(Instant::now() + config.prompt);
                }
            }
        }
    }

    async fn bounded<F>(&self, timer: &'static str, work: F)
    where
        F: Future<Output = ()>,
    {
        debug!(timer, "Timer fired");
        if tokio::time::timeout(self.config.handler_budget, work)
            .await
            .is_err()
        {
            warn!(
                timer,
                "Timer handler exceeded its budget of {:?}, abandoning it",
                self.config.handler_budget
            );
        }
    }
}
