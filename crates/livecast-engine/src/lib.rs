//! Scheduler and queue-driven orchestrator for livecast.
//!
//! This crate ties the prompt and clip queues to the generation
//! collaborators and the stream controller, and runs the idle-replay,
//! restart and prompt timers.

mod ledger;
mod metrics;
mod orchestrator;
mod scheduler;
mod sink;

pub use ledger::PlaybackLedger;
pub use metrics::MetricsCollector;
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, Services, DEFAULT_ADDRESS_PREFIX, DEFAULT_POLL_INTERVAL,
};
pub use scheduler::{Scheduler, SchedulerHandle, TimerHandler};
pub use sink::{ChannelSink, ChatSink};

use std::sync::Arc;

use crossbeam_channel::Sender;
use livecast_ipc::ScheduleConfig;
use livecast_stream::StreamController;

/// Create an orchestrator whose notices go to `notice_tx`, together with the
/// scheduler that drives its timers.
pub fn create_engine(
    config: OrchestratorConfig,
    schedule: ScheduleConfig,
    controller: Arc<StreamController>,
    services: Services,
    notice_tx: Sender<String>,
) -> (Arc<Orchestrator>, Scheduler) {
    let scheduler = Scheduler::new(schedule);
    let orchestrator = Orchestrator::new(
        config,
        controller,
        services,
        Arc::new(ChannelSink::new(notice_tx)),
        scheduler.handle(),
    );
    (Arc::new(orchestrator), scheduler)
}
