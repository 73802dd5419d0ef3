//! Queues and typed messages passed between livecast loops.
//!
//! This crate defines the bounded work queues that decouple producers from
//! consumers, the ring buffer of recently played clips, and the state and
//! notice types shared by the stream controller, the engine and the app.

mod events;
mod history;
mod queue;
mod state;
mod types;

pub use events::Notice;
pub use history::RecentHistory;
pub use queue::BoundedQueue;
pub use state::{SessionState, StopReason};
pub use types::{ScheduleConfig, StatusSnapshot};

use crossbeam_channel::{Receiver, Sender};

/// Default capacity of the prompt and ready-clip queues.
pub const QUEUE_CAPACITY: usize = 10;

/// Default number of played clips remembered for idle replay.
pub const HISTORY_CAPACITY: usize = 128;

/// Channel capacity for chat notices (Engine → chat relay).
pub const NOTICE_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded notice channel.
pub fn notice_channel() -> (Sender<String>, Receiver<String>) {
    crossbeam_channel::bounded(NOTICE_CHANNEL_CAPACITY)
}
