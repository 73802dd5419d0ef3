//! Where chat notices go.

use crossbeam_channel::Sender;
use tracing::{info, warn};

use livecast_ipc::Notice;

/// Receives notices addressed to the chat audience.
pub trait ChatSink: Send + Sync {
    fn say(&self, notice: Notice);
}

/// Pushes notice text onto a bounded channel drained by a chat relay.
pub struct ChannelSink {
    tx: Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl ChatSink for ChannelSink {
    fn say(&self, notice: Notice) {
        let text = notice.text();
        info!("Chat notice: {}", text);
        if let Err(e) = self.tx.try_send(text) {
            warn!("Failed to queue chat notice: {}", e);
        }
    }
}
