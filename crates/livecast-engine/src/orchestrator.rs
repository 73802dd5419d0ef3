//! Prompt and clip loops tying the queues to the collaborators and the
//! stream controller.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use livecast_ipc::{BoundedQueue, Notice, StatusSnapshot, HISTORY_CAPACITY, QUEUE_CAPACITY};
use livecast_services::{
    ContentFilter, LipSyncGenerator, ResponseGenerator, ServiceResult, SpeechSynthesizer,
};
use livecast_stream::StreamController;

use crate::ledger::PlaybackLedger;
use crate::metrics::MetricsCollector;
use crate::scheduler::{SchedulerHandle, TimerHandler};
use crate::sink::ChatSink;

/// Default delay between queue polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Prefix a chat message needs to be taken as a prompt.
pub const DEFAULT_ADDRESS_PREFIX: &str = "Lula, ";

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub address_prefix: String,
    pub queue_capacity: usize,
    pub history_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            queue_capacity: QUEUE_CAPACITY,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

/// External collaborators used by the prompt pipeline.
#[derive(Clone)]
pub struct Services {
    pub responder: Arc<dyn ResponseGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub lip_sync: Arc<dyn LipSyncGenerator>,
    pub filter: Arc<dyn ContentFilter>,
}

/// Owns both work queues and the playback ledger.
pub struct Orchestrator {
    config: OrchestratorConfig,
    prompts: BoundedQueue<String>,
    clips: BoundedQueue<String>,
    ledger: PlaybackLedger,
    controller: Arc<StreamController>,
    services: Services,
    sink: Arc<dyn ChatSink>,
    scheduler: SchedulerHandle,
    metrics: MetricsCollector,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        controller: Arc<StreamController>,
        services: Services,
        sink: Arc<dyn ChatSink>,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            prompts: BoundedQueue::new("prompts", config.queue_capacity),
            clips: BoundedQueue::new("clips", config.queue_capacity),
            ledger: PlaybackLedger::new(config.history_capacity),
            config,
            controller,
            services,
            sink,
            scheduler,
            metrics: MetricsCollector::new(),
        }
    }

    /// Take a chat message. Only messages starting with the address prefix
    /// become prompts; they are queued as `"<text> - <user>"`.
    ///
    /// Returns whether the message was queued.
    pub fn submit_message(&self, user: &str, text: &str) -> bool {
        let prefix = self.config.address_prefix.as_str();
        if !text.starts_with(prefix) {
            debug!(user, "Ignoring message without address prefix");
            self.sink.say(Notice::Usage {
                prefix: prefix.to_string(),
            });
            return false;
        }

        let accepted = self.enqueue_prompt(format!("{text} - {user}"));
        if accepted {
            self.sink.say(Notice::Processing {
                user: user.to_string(),
            });
        }
        accepted
    }

    /// Queue a prompt for generation. Returns `false` if it was dropped.
    pub fn enqueue_prompt(&self, prompt: String) -> bool {
        let accepted = self.prompts.enqueue(prompt);
        self.metrics.record_prompt(accepted);
        accepted
    }

    /// Queue a clip for playback. Returns `false` if it was dropped.
    pub fn enqueue_clip(&self, clip: String) -> bool {
        self.clips.enqueue(clip)
    }

    /// Handle at most one queued prompt. Returns whether one was dequeued.
    pub async fn process_next_prompt(&self) -> bool {
        let Some(prompt) = self.prompts.dequeue() else {
            return false;
        };

        if self.services.filter.contains_banned_content(&prompt) {
            info!(%prompt, "Prompt refused by content filter");
            self.metrics.record_refusal();
            self.sink.say(Notice::Refused);
            return true;
        }

        match self.generate_clip(&prompt).await {
            Ok(clip) => {
                let queued = self.clips.enqueue(clip);
                self.metrics.record_clip(queued);
                self.scheduler.reset_idle();
            }
            Err(e) => {
                error!(%prompt, "Error generating clip: {}", e);
                self.metrics.record_pipeline_failure();
            }
        }
        true
    }

    /// Response, speech, then lip-sync. Returns the local clip location.
    #[instrument(name = "generate_clip", skip(self))]
    async fn generate_clip(&self, prompt: &str) -> ServiceResult<String> {
        let answer = self.services.responder.generate_response(prompt).await?;
        debug!("Response ready");

        let key = self.services.speech.generate_audio(&answer).await?;
        self.sink.say(Notice::AlmostReady);
        debug!(%key, "Audio ready");

        let clip = self.services.lip_sync.generate_video(&key).await?;
        self.sink.say(Notice::AnytimeNow);
        info!(clip = %clip.display(), "Clip ready");

        Ok(clip.to_string_lossy().into_owned())
    }

    /// Play at most one queued clip. Returns whether one was dequeued.
    pub async fn play_next_clip(&self) -> bool {
        let Some(clip) = self.clips.dequeue() else {
            return false;
        };

        match self.controller.switch_to(Path::new(&clip)).await {
            Ok(waited) => {
                self.ledger.record_played(&clip);
                self.metrics.record_switch(true);
                info!(%clip, "Played clip in {:?}", waited);
            }
            Err(e) => {
                self.metrics.record_switch(false);
                error!(%clip, "Error switching to clip: {}", e);
            }
        }
        true
    }

    /// Poll the prompt queue forever.
    pub async fn run_prompt_loop(&self) {
        info!("Prompt loop started");
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.process_next_prompt().await;
        }
    }

    /// Poll the clip queue forever. This is the only caller of `switch_to`.
    pub async fn run_clip_loop(&self) {
        info!("Clip loop started");
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.play_next_clip().await;
        }
    }

    /// Current counters, queue depths and session state.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            session: self.controller.state(),
            prompt_queue_len: self.prompts.len(),
            clip_queue_len: self.clips.len(),
            history_len: self.ledger.len(),
            reinit_count: self.controller.reinit_count(),
            ..self.metrics.snapshot()
        }
    }

    pub fn prompts(&self) -> &BoundedQueue<String> {
        &self.prompts
    }

    pub fn clips(&self) -> &BoundedQueue<String> {
        &self.clips
    }

    pub fn ledger(&self) -> &PlaybackLedger {
        &self.ledger
    }
}

#[async_trait]
impl TimerHandler for Orchestrator {
    #[instrument(name = "idle_replay", skip(self))]
    async fn on_idle_replay(&self) {
        let Some(clip) = self.ledger.sample() else {
            debug!("Nothing played yet, skipping replay");
            return;
        };

        self.sink.say(Notice::Replaying);
        if self.clips.enqueue(clip) {
            self.metrics.record_replay();
        }
    }

    #[instrument(name = "scheduled_restart", skip(self))]
    async fn on_restart(&self) {
        info!("Restarting broadcast");
        self.sink.say(Notice::Restarting);
        self.metrics.record_restart();
        if let Err(e) = self.controller.stop() {
            warn!("Error stopping broadcast for restart: {}", e);
        }
    }

    #[instrument(name = "injected_prompt", skip(self))]
    async fn on_prompt(&self) {
        match self.services.responder.generate_question().await {
            Ok(question) => {
                self.sink.say(Notice::Question {
                    text: question.clone(),
                });
                self.enqueue_prompt(question);
            }
            Err(e) => error!("Error generating question: {}", e),
        }
    }
}
