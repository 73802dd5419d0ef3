//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use livecast_engine::{OrchestratorConfig, DEFAULT_ADDRESS_PREFIX};
use livecast_ipc::ScheduleConfig;
use livecast_stream::{ingest_destination, DEFAULT_INGEST_URL};

/// Startup configuration errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),

    #[error("{0} must be a non-zero duration")]
    ZeroInterval(&'static str),

    #[error("STREAM_KEY is required")]
    MissingStreamKey,

    #[error("Invalid {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "livecast")]
#[command(about = "Chat-driven live stream host", long_about = None)]
pub struct Args {
    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Base directory; the playlist lives in <base>/tmp, seed assets in <base>/assets
    #[arg(long, env = "BASE_PATH", default_value = ".")]
    pub base_path: PathBuf,

    /// Filler clip looped between generated clips
    #[arg(long, env = "FILLER_CLIP", default_value = "loop.mp4")]
    pub filler_clip: String,

    /// Secret stream key appended to the ingest URL
    #[arg(long, env = "STREAM_KEY", hide_env_values = true, default_value = "")]
    pub stream_key: String,

    /// RTMP ingest endpoint
    #[arg(long, env = "INGEST_URL", default_value = DEFAULT_INGEST_URL)]
    pub ingest_url: String,

    /// Broadcast program
    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    pub ffmpeg_bin: PathBuf,

    /// Duration probe program
    #[arg(long, env = "FFPROBE_BIN", default_value = "ffprobe")]
    pub ffprobe_bin: PathBuf,

    /// Capacity of the prompt and ready-clip queues
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = livecast_ipc::QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Played clips remembered for idle replay; also the number of clip files kept on disk
    #[arg(long, env = "HISTORY_CAPACITY", default_value_t = livecast_ipc::HISTORY_CAPACITY)]
    pub history_capacity: usize,

    /// Delay between queue polls
    #[arg(long, env = "POLL_INTERVAL", default_value = "3s", value_parser = humantime::parse_duration)]
    pub poll_interval: Duration,

    /// First idle period before replaying an old clip
    #[arg(long, env = "IDLE_REPLAY_INITIAL", default_value = "5m", value_parser = humantime::parse_duration)]
    pub idle_replay_initial: Duration,

    /// Idle period between subsequent replays
    #[arg(long, env = "IDLE_REPLAY_RECURRING", default_value = "2m", value_parser = humantime::parse_duration)]
    pub idle_replay_recurring: Duration,

    /// Period between scheduled broadcast restarts
    #[arg(long, env = "RESTART_INTERVAL", default_value = "5h", value_parser = humantime::parse_duration)]
    pub restart_interval: Duration,

    /// Period between injected prompts
    #[arg(long, env = "PROMPT_INTERVAL", default_value = "10m", value_parser = humantime::parse_duration)]
    pub prompt_interval: Duration,

    /// Upper bound on one timer handler's run time
    #[arg(long, env = "HANDLER_BUDGET", default_value = "90s", value_parser = humantime::parse_duration)]
    pub handler_budget: Duration,

    /// Play time assumed when a clip cannot be probed
    #[arg(long, env = "SWITCH_DEFAULT_DURATION", default_value = "10s", value_parser = humantime::parse_duration)]
    pub switch_default_duration: Duration,

    /// Extra wait after a clip before restoring the filler
    #[arg(long, env = "SWITCH_GUARD", default_value = "2s", value_parser = humantime::parse_duration)]
    pub switch_guard: Duration,

    /// Delay between broadcast process launches
    #[arg(long, env = "RESTART_DELAY", default_value = "3s", value_parser = humantime::parse_duration)]
    pub restart_delay: Duration,

    /// Prefix a chat message needs to become a prompt (empty accepts everything)
    #[arg(long, env = "ADDRESS_PREFIX", default_value = DEFAULT_ADDRESS_PREFIX)]
    pub address_prefix: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub openai_api_key: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = livecast_services::DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = livecast_services::DEFAULT_OPENAI_MODEL)]
    pub openai_model: String,

    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true, default_value = "")]
    pub elevenlabs_api_key: String,

    #[arg(long, env = "ELEVENLABS_VOICE_ID", default_value = "")]
    pub elevenlabs_voice_id: String,

    #[arg(long, env = "ELEVENLABS_BASE_URL", default_value = livecast_services::DEFAULT_ELEVENLABS_BASE_URL)]
    pub elevenlabs_base_url: String,

    #[arg(long, env = "REPLICATE_API_KEY", hide_env_values = true, default_value = "")]
    pub replicate_api_key: String,

    #[arg(long, env = "REPLICATE_BASE_URL", default_value = livecast_services::DEFAULT_REPLICATE_BASE_URL)]
    pub replicate_base_url: String,

    /// Video of the face animated by lip-sync
    #[arg(long, env = "FACE_VIDEO_URL")]
    pub face_video_url: String,

    /// Public bucket audio is uploaded to and read back from
    #[arg(long, env = "BUCKET_URL")]
    pub bucket_url: String,
}

impl Args {
    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("QUEUE_CAPACITY"));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("HISTORY_CAPACITY"));
        }

        let intervals = [
            ("POLL_INTERVAL", self.poll_interval),
            ("IDLE_REPLAY_INITIAL", self.idle_replay_initial),
            ("IDLE_REPLAY_RECURRING", self.idle_replay_recurring),
            ("RESTART_INTERVAL", self.restart_interval),
            ("PROMPT_INTERVAL", self.prompt_interval),
            ("HANDLER_BUDGET", self.handler_budget),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::ZeroInterval(*name));
        }

        if self.stream_key.trim().is_empty() {
            return Err(ConfigError::MissingStreamKey);
        }
        self.destination()?;

        let urls = [
            ("OPENAI_BASE_URL", &self.openai_base_url),
            ("ELEVENLABS_BASE_URL", &self.elevenlabs_base_url),
            ("REPLICATE_BASE_URL", &self.replicate_base_url),
            ("FACE_VIDEO_URL", &self.face_video_url),
            ("BUCKET_URL", &self.bucket_url),
        ];
        for (name, value) in urls {
            url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
                name,
                reason: format!("{value}: {e}"),
            })?;
        }

        Ok(())
    }

    /// Push destination for the broadcast process.
    pub fn destination(&self) -> Result<String, ConfigError> {
        ingest_destination(&self.ingest_url, &self.stream_key).map_err(|e| {
            ConfigError::InvalidUrl {
                name: "INGEST_URL",
                reason: e.to_string(),
            }
        })
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.base_path.join("tmp").join("playlist.txt")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.base_path.join("assets")
    }

    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            idle_initial: self.idle_replay_initial,
            idle_recurring: self.idle_replay_recurring,
            restart: self.restart_interval,
            prompt: self.prompt_interval,
            handler_budget: self.handler_budget,
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: self.poll_interval,
            address_prefix: self.address_prefix.clone(),
            queue_capacity: self.queue_capacity,
            history_capacity: self.history_capacity,
        }
    }
}
