//! Response, speech, lip-sync and storage collaborators for livecast.
//!
//! The orchestrator only sees the traits defined here. The HTTP clients are
//! thin request/response integrations with no state machine of their own.

mod elevenlabs;
mod error;
mod filter;
mod openai;
mod replicate;
mod storage;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsSynthesizer, DEFAULT_ELEVENLABS_BASE_URL};
pub use error::ServiceError;
pub use filter::{BannedWords, DEFAULT_BANNED_TERMS};
pub use openai::{
    OpenAiConfig, OpenAiResponder, Persona, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
    DEFAULT_TOPICS,
};
pub use replicate::{ReplicateConfig, ReplicateLipSync, DEFAULT_REPLICATE_BASE_URL};
pub use storage::{ClipCache, HttpObjectStore, DEFAULT_CLIP_SLOTS};

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

/// Result type for collaborator calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Produces spoken-style text answers.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Answer a viewer prompt.
    async fn generate_response(&self, prompt: &str) -> ServiceResult<String>;

    /// Invent a question on a random topic, used when chat is quiet.
    async fn generate_question(&self) -> ServiceResult<String>;
}

/// Turns text into stored audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return the storage key of the audio.
    async fn generate_audio(&self, text: &str) -> ServiceResult<String>;
}

/// Turns stored audio into a local lip-synced clip.
#[async_trait]
pub trait LipSyncGenerator: Send + Sync {
    /// Generate a clip for the audio at `storage_key` and return its local path.
    async fn generate_video(&self, storage_key: &str) -> ServiceResult<PathBuf>;
}

/// Deny-list content check applied to prompts before any generation.
pub trait ContentFilter: Send + Sync {
    fn contains_banned_content(&self, text: &str) -> bool;
}

/// Object storage the lip-sync service can read audio from.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` and return the key.
    async fn save(&self, key: &str, body: Bytes, content_type: &str) -> ServiceResult<String>;

    /// Publicly reachable URL of `key`.
    fn public_url(&self, key: &str) -> String;
}

/// Turn a non-success response into [`ServiceError::Status`].
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> ServiceResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

/// Join `base` and `path` with exactly one slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
