//! ElevenLabs text-to-speech.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{ensure_success, join_url, ObjectStore, ServiceResult, SpeechSynthesizer};

pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub voice_id: String,
    pub base_url: String,
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.7,
            similarity_boost: 0.4,
            style: 0.2,
        }
    }
}

/// Synthesizes speech and uploads the mp3 to object storage.
pub struct ElevenLabsSynthesizer {
    client: Client,
    config: ElevenLabsConfig,
    store: Arc<dyn ObjectStore>,
}

impl ElevenLabsSynthesizer {
    pub fn new(client: Client, config: ElevenLabsConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            client,
            config,
            store,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    #[instrument(name = "generate_audio", skip_all)]
    async fn generate_audio(&self, text: &str) -> ServiceResult<String> {
        let url = join_url(
            &self.config.base_url,
            &format!("text-to-speech/{}", self.config.voice_id),
        );
        let request = SpeechRequest {
            text,
            model_id: ELEVENLABS_MODEL,
            voice_settings: VoiceSettings::default(),
        };

        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.config.api_key)
            .header(ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await?;
        let audio = ensure_success("elevenlabs", response).await?.bytes().await?;

        let key = format!("{}.mp3", uuid::Uuid::new_v4());
        info!("Synthesized {} bytes of audio as {}", audio.len(), key);

        self.store.save(&key, audio, "audio/mpeg").await
    }
}
