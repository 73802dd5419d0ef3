//! Replicate lip-sync predictions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::storage::ClipCache;
use crate::{ensure_success, join_url, LipSyncGenerator, ObjectStore, ServiceError, ServiceResult};

pub const DEFAULT_REPLICATE_BASE_URL: &str = "https://api.replicate.com/v1";
pub const LIP_SYNC_MODEL_VERSION: &str =
    "8d65e3f4f4298520e079198b493c25adfc43c058ffec924f2aefc8010ed25eef";

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_key: String,
    pub base_url: String,
    /// Source video whose face is animated.
    pub face_video_url: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl ReplicateConfig {
    pub fn new(api_key: impl Into<String>, face_video_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_REPLICATE_BASE_URL.to_string(),
            face_video_url: face_video_url.into(),
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct PredictionRequest {
    version: &'static str,
    input: Value,
    is_training: bool,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    output: Option<Value>,
}

impl Prediction {
    /// URL of the finished clip, if the prediction succeeded.
    fn output_url(&self) -> Option<&str> {
        if self.status != "succeeded" {
            return None;
        }
        match self.output.as_ref()? {
            Value::String(url) if !url.is_empty() => Some(url),
            Value::Array(items) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }

    fn is_terminal_failure(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "canceled")
    }

    fn error_detail(&self) -> String {
        match &self.error {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// [`LipSyncGenerator`] that runs a Replicate prediction and downloads the
/// result into the local clip cache.
pub struct ReplicateLipSync {
    client: Client,
    config: ReplicateConfig,
    store: Arc<dyn ObjectStore>,
    cache: ClipCache,
}

impl ReplicateLipSync {
    pub fn new(
        client: Client,
        config: ReplicateConfig,
        store: Arc<dyn ObjectStore>,
        cache: ClipCache,
    ) -> Self {
        Self {
            client,
            config,
            store,
            cache,
        }
    }

    fn predictions_url(&self) -> String {
        join_url(&self.config.base_url, "predictions")
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.config.api_key)
    }

    async fn create_prediction(&self, audio_url: &str) -> ServiceResult<Prediction> {
        let request = PredictionRequest {
            version: LIP_SYNC_MODEL_VERSION,
            input: json!({
                "fps": 25,
                "face": self.config.face_video_url,
                "pads": "0 10 0 0",
                "audio": audio_url,
                "smooth": true,
                "resize_factor": 1,
            }),
            is_training: false,
        };

        let response = self
            .client
            .post(self.predictions_url())
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&request)
            .send()
            .await?;
        Ok(ensure_success("replicate", response).await?.json().await?)
    }

    async fn fetch_prediction(&self, id: &str) -> ServiceResult<Prediction> {
        let response = self
            .client
            .get(join_url(&self.predictions_url(), id))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;
        Ok(ensure_success("replicate", response).await?.json().await?)
    }

    /// Poll until the prediction yields an output URL or fails.
    async fn wait_for_output(&self, id: &str) -> ServiceResult<String> {
        let poll = async {
            loop {
                tokio::time::sleep(self.config.poll_interval).await;

                let prediction = self.fetch_prediction(id).await?;
                if let Some(url) = prediction.output_url() {
                    return Ok(url.to_string());
                }
                if prediction.is_terminal_failure() {
                    return Err(ServiceError::JobFailed {
                        id: id.to_string(),
                        status: prediction.status.clone(),
                        detail: prediction.error_detail(),
                    });
                }
                debug!("Job {} status: {}", id, prediction.status);
            }
        };

        tokio::time::timeout(self.config.timeout, poll)
            .await
            .map_err(|_| ServiceError::Timeout(self.config.timeout))?
    }
}

#[async_trait]
impl LipSyncGenerator for ReplicateLipSync {
    #[instrument(name = "generate_video", skip(self))]
    async fn generate_video(&self, storage_key: &str) -> ServiceResult<PathBuf> {
        let audio_url = self.store.public_url(storage_key);
        let prediction = self.create_prediction(&audio_url).await?;
        if prediction.id.is_empty() {
            return Err(ServiceError::EmptyResponse("replicate"));
        }
        info!("Started lip-sync job {}", prediction.id);

        let output = self.wait_for_output(&prediction.id).await?;
        self.cache.download(&output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpObjectStore;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lip_sync(server: &MockServer, dir: &std::path::Path, timeout: Duration) -> ReplicateLipSync {
        let client = Client::new();
        let store = Arc::new(HttpObjectStore::new(
            client.clone(),
            format!("{}/bucket", server.uri()),
        ));
        let cache = ClipCache::new(client.clone(), dir).with_slots(1);
        let config = ReplicateConfig::new("r8-test", "https://cdn.example/face.mp4")
            .with_base_url(format!("{}/v1", server.uri()))
            .with_polling(Duration::from_millis(10), timeout);
        ReplicateLipSync::new(client, config, store, cache)
    }

    #[tokio::test]
    async fn test_generate_video_polls_until_succeeded() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .and(header("authorization", "Token r8-test"))
            .and(body_partial_json(json!({
                "version": LIP_SYNC_MODEL_VERSION,
                "input": { "audio": format!("{}/bucket/k1.mp3", server.uri()), "fps": 25 },
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "id": "p1", "status": "starting" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        // First poll still processing, then succeeded.
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "p1", "status": "processing" })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p1",
                "status": "succeeded",
                "output": format!("{}/out/p1.mp4", server.uri()),
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/out/p1.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"clip".to_vec()))
            .mount(&server)
            .await;

        let clip = lip_sync(&server, dir.path(), Duration::from_secs(5))
            .generate_video("k1.mp3")
            .await
            .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));

        assert_eq!(clip, dir.path().join("latest0.mp4"));
        assert_eq!(std::fs::read(&clip).unwrap(), b"clip");
    }

    #[tokio::test]
    async fn test_failed_prediction_is_reported() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "p2" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p2",
                "status": "failed",
                "error": "no face detected",
            })))
            .mount(&server)
            .await;

        let result = lip_sync(&server, dir.path(), Duration::from_secs(5))
            .generate_video("k2.mp3")
            .await;

        match result {
            Err(ServiceError::JobFailed { id, status, detail }) => {
                assert_eq!(id, "p2");
                assert_eq!(status, "failed");
                assert_eq!(detail, "no face detected");
            }
            other => panic!("Expected JobFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_prediction_times_out() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "p3" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "p3", "status": "processing" })),
            )
            .mount(&server)
            .await;

        let result = lip_sync(&server, dir.path(), Duration::from_millis(100))
            .generate_video("k3.mp3")
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout(_))));
    }

    #[test]
    fn test_output_url_requires_success() {
        let pending: Prediction =
            serde_json::from_value(json!({ "id": "p", "status": "processing", "output": "u" }))
                .unwrap();
        assert_eq!(pending.output_url(), None);

        let listed: Prediction =
            serde_json::from_value(json!({ "id": "p", "status": "succeeded", "output": ["u1"] }))
                .unwrap();
        assert_eq!(listed.output_url(), Some("u1"));
    }
}
