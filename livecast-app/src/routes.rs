//! HTTP surface: liveness, status, message intake and notice polling.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use tracing::debug;

use livecast_engine::Orchestrator;
use livecast_ipc::StatusSnapshot;

/// State shared with the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub notices: Receiver<String>,
}

/// A chat message relayed from the audience.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageRequest {
    pub user: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub accepted: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/status", get(status))
        .route("/messages", post(submit_message))
        .route("/notices", get(poll_notices))
        .with_state(state)
}

async fn liveness() -> &'static str {
    "OK"
}

async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.orchestrator.status())
}

async fn submit_message(
    State(state): State<AppState>,
    Json(message): Json<MessageRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    debug!(user = %message.user, "Message received");
    let accepted = state
        .orchestrator
        .submit_message(&message.user, &message.text);
    (StatusCode::ACCEPTED, Json(MessageResponse { accepted }))
}

/// Drain all pending chat notices (non-blocking).
async fn poll_notices(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.notices.try_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use livecast_engine::{create_engine, OrchestratorConfig, Services};
    use livecast_ipc::notice_channel;
    use livecast_services::{
        BannedWords, LipSyncGenerator, ResponseGenerator, ServiceError, ServiceResult,
        SpeechSynthesizer,
    };
    use livecast_stream::{
        DurationProbe, Playlist, StreamConfig, StreamController, StreamError, StreamResult,
    };

    /// Collaborators that are never reached by these tests.
    struct Unreachable;

    #[async_trait]
    impl ResponseGenerator for Unreachable {
        async fn generate_response(&self, _prompt: &str) -> ServiceResult<String> {
            Err(ServiceError::EmptyResponse("test"))
        }

        async fn generate_question(&self) -> ServiceResult<String> {
            Err(ServiceError::EmptyResponse("test"))
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for Unreachable {
        async fn generate_audio(&self, _text: &str) -> ServiceResult<String> {
            Err(ServiceError::EmptyResponse("test"))
        }
    }

    #[async_trait]
    impl LipSyncGenerator for Unreachable {
        async fn generate_video(&self, _storage_key: &str) -> ServiceResult<PathBuf> {
            Err(ServiceError::EmptyResponse("test"))
        }
    }

    #[async_trait]
    impl DurationProbe for Unreachable {
        async fn duration(&self, _clip: &Path) -> StreamResult<Duration> {
            Err(StreamError::Probe("test".to_string()))
        }
    }

    fn app() -> Router {
        let controller = Arc::new(StreamController::new(
            StreamConfig::new("rtmp://localhost/app/key"),
            Playlist::new("/nonexistent/playlist.txt", "loop.mp4"),
            Arc::new(Unreachable),
        ));
        let unreachable = Arc::new(Unreachable);
        let services = Services {
            responder: unreachable.clone(),
            speech: unreachable.clone(),
            lip_sync: unreachable,
            filter: Arc::new(BannedWords::default()),
        };
        let (notice_tx, notices) = notice_channel();
        let (orchestrator, _scheduler) = create_engine(
            OrchestratorConfig::default(),
            Default::default(),
            controller,
            services,
            notice_tx,
        );

        router(AppState {
            orchestrator,
            notices,
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_message(user: &str, text: &str) -> Request<Body> {
        let body = serde_json::to_vec(&MessageRequest {
            user: user.to_string(),
            text: text.to_string(),
        })
        .unwrap();
        Request::post("/messages")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_liveness_returns_ok() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_message_is_queued_and_acknowledged() {
        let app = app();

        let response = app
            .clone()
            .oneshot(post_message("ana", "Lula, hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["accepted"], true);

        let response = app
            .clone()
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = body_json(response).await;
        assert_eq!(status["prompt_queue_len"], 1);
        assert_eq!(status["prompts_accepted"], 1);
        assert_eq!(status["session"], "NotStarted");
        assert_eq!(status["reinit_count"], 0);

        let response = app
            .oneshot(Request::get("/notices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let notices = body_json(response).await;
        assert_eq!(
            notices,
            serde_json::json!([
                "We are processing your request ana, please wait a minute or two."
            ])
        );
    }

    #[tokio::test]
    async fn test_unaddressed_message_is_rejected() {
        let response = app()
            .oneshot(post_message("ana", "hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["accepted"], false);
    }
}
