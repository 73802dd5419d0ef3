//! livecast application library.
//!
//! Reads the configuration, builds the collaborators, the stream controller
//! and the engine, then runs every loop alongside the HTTP server.

mod config;
mod routes;

pub use config::{Args, ConfigError};
pub use routes::{router, AppState, MessageRequest, MessageResponse};

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livecast_engine::{create_engine, Services};
use livecast_ipc::notice_channel;
use livecast_services::{
    BannedWords, ClipCache, ElevenLabsConfig, ElevenLabsSynthesizer, HttpObjectStore,
    ObjectStore, OpenAiConfig, OpenAiResponder, ReplicateConfig, ReplicateLipSync,
};
use livecast_stream::{
    run_forever, FfprobeProbe, Playlist, RestartPolicy, StreamConfig, StreamController,
};

/// Initialize logging.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "livecast=info,livecast_lib=info,livecast_engine=info,livecast_stream=info,livecast_services=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_services(args: &Args, playlist: &Playlist) -> Services {
    let client = reqwest::Client::new();
    let store: Arc<dyn ObjectStore> =
        Arc::new(HttpObjectStore::new(client.clone(), &args.bucket_url));

    let responder = OpenAiResponder::new(
        client.clone(),
        OpenAiConfig::new(&args.openai_api_key)
            .with_base_url(&args.openai_base_url)
            .with_model(&args.openai_model),
    );
    let speech = ElevenLabsSynthesizer::new(
        client.clone(),
        ElevenLabsConfig::new(&args.elevenlabs_api_key, &args.elevenlabs_voice_id)
            .with_base_url(&args.elevenlabs_base_url),
        store.clone(),
    );

    let slots = u32::try_from(args.history_capacity).unwrap_or(u32::MAX);
    let cache = ClipCache::new(client.clone(), playlist.dir()).with_slots(slots);
    let lip_sync = ReplicateLipSync::new(
        client,
        ReplicateConfig::new(&args.replicate_api_key, &args.face_video_url)
            .with_base_url(&args.replicate_base_url),
        store,
        cache,
    );

    Services {
        responder: Arc::new(responder),
        speech: Arc::new(speech),
        lip_sync: Arc::new(lip_sync),
        filter: Arc::new(BannedWords::default()),
    }
}

/// Run the service until the HTTP server stops.
pub async fn run(args: Args) -> anyhow::Result<()> {
    args.validate().context("Invalid configuration")?;
    info!("livecast starting");

    let playlist = Playlist::new(args.playlist_path(), args.filler_clip.clone());
    let services = build_services(&args, &playlist);

    let mut stream_config = StreamConfig::new(args.destination()?);
    stream_config.program = args.ffmpeg_bin.clone();
    stream_config.default_duration = args.switch_default_duration;
    stream_config.guard = args.switch_guard;
    stream_config.assets_dir = Some(args.assets_dir());

    let controller = Arc::new(StreamController::new(
        stream_config,
        playlist,
        Arc::new(FfprobeProbe::new(args.ffprobe_bin.clone())),
    ));
    controller
        .prepare_playlist()
        .await
        .context("Failed to prepare playlist")?;

    let (notice_tx, notice_rx) = notice_channel();
    let (orchestrator, scheduler) = create_engine(
        args.orchestrator(),
        args.schedule(),
        controller.clone(),
        services,
        notice_tx,
    );

    tokio::spawn(run_forever(
        controller,
        RestartPolicy {
            delay: args.restart_delay,
        },
    ));

    let prompts = orchestrator.clone();
    tokio::spawn(async move { prompts.run_prompt_loop().await });

    let clips = orchestrator.clone();
    tokio::spawn(async move { clips.run_clip_loop().await });

    tokio::spawn(scheduler.run(orchestrator.clone()));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("Failed to bind port {}", args.port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router(AppState {
            orchestrator,
            notices: notice_rx,
        }),
    )
    .await?;

    Ok(())
}
