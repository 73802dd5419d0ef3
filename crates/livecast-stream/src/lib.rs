//! Broadcast process control and gapless playlist switching.
//!
//! This crate owns the long-running ffmpeg process that pushes the live
//! stream and the concat playlist it loops over. Clips are spliced in by
//! rewriting the playlist's active slot for exactly one play-through.

mod controller;
mod error;
mod playlist;
mod probe;
mod recipe;
mod supervisor;

pub use controller::{StreamConfig, StreamController};
pub use error::StreamError;
pub use playlist::Playlist;
pub use probe::{parse_probe_output, DurationProbe, FfprobeProbe};
pub use recipe::{ingest_destination, EncodingRecipe, DEFAULT_INGEST_URL};
pub use supervisor::{run_forever, RestartPolicy};

use std::time::Duration;

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Play time assumed for a clip whose duration cannot be probed.
pub const DEFAULT_CLIP_DURATION: Duration = Duration::from_secs(10);

/// Extra wait after a clip before the filler is restored.
pub const SWITCH_GUARD: Duration = Duration::from_secs(2);

/// Delay between broadcast process launches in milliseconds.
pub const RESTART_DELAY_MS: u64 = 3000;

/// Diagnostic output fragment printed when ffmpeg reinitializes its filters.
pub const REINIT_MARKER: &str = " Reinit context";
