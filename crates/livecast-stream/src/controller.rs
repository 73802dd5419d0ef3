//! Broadcast process lifecycle and gapless clip switching.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument, warn};

use livecast_ipc::{SessionState, StopReason};

use crate::error::StreamError;
use crate::playlist::Playlist;
use crate::probe::DurationProbe;
use crate::recipe::EncodingRecipe;
use crate::{StreamResult, DEFAULT_CLIP_DURATION, REINIT_MARKER, SWITCH_GUARD};

/// Configuration for the broadcast process.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Broadcast program (ffmpeg).
    pub program: PathBuf,

    /// Push destination, ingest URL joined with the stream key.
    pub destination: String,

    /// Encoding parameters.
    pub recipe: EncodingRecipe,

    /// Play time assumed when a clip cannot be probed.
    pub default_duration: Duration,

    /// Extra wait after a clip's duration before restoring the filler.
    pub guard: Duration,

    /// Directory the playlist is seeded from on first launch.
    pub assets_dir: Option<PathBuf>,
}

impl StreamConfig {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            destination: destination.into(),
            recipe: EncodingRecipe::default(),
            default_duration: DEFAULT_CLIP_DURATION,
            guard: SWITCH_GUARD,
            assets_dir: None,
        }
    }
}

/// Owns one broadcast process and the playlist it loops over.
pub struct StreamController {
    config: StreamConfig,
    playlist: Playlist,
    probe: Arc<dyn DurationProbe>,
    state: RwLock<SessionState>,
    /// Stop trigger of the current run, tagged with its run number.
    kill_tx: Mutex<Option<(u64, oneshot::Sender<()>)>>,
    runs: AtomicU64,
    switch_lock: tokio::sync::Mutex<()>,
    reinit_count: Arc<AtomicU64>,
}

impl StreamController {
    /// Create a controller. No process is launched until [`start`](Self::start).
    pub fn new(config: StreamConfig, playlist: Playlist, probe: Arc<dyn DurationProbe>) -> Self {
        Self {
            config,
            playlist,
            probe,
            state: RwLock::new(SessionState::NotStarted),
            kill_tx: Mutex::new(None),
            runs: AtomicU64::new(0),
            switch_lock: tokio::sync::Mutex::new(()),
            reinit_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Seed the playlist if needed and reset its active slot to the filler.
    pub async fn prepare_playlist(&self) -> StreamResult<()> {
        self.playlist.prepare(self.config.assets_dir.as_deref()).await
    }

    /// Launch the broadcast process and wait for it to exit.
    ///
    /// Returns `Ok(StopReason::Requested)` when the process was terminated by
    /// [`stop`](Self::stop), `Ok(StopReason::Exited)` when it finished
    /// cleanly, and an error when it failed to launch or crashed. Callers own
    /// the restart loop.
    #[instrument(name = "stream_start", skip(self))]
    pub async fn start(&self) -> StreamResult<StopReason> {
        let (kill_tx, kill_rx) = oneshot::channel();
        let run = {
            let mut slot = self.kill_tx.lock();
            if slot.is_some() {
                return Err(StreamError::AlreadyRunning);
            }
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            *slot = Some((run, kill_tx));
            run
        };

        let args = self
            .config
            .recipe
            .to_args(self.playlist.path(), &self.config.destination);

        let spawned = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                self.release(run);
                return Err(StreamError::Spawn {
                    program: self.config.program.display().to_string(),
                    source,
                });
            }
        };

        info!(pid = ?child.id(), "Broadcast process started");
        self.transition_to(SessionState::Running);

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_diagnostics(stderr, Arc::clone(&self.reinit_count)));
        }

        let exited = tokio::select! {
            status = child.wait() => Some(status),
            _ = kill_rx => None,
        };

        let outcome = match exited {
            Some(Ok(status)) if status.success() => Ok(StopReason::Exited {
                code: status.code(),
            }),
            Some(Ok(status)) => Err(StreamError::ProcessExited {
                code: status.code(),
            }),
            Some(Err(e)) => Err(StreamError::Io(e)),
            None => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill broadcast process: {}", e);
                }
                Ok(StopReason::Requested)
            }
        };

        // A newer run may already own the trigger and the state.
        self.release(run);
        if self.runs.load(Ordering::SeqCst) == run {
            self.transition_to(SessionState::Stopped);
        }

        match &outcome {
            Ok(reason) => info!(reason = %reason.message(), "Broadcast process stopped"),
            Err(e) => warn!("Broadcast process ended: {}", e),
        }
        outcome
    }

    /// Forcibly terminate the running broadcast process.
    #[instrument(name = "stream_stop", skip(self))]
    pub fn stop(&self) -> StreamResult<()> {
        let (_, kill_tx) = self.kill_tx.lock().take().ok_or(StreamError::NotRunning)?;
        kill_tx.send(()).map_err(|_| StreamError::NotRunning)?;
        info!("Broadcast stop requested");
        Ok(())
    }

    /// Play `clip` once in place of the filler.
    ///
    /// Rewrites the playlist's active slot, waits for the clip's duration plus
    /// the guard interval, then restores the filler. Blocks the caller for the
    /// whole wait and returns it. Concurrent calls are serialized.
    #[instrument(name = "switch_to", skip(self), fields(clip = %clip.display()))]
    pub async fn switch_to(&self, clip: &Path) -> StreamResult<Duration> {
        let _slot = self.switch_lock.lock().await;

        if !self.state().is_running() {
            warn!(state = self.state().name(), "Broadcast is not running, switching playlist anyway");
        }

        self.playlist.set_active(clip).await?;
        self.set_awaiting_switch(true);
        info!("Playlist switched, waiting for clip to finish");

        let duration = match self.probe.duration(clip).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Could not probe clip, assuming default duration: {}", e);
                self.config.default_duration
            }
        };

        let wait = duration + self.config.guard;
        debug!(wait_ms = wait.as_millis() as u64, "Waiting for clip");
        tokio::time::sleep(wait).await;

        let restored = self.playlist.restore_filler().await;
        self.set_awaiting_switch(false);
        restored?;

        info!(wait_ms = wait.as_millis() as u64, "Clip finished, filler restored");
        Ok(wait)
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Number of context reinitializations seen in the process output.
    pub fn reinit_count(&self) -> u64 {
        self.reinit_count.load(Ordering::Relaxed)
    }

    /// The playlist this controller writes.
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Clear the stop trigger if it still belongs to `run`.
    fn release(&self, run: u64) {
        let mut slot = self.kill_tx.lock();
        if matches!(&*slot, Some((owner, _)) if *owner == run) {
            slot.take();
        }
    }

    fn set_awaiting_switch(&self, awaiting: bool) {
        let next = match (self.state(), awaiting) {
            (SessionState::Running, true) => SessionState::AwaitingSwitch,
            (SessionState::AwaitingSwitch, false) => SessionState::Running,
            _ => return,
        };
        self.transition_to(next);
    }

    fn transition_to(&self, new_state: SessionState) {
        let previous = std::mem::replace(&mut *self.state.write(), new_state);
        debug!(
            previous = previous.name(),
            current = new_state.name(),
            "Session state transition"
        );
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        if let Some((_, kill_tx)) = self.kill_tx.lock().take() {
            let _ = kill_tx.send(());
        }
    }
}

/// Log the broadcast process's diagnostic stream line by line.
///
/// The reinit marker is counted for observability only; switch timing never
/// depends on it.
async fn read_diagnostics(stderr: ChildStderr, reinit_count: Arc<AtomicU64>) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.contains(REINIT_MARKER) {
                    reinit_count.fetch_add(1, Ordering::Relaxed);
                    info!(%line, "Broadcast reinitialized context");
                } else {
                    debug!(target: "livecast_stream::ffmpeg", "{}", line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Error reading broadcast diagnostics: {}", e);
                break;
            }
        }
    }
    debug!("Diagnostic reader finished");
}
