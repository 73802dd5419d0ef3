//! Clip duration probing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::StreamError;
use crate::StreamResult;

/// Reads the play duration of a local clip.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Return the container duration of `clip`.
    async fn duration(&self, clip: &Path) -> StreamResult<Duration>;
}

/// Probe backed by the `ffprobe` utility.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn duration(&self, clip: &Path) -> StreamResult<Duration> {
        let output = Command::new(&self.program)
            .args(["-v", "error", "-show_format", "-of", "json"])
            .arg(clip)
            .output()
            .await
            .map_err(|e| StreamError::Probe(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(StreamError::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_output(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Extract `format.duration` from ffprobe's JSON output.
pub fn parse_probe_output(json: &[u8]) -> StreamResult<Duration> {
    let output: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| StreamError::Probe(e.to_string()))?;

    let raw = output
        .format
        .duration
        .ok_or_else(|| StreamError::Probe("no duration in probe output".to_string()))?;

    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| StreamError::Probe(format!("unparseable duration {raw:?}")))?;

    Duration::try_from_secs_f64(seconds)
        .map_err(|_| StreamError::Probe(format!("invalid duration {seconds}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{"format": {"filename": "c1.mp4", "duration": "12.480000"}}"#;
        assert_eq!(
            parse_probe_output(json).unwrap(),
            Duration::from_secs_f64(12.48)
        );
    }

    #[test]
    fn test_parse_probe_output_without_duration() {
        let json = br#"{"format": {"filename": "c1.mp4"}}"#;
        assert!(matches!(parse_probe_output(json), Err(StreamError::Probe(_))));
    }

    #[test]
    fn test_parse_probe_output_rejects_negative() {
        let json = br#"{"format": {"duration": "-3"}}"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_probe_error() {
        let probe = FfprobeProbe::new("/nonexistent/ffprobe");
        let result = probe.duration(Path::new("clip.mp4")).await;
        assert!(matches!(result, Err(StreamError::Probe(_))));
    }
}
