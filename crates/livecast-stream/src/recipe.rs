//! Fixed encoding recipe for the broadcast process.

use std::path::Path;

use url::Url;

use crate::error::StreamError;
use crate::StreamResult;

/// Default ingest server.
pub const DEFAULT_INGEST_URL: &str = "rtmp://live.twitch.tv/app";

/// Video and audio encoding parameters handed to ffmpeg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingRecipe {
    /// Video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Audio sample rate in Hz.
    pub audio_sample_rate: u32,

    /// Keyframe interval in frames.
    pub keyframe_interval: u32,

    /// x264 speed preset.
    pub preset: &'static str,

    /// Output pixel format.
    pub pixel_format: &'static str,
}

impl Default for EncodingRecipe {
    fn default() -> Self {
        Self {
            video_bitrate_kbps: 4500,
            audio_bitrate_kbps: 128,
            audio_sample_rate: 44100,
            keyframe_interval: 48,
            preset: "faster",
            pixel_format: "yuv420p",
        }
    }
}

impl EncodingRecipe {
    /// Build the ffmpeg argument list that loops `playlist` forever and
    /// pushes FLV to `destination`.
    pub fn to_args(&self, playlist: &Path, destination: &str) -> Vec<String> {
        let keyint = self.keyframe_interval;
        vec![
            "-re".into(),
            "-loglevel".into(),
            "verbose".into(),
            "-stream_loop".into(),
            "-1".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            playlist.display().to_string(),
            "-pix_fmt".into(),
            self.pixel_format.into(),
            "-x264-params".into(),
            format!("keyint={keyint}:min-keyint={keyint}:scenecut=-1"),
            "-b:v".into(),
            format!("{}k", self.video_bitrate_kbps),
            "-b:a".into(),
            format!("{}k", self.audio_bitrate_kbps),
            "-ar".into(),
            self.audio_sample_rate.to_string(),
            "-acodec".into(),
            "aac".into(),
            "-vcodec".into(),
            "libx264".into(),
            "-preset".into(),
            self.preset.into(),
            "-f".into(),
            "flv".into(),
            destination.to_string(),
        ]
    }
}

/// Join the ingest server URL and the stream key into the push destination.
pub fn ingest_destination(ingest_url: &str, stream_key: &str) -> StreamResult<String> {
    if stream_key.trim().is_empty() {
        return Err(StreamError::InvalidUrl("stream key is empty".to_string()));
    }

    let url = Url::parse(ingest_url).map_err(|e| StreamError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "rtmp" | "rtmps") {
        return Err(StreamError::InvalidUrl(
            "URL must start with rtmp:// or rtmps://".to_string(),
        ));
    }

    let base = ingest_url.trim_end_matches('/');
    Ok(format!("{base}/{stream_key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_read_playlist_and_push_flv() {
        let args = EncodingRecipe::default().to_args(Path::new("/srv/tmp/playlist.txt"), "rtmp://host/app/key");

        let input = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[input + 1], "/srv/tmp/playlist.txt");
        assert_eq!(args.last().unwrap(), "rtmp://host/app/key");
        assert!(args.contains(&"keyint=48:min-keyint=48:scenecut=-1".to_string()));
        assert!(args.contains(&"4500k".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_ingest_destination_joins_key() {
        assert_eq!(
            ingest_destination("rtmp://live.twitch.tv/app", "live_123").unwrap(),
            "rtmp://live.twitch.tv/app/live_123"
        );
        assert_eq!(
            ingest_destination("rtmp://live.twitch.tv/app/", "live_123").unwrap(),
            "rtmp://live.twitch.tv/app/live_123"
        );
    }

    #[test]
    fn test_ingest_destination_rejects_bad_input() {
        assert!(ingest_destination("http://example.com/app", "key").is_err());
        assert!(ingest_destination("rtmp://live.twitch.tv/app", "  ").is_err());
        assert!(ingest_destination("not a url", "key").is_err());
    }
}
