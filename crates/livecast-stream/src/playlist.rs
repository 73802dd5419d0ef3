//! Two-line concat playlist read by the broadcast process.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::StreamError;
use crate::StreamResult;

/// The playlist file looped by the broadcast process.
///
/// Line 1 always references the filler clip. Line 2 is the active slot: it
/// references the filler too, except while a clip is being switched in.
#[derive(Debug, Clone)]
pub struct Playlist {
    path: PathBuf,
    filler: String,
}

impl Playlist {
    /// Create a handle for the playlist at `path` using `filler` (a file name
    /// in the playlist directory) as the looping content.
    pub fn new(path: impl Into<PathBuf>, filler: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filler: filler.into(),
        }
    }

    /// Path of the playlist file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the playlist, the filler and downloaded clips.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Concat entry referencing the filler clip.
    pub fn filler_entry(&self) -> String {
        concat_entry(&self.filler)
    }

    /// Concat entry referencing `clip`.
    ///
    /// Clips inside the playlist directory are referenced by file name, others
    /// by their full path.
    pub fn entry_for(&self, clip: &Path) -> String {
        let in_dir = match clip.parent() {
            None => true,
            Some(parent) => parent.as_os_str().is_empty() || parent == self.dir(),
        };

        match clip.file_name() {
            Some(name) if in_dir => concat_entry(&name.to_string_lossy()),
            _ => concat_entry(&clip.display().to_string()),
        }
    }

    /// Point the active slot at `clip`.
    pub async fn set_active(&self, clip: &Path) -> StreamResult<()> {
        self.replace_second_line(&self.entry_for(clip)).await
    }

    /// Point the active slot back at the filler.
    pub async fn restore_filler(&self) -> StreamResult<()> {
        self.replace_second_line(&self.filler_entry()).await
    }

    /// Current content of the active slot.
    pub async fn active_entry(&self) -> StreamResult<String> {
        let content = fs::read_to_string(&self.path).await?;
        content
            .split('\n')
            .nth(1)
            .map(str::to_string)
            .ok_or_else(|| self.too_short())
    }

    /// Make sure a usable playlist exists before the first launch.
    ///
    /// A missing playlist is seeded from `assets` (every file in it is copied
    /// into the playlist directory). If there are no assets a fresh playlist is
    /// written. The active slot is always reset to the filler.
    #[instrument(name = "prepare_playlist", skip(self), fields(path = %self.path.display()))]
    pub async fn prepare(&self, assets: Option<&Path>) -> StreamResult<()> {
        fs::create_dir_all(self.dir()).await?;

        if !fs::try_exists(&self.path).await? {
            if let Some(assets) = assets {
                copy_assets(assets, self.dir()).await?;
            }
        }

        if !fs::try_exists(&self.path).await? {
            info!("No playlist found, writing a fresh one");
            let entry = self.filler_entry();
            fs::write(&self.path, format!("{entry}\n{entry}\n")).await?;
        }

        self.restore_filler().await
    }

    async fn replace_second_line(&self, line: &str) -> StreamResult<()> {
        let content = fs::read_to_string(&self.path).await?;
        let mut lines: Vec<&str> = content.split('\n').collect();
        if lines.len() < 2 {
            return Err(self.too_short());
        }
        lines[1] = line;

        // rename keeps the reader from ever seeing a half-written file
        let staging = self.path.with_extension("txt.tmp");
        fs::write(&staging, lines.join("\n")).await?;
        fs::rename(&staging, &self.path).await?;

        debug!(entry = line, "Playlist active slot rewritten");
        Ok(())
    }

    fn too_short(&self) -> StreamError {
        StreamError::Playlist {
            path: self.path.clone(),
            reason: "file does not have at least two lines".to_string(),
        }
    }
}

fn concat_entry(name: &str) -> String {
    format!("file '{}'", name.replace('\'', "'\\''"))
}

async fn copy_assets(assets: &Path, dest: &Path) -> StreamResult<()> {
    let mut entries = fs::read_dir(assets).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let target = dest.join(entry.file_name());
        fs::copy(entry.path(), &target).await?;
        debug!(file = %target.display(), "Copied asset");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist_in(dir: &Path) -> Playlist {
        Playlist::new(dir.join("playlist.txt"), "loop.mp4")
    }

    #[tokio::test]
    async fn test_set_active_rewrites_only_second_line() {
        let dir = tempfile::tempdir().unwrap();
        let playlist = playlist_in(dir.path());
        fs::write(playlist.path(), "file 'loop.mp4'\nfile 'loop.mp4'\n")
            .await
            .unwrap();

        playlist.set_active(&dir.path().join("latest3.mp4")).await.unwrap();

        let content = fs::read_to_string(playlist.path()).await.unwrap();
        assert_eq!(content, "file 'loop.mp4'\nfile 'latest3.mp4'\n");
    }

    #[tokio::test]
    async fn test_restore_filler() {
        let dir = tempfile::tempdir().unwrap();
        let playlist = playlist_in(dir.path());
        fs::write(playlist.path(), "file 'loop.mp4'\nfile 'clip.mp4'")
            .await
            .unwrap();

        playlist.restore_filler().await.unwrap();
        assert_eq!(playlist.active_entry().await.unwrap(), "file 'loop.mp4'");
    }

    #[tokio::test]
    async fn test_single_line_playlist_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let playlist = playlist_in(dir.path());
        fs::write(playlist.path(), "file 'loop.mp4'").await.unwrap();

        let result = playlist.set_active(Path::new("clip.mp4")).await;
        assert!(matches!(result, Err(StreamError::Playlist { .. })));
    }

    #[tokio::test]
    async fn test_missing_playlist_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let playlist = playlist_in(dir.path());

        let result = playlist.set_active(Path::new("clip.mp4")).await;
        assert!(matches!(result, Err(StreamError::Io(_))));
    }

    #[test]
    fn test_entry_for_outside_clip_uses_full_path() {
        let playlist = Playlist::new("/srv/tmp/playlist.txt", "loop.mp4");
        assert_eq!(
            playlist.entry_for(Path::new("/srv/tmp/latest1.mp4")),
            "file 'latest1.mp4'"
        );
        assert_eq!(
            playlist.entry_for(Path::new("/data/clips/a.mp4")),
            "file '/data/clips/a.mp4'"
        );
        assert_eq!(playlist.entry_for(Path::new("c1.mp4")), "file 'c1.mp4'");
    }

    #[test]
    fn test_entry_escapes_quotes() {
        let playlist = Playlist::new("/srv/tmp/playlist.txt", "loop.mp4");
        assert_eq!(
            playlist.entry_for(Path::new("it's.mp4")),
            "file 'it'\\''s.mp4'"
        );
    }

    #[tokio::test]
    async fn test_prepare_seeds_from_assets() {
        let root = tempfile::tempdir().unwrap();
        let assets = root.path().join("assets");
        let tmp = root.path().join("tmp");
        fs::create_dir_all(&assets).await.unwrap();
        fs::write(assets.join("playlist.txt"), "file 'loop.mp4'\nfile 'old.mp4'\n")
            .await
            .unwrap();
        fs::write(assets.join("loop.mp4"), b"video").await.unwrap();

        let playlist = playlist_in(&tmp);
        playlist.prepare(Some(&assets)).await.unwrap();

        assert!(fs::try_exists(tmp.join("loop.mp4")).await.unwrap());
        assert_eq!(playlist.active_entry().await.unwrap(), "file 'loop.mp4'");
    }

    #[tokio::test]
    async fn test_prepare_writes_fresh_playlist() {
        let root = tempfile::tempdir().unwrap();
        let playlist = playlist_in(&root.path().join("tmp"));

        playlist.prepare(None).await.unwrap();

        let content = fs::read_to_string(playlist.path()).await.unwrap();
        assert_eq!(content, "file 'loop.mp4'\nfile 'loop.mp4'\n");
    }
}
