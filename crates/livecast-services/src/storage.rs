//! Object storage for synthesized audio and the local clip cache.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, info};

use crate::{ensure_success, join_url, ObjectStore, ServiceResult};

/// Number of rotating clip files kept on disk.
pub const DEFAULT_CLIP_SLOTS: u32 = 10;

/// Bucket reachable over plain HTTP: objects are written with `PUT` and read
/// back from the same URL.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    bucket_url: String,
}

impl HttpObjectStore {
    pub fn new(client: Client, bucket_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket_url: bucket_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn save(&self, key: &str, body: Bytes, content_type: &str) -> ServiceResult<String> {
        let url = self.public_url(key);
        debug!("Uploading {} bytes to {}", body.len(), url);

        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        ensure_success("object store", response).await?;

        info!("Saved object {}", key);
        Ok(key.to_string())
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.bucket_url, key)
    }
}

/// Downloads finished clips into a small set of rotating files.
///
/// Downloads take the slots in turn, so at most `slots` clips occupy the
/// disk and a file is only reused after every other slot has been written.
/// Each download is staged next to its slot and renamed over it; a reader
/// that already opened the old clip keeps reading the old bytes.
#[derive(Debug, Clone)]
pub struct ClipCache {
    client: Client,
    dir: PathBuf,
    slots: u32,
    next_slot: Arc<AtomicU32>,
}

impl ClipCache {
    pub fn new(client: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
            slots: DEFAULT_CLIP_SLOTS,
            next_slot: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_slots(mut self, slots: u32) -> Self {
        self.slots = slots.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fetch `url` into the cache and return the local path.
    pub async fn download(&self, url: &str) -> ServiceResult<PathBuf> {
        let response = self.client.get(url).send().await?;
        let body = ensure_success("clip download", response).await?.bytes().await?;

        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed) % self.slots;
        let path = self.dir.join(format!("latest{slot}.mp4"));
        let staging = self
            .dir
            .join(format!(".latest{slot}.{}.part", uuid::Uuid::new_v4()));

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&staging, &body).await?;
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        info!("Downloaded clip to {} ({} bytes)", path.display(), body.len());
        Ok(path)
    }
}
