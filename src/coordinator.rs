//! Thumbnail and metadata cache
//!
//! [`ThumbnailCache`] is the public face of the crate. It looks artifacts
//! up in the [`ArtifactStore`], generates them on a miss, writes them back
//! and hands results to a [`Dispatcher`]. Three worker pools keep the
//! kinds of work apart:
//!
//! - interactive: on-demand thumbnails, durations and metadata writes
//! - background: precaching, so bulk warming never starves the list UI
//! - eviction: a single thread enforcing the size budget
//!
//! Concurrent requests for the same resource are not deduplicated. Both
//! miss, both generate, and the atomic store writes make the last one win.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use image::ImageFormat;
use tracing::{debug, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::StoreResult;
use crate::eviction::enforce_budget;
use crate::generator::{ArtifactGenerator, UNKNOWN_DURATION};
use crate::key::{derive_key_with, CacheKey, KeyHash};
use crate::media::{FfmpegProbe, MediaProbe};
use crate::pool::WorkerPool;
use crate::precache::{ItemOutcome, PrecacheJob, PrecacheProgress, PrecacheState};
use crate::resource::VideoResource;
use crate::store::{ArtifactKind, ArtifactStore, MetadataKind, StoreStats};

/// Durable cache of video thumbnails and duration strings.
pub struct ThumbnailCache {
    inner: Arc<Inner>,
}

struct Inner {
    store: ArtifactStore,
    generator: ArtifactGenerator,
    key_hash: KeyHash,
    max_bytes: u64,
    /// In-process copy of metadata values, keyed by `<key>_<kind>`
    metadata: Arc<DashMap<String, String>>,
    dispatcher: Arc<dyn Dispatcher>,
    interactive: WorkerPool,
    background: WorkerPool,
    eviction: WorkerPool,
    precache: Mutex<Option<Arc<PrecacheJob>>>,
    precache_delay: Duration,
    eviction_interval: u64,
    writes: AtomicU64,
    shutdown_grace: Duration,
}

impl ThumbnailCache {
    /// Open the cache described by `config`, decoding media with ffmpeg.
    pub fn open(config: &Config, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let probe = Arc::new(FfmpegProbe::from_config(&config.media));
        Self::with_probe(config, probe, dispatcher)
    }

    /// Open the cache with an explicit media backend.
    ///
    /// The cache directory is created if needed and an eviction pass is
    /// scheduled. An unusable directory is logged; the cache then misses
    /// on every lookup but keeps working.
    pub fn with_probe(
        config: &Config,
        probe: Arc<dyn MediaProbe>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let store = ArtifactStore::new(config.cache_directory());
        if let Err(e) = store.ensure_dir() {
            warn!("{}", e);
        }

        let budget = config.budget();
        let generator = ArtifactGenerator::new(
            probe,
            budget.thumbnail_width,
            budget.thumbnail_height,
            config.thumbnail.jpeg_quality,
        );

        let cache = Self {
            inner: Arc::new(Inner {
                store,
                generator,
                key_hash: config.cache.key_hash,
                max_bytes: budget.max_bytes,
                metadata: Arc::new(DashMap::new()),
                dispatcher,
                interactive: WorkerPool::new("vidcache-interactive", config.workers.interactive),
                background: WorkerPool::new("vidcache-precache", config.workers.background),
                eviction: WorkerPool::new("vidcache-evict", 1),
                precache: Mutex::new(None),
                precache_delay: config.precache_delay(),
                eviction_interval: config.workers.eviction_interval,
                writes: AtomicU64::new(0),
                shutdown_grace: config.shutdown_grace(),
            }),
        };
        cache.enforce_budget();
        cache
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.inner.store
    }

    /// Fetch a thumbnail, generating and caching it on a miss.
    ///
    /// Returns immediately; `callback` later receives the JPEG bytes, or
    /// `None` if no frame could be extracted, on the completion context.
    pub fn get_thumbnail<F>(&self, resource: &VideoResource, callback: F)
    where
        F: FnOnce(Option<Vec<u8>>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let resource = resource.clone();
        let accepted = self.inner.interactive.execute(move || {
            let thumbnail = inner.load_thumbnail(&resource);
            inner.dispatcher.post(Box::new(move || callback(thumbnail)));
        });
        if !accepted {
            debug!("Thumbnail request rejected: cache is shut down");
        }
    }

    /// Fetch the formatted duration, generating and caching it on a miss.
    ///
    /// `callback` receives `"Unknown"` when the duration cannot be read;
    /// that value is not cached.
    pub fn get_duration<F>(&self, resource: &VideoResource, callback: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let resource = resource.clone();
        let accepted = self.inner.interactive.execute(move || {
            let duration = inner
                .load_duration(&resource)
                .unwrap_or_else(|| UNKNOWN_DURATION.to_string());
            inner.dispatcher.post(Box::new(move || callback(duration)));
        });
        if !accepted {
            debug!("Duration request rejected: cache is shut down");
        }
    }

    /// Cached metadata value, if present and fresh. Never generates.
    pub fn get_cached_metadata(
        &self,
        resource: &VideoResource,
        kind: MetadataKind,
    ) -> Option<String> {
        self.inner.cached_metadata(resource, kind)
    }

    /// Record a metadata value.
    ///
    /// Visible to [`get_cached_metadata`](Self::get_cached_metadata)
    /// immediately; written to disk asynchronously.
    pub fn cache_metadata(
        &self,
        resource: &VideoResource,
        kind: MetadataKind,
        value: impl Into<String>,
    ) {
        let value = value.into();
        let key = self.inner.key_for(resource);
        self.inner.remember(&key, kind, value.clone());

        let inner = Arc::clone(&self.inner);
        self.inner.interactive.execute(move || {
            inner.persist(&key, ArtifactKind::Metadata(kind), value.as_bytes());
        });
    }

    /// Start warming duration metadata for `resources` on the background
    /// pool, cancelling any run already in progress.
    pub fn precache_metadata(
        &self,
        resources: Vec<VideoResource>,
        progress: impl PrecacheProgress + 'static,
    ) {
        let progress: Arc<dyn PrecacheProgress> = Arc::new(progress);
        let job = Arc::new(PrecacheJob::new(resources.len()));
        {
            let mut slot = self
                .inner
                .precache
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = slot.replace(Arc::clone(&job)) {
                if previous.cancel() {
                    debug!("Cancelled ongoing precaching");
                }
            }
        }

        let inner = Arc::clone(&self.inner);
        self.inner.background.execute(move || {
            job.run(
                &resources,
                inner.precache_delay,
                &inner.dispatcher,
                &progress,
                |resource| inner.precache_item(resource),
            );
        });
    }

    /// Cancel the running precache job. Returns whether one was running.
    pub fn cancel_precaching(&self) -> bool {
        self.inner.cancel_precaching()
    }

    /// State of the most recent precache job.
    pub fn precache_state(&self) -> PrecacheState {
        self.inner
            .precache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|job| job.state())
            .unwrap_or(PrecacheState::Idle)
    }

    /// Cancel precaching, then delete every entry and forget all metadata.
    pub fn clear_cache(&self) {
        self.inner.cancel_precaching();

        let inner = Arc::clone(&self.inner);
        self.inner.interactive.execute(move || {
            match inner.store.clear() {
                Ok(removed) => debug!("Cache cleared ({} files)", removed),
                Err(e) => warn!("Error clearing cache: {}", e),
            }
            inner.metadata.clear();
        });
    }

    /// Schedule an eviction pass on the eviction worker.
    pub fn enforce_budget(&self) {
        self.inner.schedule_eviction();
    }

    /// Summary of what is on disk.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.inner.store.stats()
    }

    /// Stop all work and wait for in-flight jobs.
    ///
    /// Waits at most the configured grace period; work still queued after
    /// that is discarded. Returns `true` if everything drained in time.
    pub fn shutdown(self) -> bool {
        self.inner.cancel_precaching();

        let deadline = Instant::now() + self.inner.shutdown_grace;
        let interactive = self.inner.interactive.shutdown(deadline);
        let background = self.inner.background.shutdown(deadline);
        let eviction = self.inner.eviction.shutdown(deadline);

        let clean = interactive && background && eviction;
        if !clean {
            warn!("Cache shutdown timed out; remaining work was cancelled");
        }
        clean
    }
}

impl Drop for ThumbnailCache {
    fn drop(&mut self) {
        self.inner.cancel_precaching();
    }
}

impl Inner {
    fn key_for(&self, resource: &VideoResource) -> CacheKey {
        derive_key_with(self.key_hash, &resource.locator(), resource.last_modified())
    }

    fn load_thumbnail(&self, resource: &VideoResource) -> Option<Vec<u8>> {
        let key = self.key_for(resource);

        if self
            .store
            .has(&key, ArtifactKind::Thumbnail, resource.last_modified())
        {
            match self.store.read(&key, ArtifactKind::Thumbnail) {
                Some(bytes) if image::guess_format(&bytes).ok() == Some(ImageFormat::Jpeg) => {
                    debug!("Loaded cached thumbnail for {}", resource.display_name());
                    return Some(bytes);
                }
                Some(_) => {
                    warn!(
                        "Cached thumbnail for {} is corrupt, will regenerate",
                        resource.display_name()
                    );
                    if let Err(e) = self.store.delete(&key, ArtifactKind::Thumbnail) {
                        warn!("{}", e);
                    }
                }
                None => {}
            }
        }

        let thumbnail = self.generator.generate_thumbnail(resource)?;
        self.persist(&key, ArtifactKind::Thumbnail, &thumbnail);
        debug!("Generated and cached thumbnail for {}", resource.display_name());
        Some(thumbnail)
    }

    fn load_duration(&self, resource: &VideoResource) -> Option<String> {
        if let Some(cached) = self.cached_metadata(resource, MetadataKind::Duration) {
            return Some(cached);
        }
        let duration = self.generator.duration_text(resource)?;
        self.write_metadata(resource, MetadataKind::Duration, &duration);
        Some(duration)
    }

    fn precache_item(&self, resource: &VideoResource) -> ItemOutcome {
        if self
            .cached_metadata(resource, MetadataKind::Duration)
            .is_some()
        {
            return ItemOutcome::Skipped;
        }
        match self.generator.duration_text(resource) {
            Some(duration) => {
                self.write_metadata(resource, MetadataKind::Duration, &duration);
                debug!("Precached duration for: {}", resource.display_name());
                ItemOutcome::Cached
            }
            None => {
                warn!("Error precaching metadata for {}", resource.locator());
                ItemOutcome::Failed
            }
        }
    }

    fn cached_metadata(&self, resource: &VideoResource, kind: MetadataKind) -> Option<String> {
        let key = self.key_for(resource);
        let map_key = metadata_map_key(&key, kind);
        if let Some(value) = self.metadata.get(&map_key) {
            return Some(value.clone());
        }

        let artifact = ArtifactKind::Metadata(kind);
        if !self.store.has(&key, artifact, resource.last_modified()) {
            return None;
        }
        let bytes = self.store.read(&key, artifact)?;
        let value = String::from_utf8_lossy(&bytes)
            .lines()
            .next()
            .unwrap_or("")
            .to_string();
        if value.is_empty() {
            return None;
        }
        self.metadata.insert(map_key, value.clone());
        Some(value)
    }

    /// Record in memory and write through on the current thread.
    fn write_metadata(&self, resource: &VideoResource, kind: MetadataKind, value: &str) {
        let key = self.key_for(resource);
        self.remember(&key, kind, value.to_string());
        self.persist(&key, ArtifactKind::Metadata(kind), value.as_bytes());
    }

    fn remember(&self, key: &CacheKey, kind: MetadataKind, value: String) {
        self.metadata.insert(metadata_map_key(key, kind), value);
    }

    /// Write an artifact, treating failure as a logged no-op.
    fn persist(&self, key: &CacheKey, kind: ArtifactKind, bytes: &[u8]) {
        if let Err(e) = self.store.write(key, kind, bytes) {
            warn!("Failed to save to cache: {}", e);
            return;
        }
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if self.eviction_interval > 0 && writes % self.eviction_interval == 0 {
            self.schedule_eviction();
        }
    }

    fn schedule_eviction(&self) {
        let store = self.store.clone();
        let metadata = Arc::clone(&self.metadata);
        let max_bytes = self.max_bytes;
        self.eviction.execute(move || {
            let report = enforce_budget(&store, max_bytes);
            // Metadata files are named after their map key
            for path in &report.evicted {
                if path.extension().is_some_and(|ext| ext == "txt") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        metadata.remove(stem);
                    }
                }
            }
            if report.deleted > 0 {
                debug!(
                    "Evicted {} cache entries ({} bytes)",
                    report.deleted, report.bytes_reclaimed
                );
            }
        });
    }

    fn cancel_precaching(&self) -> bool {
        let slot = self.precache.lock().unwrap_or_else(PoisonError::into_inner);
        let cancelled = slot.as_ref().is_some_and(|job| job.cancel());
        if cancelled {
            debug!("Cancelled ongoing precaching");
        }
        cancelled
    }
}

fn metadata_map_key(key: &CacheKey, kind: MetadataKind) -> String {
    format!("{}_{}", key, kind.as_str())
}
