//! Test helper utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use image::{DynamicImage, RgbImage};
use tempfile::TempDir;
use vidcache::{
    ChannelDispatcher, CompletionQueue, Config, MediaError, MediaHandle, MediaProbe,
    ThumbnailCache, VideoResource,
};

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// In-memory media backend that counts how often it is opened.
pub struct FakeProbe {
    opens: AtomicUsize,
    /// Duration reported by every handle, in milliseconds (<0 = none).
    duration_millis: AtomicI64,
    failing: AtomicBool,
    open_delay: Duration,
}

impl FakeProbe {
    pub fn new(duration_millis: i64) -> Arc<Self> {
        Self::with_delay(duration_millis, Duration::ZERO)
    }

    /// A probe whose every open blocks for `open_delay`.
    pub fn with_delay(duration_millis: i64, open_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            opens: AtomicUsize::new(0),
            duration_millis: AtomicI64::new(duration_millis),
            failing: AtomicBool::new(false),
            open_delay,
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

struct FakeHandle {
    duration_millis: Option<i64>,
}

impl MediaHandle for FakeHandle {
    fn duration_millis(&mut self) -> Option<i64> {
        self.duration_millis
    }

    fn frame_at(&mut self, _micros: i64) -> Option<DynamicImage> {
        Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            64,
            48,
            image::Rgb([30, 120, 200]),
        )))
    }
}

impl MediaProbe for FakeProbe {
    fn open(&self, resource: &VideoResource) -> Result<Box<dyn MediaHandle>, MediaError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if !self.open_delay.is_zero() {
            thread::sleep(self.open_delay);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(MediaError::Unreadable {
                locator: resource.locator(),
                reason: "fake failure".to_string(),
            });
        }
        let duration = self.duration_millis.load(Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            duration_millis: (duration >= 0).then_some(duration),
        }))
    }
}

/// Config pointing at `<temp>/cache` with no precache pacing.
pub fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.cache.directory = temp
        .path()
        .join("cache")
        .to_string_lossy()
        .into_owned();
    config.workers.precache_delay_ms = 0;
    config
}

/// Open a cache whose completions run when the returned queue is polled.
pub fn open_cache(config: &Config, probe: &Arc<FakeProbe>) -> (ThumbnailCache, CompletionQueue) {
    let (dispatcher, queue) = ChannelDispatcher::new();
    let probe: Arc<dyn MediaProbe> = Arc::clone(probe) as Arc<dyn MediaProbe>;
    let cache = ThumbnailCache::with_probe(config, probe, Arc::new(dispatcher));
    (cache, queue)
}

/// A local video that need not exist on disk.
pub fn video(name: &str, last_modified: i64) -> VideoResource {
    VideoResource::LocalPath {
        path: format!("/videos/{}", name).into(),
        last_modified,
    }
}

/// Request a thumbnail and pump the queue until it arrives.
pub fn fetch_thumbnail(
    cache: &ThumbnailCache,
    queue: &CompletionQueue,
    resource: &VideoResource,
) -> Option<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    cache.get_thumbnail(resource, move |bytes| {
        tx.send(bytes).unwrap();
    });
    assert!(queue.run_one(WAIT), "thumbnail callback never arrived");
    rx.try_recv().unwrap()
}

/// Request a duration and pump the queue until it arrives.
pub fn fetch_duration(
    cache: &ThumbnailCache,
    queue: &CompletionQueue,
    resource: &VideoResource,
) -> String {
    let (tx, rx) = mpsc::channel();
    cache.get_duration(resource, move |duration| {
        tx.send(duration).unwrap();
    });
    assert!(queue.run_one(WAIT), "duration callback never arrived");
    rx.try_recv().unwrap()
}

/// Poll `condition` until it holds or [`WAIT`] passes.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
