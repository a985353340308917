//! Unit tests for the thumbnail cache lookups and write-through

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use image::ImageFormat;
use tempfile::TempDir;
use vidcache::{derive_key, ArtifactKind, ArtifactStore, MetadataKind, UNKNOWN_DURATION};

use crate::helpers::{
    fetch_duration, fetch_thumbnail, open_cache, test_config, video, wait_until, FakeProbe, WAIT,
};

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[test]
fn miss_generates_and_second_request_hits() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(10_000);
    let (cache, queue) = open_cache(&config, &probe);
    let clip = video("clip.mp4", 1_000);

    let first = fetch_thumbnail(&cache, &queue, &clip).unwrap();
    assert_eq!(image::guess_format(&first).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(&first).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 150));
    assert_eq!(probe.opens(), 1);

    let second = fetch_thumbnail(&cache, &queue, &clip).unwrap();
    assert_eq!(second, first);
    assert_eq!(probe.opens(), 1, "hit must not touch the media backend");

    let key = derive_key(&clip.locator(), clip.last_modified());
    assert!(cache.store().has(&key, ArtifactKind::Thumbnail, clip.last_modified()));
    assert!(cache.shutdown());
}

#[test]
fn callbacks_run_on_the_polling_thread() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(10_000);
    let (cache, queue) = open_cache(&config, &probe);

    let caller = thread::current().id();
    let (tx, rx) = mpsc::channel();
    cache.get_thumbnail(&video("a.mp4", 1), move |_| {
        tx.send(thread::current().id()).unwrap();
    });
    assert!(queue.run_one(WAIT));
    assert_eq!(rx.try_recv().unwrap(), caller);
    assert!(cache.shutdown());
}

#[test]
fn overlapping_requests_both_generate() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::with_delay(10_000, Duration::from_millis(50));
    let (cache, queue) = open_cache(&config, &probe);
    let clip = video("clip.mp4", 1);

    let (tx, rx) = mpsc::channel();
    for _ in 0..2 {
        let tx = tx.clone();
        cache.get_thumbnail(&clip, move |bytes| {
            tx.send(bytes).unwrap();
        });
    }
    assert!(queue.run_one(WAIT));
    assert!(queue.run_one(WAIT));

    for _ in 0..2 {
        let bytes = rx.try_recv().unwrap().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }
    assert_eq!(probe.opens(), 2, "requests are not coalesced");

    let entries = cache.store().list_all().unwrap();
    assert_eq!(entries.len(), 1);
    let key = derive_key(&clip.locator(), clip.last_modified());
    let stored = cache.store().read(&key, ArtifactKind::Thumbnail).unwrap();
    assert!(image::load_from_memory_with_format(&stored, ImageFormat::Jpeg).is_ok());
    assert!(cache.shutdown());
}

#[test]
fn failed_generation_is_not_cached() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(10_000);
    probe.set_failing(true);
    let (cache, queue) = open_cache(&config, &probe);
    let clip = video("broken.mp4", 1);

    assert!(fetch_thumbnail(&cache, &queue, &clip).is_none());
    assert!(cache.store().list_all().unwrap().is_empty());

    // A later request tries again instead of remembering the failure
    probe.set_failing(false);
    assert!(fetch_thumbnail(&cache, &queue, &clip).is_some());
    assert_eq!(probe.opens(), 2);
    assert!(cache.shutdown());
}

#[test]
fn entry_older_than_resource_is_regenerated() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(10_000);

    // Stored now, but the resource claims a modification an hour from now
    let future = now_millis() + 3_600_000;
    let clip = video("edited.mp4", future);
    let store = ArtifactStore::new(config.cache_directory());
    store
        .write(
            &derive_key(&clip.locator(), future),
            ArtifactKind::Thumbnail,
            b"stale bytes",
        )
        .unwrap();

    let (cache, queue) = open_cache(&config, &probe);
    let thumbnail = fetch_thumbnail(&cache, &queue, &clip).unwrap();
    assert_eq!(probe.opens(), 1);
    assert_ne!(thumbnail, b"stale bytes".to_vec());
    assert!(cache.shutdown());
}

#[test]
fn corrupt_thumbnail_is_replaced() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(10_000);
    let clip = video("clip.mp4", 0);
    let key = derive_key(&clip.locator(), 0);

    let store = ArtifactStore::new(config.cache_directory());
    store
        .write(&key, ArtifactKind::Thumbnail, b"not a jpeg")
        .unwrap();

    let (cache, queue) = open_cache(&config, &probe);
    let thumbnail = fetch_thumbnail(&cache, &queue, &clip).unwrap();
    assert_eq!(image::guess_format(&thumbnail).unwrap(), ImageFormat::Jpeg);
    assert_eq!(probe.opens(), 1);
    assert_eq!(store.read(&key, ArtifactKind::Thumbnail).unwrap(), thumbnail);
    assert!(cache.shutdown());
}

#[test]
fn duration_is_generated_once_then_served_from_cache() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(125_000);
    let (cache, queue) = open_cache(&config, &probe);
    let clip = video("clip.mp4", 1);

    assert_eq!(fetch_duration(&cache, &queue, &clip), "02:05");
    assert_eq!(fetch_duration(&cache, &queue, &clip), "02:05");
    assert_eq!(probe.opens(), 1);
    assert_eq!(
        cache.get_cached_metadata(&clip, MetadataKind::Duration),
        Some("02:05".to_string())
    );
    assert!(cache.shutdown());
}

#[test]
fn unknown_duration_is_reported_but_not_cached() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(-1);
    let (cache, queue) = open_cache(&config, &probe);
    let clip = video("stream.mp4", 1);

    assert_eq!(fetch_duration(&cache, &queue, &clip), UNKNOWN_DURATION);
    assert_eq!(cache.get_cached_metadata(&clip, MetadataKind::Duration), None);
    assert!(cache.store().list_all().unwrap().is_empty());
    assert!(cache.shutdown());
}

#[test]
fn startup_eviction_enforces_budget() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.cache.max_size_mb = 0;

    let store = ArtifactStore::new(config.cache_directory());
    for i in 0..4 {
        let key = derive_key(&format!("/videos/{}.mp4", i), 0);
        store
            .write(&key, ArtifactKind::Thumbnail, &[0u8; 1024])
            .unwrap();
    }

    let probe = FakeProbe::new(10_000);
    let (cache, _queue) = open_cache(&config, &probe);
    assert!(wait_until(|| store.list_all().unwrap().len() == 1));
    assert!(cache.shutdown());
}

#[test]
fn writes_periodically_trigger_eviction() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.cache.max_size_mb = 0;
    config.workers.eviction_interval = 1;

    let probe = FakeProbe::new(10_000);
    let (cache, queue) = open_cache(&config, &probe);
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        assert!(fetch_thumbnail(&cache, &queue, &video(name, 1)).is_some());
    }

    assert!(wait_until(|| cache.store().list_all().unwrap().len() == 1));
    assert!(cache.shutdown());
}

#[test]
fn unusable_directory_degrades_to_misses() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let mut config = test_config(&temp);
    config.cache.directory = blocker.join("cache").to_string_lossy().into_owned();
    let probe = FakeProbe::new(10_000);
    let (cache, queue) = open_cache(&config, &probe);
    let clip = video("clip.mp4", 1);

    // Generation still succeeds; only the write-through fails
    assert!(fetch_thumbnail(&cache, &queue, &clip).is_some());
    assert!(fetch_thumbnail(&cache, &queue, &clip).is_some());
    assert_eq!(probe.opens(), 2);
    assert!(cache.shutdown());
}
