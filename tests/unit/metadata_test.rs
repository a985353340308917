//! Unit tests for metadata caching and cache clearing

use std::fs::File;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tempfile::TempDir;
use vidcache::{derive_key, ArtifactKind, ArtifactStore, MetadataKind};

use crate::helpers::{fetch_thumbnail, open_cache, test_config, video, wait_until, FakeProbe};

const DURATION: MetadataKind = MetadataKind::Duration;

#[test]
fn cached_value_is_visible_immediately_and_persisted() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(10_000);
    let clip = video("clip.mp4", 1);

    let (cache, _queue) = open_cache(&config, &probe);
    cache.cache_metadata(&clip, DURATION, "03:15");
    assert_eq!(
        cache.get_cached_metadata(&clip, DURATION),
        Some("03:15".to_string())
    );
    assert!(cache.shutdown());

    let key = derive_key(&clip.locator(), 1);
    let store = ArtifactStore::new(config.cache_directory());
    assert_eq!(
        store.read(&key, ArtifactKind::Metadata(DURATION)).unwrap(),
        b"03:15".to_vec()
    );

    // A fresh instance finds it on disk without touching the media backend
    let (reopened, _queue) = open_cache(&config, &probe);
    assert_eq!(
        reopened.get_cached_metadata(&clip, DURATION),
        Some("03:15".to_string())
    );
    assert_eq!(probe.opens(), 0);
    assert!(reopened.shutdown());
}

#[test]
fn missing_metadata_is_none() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(10_000);
    let (cache, _queue) = open_cache(&config, &probe);

    assert_eq!(cache.get_cached_metadata(&video("new.mp4", 1), DURATION), None);
    assert_eq!(probe.opens(), 0, "lookups never generate");
    assert!(cache.shutdown());
}

#[test]
fn stale_or_empty_disk_values_are_ignored() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let store = ArtifactStore::new(config.cache_directory());

    let future = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
        + 3_600_000;
    let edited = video("edited.mp4", future);
    store
        .write(
            &derive_key(&edited.locator(), future),
            ArtifactKind::Metadata(DURATION),
            b"01:00",
        )
        .unwrap();

    let blank = video("blank.mp4", 0);
    store
        .write(
            &derive_key(&blank.locator(), 0),
            ArtifactKind::Metadata(DURATION),
            b"",
        )
        .unwrap();

    let probe = FakeProbe::new(10_000);
    let (cache, _queue) = open_cache(&config, &probe);
    assert_eq!(cache.get_cached_metadata(&edited, DURATION), None);
    assert_eq!(cache.get_cached_metadata(&blank, DURATION), None);
    assert!(cache.shutdown());
}

#[test]
fn instances_do_not_share_memory() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let probe = FakeProbe::new(10_000);
    let clip = video("clip.mp4", 1);

    let (first, _q1) = open_cache(&test_config(&first_dir), &probe);
    let (second, _q2) = open_cache(&test_config(&second_dir), &probe);
    first.cache_metadata(&clip, DURATION, "00:42");

    assert_eq!(
        first.get_cached_metadata(&clip, DURATION),
        Some("00:42".to_string())
    );
    assert_eq!(second.get_cached_metadata(&clip, DURATION), None);
    assert!(first.shutdown());
    assert!(second.shutdown());
}

#[test]
fn evicted_values_are_forgotten() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.cache.max_size_mb = 0;
    let probe = FakeProbe::new(10_000);
    let (cache, _queue) = open_cache(&config, &probe);
    let old = video("old.mp4", 1);
    let new = video("new.mp4", 1);

    cache.cache_metadata(&old, DURATION, "01:00");
    cache.cache_metadata(&new, DURATION, "02:00");
    assert!(wait_until(|| cache.store().list_all().unwrap().len() == 2));

    let old_path = cache.store().entry_path(
        &derive_key(&old.locator(), old.last_modified()),
        ArtifactKind::Metadata(DURATION),
    );
    File::options()
        .write(true)
        .open(&old_path)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(3_600))
        .unwrap();

    cache.enforce_budget();
    assert!(wait_until(|| cache.get_cached_metadata(&old, DURATION).is_none()));
    assert!(!old_path.exists());
    assert_eq!(
        cache.get_cached_metadata(&new, DURATION),
        Some("02:00".to_string())
    );
    assert!(cache.shutdown());
}

#[test]
fn clear_removes_entries_and_memory() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let probe = FakeProbe::new(10_000);
    let (cache, queue) = open_cache(&config, &probe);
    let clip = video("clip.mp4", 1);

    assert!(fetch_thumbnail(&cache, &queue, &clip).is_some());
    cache.cache_metadata(&clip, DURATION, "00:10");
    assert!(wait_until(|| cache.store().list_all().unwrap().len() == 2));

    cache.clear_cache();
    assert!(wait_until(|| {
        cache.store().list_all().unwrap().is_empty()
            && cache.get_cached_metadata(&clip, DURATION).is_none()
    }));

    // Clearing an empty cache is fine
    cache.clear_cache();
    assert!(cache.shutdown());
    assert!(ArtifactStore::new(config.cache_directory())
        .list_all()
        .unwrap()
        .is_empty());
}
