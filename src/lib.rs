//! vidcache Library
//!
//! A durable cache of video thumbnails and duration strings, keyed by
//! resource identity and modification time, with a size budget and
//! cancellable background precaching.

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod eviction;
pub mod generator;
pub mod key;
pub mod media;
pub mod pool;
pub mod precache;
pub mod resource;
pub mod store;

pub use config::Config;
pub use coordinator::ThumbnailCache;
pub use dispatch::{ChannelDispatcher, CompletionQueue, Dispatcher, ThreadDispatcher};
pub use error::{MediaError, StoreError};
pub use eviction::{enforce_budget, EvictionReport};
pub use generator::{format_duration, ArtifactGenerator, UNKNOWN_DURATION};
pub use key::{derive_key, CacheKey, KeyHash};
pub use media::{FfmpegProbe, MediaHandle, MediaProbe};
pub use precache::{NoProgress, PrecacheProgress, PrecacheState};
pub use resource::{scan_folder, VideoResource};
pub use store::{ArtifactKind, ArtifactStore, MetadataKind, StoreStats};
