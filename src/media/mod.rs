//! Media inspection
//!
//! The cache does not decode video itself. It asks a [`MediaProbe`] to open
//! a resource and then queries the resulting [`MediaHandle`] for the stream
//! duration and single frames. Dropping the handle releases it.

pub mod ffmpeg;

pub use ffmpeg::FfmpegProbe;

use image::DynamicImage;

use crate::error::MediaError;
use crate::resource::VideoResource;

/// An opened media source.
pub trait MediaHandle {
    /// Stream duration in milliseconds, if the container reports one.
    fn duration_millis(&mut self) -> Option<i64>;

    /// Decode the frame closest to `micros` microseconds into the stream.
    fn frame_at(&mut self, micros: i64) -> Option<DynamicImage>;
}

/// Opens media sources. Shared by every worker thread.
pub trait MediaProbe: Send + Sync {
    fn open(&self, resource: &VideoResource) -> Result<Box<dyn MediaHandle>, MediaError>;
}
