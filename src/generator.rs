//! Artifact generation policy
//!
//! Decides which frame represents a video, how it is scaled and encoded,
//! and how a duration is rendered. Media failures never escape: a
//! thumbnail becomes `None`, a duration becomes [`UNKNOWN_DURATION`].

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{debug, warn};

use crate::media::MediaProbe;
use crate::resource::VideoResource;

/// Duration text shown when the stream length cannot be read.
pub const UNKNOWN_DURATION: &str = "Unknown";

/// Frame offset used when the duration is unavailable (1 s).
pub const DEFAULT_SAMPLE_MICROS: i64 = 1_000_000;
/// Earliest frame offset considered representative (0.5 s).
pub const MIN_SAMPLE_MICROS: i64 = 500_000;
/// Distance kept from the end of the stream (0.1 s).
pub const END_MARGIN_MICROS: i64 = 100_000;

/// Pick the frame offset, in microseconds, for a thumbnail.
///
/// The midpoint of the stream, no later than 0.1 s before the end and no
/// earlier than 0.5 s. Unknown or non-positive durations sample at 1 s.
pub fn sample_time_micros(duration_millis: Option<i64>) -> i64 {
    match duration_millis {
        Some(duration) if duration > 0 => {
            let midpoint = (duration / 2).saturating_mul(1000);
            let latest = duration.saturating_mul(1000) - END_MARGIN_MICROS;
            midpoint.min(latest).max(MIN_SAMPLE_MICROS)
        }
        _ => DEFAULT_SAMPLE_MICROS,
    }
}

/// Render a duration as `MM:SS`. Minutes are not capped at two digits.
pub fn format_duration(millis: i64) -> String {
    let total_seconds = millis.max(0) / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Produces thumbnails and duration strings from a [`MediaProbe`].
#[derive(Clone)]
pub struct ArtifactGenerator {
    probe: Arc<dyn MediaProbe>,
    width: u32,
    height: u32,
    jpeg_quality: u8,
}

impl ArtifactGenerator {
    pub fn new(probe: Arc<dyn MediaProbe>, width: u32, height: u32, jpeg_quality: u8) -> Self {
        Self {
            probe,
            width,
            height,
            jpeg_quality,
        }
    }

    /// Extract a representative frame and encode it as a scaled JPEG.
    pub fn generate_thumbnail(&self, resource: &VideoResource) -> Option<Vec<u8>> {
        let mut handle = match self.probe.open(resource) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Error generating thumbnail for {}: {}", resource.locator(), e);
                return None;
            }
        };

        let at = sample_time_micros(handle.duration_millis());
        let Some(frame) = handle.frame_at(at) else {
            warn!("No frame at {}us for {}", at, resource.locator());
            return None;
        };
        drop(handle);

        match self.encode(&frame) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to encode thumbnail for {}: {}", resource.locator(), e);
                None
            }
        }
    }

    /// The formatted duration, or `None` if it cannot be determined.
    pub fn duration_text(&self, resource: &VideoResource) -> Option<String> {
        let mut handle = match self.probe.open(resource) {
            Ok(handle) => handle,
            Err(e) => {
                debug!("Error calculating duration for {}: {}", resource.locator(), e);
                return None;
            }
        };
        handle.duration_millis().map(format_duration)
    }

    /// The formatted duration, or [`UNKNOWN_DURATION`].
    pub fn generate_duration(&self, resource: &VideoResource) -> String {
        self.duration_text(resource)
            .unwrap_or_else(|| UNKNOWN_DURATION.to_string())
    }

    fn encode(&self, frame: &DynamicImage) -> image::ImageResult<Vec<u8>> {
        let scaled = frame
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_rgb8();
        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut out, self.jpeg_quality).encode_image(&scaled)?;
        Ok(out.into_inner())
    }
}
