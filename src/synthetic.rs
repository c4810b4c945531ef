//! Deterministic in-process collaborators.
//!
//! [`SyntheticProvider`] opens fake videos whose pixels depend only on the frame number and the
//! YCbCr matrix, and [`BandRenderer`] draws one opaque band per visible subtitle line. Both keep
//! shared counters so callers can observe what the pipeline worker did.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::foundation::core::{Fps, SourceInfo};
use crate::foundation::error::{SourceError, SubtitleError};
use crate::pipeline::buffer_pool::PooledBuffer;
use crate::pipeline::frame::VideoFrame;
use crate::pipeline::source::{FrameSource, SourceProvider, SubtitleRenderer};
use crate::pipeline::subtitles::SubtitleLine;

/// Shape of the videos a [`SyntheticProvider`] opens.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticVideo {
    /// Number of frames.
    pub frame_count: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Nominal frame rate.
    pub fps: Fps,
    /// YCbCr matrix the stream is tagged with.
    pub color_space: String,
    /// Frames that fail to decode.
    pub bad_frames: BTreeSet<u64>,
    /// Frames whose decode panics.
    pub panic_frames: BTreeSet<u64>,
    /// Time spent in every decode.
    pub decode_delay: Duration,
    /// Store rows bottom-up.
    pub flipped: bool,
}

impl Default for SyntheticVideo {
    fn default() -> Self {
        Self {
            frame_count: 100,
            width: 16,
            height: 16,
            fps: Fps { num: 25, den: 1 },
            color_space: "TV.601".to_string(),
            bad_frames: BTreeSet::new(),
            panic_frames: BTreeSet::new(),
            decode_delay: Duration::ZERO,
            flipped: false,
        }
    }
}

/// One decode as seen by a synthetic source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeRecord {
    /// Frame decoded.
    pub frame: u64,
    /// Matrix in effect.
    pub color_space: String,
}

/// Opens [`SyntheticSource`]s. Clones share counters.
#[derive(Clone, Debug, Default)]
pub struct SyntheticProvider {
    video: SyntheticVideo,
    missing: Arc<Mutex<BTreeSet<PathBuf>>>,
    opened: Arc<AtomicU64>,
    decodes: Arc<Mutex<Vec<DecodeRecord>>>,
}

impl SyntheticProvider {
    /// Provider for videos shaped like `video`.
    pub fn new(video: SyntheticVideo) -> Self {
        Self {
            video,
            ..Self::default()
        }
    }

    /// Make `path` report [`SourceError::NotFound`].
    pub fn with_missing(self, path: impl Into<PathBuf>) -> Self {
        self.missing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into());
        self
    }

    /// Number of successful opens.
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Every decode performed by sources from this provider, in order.
    pub fn decodes(&self) -> Vec<DecodeRecord> {
        self.decodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Pixel value every pixel of `frame` has under `color_space`.
    pub fn pixel_for(frame: u64, color_space: &str) -> [u8; 4] {
        let tint = color_space
            .bytes()
            .fold(0u8, |acc, b| acc.wrapping_mul(31).wrapping_add(b));
        [(frame % 256) as u8, ((frame / 256) % 256) as u8, tint, 255]
    }
}

impl SourceProvider for SyntheticProvider {
    fn open(
        &self,
        path: &Path,
        color_matrix_hint: &str,
    ) -> Result<Box<dyn FrameSource>, SourceError> {
        let missing = self
            .missing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(path);
        if missing {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        if self.video.frame_count == 0 || self.video.width == 0 || self.video.height == 0 {
            return Err(SourceError::Open {
                path: path.to_path_buf(),
                reason: "video has no frames".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::Relaxed);

        let color_space = if self.video.color_space.is_empty() {
            color_matrix_hint.to_string()
        } else {
            self.video.color_space.clone()
        };
        Ok(Box::new(SyntheticSource {
            video: self.video.clone(),
            color_space,
            decodes: Arc::clone(&self.decodes),
        }))
    }
}

/// A fake video stream.
#[derive(Debug)]
pub struct SyntheticSource {
    video: SyntheticVideo,
    color_space: String,
    decodes: Arc<Mutex<Vec<DecodeRecord>>>,
}

impl FrameSource for SyntheticSource {
    fn info(&self) -> SourceInfo {
        let v = &self.video;
        SourceInfo {
            frame_count: v.frame_count,
            width: v.width,
            height: v.height,
            dar: f64::from(v.width) / f64::from(v.height),
            fps: v.fps,
            keyframes: (0..v.frame_count).step_by(10).collect(),
            color_space: self.color_space.clone(),
            real_color_space: v.color_space.clone(),
            warning: None,
            decoder_name: "synthetic".to_string(),
            has_audio: false,
            should_set_video_properties: true,
        }
    }

    fn color_space(&self) -> String {
        self.color_space.clone()
    }

    fn set_color_space(&mut self, matrix: &str) {
        self.color_space = matrix.to_string();
    }

    fn decode(&mut self, frame: u64) -> Result<VideoFrame, SourceError> {
        if !self.video.decode_delay.is_zero() {
            std::thread::sleep(self.video.decode_delay);
        }
        if frame >= self.video.frame_count {
            return Err(SourceError::OutOfRange {
                frame,
                count: self.video.frame_count,
            });
        }
        if self.video.bad_frames.contains(&frame) {
            return Err(SourceError::decode(frame, "corrupt packet"));
        }
        if self.video.panic_frames.contains(&frame) {
            panic!("decoder crashed on frame {frame}");
        }
        self.decodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(DecodeRecord {
                frame,
                color_space: self.color_space.clone(),
            });

        let px = SyntheticProvider::pixel_for(frame, &self.color_space);
        let stride = self.video.width as usize * 4;
        let data = px
            .iter()
            .copied()
            .cycle()
            .take(stride * self.video.height as usize)
            .collect();
        Ok(VideoFrame {
            width: self.video.width,
            height: self.video.height,
            stride,
            flipped: self.video.flipped,
            data,
        })
    }
}

/// Color of the bands [`BandRenderer`] draws.
pub const BAND_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Draws one opaque band per visible line, top to bottom.
///
/// Fails when a line's text contains the configured marker, after drawing the bands before it.
#[derive(Clone, Debug)]
pub struct BandRenderer {
    band_height: u32,
    fail_marker: Option<String>,
    renders: Arc<AtomicU64>,
}

impl Default for BandRenderer {
    fn default() -> Self {
        Self {
            band_height: 2,
            fail_marker: None,
            renders: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl BandRenderer {
    /// Renderer with two-pixel bands that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Band height in pixels (at least 1).
    pub fn with_band_height(mut self, rows: u32) -> Self {
        self.band_height = rows.max(1);
        self
    }

    /// Fail on lines whose text contains `marker`.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Number of render calls across all clones.
    pub fn renders(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }

    /// Row range of the band for the `index`-th visible line.
    pub fn band_rows(&self, index: usize) -> std::ops::Range<u32> {
        let start = self.band_height.saturating_mul(index as u32);
        start..start.saturating_add(self.band_height)
    }
}

impl SubtitleRenderer for BandRenderer {
    fn render(
        &mut self,
        target: &mut PooledBuffer,
        _time_ms: i64,
        lines: &[SubtitleLine],
    ) -> Result<(), SubtitleError> {
        self.renders.fetch_add(1, Ordering::Relaxed);
        let height = target.height();
        let stride = target.stride();
        for (i, line) in lines.iter().enumerate() {
            if let Some(marker) = &self.fail_marker
                && line.text.contains(marker.as_str())
            {
                return Err(SubtitleError::Render(format!(
                    "cannot render line {i}: {:?}",
                    line.text
                )));
            }
            let rows = self.band_rows(i);
            let end = rows.end.min(height) as usize;
            let start = (rows.start as usize).min(end);
            let data = target.data_mut();
            for px in data[start * stride..end * stride].chunks_exact_mut(4) {
                px.copy_from_slice(&BAND_COLOR);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/synthetic.rs"]
mod tests;
