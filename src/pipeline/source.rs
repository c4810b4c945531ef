use std::path::Path;

use crate::foundation::core::SourceInfo;
use crate::foundation::error::{SourceError, SubtitleError};
use crate::pipeline::buffer_pool::PooledBuffer;
use crate::pipeline::frame::VideoFrame;
use crate::pipeline::subtitles::SubtitleLine;

/// Opens frame sources. Implemented by the decoder layer.
pub trait SourceProvider {
    /// Open `path`, converting YCbCr with `color_matrix_hint` when the stream does not say.
    ///
    /// Runs synchronously on the caller; failures here are resource errors, not pipeline events.
    fn open(&self, path: &Path, color_matrix_hint: &str)
    -> Result<Box<dyn FrameSource>, SourceError>;
}

/// An opened video stream.
///
/// Owned by a pipeline and only ever called from that pipeline's serial worker.
pub trait FrameSource: Send {
    /// Stream metadata. Read once at open.
    fn info(&self) -> SourceInfo;

    /// YCbCr matrix currently used for conversion.
    fn color_space(&self) -> String;

    /// Switch the YCbCr matrix used for subsequently decoded frames.
    fn set_color_space(&mut self, matrix: &str);

    /// Decode frame `frame`.
    fn decode(&mut self, frame: u64) -> Result<VideoFrame, SourceError>;
}

/// Draws subtitle lines onto frames.
///
/// Owned by a pipeline and only ever called from that pipeline's serial worker.
pub trait SubtitleRenderer: Send {
    /// Draw `lines` (already filtered to those visible at `time_ms`) onto `target`.
    fn render(
        &mut self,
        target: &mut PooledBuffer,
        time_ms: i64,
        lines: &[SubtitleLine],
    ) -> Result<(), SubtitleError>;
}
