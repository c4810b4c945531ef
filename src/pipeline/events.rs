use std::sync::Arc;

use crate::foundation::error::{SourceError, SubtitleError};
use crate::pipeline::frame::RenderedFrame;
use crate::pipeline::version::Version;

const DECODE_SUMMARY: &str =
    "Failed seeking video. The video file may be corrupt or incomplete.";
const RENDER_SUMMARY: &str = "Failed rendering subtitles.";

/// A completed frame request.
#[derive(Clone, Debug)]
pub struct FrameReady {
    /// The rendered frame.
    pub frame: Arc<RenderedFrame>,
    /// Version the frame was computed under.
    pub version: Version,
}

impl FrameReady {
    /// Frame number of the delivered frame.
    pub fn frame_number(&self) -> u64 {
        self.frame.frame_number
    }

    /// Time (ms) used for subtitle rendering.
    pub fn time_ms(&self) -> i64 {
        self.frame.time_ms
    }
}

/// A user-facing description of a transient pipeline failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Human-readable summary for display.
    pub summary: String,
    /// Original diagnostic text.
    pub detail: String,
    /// Frame whose request failed.
    pub frame_number: u64,
    /// Version of the failed request.
    pub version: Version,
}

impl ErrorEvent {
    /// Translate a decode failure. Logs at error level.
    pub fn from_source_error(err: &SourceError, frame_number: u64, version: Version) -> Self {
        let detail = err.to_string();
        tracing::error!(
            frame = frame_number,
            %version,
            "{DECODE_SUMMARY} Error message reported: {detail}"
        );
        Self {
            summary: DECODE_SUMMARY.to_string(),
            detail,
            frame_number,
            version,
        }
    }

    /// Translate a subtitle rendering failure. Logs at error level.
    pub fn from_subtitle_error(err: &SubtitleError, frame_number: u64, version: Version) -> Self {
        let detail = err.to_string();
        tracing::error!(
            frame = frame_number,
            %version,
            "{RENDER_SUMMARY} Error message reported: {detail}"
        );
        Self {
            summary: RENDER_SUMMARY.to_string(),
            detail,
            frame_number,
            version,
        }
    }
}

impl std::fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\nError message reported: {}", self.summary, self.detail)
    }
}

/// Everything a pipeline tells its sink. Always delivered on the main queue.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    /// A requested frame is ready.
    FrameReady(FrameReady),
    /// The source failed to decode a requested frame.
    DecodeError(ErrorEvent),
    /// Subtitles could not be rendered; the frame is still delivered without them.
    RenderError(ErrorEvent),
}

impl PipelineEvent {
    /// Version the event was produced under.
    pub fn version(&self) -> Version {
        match self {
            Self::FrameReady(f) => f.version,
            Self::DecodeError(e) | Self::RenderError(e) => e.version,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/events.rs"]
mod tests;
