use crate::pipeline::frame_pipeline::FramePipeline;
use crate::pipeline::subtitles::{SubtitleLine, SubtitleSnapshot};
use crate::pipeline::version::Version;

/// Options for [`VideoController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ControllerOpts {
    /// Seek to a line's start time when it becomes the active line.
    pub subtitle_sync: bool,
}

impl Default for ControllerOpts {
    fn default() -> Self {
        Self {
            subtitle_sync: true,
        }
    }
}

/// Display aspect ratio mode.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    /// Use the video's own width / height.
    Default,
    /// 4:3.
    Fullscreen,
    /// 16:9.
    Widescreen,
    /// 2.35:1.
    Cinematic,
    /// Explicit ratio.
    Custom(f64),
}

const MIN_ASPECT: f64 = 0.5;
const MAX_ASPECT: f64 = 5.0;

/// Editor-side owner of the current [`FramePipeline`].
///
/// Tracks the current frame and color matrix and turns seeks, script commits and active-line
/// changes into pipeline requests. Every method is a no-op without an open pipeline.
#[derive(Debug)]
pub struct VideoController {
    pipeline: Option<FramePipeline>,
    frame: u64,
    color_matrix: String,
    aspect: AspectRatio,
    aspect_value: f64,
    opts: ControllerOpts,
}

impl Default for VideoController {
    fn default() -> Self {
        Self::new(ControllerOpts::default())
    }
}

impl VideoController {
    /// Controller without a pipeline.
    pub fn new(opts: ControllerOpts) -> Self {
        Self {
            pipeline: None,
            frame: 0,
            color_matrix: String::new(),
            aspect: AspectRatio::Default,
            aspect_value: 1.0,
            opts,
        }
    }

    /// Replace the current pipeline, returning the previous one.
    ///
    /// Resets the tracked color matrix to the new pipeline's.
    pub fn set_pipeline(&mut self, pipeline: Option<FramePipeline>) -> Option<FramePipeline> {
        self.color_matrix = pipeline
            .as_ref()
            .map(|p| p.color_space().to_string())
            .unwrap_or_default();
        self.frame = 0;
        tracing::debug!(
            open = pipeline.is_some(),
            color_matrix = %self.color_matrix,
            "video pipeline replaced"
        );
        std::mem::replace(&mut self.pipeline, pipeline)
    }

    /// The current pipeline.
    pub fn pipeline(&self) -> Option<&FramePipeline> {
        self.pipeline.as_ref()
    }

    /// Frame most recently jumped to.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Color matrix last forwarded to (or reported by) the pipeline.
    pub fn color_matrix(&self) -> &str {
        &self.color_matrix
    }

    /// Seek to frame `n`, clamped into the video. Returns the request's version.
    pub fn jump_to_frame(&mut self, n: i64) -> Option<Version> {
        let pipeline = self.pipeline.as_ref()?;
        let last = pipeline.frame_count().saturating_sub(1);
        let frame = u64::try_from(n).unwrap_or(0).min(last);
        self.frame = frame;
        Some(pipeline.request_frame(frame, pipeline.fps().time_at_frame_ms(frame)))
    }

    /// Seek to the frame shown at `ms`.
    pub fn jump_to_time(&mut self, ms: i64) -> Option<Version> {
        let frame = self.pipeline.as_ref()?.fps().frame_at_time_ms(ms);
        self.jump_to_frame(i64::try_from(frame).unwrap_or(i64::MAX))
    }

    /// Seek to the first frame starting at or after `ms`.
    pub fn jump_to_start_time(&mut self, ms: i64) -> Option<Version> {
        let frame = self.pipeline.as_ref()?.fps().first_frame_from_ms(ms);
        self.jump_to_frame(i64::try_from(frame).unwrap_or(i64::MAX))
    }

    /// Start time of `frame`, if a video is open.
    pub fn time_at_frame(&self, frame: u64) -> Option<i64> {
        Some(self.pipeline.as_ref()?.fps().time_at_frame_ms(frame))
    }

    /// Frame shown at `ms`, if a video is open.
    pub fn frame_at_time(&self, ms: i64) -> Option<u64> {
        Some(self.pipeline.as_ref()?.fps().frame_at_time_ms(ms))
    }

    /// Script-info commit: forward the script's YCbCr matrix if it is set and differs from the
    /// current one.
    pub fn on_script_info_commit(&mut self, matrix: &str) -> Option<Version> {
        let pipeline = self.pipeline.as_mut()?;
        if matrix.is_empty() || matrix == self.color_matrix {
            return None;
        }
        self.color_matrix = matrix.to_string();
        Some(pipeline.set_color_space(matrix))
    }

    /// Dialogue commit: hand the new script to the pipeline.
    pub fn on_subtitles_commit(&mut self, snapshot: SubtitleSnapshot) -> Option<Version> {
        Some(self.pipeline.as_ref()?.update_subtitles(snapshot))
    }

    /// Active-line change: seek to the first frame showing it when subtitle sync is on.
    pub fn on_active_line_changed(&mut self, line: Option<&SubtitleLine>) -> Option<Version> {
        let line = line?;
        if !self.opts.subtitle_sync {
            return None;
        }
        self.jump_to_start_time(line.start_ms)
    }

    /// Current aspect ratio mode.
    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect
    }

    /// Current aspect ratio value.
    pub fn aspect_ratio_value(&self) -> f64 {
        self.aspect_value
    }

    /// Set the aspect ratio mode. The value is clamped to `[0.5, 5.0]`; returns it.
    ///
    /// [`AspectRatio::Default`] needs an open video with a non-zero height and is ignored
    /// otherwise.
    pub fn set_aspect_ratio(&mut self, aspect: AspectRatio) -> f64 {
        let value = match aspect {
            AspectRatio::Default => match &self.pipeline {
                Some(p) if p.height() > 0 => f64::from(p.width()) / f64::from(p.height()),
                _ => return self.aspect_value,
            },
            AspectRatio::Fullscreen => 4.0 / 3.0,
            AspectRatio::Widescreen => 16.0 / 9.0,
            AspectRatio::Cinematic => 2.35,
            AspectRatio::Custom(v) => v,
        };
        if !value.is_finite() {
            return self.aspect_value;
        }
        self.aspect = aspect;
        self.aspect_value = value.clamp(MIN_ASPECT, MAX_ASPECT);
        self.aspect_value
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/controller.rs"]
mod tests;
