use crate::foundation::error::{FrameError, FrameResult};

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated frame rate.
    pub fn new(num: u32, den: u32) -> FrameResult<Self> {
        if den == 0 {
            return Err(FrameError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(FrameError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Whether both terms are non-zero. Deserialized values skip [`Fps::new`].
    pub fn is_valid(self) -> bool {
        self.num != 0 && self.den != 0
    }

    /// Start time of `frame` in whole milliseconds (floored). `0` for an invalid rate.
    pub fn time_at_frame_ms(self, frame: u64) -> i64 {
        let ms = (u128::from(frame) * 1000 * u128::from(self.den))
            .checked_div(u128::from(self.num))
            .unwrap_or(0);
        i64::try_from(ms).unwrap_or(i64::MAX)
    }

    /// Frame displayed at `ms`. Negative times and invalid rates map to frame 0.
    pub fn frame_at_time_ms(self, ms: i64) -> u64 {
        if ms <= 0 {
            return 0;
        }
        let frames = ((ms as u128) * u128::from(self.num))
            .checked_div(1000 * u128::from(self.den))
            .unwrap_or(0);
        u64::try_from(frames).unwrap_or(u64::MAX)
    }

    /// First frame whose start time is at or after `ms`.
    ///
    /// Seeking here for something that begins at `ms` lands on a frame where it is already shown.
    pub fn first_frame_from_ms(self, ms: i64) -> u64 {
        if ms <= 0 || !self.is_valid() {
            return 0;
        }
        let frames = ((ms as u128) * u128::from(self.num)).div_ceil(1000 * u128::from(self.den));
        u64::try_from(frames).unwrap_or(u64::MAX)
    }
}

/// Metadata snapshot of an opened frame source.
///
/// Captured once when a pipeline opens its source so the submitting thread can answer metadata
/// queries without touching the decoder, which is owned by the pipeline's worker.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceInfo {
    /// Number of frames in the stream.
    pub frame_count: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Display aspect ratio; `0.0` when the container does not specify one.
    pub dar: f64,
    /// Nominal frame rate.
    pub fps: Fps,
    /// Keyframe frame numbers in increasing order.
    pub keyframes: Vec<u64>,
    /// YCbCr matrix the source is converting with when opened.
    pub color_space: String,
    /// YCbCr matrix the stream is actually tagged with.
    pub real_color_space: String,
    /// Non-fatal warning raised while opening, if any.
    pub warning: Option<String>,
    /// Human-readable decoder name.
    pub decoder_name: String,
    /// Whether the container also carries audio.
    pub has_audio: bool,
    /// Whether the subtitle script's video properties should be updated from this source.
    pub should_set_video_properties: bool,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
