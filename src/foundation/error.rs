use std::path::PathBuf;

use crate::dispatch::failure::WorkFailure;

/// Convenience result type used across the pipeline APIs.
pub type FrameResult<T> = Result<T, FrameError>;

/// Result type for queue and context construction.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    /// Invalid caller-provided arguments or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// The frame source could not be opened or failed to decode.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The subtitle renderer failed.
    #[error("subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// A queue could not be created or configured.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Work executed on a queue failed.
    #[error("work error: {0}")]
    Work(#[from] WorkFailure),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrameError {
    /// Build a [`FrameError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Failures reported by a [`crate::FrameSource`] or its provider.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The requested media file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but no decoder could open it.
    #[error("failed to open {}: {reason}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Decoder diagnostic.
        reason: String,
    },

    /// A single frame failed to decode.
    #[error("failed to decode frame {frame}: {reason}")]
    Decode {
        /// Frame number that failed.
        frame: u64,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The frame number is past the end of the stream.
    #[error("frame {frame} out of range (frame count {count})")]
    OutOfRange {
        /// Requested frame number.
        frame: u64,
        /// Number of frames in the source.
        count: u64,
    },
}

impl SourceError {
    /// Build a [`SourceError::Decode`] value.
    pub fn decode(frame: u64, reason: impl Into<String>) -> Self {
        Self::Decode {
            frame,
            reason: reason.into(),
        }
    }
}

/// Failures reported by a [`crate::SubtitleRenderer`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubtitleError {
    /// Rendering subtitles onto a frame failed.
    #[error("render failed: {0}")]
    Render(String),
}

/// Failures while building the dispatch layer itself.
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    /// `initialize_dispatch` or `install_dispatch` was called twice.
    #[error("dispatch is already initialized")]
    AlreadyInitialized,

    /// A dedicated worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// The background pool could not be built.
    #[error("failed to build background pool: {0}")]
    ThreadPool(String),

    /// A dispatch option is out of range.
    #[error("invalid dispatch option: {0}")]
    InvalidOption(String),
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
