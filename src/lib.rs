//! Work-dispatch queues and a versioned, latest-wins video frame pipeline.
//!
//! The crate has two layers:
//!
//! - **dispatch**: a process-wide [`DispatchContext`] with a main queue (runs on the owner thread
//!   through a [`Trampoline`]), a shared background pool, and private [`SerialQueue`]s. Async
//!   work failures are captured and surfaced on the main queue.
//! - **pipeline**: a [`FramePipeline`] decodes video frames and renders subtitles on its own
//!   serial queue. Every request is stamped with a [`Version`]; results are delivered to a
//!   [`FrameEventSink`] on the main queue, and stale ones are discarded by the sink.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use frame_dispatch::{
//!     BandRenderer, DispatchContext, FramePipeline, InMemoryEventSink, MainPump, PipelineOpts,
//!     SyntheticProvider,
//! };
//!
//! let pump = MainPump::new();
//! let ctx = DispatchContext::new(pump.trampoline())?;
//! let sink = Arc::new(InMemoryEventSink::new());
//! let pipeline = FramePipeline::open(
//!     &ctx,
//!     &SyntheticProvider::default(),
//!     Path::new("clip.mkv"),
//!     "TV.601",
//!     Box::new(BandRenderer::new()),
//!     sink.clone(),
//!     PipelineOpts::default(),
//! )?;
//! let v = pipeline.request_frame(12, 480);
//! pump.run_until(Duration::from_secs(1), || sink.latest_version() == Some(v));
//! # Ok::<(), frame_dispatch::FrameError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

mod config;
pub(crate) mod dispatch;
pub(crate) mod pipeline;
pub mod synthetic;

pub use crate::config::RuntimeConfig;
pub use crate::foundation::core::{Fps, SourceInfo};
pub use crate::foundation::error::{
    DispatchError, DispatchResult, FrameError, FrameResult, SourceError, SubtitleError,
};

pub use crate::dispatch::context::{DispatchContext, DispatchContextBuilder, DispatchOpts};
pub use crate::dispatch::failure::{PanicPayload, WorkFailure};
pub use crate::dispatch::pump::MainPump;
pub use crate::dispatch::queue::{FailureHandler, Queue, Thunk, Trampoline, inline_trampoline};
pub use crate::dispatch::registry::{
    background_queue, create_serial_queue, global, initialize_dispatch, install_dispatch,
    main_queue, try_global,
};
pub use crate::dispatch::serial::SerialQueue;

pub use crate::pipeline::buffer_pool::{BufferPoolOpts, BufferPoolStats, PooledBuffer};
pub use crate::pipeline::controller::{AspectRatio, ControllerOpts, VideoController};
pub use crate::pipeline::events::{ErrorEvent, FrameReady, PipelineEvent};
pub use crate::pipeline::frame::{RenderedFrame, VideoFrame};
pub use crate::pipeline::frame_pipeline::{FramePipeline, PipelineOpts, PipelineStats};
pub use crate::pipeline::sink::{FrameEventSink, InMemoryEventSink, LatestFrame};
pub use crate::pipeline::source::{FrameSource, SourceProvider, SubtitleRenderer};
pub use crate::pipeline::subtitles::{SubtitleLine, SubtitleSnapshot};
pub use crate::pipeline::version::{Version, VersionGate};
pub use crate::synthetic::{
    BAND_COLOR, BandRenderer, DecodeRecord, SyntheticProvider, SyntheticSource, SyntheticVideo,
};
