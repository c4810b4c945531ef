//! Versioned, latest-wins frame pipeline.
//!
//! A [`crate::FramePipeline`] owns one decoder and one subtitle renderer and serializes all
//! work on them through a private serial queue. Submitting threads only bump an atomic version;
//! results come back to a [`crate::FrameEventSink`] on the main queue tagged with that version,
//! and the sink keeps the newest.

pub(crate) mod buffer_pool;
pub(crate) mod controller;
pub(crate) mod events;
pub(crate) mod frame;
pub(crate) mod frame_pipeline;
pub(crate) mod sink;
pub(crate) mod source;
pub(crate) mod subtitles;
pub(crate) mod version;
