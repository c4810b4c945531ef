use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::dispatch::context::DispatchContext;
use crate::dispatch::queue::Queue;
use crate::dispatch::serial::SerialQueue;
use crate::foundation::core::{Fps, SourceInfo};
use crate::foundation::error::{FrameResult, SourceError, SubtitleError};
use crate::pipeline::buffer_pool::{
    BufferPool, BufferPoolOpts, BufferPoolStats, PooledBuffer, SharedPool, lock_pool,
};
use crate::pipeline::events::{ErrorEvent, FrameReady, PipelineEvent};
use crate::pipeline::frame::{RenderedFrame, VideoFrame};
use crate::pipeline::sink::FrameEventSink;
use crate::pipeline::source::{FrameSource, SourceProvider, SubtitleRenderer};
use crate::pipeline::subtitles::{SubtitleLine, SubtitleSnapshot};
use crate::pipeline::version::{Version, VersionCounter};

/// Options controlling a [`FramePipeline`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineOpts {
    /// Frame buffer pool limits.
    pub pool: BufferPoolOpts,
    /// Keep the last decoded frame and skip decoding when the same frame is requested again
    /// (e.g. after a subtitle edit).
    pub reuse_decoded_frame: bool,
    /// Re-deliver the last rendered frame when frame, time and visible lines are unchanged.
    pub reuse_rendered_frame: bool,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            pool: BufferPoolOpts::default(),
            reuse_decoded_frame: true,
            reuse_rendered_frame: true,
        }
    }
}

/// Worker-side counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frame computations run (requests, subtitle refreshes and synchronous fetches).
    pub computed: u64,
    /// Computations whose version had already been superseded when they finished.
    pub superseded: u64,
    /// Frames decoded by the source.
    pub decoded: u64,
    /// Computations that reused the last decoded frame.
    pub decode_reused: u64,
    /// Subtitle render passes.
    pub rendered: u64,
    /// Computations that re-delivered the last rendered frame.
    pub render_reused: u64,
    /// Decode failures.
    pub decode_errors: u64,
    /// Subtitle render failures.
    pub render_errors: u64,
    /// Buffer pool counters.
    pub pool: BufferPoolStats,
}

struct LastRender {
    frame_number: u64,
    time_ms: i64,
    lines: Vec<SubtitleLine>,
    frame: Arc<RenderedFrame>,
}

/// Pipeline state owned by the serial worker. Never locked from any other thread.
struct WorkerState {
    source: Box<dyn FrameSource>,
    renderer: Box<dyn SubtitleRenderer>,
    subtitles: SubtitleSnapshot,
    frame_count: u64,

    // Last requested position, re-rendered on subtitle changes.
    frame_number: Option<u64>,
    time_ms: i64,

    decoded: Option<(u64, VideoFrame)>,
    last_render: Option<LastRender>,

    pool: SharedPool,
    opts: PipelineOpts,
    stats: PipelineStats,
}

type Produced = (Arc<RenderedFrame>, Option<SubtitleError>);

impl WorkerState {
    fn invalidate(&mut self) {
        self.decoded = None;
        self.last_render = None;
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn produce(
        &mut self,
        frame_number: u64,
        time_ms: i64,
        with_subtitles: bool,
    ) -> Result<Produced, SourceError> {
        self.stats.computed += 1;
        let lines = if with_subtitles {
            self.subtitles.visible_at(time_ms)
        } else {
            Vec::new()
        };

        if self.opts.reuse_rendered_frame
            && let Some(last) = &self.last_render
            && last.frame_number == frame_number
            && last.time_ms == time_ms
            && last.lines == lines
            && last.frame.has_subtitles == !lines.is_empty()
        {
            self.stats.render_reused += 1;
            return Ok((Arc::clone(&last.frame), None));
        }

        if frame_number >= self.frame_count {
            return Err(SourceError::OutOfRange {
                frame: frame_number,
                count: self.frame_count,
            });
        }

        let reuse = self.opts.reuse_decoded_frame
            && matches!(&self.decoded, Some((n, _)) if *n == frame_number);
        if reuse {
            self.stats.decode_reused += 1;
        } else {
            self.decoded = None;
            let frame = self.source.decode(frame_number)?;
            if !frame.is_well_formed() {
                return Err(SourceError::decode(
                    frame_number,
                    "decoder returned a buffer smaller than its geometry",
                ));
            }
            self.stats.decoded += 1;
            self.decoded = Some((frame_number, frame));
        }
        let Some((_, decoded)) = &self.decoded else {
            return Err(SourceError::decode(frame_number, "decoded frame missing"));
        };

        let mut pixels = PooledBuffer::take(&self.pool, decoded.width, decoded.height);
        decoded.copy_into(&mut pixels);

        let mut render_err = None;
        if !lines.is_empty() {
            self.stats.rendered += 1;
            if let Err(err) = self.renderer.render(&mut pixels, time_ms, &lines) {
                self.stats.render_errors += 1;
                // Drop whatever the renderer managed to draw.
                decoded.copy_into(&mut pixels);
                render_err = Some(err);
            }
        }

        let frame = Arc::new(RenderedFrame {
            frame_number,
            time_ms,
            color_space: self.source.color_space(),
            has_subtitles: !lines.is_empty() && render_err.is_none(),
            pixels,
        });
        if render_err.is_none() {
            self.last_render = Some(LastRender {
                frame_number,
                time_ms,
                lines,
                frame: Arc::clone(&frame),
            });
        }
        Ok((frame, render_err))
    }

    /// Compute one request and translate the outcome into sink events.
    fn process(&mut self, frame_number: u64, time_ms: i64, version: Version) -> Vec<PipelineEvent> {
        match self.produce(frame_number, time_ms, true) {
            Ok((frame, None)) => vec![PipelineEvent::FrameReady(FrameReady { frame, version })],
            Ok((frame, Some(err))) => vec![
                PipelineEvent::RenderError(ErrorEvent::from_subtitle_error(
                    &err,
                    frame_number,
                    version,
                )),
                PipelineEvent::FrameReady(FrameReady { frame, version }),
            ],
            Err(err) => {
                self.stats.decode_errors += 1;
                vec![PipelineEvent::DecodeError(ErrorEvent::from_source_error(
                    &err,
                    frame_number,
                    version,
                ))]
            }
        }
    }
}

fn lock_state(state: &Mutex<WorkerState>) -> MutexGuard<'_, WorkerState> {
    // A panicking collaborator poisons the lock; the panic itself is already on its way to the
    // main queue and the state is still usable for the next request.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Asynchronous decode + subtitle render pipeline for one open video.
///
/// Every request bumps the pipeline's version on the calling thread and is computed on the
/// pipeline's private serial queue, in submission order. Each request produces exactly one
/// delivery on the main queue (a frame, or a decode error), tagged with the version it was
/// submitted under. Nothing is cancelled: when requests arrive faster than frames can be
/// produced, superseded results are still delivered and the sink discards them by version
/// (see [`crate::LatestFrame`]).
///
/// Dropping the pipeline bumps the version, waits for all queued work to finish and only then
/// releases the source.
pub struct FramePipeline {
    // Declared first so the worker thread is joined before the source is released.
    worker: SerialQueue,
    state: Arc<Mutex<WorkerState>>,
    version: Arc<VersionCounter>,
    main: Queue,
    sink: Arc<dyn FrameEventSink>,

    path: PathBuf,
    info: SourceInfo,
    color_space: String,
}

impl std::fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("path", &self.path)
            .field("version", &self.version.current())
            .field("color_space", &self.color_space)
            .finish()
    }
}

impl FramePipeline {
    /// Open `path` through `provider` and start the pipeline's worker.
    ///
    /// Opening runs synchronously; a missing or undecodable file is returned as an error here,
    /// never as a pipeline event.
    #[tracing::instrument(skip(ctx, provider, path, renderer, sink, opts), fields(path = %path.display()))]
    pub fn open(
        ctx: &DispatchContext,
        provider: &dyn SourceProvider,
        path: &Path,
        color_matrix_hint: &str,
        renderer: Box<dyn SubtitleRenderer>,
        sink: Arc<dyn FrameEventSink>,
        opts: PipelineOpts,
    ) -> FrameResult<Self> {
        let source = provider.open(path, color_matrix_hint)?;
        let info = source.info();
        if !info.fps.is_valid() {
            return Err(SourceError::Open {
                path: path.to_path_buf(),
                reason: format!("invalid frame rate {}/{}", info.fps.num, info.fps.den),
            }
            .into());
        }
        let worker = ctx.create_serial_queue()?;
        tracing::debug!(
            frames = info.frame_count,
            width = info.width,
            height = info.height,
            decoder = %info.decoder_name,
            queue = worker.name(),
            "frame pipeline opened"
        );

        let state = WorkerState {
            source,
            renderer,
            subtitles: SubtitleSnapshot::default(),
            frame_count: info.frame_count,
            frame_number: None,
            time_ms: 0,
            decoded: None,
            last_render: None,
            pool: BufferPool::shared(opts.pool),
            opts,
            stats: PipelineStats::default(),
        };

        Ok(Self {
            worker,
            state: Arc::new(Mutex::new(state)),
            version: Arc::new(VersionCounter::default()),
            main: ctx.main_queue().clone(),
            sink,
            path: path.to_path_buf(),
            color_space: info.color_space.clone(),
            info,
        })
    }

    /// Ask for frame `frame_number`, rendering subtitles visible at `time_ms`.
    ///
    /// Returns the version the delivery will carry.
    pub fn request_frame(&self, frame_number: u64, time_ms: i64) -> Version {
        let version = self.version.bump();
        tracing::trace!(frame = frame_number, time_ms, %version, "frame requested");

        let state = Arc::clone(&self.state);
        let counter = Arc::clone(&self.version);
        let main = self.main.clone();
        let sink = Arc::clone(&self.sink);
        self.worker.submit_async(move || {
            let events = {
                let mut st = lock_state(&state);
                st.frame_number = Some(frame_number);
                st.time_ms = time_ms;
                let events = st.process(frame_number, time_ms, version);
                note_superseded(&mut st, &counter, version);
                events
            };
            deliver(&main, sink, events);
        });
        version
    }

    /// Replace the subtitle script.
    ///
    /// Invalidates in-flight work and, if a frame has been requested before, re-renders the last
    /// requested frame with the new lines and delivers it under the new version.
    pub fn update_subtitles(&self, snapshot: SubtitleSnapshot) -> Version {
        let version = self.version.bump();
        tracing::debug!(lines = snapshot.lines().len(), %version, "subtitles updated");

        let state = Arc::clone(&self.state);
        let counter = Arc::clone(&self.version);
        let main = self.main.clone();
        let sink = Arc::clone(&self.sink);
        self.worker.submit_async(move || {
            let events = {
                let mut st = lock_state(&state);
                st.subtitles = snapshot;
                let Some(frame_number) = st.frame_number else {
                    return;
                };
                let time_ms = st.time_ms;
                let events = st.process(frame_number, time_ms, version);
                note_superseded(&mut st, &counter, version);
                events
            };
            deliver(&main, sink, events);
        });
        version
    }

    /// Switch the source's YCbCr matrix.
    ///
    /// Runs as ordinary work on the serial queue: requests submitted after this call from the
    /// same thread see the new matrix, requests queued before it do not.
    pub fn set_color_space(&mut self, matrix: &str) -> Version {
        let version = self.version.bump();
        tracing::debug!(matrix, %version, "color space change requested");
        self.color_space = matrix.to_string();

        let state = Arc::clone(&self.state);
        let matrix = matrix.to_string();
        self.worker.submit_async(move || {
            let mut st = lock_state(&state);
            st.source.set_color_space(&matrix);
            st.invalidate();
        });
        version
    }

    /// Fetch a frame synchronously, bypassing the sink.
    ///
    /// Waits for all previously queued work. Decode and render failures are returned as errors.
    /// Does not change the version or the last requested position.
    pub fn get_frame_sync(
        &self,
        frame_number: u64,
        time_ms: i64,
        with_subtitles: bool,
    ) -> FrameResult<Arc<RenderedFrame>> {
        let state = Arc::clone(&self.state);
        let (frame, render_err) = self.worker.submit_sync(move || {
            lock_state(&state).produce(frame_number, time_ms, with_subtitles)
        })??;
        match render_err {
            Some(err) => Err(err.into()),
            None => Ok(frame),
        }
    }

    /// Worker counters, read on the worker after all queued work.
    pub fn stats(&self) -> FrameResult<PipelineStats> {
        let state = Arc::clone(&self.state);
        let stats = self.worker.submit_sync(move || {
            let st = lock_state(&state);
            let mut stats = st.stats;
            stats.pool = lock_pool(&st.pool).stats();
            stats
        })?;
        Ok(stats)
    }

    /// Close the pipeline. Same as dropping it.
    pub fn close(self) {}

    /// Version of the most recent invalidation.
    pub fn current_version(&self) -> Version {
        self.version.current()
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source metadata captured at open.
    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Number of frames in the source.
    pub fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Display aspect ratio reported by the source.
    pub fn dar(&self) -> f64 {
        self.info.dar
    }

    /// Nominal frame rate.
    pub fn fps(&self) -> Fps {
        self.info.fps
    }

    /// Keyframe frame numbers.
    pub fn keyframes(&self) -> &[u64] {
        &self.info.keyframes
    }

    /// YCbCr matrix most recently requested through [`FramePipeline::set_color_space`], or the
    /// one the source opened with.
    pub fn color_space(&self) -> &str {
        &self.color_space
    }

    /// YCbCr matrix the stream is tagged with.
    pub fn real_color_space(&self) -> &str {
        &self.info.real_color_space
    }

    /// Warning raised while opening, if any.
    pub fn warning(&self) -> Option<&str> {
        self.info.warning.as_deref()
    }

    /// Decoder name.
    pub fn decoder_name(&self) -> &str {
        &self.info.decoder_name
    }

    /// Whether the file also has audio.
    pub fn has_audio(&self) -> bool {
        self.info.has_audio
    }

    /// Whether script video properties should be updated from this source.
    pub fn should_set_video_properties(&self) -> bool {
        self.info.should_set_video_properties
    }
}

fn note_superseded(st: &mut WorkerState, counter: &VersionCounter, version: Version) {
    let current = counter.current();
    if current != version {
        st.stats.superseded += 1;
        tracing::trace!(%version, %current, "delivering superseded result");
    }
}

fn deliver(main: &Queue, sink: Arc<dyn FrameEventSink>, events: Vec<PipelineEvent>) {
    main.submit_async(move || {
        for event in events {
            sink.on_event(event);
        }
    });
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        let version = self.version.bump();
        // Queued work holds the worker state; wait for it before the source goes away.
        if let Err(failure) = self.worker.submit_sync(|| ()) {
            tracing::warn!(%failure, "frame pipeline drain failed");
        }
        tracing::debug!(path = %self.path.display(), %version, "frame pipeline closed");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/frame_pipeline.rs"]
mod tests;
