use super::*;
use crate::dispatch::failure::WorkFailure;
use crate::dispatch::pump::MainPump;
use crate::foundation::error::FrameError;
use crate::pipeline::sink::InMemoryEventSink;
use crate::synthetic::{BAND_COLOR, BandRenderer, SyntheticProvider, SyntheticVideo};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

struct Rig {
    pump: MainPump,
    ctx: DispatchContext,
    provider: SyntheticProvider,
    sink: Arc<InMemoryEventSink>,
}

impl Rig {
    fn new(video: SyntheticVideo) -> Self {
        let pump = MainPump::new();
        let ctx = DispatchContext::builder(pump.trampoline()).build().unwrap();
        Self {
            pump,
            ctx,
            provider: SyntheticProvider::new(video),
            sink: Arc::new(InMemoryEventSink::new()),
        }
    }

    fn open(&self, renderer: BandRenderer) -> FrameResult<FramePipeline> {
        FramePipeline::open(
            &self.ctx,
            &self.provider,
            Path::new("clip.mkv"),
            "TV.601",
            Box::new(renderer),
            Arc::clone(&self.sink) as Arc<dyn FrameEventSink>,
            PipelineOpts::default(),
        )
    }

    fn wait_for(&self, events: usize) {
        assert!(
            self.pump.run_until(WAIT, || self.sink.len() >= events),
            "expected {events} events, got {}",
            self.sink.len()
        );
    }
}

#[test]
fn open_failure_is_returned_synchronously() {
    let rig = Rig::new(SyntheticVideo::default());
    let provider = rig.provider.clone().with_missing("clip.mkv");
    let err = FramePipeline::open(
        &rig.ctx,
        &provider,
        Path::new("clip.mkv"),
        "",
        Box::new(BandRenderer::new()),
        Arc::clone(&rig.sink) as Arc<dyn FrameEventSink>,
        PipelineOpts::default(),
    )
    .unwrap_err();
    assert!(matches!(err, FrameError::Source(SourceError::NotFound(_))));
    assert!(rig.sink.is_empty());
}

#[test]
fn metadata_is_answered_without_the_worker() {
    let rig = Rig::new(SyntheticVideo {
        frame_count: 42,
        width: 8,
        height: 4,
        ..SyntheticVideo::default()
    });
    let p = rig.open(BandRenderer::new()).unwrap();
    assert_eq!(p.frame_count(), 42);
    assert_eq!((p.width(), p.height()), (8, 4));
    assert_eq!(p.dar(), 2.0);
    assert_eq!(p.fps(), Fps { num: 25, den: 1 });
    assert_eq!(p.keyframes()[..2], [0, 10]);
    assert_eq!(p.color_space(), "TV.601");
    assert_eq!(p.real_color_space(), "TV.601");
    assert_eq!(p.decoder_name(), "synthetic");
    assert_eq!(p.warning(), None);
    assert!(!p.has_audio());
    assert!(p.should_set_video_properties());
    assert_eq!(p.current_version(), Version(0));
    assert_eq!(p.path(), Path::new("clip.mkv"));
}

#[test]
fn request_delivers_on_the_main_queue_with_its_version() {
    let rig = Rig::new(SyntheticVideo::default());
    let p = rig.open(BandRenderer::new()).unwrap();
    let v = p.request_frame(7, 280);
    assert_eq!(v, Version(1));
    rig.wait_for(1);

    let shown = rig.sink.latest().unwrap();
    assert_eq!(shown.version, v);
    assert_eq!(shown.frame_number(), 7);
    assert_eq!(shown.time_ms(), 280);
    assert_eq!(
        shown.frame.pixel(0, 0).unwrap(),
        SyntheticProvider::pixel_for(7, "TV.601")
    );
}

#[test]
fn identical_request_reuses_the_rendered_frame() {
    let rig = Rig::new(SyntheticVideo::default());
    let p = rig.open(BandRenderer::new()).unwrap();
    p.request_frame(3, 120);
    p.request_frame(3, 120);
    rig.wait_for(2);

    let stats = p.stats().unwrap();
    assert_eq!(stats.decoded, 1);
    assert_eq!(stats.render_reused, 1);
    let frames = rig.sink.frames();
    assert!(Arc::ptr_eq(&frames[0].frame, &frames[1].frame));
    assert_eq!(rig.sink.latest_version(), Some(Version(2)));
}

#[test]
fn subtitle_update_rerenders_the_last_frame_without_decoding() {
    let rig = Rig::new(SyntheticVideo::default());
    let renderer = BandRenderer::new();
    let p = rig.open(renderer.clone()).unwrap();
    p.request_frame(5, 200);
    rig.wait_for(1);

    let v = p.update_subtitles(SubtitleSnapshot::new(vec![SubtitleLine::new(0, 1000, "hi")]));
    rig.wait_for(2);

    let shown = rig.sink.latest().unwrap();
    assert_eq!(shown.version, v);
    assert_eq!(shown.frame_number(), 5);
    assert!(shown.frame.has_subtitles);
    assert_eq!(shown.frame.pixel(0, 0).unwrap(), BAND_COLOR);
    let stats = p.stats().unwrap();
    assert_eq!((stats.decoded, stats.decode_reused), (1, 1));
    assert_eq!(renderer.renders(), 1);
}

#[test]
fn subtitle_update_before_any_request_delivers_nothing() {
    let rig = Rig::new(SyntheticVideo::default());
    let p = rig.open(BandRenderer::new()).unwrap();
    p.update_subtitles(SubtitleSnapshot::default());
    p.stats().unwrap();
    assert_eq!(rig.pump.run_pending(), 0);
    assert!(rig.sink.is_empty());
}

#[test]
fn render_failure_reports_then_delivers_the_bare_frame() {
    let rig = Rig::new(SyntheticVideo::default());
    let p = rig.open(BandRenderer::new().failing_on("{crash}")).unwrap();
    p.update_subtitles(SubtitleSnapshot::new(vec![SubtitleLine::new(
        0,
        1000,
        "{crash}",
    )]));
    let v = p.request_frame(2, 80);
    rig.wait_for(2);

    let events = rig.sink.events();
    assert!(matches!(&events[0], PipelineEvent::RenderError(e) if e.version == v));
    let PipelineEvent::FrameReady(ready) = &events[1] else {
        panic!("expected a frame, got {:?}", events[1]);
    };
    assert!(!ready.frame.has_subtitles);
    assert_eq!(
        ready.frame.pixel(0, 0).unwrap(),
        SyntheticProvider::pixel_for(2, "TV.601")
    );
    assert_eq!(p.stats().unwrap().render_errors, 1);
}

#[test]
fn sync_fetch_returns_errors_and_leaves_version_alone() {
    let rig = Rig::new(SyntheticVideo {
        bad_frames: [9].into_iter().collect(),
        ..SyntheticVideo::default()
    });
    let p = rig.open(BandRenderer::new()).unwrap();
    let frame = p.get_frame_sync(4, 160, false).unwrap();
    assert_eq!(frame.frame_number, 4);

    let err = p.get_frame_sync(9, 360, false).unwrap_err();
    assert!(matches!(err, FrameError::Source(SourceError::Decode { frame: 9, .. })));
    let err = p.get_frame_sync(1000, 0, false).unwrap_err();
    assert!(matches!(err, FrameError::Source(SourceError::OutOfRange { .. })));

    assert_eq!(p.current_version(), Version(0));
    assert_eq!(rig.pump.run_pending(), 0);
}

#[test]
fn released_frames_go_back_to_the_pool() {
    let rig = Rig::new(SyntheticVideo::default());
    let p = rig.open(BandRenderer::new()).unwrap();
    // The pipeline keeps the last rendered frame, so the first buffer comes back on the third fetch.
    for n in 1..=3 {
        drop(p.get_frame_sync(n, 0, false).unwrap());
    }
    let stats = p.stats().unwrap();
    assert_eq!(stats.decoded, 3);
    assert!(stats.pool.reused >= 1);
}

#[test]
fn drop_waits_for_queued_work() {
    let rig = Rig::new(SyntheticVideo {
        decode_delay: Duration::from_millis(20),
        ..SyntheticVideo::default()
    });
    let p = rig.open(BandRenderer::new()).unwrap();
    for n in 0..3 {
        p.request_frame(n, 0);
    }
    drop(p);
    assert_eq!(rig.provider.decodes().len(), 3);
    assert_eq!(rig.pump.run_pending(), 3);
}

#[test]
fn zero_frame_rate_is_rejected_at_open() {
    let rig = Rig::new(SyntheticVideo {
        fps: Fps { num: 0, den: 1 },
        ..SyntheticVideo::default()
    });
    let err = rig.open(BandRenderer::new()).unwrap_err();
    assert!(matches!(
        err,
        FrameError::Source(SourceError::Open { ref reason, .. }) if reason.contains("0/1")
    ));
}

#[test]
fn decoder_panic_goes_to_the_failure_handler_and_later_requests_still_arrive() {
    let pump = MainPump::new();
    let failures: Arc<Mutex<Vec<WorkFailure>>> = Arc::default();
    let seen = Arc::clone(&failures);
    let ctx = DispatchContext::builder(pump.trampoline())
        .on_failure(move |f| seen.lock().unwrap().push(f))
        .build()
        .unwrap();
    let provider = SyntheticProvider::new(SyntheticVideo {
        panic_frames: [6].into_iter().collect(),
        ..SyntheticVideo::default()
    });
    let sink = Arc::new(InMemoryEventSink::new());
    let p = FramePipeline::open(
        &ctx,
        &provider,
        Path::new("clip.mkv"),
        "TV.601",
        Box::new(BandRenderer::new()),
        Arc::clone(&sink) as Arc<dyn FrameEventSink>,
        PipelineOpts::default(),
    )
    .unwrap();

    p.request_frame(6, 240);
    let next = p.request_frame(7, 280);
    assert!(pump.run_until(WAIT, || {
        sink.latest_version() == Some(next) && !failures.lock().unwrap().is_empty()
    }));

    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].is_panic());
    assert!(failures[0].panic_message().unwrap().contains("frame 6"));

    assert_eq!(sink.len(), 1);
    assert_eq!(sink.latest().unwrap().frame_number(), 7);
    assert_eq!(p.get_frame_sync(8, 320, false).unwrap().frame_number, 8);
}
