use super::*;
use crate::pipeline::buffer_pool::{BufferPool, BufferPoolOpts, PooledBuffer};
use crate::pipeline::frame::RenderedFrame;
use std::sync::Arc;

fn ready(frame_number: u64, version: u64) -> FrameReady {
    let pool = BufferPool::shared(BufferPoolOpts::default());
    FrameReady {
        frame: Arc::new(RenderedFrame {
            frame_number,
            time_ms: frame_number as i64 * 40,
            color_space: "TV.601".to_string(),
            has_subtitles: false,
            pixels: PooledBuffer::take(&pool, 2, 2),
        }),
        version: Version(version),
    }
}

#[test]
fn older_result_arriving_last_does_not_replace_newer() {
    let sink = InMemoryEventSink::new();
    // B (v2) completes before A (v1).
    sink.on_event(PipelineEvent::FrameReady(ready(9, 2)));
    sink.on_event(PipelineEvent::FrameReady(ready(5, 1)));

    assert_eq!(sink.frames().len(), 2);
    let shown = sink.latest().unwrap();
    assert_eq!(shown.frame_number(), 9);
    assert_eq!(shown.version, Version(2));
    assert_eq!(sink.discarded(), 1);
}

#[test]
fn in_order_results_advance_the_display() {
    let mut latest = LatestFrame::new();
    assert!(latest.offer(ready(5, 1)));
    assert!(latest.offer(ready(9, 2)));
    assert_eq!(latest.current().unwrap().frame_number(), 9);
    assert_eq!(latest.discarded(), 0);
}

#[test]
fn errors_are_recorded_separately() {
    let sink = InMemoryEventSink::new();
    let err = crate::SourceError::decode(1, "x");
    sink.on_event(PipelineEvent::DecodeError(ErrorEvent::from_source_error(
        &err,
        1,
        Version(1),
    )));
    assert_eq!(sink.errors().len(), 1);
    assert!(sink.frames().is_empty());
    assert!(sink.latest().is_none());
}
