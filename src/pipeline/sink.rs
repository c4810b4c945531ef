use std::sync::Mutex;

use crate::pipeline::events::{ErrorEvent, FrameReady, PipelineEvent};
use crate::pipeline::version::{Version, VersionGate};

/// Receiver of pipeline events.
///
/// Called on the main queue only. Deliveries for superseded requests still arrive; a conformant
/// sink keeps only the highest version it has seen, e.g. with [`LatestFrame`].
pub trait FrameEventSink: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: PipelineEvent);
}

/// The frame a sink should be displaying: the highest-version delivery seen so far.
#[derive(Debug, Default)]
pub struct LatestFrame {
    gate: VersionGate,
    current: Option<FrameReady>,
}

impl LatestFrame {
    /// Nothing displayed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a delivery; returns `true` if it replaced the displayed frame.
    pub fn offer(&mut self, ready: FrameReady) -> bool {
        if !self.gate.admit(ready.version) {
            tracing::trace!(version = %ready.version, "discarding stale frame");
            return false;
        }
        self.current = Some(ready);
        true
    }

    /// The frame to display.
    pub fn current(&self) -> Option<&FrameReady> {
        self.current.as_ref()
    }

    /// Number of deliveries discarded as stale.
    pub fn discarded(&self) -> u64 {
        self.gate.rejected()
    }
}

#[derive(Default)]
struct Recorded {
    events: Vec<PipelineEvent>,
    latest: LatestFrame,
}

/// Sink that records every event and tracks the latest frame. For tests and headless use.
#[derive(Default)]
pub struct InMemoryEventSink {
    inner: Mutex<Recorded>,
}

impl std::fmt::Debug for InMemoryEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventSink")
            .field("events", &self.len())
            .finish()
    }
}

impl InMemoryEventSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of events received.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Return `true` when nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All events in arrival order.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.lock().events.clone()
    }

    /// Every frame delivery in arrival order, stale ones included.
    pub fn frames(&self) -> Vec<FrameReady> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::FrameReady(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    /// Decode and render errors in arrival order.
    pub fn errors(&self) -> Vec<ErrorEvent> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::DecodeError(err) | PipelineEvent::RenderError(err) => {
                    Some(err.clone())
                }
                PipelineEvent::FrameReady(_) => None,
            })
            .collect()
    }

    /// The frame a conformant display would show.
    pub fn latest(&self) -> Option<FrameReady> {
        self.lock().latest.current().cloned()
    }

    /// Version of the displayed frame.
    pub fn latest_version(&self) -> Option<Version> {
        self.latest().map(|f| f.version)
    }

    /// Number of frame deliveries discarded as stale.
    pub fn discarded(&self) -> u64 {
        self.lock().latest.discarded()
    }
}

impl FrameEventSink for InMemoryEventSink {
    fn on_event(&self, event: PipelineEvent) {
        let mut rec = self.lock();
        if let PipelineEvent::FrameReady(ready) = &event {
            rec.latest.offer(ready.clone());
        }
        rec.events.push(event);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/sink.rs"]
mod tests;
