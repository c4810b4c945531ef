use std::sync::Arc;

/// One subtitle event as the renderer sees it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SubtitleLine {
    /// Start time in milliseconds (inclusive).
    pub start_ms: i64,
    /// End time in milliseconds (exclusive).
    pub end_ms: i64,
    /// Layer; higher layers draw on top.
    #[serde(default)]
    pub layer: i32,
    /// Style name.
    #[serde(default)]
    pub style: String,
    /// Event text, override tags included.
    pub text: String,
    /// Commented-out lines are never rendered.
    #[serde(default)]
    pub comment: bool,
}

impl SubtitleLine {
    /// A plain dialogue line.
    pub fn new(start_ms: i64, end_ms: i64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            layer: 0,
            style: "Default".to_string(),
            text: text.into(),
            comment: false,
        }
    }

    /// Return `true` when this line is drawn at `time_ms`.
    pub fn is_visible_at(&self, time_ms: i64) -> bool {
        !self.comment && self.start_ms <= time_ms && time_ms < self.end_ms
    }
}

/// Immutable snapshot of the subtitle script handed to a pipeline.
///
/// Cheap to clone; the pipeline's worker keeps one and the editor can build the next one
/// without coordinating with it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubtitleSnapshot {
    lines: Arc<[SubtitleLine]>,
}

impl SubtitleSnapshot {
    /// Snapshot of `lines`.
    pub fn new(lines: Vec<SubtitleLine>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    /// All lines in script order.
    pub fn lines(&self) -> &[SubtitleLine] {
        &self.lines
    }

    /// Return `true` when the snapshot has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines visible at `time_ms`, sorted by layer (stable, so script order breaks ties).
    pub fn visible_at(&self, time_ms: i64) -> Vec<SubtitleLine> {
        let mut out: Vec<SubtitleLine> = self
            .lines
            .iter()
            .filter(|l| l.is_visible_at(time_ms))
            .cloned()
            .collect();
        out.sort_by_key(|l| l.layer);
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/subtitles.rs"]
mod tests;
