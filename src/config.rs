use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::dispatch::context::DispatchOpts;
use crate::foundation::error::{FrameError, FrameResult};
use crate::pipeline::controller::ControllerOpts;
use crate::pipeline::frame_pipeline::PipelineOpts;

/// All tunables in one JSON-loadable document.
///
/// Every section and field is optional; missing ones take their defaults.
///
/// ```json
/// {
///   "dispatch": { "background_threads": 4, "serial_thread_name": "video" },
///   "pipeline": { "pool": { "max_pool_bytes": 33554432 }, "reuse_rendered_frame": false },
///   "controller": { "subtitle_sync": false }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Queue setup.
    pub dispatch: DispatchOpts,
    /// Defaults for newly opened pipelines.
    pub pipeline: PipelineOpts,
    /// Video controller behaviour.
    pub controller: ControllerOpts,
}

impl RuntimeConfig {
    /// Parse a config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> FrameResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| FrameError::validation(format!("parse runtime config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a config from a JSON string.
    pub fn from_json_str(s: &str) -> FrameResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> FrameResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FrameError::validation(format!("open runtime config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> FrameResult<()> {
        if self.dispatch.background_threads == Some(0) {
            return Err(FrameError::validation(
                "dispatch.background_threads must be > 0 when set",
            ));
        }
        if self.dispatch.serial_thread_name.trim().is_empty() {
            return Err(FrameError::validation(
                "dispatch.serial_thread_name must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
