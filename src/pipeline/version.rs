use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic invalidation stamp attached to every pipeline delivery.
///
/// Higher versions supersede lower ones. `Version(0)` means "nothing requested yet".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Version(pub u64);

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The only pipeline state written from submitting threads.
///
/// Bumped with release semantics on the submitting thread and read with acquire semantics on the
/// worker, so a worker that observes a bump also observes everything the submitter did before it.
#[derive(Debug, Default)]
pub(crate) struct VersionCounter(AtomicU64);

impl VersionCounter {
    /// Invalidate in-flight work; returns the new current version.
    pub(crate) fn bump(&self) -> Version {
        Version(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub(crate) fn current(&self) -> Version {
        Version(self.0.load(Ordering::Acquire))
    }
}

/// Sink-side "highest version wins" filter.
///
/// Deliveries may arrive in any order; [`VersionGate::admit`] accepts a version only if it is
/// strictly newer than every version admitted before, so a stale result can never replace a
/// newer one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VersionGate {
    highest: Option<Version>,
    rejected: u64,
}

impl VersionGate {
    /// Create a gate that has admitted nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `v` if it is newer than everything seen so far.
    pub fn admit(&mut self, v: Version) -> bool {
        match self.highest {
            Some(h) if v <= h => {
                self.rejected += 1;
                false
            }
            _ => {
                self.highest = Some(v);
                true
            }
        }
    }

    /// Return `true` if `v` would be rejected by [`VersionGate::admit`].
    pub fn is_stale(&self, v: Version) -> bool {
        self.highest.is_some_and(|h| v <= h)
    }

    /// Highest version admitted so far.
    pub fn highest(&self) -> Option<Version> {
        self.highest
    }

    /// Number of deliveries rejected as stale.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/version.rs"]
mod tests;
