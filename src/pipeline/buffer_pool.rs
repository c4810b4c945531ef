use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Pool configuration for cached frame buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BufferPoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained buffers per (width, height) bucket.
    pub max_buffers_per_size: usize,
}

impl Default for BufferPoolOpts {
    fn default() -> Self {
        Self {
            // A handful of 1080p RGBA frames.
            max_pool_bytes: 64 * 1024 * 1024,
            max_buffers_per_size: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BufferKey {
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl BufferKey {
    pub(crate) fn byte_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

/// Counters describing pool reuse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Buffers currently parked in the pool.
    pub retained_buffers: usize,
    /// Bytes currently parked in the pool.
    pub retained_bytes: usize,
    /// Buffers handed out from the pool instead of allocated.
    pub reused: u64,
    /// Fresh allocations.
    pub alloc_buffers: u64,
    /// Bytes allocated fresh.
    pub alloc_bytes: u64,
    /// Buffers released but not retained because a cap was hit.
    pub dropped_on_release: u64,
}

/// Bounded pool of RGBA8 frame buffers keyed by frame size.
///
/// Buffers come back through [`PooledBuffer`]'s `Drop`, so a buffer re-enters the pool only once
/// the last holder of the frame it backs has let go.
pub(crate) struct BufferPool {
    opts: BufferPoolOpts,
    stats: BufferPoolStats,
    free: HashMap<BufferKey, Vec<Vec<u8>>>,
}

pub(crate) type SharedPool = Arc<Mutex<BufferPool>>;

impl BufferPool {
    pub(crate) fn new(opts: BufferPoolOpts) -> Self {
        Self {
            opts,
            stats: BufferPoolStats::default(),
            free: HashMap::new(),
        }
    }

    pub(crate) fn shared(opts: BufferPoolOpts) -> SharedPool {
        Arc::new(Mutex::new(Self::new(opts)))
    }

    pub(crate) fn stats(&self) -> BufferPoolStats {
        self.stats
    }

    /// A buffer of `key`'s size: a parked one if any, otherwise zeroed fresh memory.
    pub(crate) fn borrow(&mut self, key: BufferKey) -> Vec<u8> {
        let parked = self.free.get_mut(&key).and_then(Vec::pop);
        let stats = &mut self.stats;
        match parked {
            Some(buf) => {
                stats.retained_buffers -= 1;
                stats.retained_bytes -= key.byte_len();
                stats.reused += 1;
                buf
            }
            None => {
                stats.alloc_buffers += 1;
                stats.alloc_bytes += key.byte_len() as u64;
                vec![0; key.byte_len()]
            }
        }
    }

    /// Park `buf` for reuse, or let it go if keeping it would break a cap.
    pub(crate) fn release(&mut self, key: BufferKey, buf: Vec<u8>) {
        if !self.can_retain(key, &buf) {
            self.stats.dropped_on_release += 1;
            return;
        }
        self.free.entry(key).or_default().push(buf);
        self.stats.retained_buffers += 1;
        self.stats.retained_bytes += key.byte_len();
    }

    fn can_retain(&self, key: BufferKey, buf: &[u8]) -> bool {
        let parked = self.free.get(&key).map_or(0, Vec::len);
        buf.len() == key.byte_len()
            && parked < self.opts.max_buffers_per_size
            && self.stats.retained_bytes + key.byte_len() <= self.opts.max_pool_bytes
    }
}

pub(crate) fn lock_pool(pool: &Mutex<BufferPool>) -> MutexGuard<'_, BufferPool> {
    pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An RGBA8 pixel buffer borrowed from a pipeline's pool.
///
/// Dropping it hands the allocation back to the pool if the pool still exists.
pub struct PooledBuffer {
    key: BufferKey,
    data: Vec<u8>,
    pool: Weak<Mutex<BufferPool>>,
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("width", &self.key.width)
            .field("height", &self.key.height)
            .field("len", &self.data.len())
            .finish()
    }
}

impl PooledBuffer {
    pub(crate) fn take(pool: &SharedPool, width: u32, height: u32) -> Self {
        let key = BufferKey { width, height };
        let data = lock_pool(pool).borrow(key);
        Self {
            key,
            data,
            pool: Arc::downgrade(pool),
        }
    }

    /// Buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.key.width
    }

    /// Buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.key.height
    }

    /// Bytes per row (tightly packed RGBA8).
    pub fn stride(&self) -> usize {
        self.key.width as usize * 4
    }

    /// Pixel bytes, row-major RGBA8.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel bytes, row-major RGBA8.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.upgrade() {
            lock_pool(&pool).release(self.key, std::mem::take(&mut self.data));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/buffer_pool.rs"]
mod tests;
