//! Sample storage shared between the capture thread and the display
//!
//! The capture thread is the only writer: it appends one full frame at a
//! time. The UI thread copies windows out of the ring for drawing. The mutex
//! is held only for a frame-sized copy, so the display always sees whole
//! frames in capture order.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

/// Samples per read from the input handle
pub const FRAME_SIZE: usize = 4096;

/// Samples of history kept for display and scrolling
pub const RING_CAPACITY: usize = 524_288;

/// One fixed-size block of 16-bit samples, reused for every read
pub struct SampleFrame {
    samples: Box<[i16]>,
}

impl SampleFrame {
    pub fn new() -> Self {
        Self {
            samples: vec![0; FRAME_SIZE].into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[i16] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [i16] {
        &mut self.samples
    }
}

impl Default for SampleFrame {
    fn default() -> Self {
        Self::new()
    }
}

struct RingInner {
    data: Vec<i16>,
    /// Next position to write
    index: usize,
}

/// Fixed-capacity circular sample history
#[derive(Clone)]
pub struct SampleRing {
    inner: Arc<Mutex<RingInner>>,
    samples_written: Arc<AtomicU64>,
    capacity: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(RingInner {
                data: vec![0; capacity],
                index: 0,
            })),
            samples_written: Arc::new(AtomicU64::new(0)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingInner> {
        // Plain sample data stays usable even if a holder panicked
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append samples, wrapping at capacity
    pub fn append(&self, samples: &[i16]) {
        let mut inner = self.lock();

        // Only the newest `capacity` samples can survive
        let skip = samples.len().saturating_sub(self.capacity);
        let samples = &samples[skip..];
        let start = (inner.index + skip) % self.capacity;

        let first = samples.len().min(self.capacity - start);
        inner.data[start..start + first].copy_from_slice(&samples[..first]);
        let rest = samples.len() - first;
        inner.data[..rest].copy_from_slice(&samples[first..]);

        inner.index = (start + samples.len()) % self.capacity;
        drop(inner);

        self.samples_written
            .fetch_add((skip + samples.len()) as u64, Ordering::Relaxed);
    }

    /// Position the next sample will be written to
    pub fn write_index(&self) -> usize {
        self.lock().index
    }

    /// Total samples appended since creation or the last clear
    pub fn samples_written(&self) -> u64 {
        self.samples_written.load(Ordering::Relaxed)
    }

    /// Samples of real history currently held
    pub fn history(&self) -> usize {
        self.samples_written().min(self.capacity as u64) as usize
    }

    /// Largest scroll-back offset that still leaves `count` samples of history
    pub fn max_offset(&self, count: usize) -> usize {
        self.history().saturating_sub(count)
    }

    /// Copy `count` samples in chronological order, ending `offset` samples
    /// before the newest one
    pub fn latest(&self, count: usize, offset: usize) -> Vec<i16> {
        let count = count.min(self.capacity);
        let offset = offset.min(self.capacity - count);

        let inner = self.lock();
        let end = (inner.index + self.capacity - offset) % self.capacity;
        let start = (end + self.capacity - count) % self.capacity;

        let mut window = Vec::with_capacity(count);
        if start + count <= self.capacity {
            window.extend_from_slice(&inner.data[start..start + count]);
        } else {
            window.extend_from_slice(&inner.data[start..]);
            window.extend_from_slice(&inner.data[..count - (self.capacity - start)]);
        }
        window
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.data.fill(0);
        inner.index = 0;
        drop(inner);
        self.samples_written.store(0, Ordering::Relaxed);
    }
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new(RING_CAPACITY)
    }
}
