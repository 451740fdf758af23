use crate::metrics::Snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::RwLock;
use tracing::warn;

/// Fixed-capacity circular buffer. Once full, each push overwrites the oldest slot.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    /// Index of the oldest element once the buffer is full; 0 until then.
    head: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Push `item`, returning the evicted oldest element when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.slots.len() < self.capacity {
            self.slots.push(item);
            None
        } else {
            let old = std::mem::replace(&mut self.slots[self.head], item);
            self.head = (self.head + 1) % self.capacity;
            Some(old)
        };
        debug_assert!(self.slots.len() <= self.capacity);
        debug_assert!(self.head < self.capacity);
        evicted
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn latest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots.get(idx)
    }
}

/// Column-oriented copy of the history, oldest first. All columns share one length.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HistoryView {
    pub capacity: usize,
    pub timestamps: Vec<DateTime<Utc>>,
    pub ram: Vec<f64>,
    pub cpu: Vec<f64>,
    pub disk: Vec<f64>,
    pub swap: Vec<f64>,
    pub cache: Vec<f64>,
}

impl HistoryView {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Keep only the newest `limit` points of every column.
    pub fn tail(mut self, limit: usize) -> Self {
        let skip = self.len().saturating_sub(limit);
        self.timestamps.drain(..skip);
        for column in [
            &mut self.ram,
            &mut self.cpu,
            &mut self.disk,
            &mut self.swap,
            &mut self.cache,
        ] {
            column.drain(..skip);
        }
        self
    }
}

/// Rolling window of snapshots. Every metric shares the same slots, so
/// eviction always drops the same tick from all of them.
#[derive(Clone, Debug)]
pub struct RollingHistory {
    ring: RingBuffer<Snapshot>,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
        }
    }

    pub fn append(&mut self, snapshot: Snapshot) {
        self.ring.push(snapshot);
    }

    pub fn current(&self) -> HistoryView {
        let len = self.ring.len();
        let mut view = HistoryView {
            capacity: self.ring.capacity(),
            timestamps: Vec::with_capacity(len),
            ram: Vec::with_capacity(len),
            cpu: Vec::with_capacity(len),
            disk: Vec::with_capacity(len),
            swap: Vec::with_capacity(len),
            cache: Vec::with_capacity(len),
        };
        for s in self.ring.iter() {
            view.timestamps.push(s.timestamp);
            view.ram.push(s.ram_percent);
            view.cpu.push(s.cpu_percent);
            view.disk.push(s.disk_percent);
            view.swap.push(s.swap_percent);
            view.cache.push(s.cache_percent);
        }
        view
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.ring.latest()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// The process-wide history, shared between the tick (writer) and renderers (readers).
pub struct SharedHistory {
    inner: RwLock<RollingHistory>,
}

impl SharedHistory {
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            warn!("History capacity 0 requested, using 1");
        }
        Self {
            inner: RwLock::new(RollingHistory::new(capacity)),
        }
    }

    pub fn append(&self, snapshot: Snapshot) {
        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                // Continue with the inner value even if poisoned.
                poisoned.into_inner()
            }
        };
        guard.append(snapshot);
    }

    /// Point-in-time copy; later appends do not affect it.
    pub fn current(&self) -> HistoryView {
        self.read(|h| h.current())
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.read(|h| h.latest().cloned())
    }

    pub fn len(&self) -> usize {
        self.read(|h| h.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.read(|h| h.capacity())
    }

    fn read<R>(&self, f: impl FnOnce(&RollingHistory) -> R) -> R {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&guard)
    }
}
