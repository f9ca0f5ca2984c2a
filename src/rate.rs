// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::{Duration, Instant};

pub const DEFAULT_RATE_SAMPLES: usize = 10;
pub const DEFAULT_RATE_TICK: Duration = Duration::from_secs(1);

/// Fixed-capacity circular store. Once full, each push overwrites the oldest entry.
#[derive(Debug, Clone)]
pub struct SampleRing<T> {
    slots: Vec<T>,
    capacity: usize,
    // Index the next push lands on once the ring is full.
    write: usize,
}

impl<T> SampleRing<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            write: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
            self.write = self.slots.len() % self.capacity;
        } else {
            self.slots[self.write] = item;
            self.write = (self.write + 1) % self.capacity;
        }
    }

    pub fn oldest(&self) -> Option<&T> {
        if self.slots.len() < self.capacity {
            self.slots.first()
        } else {
            self.slots.get(self.write)
        }
    }

    pub fn newest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        self.slots.get((self.write + self.capacity - 1) % self.capacity)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub at: Instant,
    pub bytes: u64,
}

/// Throughput over the window spanned by the oldest and newest retained samples.
///
/// Updates that land inside the same tick as the newest sample are dropped, so
/// the window never collapses to a near-zero duration.
#[derive(Debug, Clone)]
pub struct ByteRateEstimator {
    samples: SampleRing<ProgressSample>,
    tick: Duration,
}

impl Default for ByteRateEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_SAMPLES, DEFAULT_RATE_TICK)
    }
}

impl ByteRateEstimator {
    pub fn new(capacity: usize, tick: Duration) -> Self {
        Self {
            // A single slot can never hold two distinct timestamps.
            samples: SampleRing::with_capacity(capacity.max(2)),
            tick,
        }
    }

    /// Records a sample unless `now` falls in the same tick as the newest one.
    /// Returns whether the sample was kept.
    pub fn update(&mut self, now: Instant, cumulative_bytes: u64) -> bool {
        if let Some(newest) = self.samples.newest() {
            if now.saturating_duration_since(newest.at) < self.tick || now == newest.at {
                return false;
            }
        }
        self.samples.push(ProgressSample {
            at: now,
            bytes: cumulative_bytes,
        });
        true
    }

    /// Bytes per second, or 0.0 when there is not enough history to say.
    pub fn estimate(&self) -> f64 {
        let (Some(oldest), Some(newest)) = (self.samples.oldest(), self.samples.newest()) else {
            return 0.0;
        };

        let elapsed = newest.at.saturating_duration_since(oldest.at).as_secs_f64();
        if elapsed <= 0.0 || newest.bytes < oldest.bytes {
            return 0.0;
        }

        (newest.bytes - oldest.bytes) as f64 / elapsed
    }

    #[cfg(test)]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
