//! Bounded in-memory sample history
//!
//! A single fixed-capacity ring of composite [`Sample`] records. Keeping the
//! metrics in one buffer (rather than one ring per metric) guarantees that
//! all series stay aligned: eviction removes a whole row at a time.
//!
//! Sharing model: one writer (the sampler loop), any number of readers
//! (alert evaluator, report queries). An append holds the write lock for a
//! single push, so readers observe either the pre- or post-append state,
//! never a torn row.

use crate::models::Sample;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Fixed-capacity, oldest-evicting store of [`Sample`] rows.
pub struct TimeSeriesStore {
    buf: VecDeque<Sample>,
    capacity: usize,
}

/// Handle shared between the sampler (writer) and readers.
pub type SharedHistory = Arc<RwLock<TimeSeriesStore>>;

impl TimeSeriesStore {
    /// Create a store holding at most `capacity` samples (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a store sized to cover `retention_minutes` of history at one
    /// sample every `sample_interval_secs` seconds (rounded up).
    pub fn for_retention(retention_minutes: u64, sample_interval_secs: u64) -> Self {
        let interval = sample_interval_secs.max(1);
        let capacity = (retention_minutes * 60).div_ceil(interval) as usize;
        Self::with_capacity(capacity)
    }

    /// Wrap a store in the shared reader/writer handle.
    pub fn into_shared(self) -> SharedHistory {
        Arc::new(RwLock::new(self))
    }

    /// Append one sample, evicting the oldest row if at capacity. O(1).
    pub fn append(&mut self, sample: Sample) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(sample);
    }

    /// All samples with `timestamp >= since`, in insertion order.
    pub fn window(&self, since: i64) -> Vec<Sample> {
        // Rows are appended in timestamp order, so the qualifying samples
        // form a suffix of the buffer.
        let start = self.buf.partition_point(|s| s.timestamp < since);
        self.buf.iter().skip(start).copied().collect()
    }

    /// The most recent `min(n, len)` samples, in insertion order.
    pub fn tail(&self, n: usize) -> Vec<Sample> {
        let skip = self.buf.len().saturating_sub(n);
        self.buf.iter().skip(skip).copied().collect()
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the store holds no samples
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum number of samples retained
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64) -> Sample {
        Sample {
            timestamp: ts,
            cpu_pct: ts as f64,
            mem_pct: 50.0,
            net_sent_kbps: 1.0,
            net_recv_kbps: 2.0,
            load1: 0.5,
        }
    }

    #[test]
    fn test_capacity_eviction_keeps_most_recent() {
        let mut store = TimeSeriesStore::with_capacity(5);

        for ts in 0..10 {
            store.append(sample(ts));
        }

        assert_eq!(store.len(), 5);
        let all = store.tail(100);
        let timestamps: Vec<i64> = all.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![5, 6, 7, 8, 9]);
        // The evicted row's metric values are gone across all series
        assert_eq!(all[0].cpu_pct, 5.0);
    }

    #[test]
    fn test_window_returns_suffix_in_order() {
        let mut store = TimeSeriesStore::with_capacity(100);
        for ts in 0..20 {
            store.append(sample(ts));
        }

        let windowed = store.window(15);
        let timestamps: Vec<i64> = windowed.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![15, 16, 17, 18, 19]);

        assert!(store.window(100).is_empty());
        assert_eq!(store.window(0).len(), 20);
    }

    #[test]
    fn test_tail_clamps_to_length() {
        let mut store = TimeSeriesStore::with_capacity(10);
        for ts in 0..3 {
            store.append(sample(ts));
        }

        assert_eq!(store.tail(2).len(), 2);
        assert_eq!(store.tail(2)[0].timestamp, 1);
        assert_eq!(store.tail(10).len(), 3);
        assert!(store.tail(0).is_empty());
    }

    #[test]
    fn test_retention_capacity_rounds_up() {
        // 60 minutes at 10s interval -> 360 rows
        let store = TimeSeriesStore::for_retention(60, 10);
        assert_eq!(store.capacity(), 360);

        // 1 minute at 7s interval -> ceil(60/7) = 9 rows
        let store = TimeSeriesStore::for_retention(1, 7);
        assert_eq!(store.capacity(), 9);

        // Degenerate configuration still yields a usable store
        let store = TimeSeriesStore::for_retention(0, 10);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_concurrent_readers_see_consistent_rows() {
        let history = TimeSeriesStore::with_capacity(1000).into_shared();

        let writer = {
            let history = Arc::clone(&history);
            std::thread::spawn(move || {
                for ts in 0..500 {
                    history.write().unwrap().append(sample(ts));
                }
            })
        };

        for _ in 0..100 {
            let snapshot = history.read().unwrap().window(0);
            // Readers always see a prefix of the append sequence
            for (i, s) in snapshot.iter().enumerate() {
                assert_eq!(s.timestamp, i as i64);
            }
        }

        writer.join().unwrap();
        assert_eq!(history.read().unwrap().len(), 500);
    }
}
