//! Lock-free pool of reusable compression encoders
//!
//! Each compression call takes an encoder, compresses with it, and gives it
//! back. Concurrent pipelines never share an encoder.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free pool of reusable values
///
/// When the pool is exhausted a fresh value is built; returning it later
/// refills the pool up to its capacity.
pub struct Pool<T> {
    queue: ArrayQueue<T>,
    metrics: PoolMetrics,
}

/// Counters for pool monitoring
#[derive(Debug, Default)]
pub struct PoolMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    returns: AtomicU64,
    drops: AtomicU64,
}

/// Point-in-time copy of [`PoolMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub drops: u64,
}

impl PoolSnapshot {
    /// Fraction of `get` calls served from the pool (1.0 when unused)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl PoolMetrics {
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

impl<T> Pool<T> {
    /// Create a pool keeping up to `pool_size` idle values
    ///
    /// Values are built lazily on first use.
    pub fn new(pool_size: usize) -> Self {
        Self {
            queue: ArrayQueue::new(pool_size.max(1)),
            metrics: PoolMetrics::default(),
        }
    }

    /// Take an idle value, building one with `make` when the pool is empty
    #[inline]
    pub fn get_or(&self, make: impl FnOnce() -> T) -> T {
        match self.queue.pop() {
            Some(value) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                value
            }
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                make()
            }
        }
    }

    /// Return a value, dropping it when the pool is full
    #[inline]
    pub fn put(&self, value: T) {
        match self.queue.push(value) {
            Ok(()) => {
                self.metrics.returns.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.metrics.drops.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Values currently idle in the pool
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;
