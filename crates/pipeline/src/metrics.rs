//! Dispatcher metrics
//!
//! Atomic counters for tracking dispatch outcomes.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the pipeline dispatcher
///
/// Safe to update from every pipeline task concurrently.
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Envelopes handed in by triggers
    envelopes_received: AtomicU64,

    /// Envelopes no pipeline matched
    envelopes_unmatched: AtomicU64,

    /// Pipeline runs started (one per matched pipeline per envelope)
    pipelines_matched: AtomicU64,

    /// Pipeline runs that finished without error
    pipelines_succeeded: AtomicU64,

    /// Pipeline runs that failed (decode, function error or panic)
    pipelines_failed: AtomicU64,

    /// Responses handed to the trigger
    responses_emitted: AtomicU64,

    /// Responses the trigger failed to deliver
    response_failures: AtomicU64,

    /// Payloads written to the retry store
    retry_writes: AtomicU64,

    /// Retry store writes that failed
    retry_failures: AtomicU64,
}

impl DispatcherMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            envelopes_received: AtomicU64::new(0),
            envelopes_unmatched: AtomicU64::new(0),
            pipelines_matched: AtomicU64::new(0),
            pipelines_succeeded: AtomicU64::new(0),
            pipelines_failed: AtomicU64::new(0),
            responses_emitted: AtomicU64::new(0),
            response_failures: AtomicU64::new(0),
            retry_writes: AtomicU64::new(0),
            retry_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.envelopes_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unmatched(&self) {
        self.envelopes_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_matched(&self, count: u64) {
        self.pipelines_matched.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_success(&self) {
        self.pipelines_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.pipelines_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_response(&self) {
        self.responses_emitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_response_failure(&self) {
        self.response_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retry_write(&self) {
        self.retry_writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retry_failure(&self) {
        self.retry_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            envelopes_received: self.envelopes_received.load(Ordering::Relaxed),
            envelopes_unmatched: self.envelopes_unmatched.load(Ordering::Relaxed),
            pipelines_matched: self.pipelines_matched.load(Ordering::Relaxed),
            pipelines_succeeded: self.pipelines_succeeded.load(Ordering::Relaxed),
            pipelines_failed: self.pipelines_failed.load(Ordering::Relaxed),
            responses_emitted: self.responses_emitted.load(Ordering::Relaxed),
            response_failures: self.response_failures.load(Ordering::Relaxed),
            retry_writes: self.retry_writes.load(Ordering::Relaxed),
            retry_failures: self.retry_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of dispatcher metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSnapshot {
    pub envelopes_received: u64,
    pub envelopes_unmatched: u64,
    pub pipelines_matched: u64,
    pub pipelines_succeeded: u64,
    pub pipelines_failed: u64,
    pub responses_emitted: u64,
    pub response_failures: u64,
    pub retry_writes: u64,
    pub retry_failures: u64,
}

impl DispatchSnapshot {
    /// Share of finished pipeline runs that succeeded (0.0 - 1.0)
    ///
    /// Returns None if no run has finished.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.pipelines_succeeded + self.pipelines_failed;
        if total == 0 {
            None
        } else {
            Some(self.pipelines_succeeded as f64 / total as f64)
        }
    }

    /// Difference from an earlier snapshot
    pub fn diff(&self, previous: &DispatchSnapshot) -> DispatchSnapshot {
        DispatchSnapshot {
            envelopes_received: self
                .envelopes_received
                .saturating_sub(previous.envelopes_received),
            envelopes_unmatched: self
                .envelopes_unmatched
                .saturating_sub(previous.envelopes_unmatched),
            pipelines_matched: self
                .pipelines_matched
                .saturating_sub(previous.pipelines_matched),
            pipelines_succeeded: self
                .pipelines_succeeded
                .saturating_sub(previous.pipelines_succeeded),
            pipelines_failed: self.pipelines_failed.saturating_sub(previous.pipelines_failed),
            responses_emitted: self
                .responses_emitted
                .saturating_sub(previous.responses_emitted),
            response_failures: self
                .response_failures
                .saturating_sub(previous.response_failures),
            retry_writes: self.retry_writes.saturating_sub(previous.retry_writes),
            retry_failures: self.retry_failures.saturating_sub(previous.retry_failures),
        }
    }
}
