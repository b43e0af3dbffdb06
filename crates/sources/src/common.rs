//! Metrics shared by every trigger

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a trigger
#[derive(Debug, Default)]
pub struct TriggerMetrics {
    /// Envelopes handed to the dispatcher
    pub envelopes_received: AtomicU64,

    /// Payload bytes of those envelopes
    pub bytes_received: AtomicU64,

    /// Pipeline responses delivered (HTTP reply, publish, channel send)
    pub responses_sent: AtomicU64,

    /// Background messages delivered
    pub background_sent: AtomicU64,

    /// Delivery or dispatch errors
    pub errors: AtomicU64,
}

impl TriggerMetrics {
    pub const fn new() -> Self {
        Self {
            envelopes_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            responses_sent: AtomicU64::new(0),
            background_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn envelope_received(&self, bytes: u64) {
        self.envelopes_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn response_sent(&self) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn background_sent(&self) {
        self.background_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TriggerSnapshot {
        TriggerSnapshot {
            envelopes_received: self.envelopes_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            background_sent: self.background_sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of trigger metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerSnapshot {
    pub envelopes_received: u64,
    pub bytes_received: u64,
    pub responses_sent: u64,
    pub background_sent: u64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_tracking() {
        let metrics = TriggerMetrics::new();

        metrics.envelope_received(100);
        metrics.envelope_received(200);
        metrics.response_sent();
        metrics.error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.envelopes_received, 2);
        assert_eq!(snapshot.bytes_received, 300);
        assert_eq!(snapshot.responses_sent, 1);
        assert_eq!(snapshot.background_sent, 0);
        assert_eq!(snapshot.errors, 1);
    }
}
