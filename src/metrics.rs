use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and query activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_indexed: AtomicU64,
    segments_indexed: AtomicU64,
    segments_skipped: AtomicU64,
    queries_answered: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ingested file with its newly indexed and already present segment counts.
    pub fn record_document(&self, indexed: u64, skipped: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.segments_indexed.fetch_add(indexed, Ordering::Relaxed);
        self.segments_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Record an answered question.
    pub fn record_query(&self) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            segments_indexed: self.segments_indexed.load(Ordering::Relaxed),
            segments_skipped: self.segments_skipped.load(Ordering::Relaxed),
            queries_answered: self.queries_answered.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Files ingested since startup.
    pub documents_indexed: u64,
    /// Segments summarized and written to both stores.
    pub segments_indexed: u64,
    /// Segments skipped because their identifier was already indexed.
    pub segments_skipped: u64,
    /// Questions answered, including those without context.
    pub queries_answered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_segments() {
        let metrics = IngestMetrics::new();
        metrics.record_document(2, 0);
        metrics.record_document(0, 3);
        metrics.record_query();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_indexed, 2);
        assert_eq!(snapshot.segments_indexed, 2);
        assert_eq!(snapshot.segments_skipped, 3);
        assert_eq!(snapshot.queries_answered, 1);
    }

    #[test]
    fn fresh_snapshot_is_zero() {
        assert_eq!(IngestMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
