//! # Metrics
//!
//! Atomic counters shared by segment writers, scanners and the request layer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Metrics collector. Clones share the same counters.
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    // Write path
    records_appended: AtomicU64,
    record_bytes: AtomicU64,
    blocks_flushed: AtomicU64,
    compressed_bytes: AtomicU64,
    index_entries: AtomicU64,
    write_errors: AtomicU64,

    // Read path
    scans: AtomicU64,
    segments_scanned: AtomicU64,
    records_scanned: AtomicU64,
    early_stops: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one appended record of `bytes` serialized bytes
    pub fn record_append(&self, bytes: u64) {
        self.inner.records_appended.fetch_add(1, Ordering::Relaxed);
        self.inner.record_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a block frame of `bytes` written to a segment
    pub fn record_block_flush(&self, bytes: u64) {
        self.inner.blocks_flushed.fetch_add(1, Ordering::Relaxed);
        self.inner.compressed_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_index_entry(&self) {
        self.inner.index_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_error(&self) {
        self.inner.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a scan over `segments` files
    pub fn record_scan(&self, segments: u64) {
        self.inner.scans.fetch_add(1, Ordering::Relaxed);
        self.inner.segments_scanned.fetch_add(segments, Ordering::Relaxed);
    }

    pub fn record_scanned(&self, records: u64) {
        self.inner.records_scanned.fetch_add(records, Ordering::Relaxed);
    }

    /// A segment whose decode loop ended on something other than a clean EOF
    pub fn record_early_stop(&self) {
        self.inner.early_stops.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_appended: self.inner.records_appended.load(Ordering::Relaxed),
            record_bytes: self.inner.record_bytes.load(Ordering::Relaxed),
            blocks_flushed: self.inner.blocks_flushed.load(Ordering::Relaxed),
            compressed_bytes: self.inner.compressed_bytes.load(Ordering::Relaxed),
            index_entries: self.inner.index_entries.load(Ordering::Relaxed),
            write_errors: self.inner.write_errors.load(Ordering::Relaxed),
            scans: self.inner.scans.load(Ordering::Relaxed),
            segments_scanned: self.inner.segments_scanned.load(Ordering::Relaxed),
            records_scanned: self.inner.records_scanned.load(Ordering::Relaxed),
            early_stops: self.inner.early_stops.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_appended: u64,
    pub record_bytes: u64,
    pub blocks_flushed: u64,
    pub compressed_bytes: u64,
    pub index_entries: u64,
    pub write_errors: u64,
    pub scans: u64,
    pub segments_scanned: u64,
    pub records_scanned: u64,
    pub early_stops: u64,
}

impl MetricsSnapshot {
    /// Compressed bytes per uncompressed record byte
    pub fn compression_ratio(&self) -> f64 {
        if self.record_bytes == 0 {
            0.0
        } else {
            self.compressed_bytes as f64 / self.record_bytes as f64
        }
    }
}
