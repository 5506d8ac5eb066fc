//! Concurrent partition scans.
//!
//! ```text
//!   g07_p..._s0000_A.seg ──► worker ─┐
//!   g07_p..._s0000_B.seg ──► worker ─┼──► mpsc ──► RecordStream
//!   g07_p..._s0001_C.seg ──► worker ─┘
//! ```
//!
//! One blocking worker per segment file. Records from one file arrive in
//! on-disk order; files interleave arbitrarily. A file that cannot be opened
//! or stops decoding early only shortens the result.

use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use wagerlog_core::{
    error::{Error, Result},
    metrics::Metrics,
    Record,
};

use crate::segment::{partition_dir, SegmentName, SegmentReader};

/// Records buffered between workers and the consumer
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

pub struct SegmentScanner {
    base_dir: PathBuf,
    metrics: Metrics,
    channel_capacity: usize,
}

impl SegmentScanner {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            metrics: Metrics::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Segment files of one partition, sorted by name. A missing partition
    /// directory is an empty partition.
    pub async fn list_segments(
        &self,
        game: u32,
        period: u32,
        shard: Option<u32>,
    ) -> Result<Vec<PathBuf>> {
        let dir = partition_dir(&self.base_dir, game, period);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Io {
                    message: format!("Failed to list partition {:?}: {}", dir, e),
                    source: e,
                })
            }
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = SegmentName::from_path(&path) else {
                continue;
            };
            if shard.map_or(true, |s| s == name.shard) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Decode every matching segment concurrently into one stream.
    pub async fn scan(&self, game: u32, period: u32, shard: Option<u32>) -> Result<RecordStream> {
        let files = self.list_segments(game, period, shard).await?;
        self.metrics.record_scan(files.len() as u64);
        info!(
            "Scanning game {} period {} shard {:?}: {} segments",
            game,
            period,
            shard,
            files.len()
        );

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        for path in &files {
            let path = path.clone();
            let tx = tx.clone();
            let metrics = self.metrics.clone();
            tokio::task::spawn_blocking(move || decode_segment(&path, &tx, &metrics));
        }

        Ok(RecordStream {
            rx,
            files: files.len(),
        })
    }

    /// [`SegmentScanner::scan`] drained into a vector
    pub async fn scan_collect(
        &self,
        game: u32,
        period: u32,
        shard: Option<u32>,
    ) -> Result<Vec<Record>> {
        Ok(self.scan(game, period, shard).await?.collect().await)
    }
}

/// Worker body: stream one file's records into `tx`.
fn decode_segment(path: &Path, tx: &mpsc::Sender<Record>, metrics: &Metrics) {
    let mut reader = match SegmentReader::open(path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("Skipping segment {:?}: {}", path, e);
            metrics.record_early_stop();
            return;
        }
    };

    let mut sent = 0u64;
    for record in reader.by_ref() {
        if tx.blocking_send(record).is_err() {
            debug!("Scan consumer went away, abandoning {:?}", path);
            metrics.record_scanned(sent);
            return;
        }
        sent += 1;
    }
    metrics.record_scanned(sent);

    match reader.stop_reason() {
        Some(reason) if reason.is_early() => {
            warn!(
                "Segment {:?} stopped early ({}) after {} records",
                path, reason, sent
            );
            metrics.record_early_stop();
        }
        _ => {
            debug!(
                "Scanned {:?}: {} records in {} blocks",
                path,
                sent,
                reader.blocks_read()
            );
        }
    }
}

/// Receiving end of a scan. Ends once every worker has finished.
pub struct RecordStream {
    rx: mpsc::Receiver<Record>,
    files: usize,
}

impl RecordStream {
    pub async fn next(&mut self) -> Option<Record> {
        self.rx.recv().await
    }

    pub async fn collect(mut self) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = self.rx.recv().await {
            records.push(record);
        }
        records
    }

    /// Number of segment files feeding this stream
    pub fn file_count(&self) -> usize {
        self.files
    }
}
