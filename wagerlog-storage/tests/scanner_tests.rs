//! # Segment Scanner Tests
//!
//! Covers:
//! - Completeness across many segment files
//! - Per-file ordering
//! - Shard filtering
//! - Tolerance of truncated and foreign files

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tempfile::TempDir;

use wagerlog_core::{Metrics, Record};
use wagerlog_storage::segment::{partition_dir, SegmentConfig, SegmentWriter};
use wagerlog_storage::SegmentScanner;

const GAME: u32 = 3;
const PERIOD: u32 = 20240701;

/// Write `records` records to a fresh segment; machine id tags the file.
fn write_segment(base: &TempDir, shard: u32, file_tag: u64, records: u32, threshold: usize) -> PathBuf {
    let config = SegmentConfig::default().with_block_threshold(threshold);
    let writer = SegmentWriter::create(base.path(), GAME, PERIOD, shard, config).unwrap();
    for seq in 0..records {
        let mut record = Record::new(GAME, PERIOD, seq)
            .with_machine(file_tag)
            .with_data(format!("ticket-{}-{}", file_tag, seq));
        writer.append(&mut record).unwrap();
    }
    writer.close().unwrap();
    writer.path().to_path_buf()
}

fn group_by_file(records: &[Record]) -> HashMap<u64, Vec<u32>> {
    let mut by_file: HashMap<u64, Vec<u32>> = HashMap::new();
    for record in records {
        by_file.entry(record.machine_id).or_default().push(record.seq_no);
    }
    by_file
}

#[tokio::test]
async fn test_scan_returns_every_record_once_in_file_order() {
    let temp_dir = TempDir::new().unwrap();
    const FILES: u64 = 6;
    const PER_FILE: u32 = 250;

    for tag in 0..FILES {
        write_segment(&temp_dir, 0, tag, PER_FILE, 1024);
    }

    let metrics = Metrics::new();
    let scanner = SegmentScanner::new(temp_dir.path())
        .with_metrics(metrics.clone())
        .with_channel_capacity(16);
    let records = scanner.scan_collect(GAME, PERIOD, None).await.unwrap();

    assert_eq!(records.len(), (FILES as usize) * (PER_FILE as usize));
    let by_file = group_by_file(&records);
    assert_eq!(by_file.len(), FILES as usize);
    for seqs in by_file.values() {
        assert_eq!(*seqs, (0..PER_FILE).collect::<Vec<_>>());
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.scans, 1);
    assert_eq!(snapshot.segments_scanned, FILES);
    assert_eq!(snapshot.records_scanned, FILES * PER_FILE as u64);
    assert_eq!(snapshot.early_stops, 0);
}

#[tokio::test]
async fn test_scan_streams_incrementally() {
    let temp_dir = TempDir::new().unwrap();
    write_segment(&temp_dir, 0, 1, 40, 256);

    let scanner = SegmentScanner::new(temp_dir.path()).with_channel_capacity(1);
    let mut stream = scanner.scan(GAME, PERIOD, None).await.unwrap();
    assert_eq!(stream.file_count(), 1);

    let mut seen = 0;
    while let Some(record) = stream.next().await {
        assert_eq!(record.seq_no, seen);
        seen += 1;
    }
    assert_eq!(seen, 40);
}

#[tokio::test]
async fn test_shard_filter() {
    let temp_dir = TempDir::new().unwrap();
    write_segment(&temp_dir, 0, 10, 5, 1024);
    write_segment(&temp_dir, 1, 11, 7, 1024);
    write_segment(&temp_dir, 1, 12, 9, 1024);

    let scanner = SegmentScanner::new(temp_dir.path());

    let shard1 = scanner.scan_collect(GAME, PERIOD, Some(1)).await.unwrap();
    assert_eq!(shard1.len(), 16);
    assert!(shard1.iter().all(|r| r.machine_id != 10));

    let shard0 = scanner.scan_collect(GAME, PERIOD, Some(0)).await.unwrap();
    assert_eq!(shard0.len(), 5);

    let none = scanner.scan_collect(GAME, PERIOD, Some(7)).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_other_partitions_are_not_scanned() {
    let temp_dir = TempDir::new().unwrap();
    write_segment(&temp_dir, 0, 1, 5, 1024);

    let scanner = SegmentScanner::new(temp_dir.path());
    assert!(scanner.scan_collect(GAME, PERIOD + 1, None).await.unwrap().is_empty());
    assert!(scanner.scan_collect(GAME + 1, PERIOD, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_truncated_segment_yields_complete_blocks_only() {
    let temp_dir = TempDir::new().unwrap();
    // 118-119 byte records: four per block at this threshold
    let path = write_segment(&temp_dir, 0, 1, 20, 450);
    let intact = write_segment(&temp_dir, 0, 2, 20, 450);

    let len = fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 5).unwrap();

    let metrics = Metrics::new();
    let scanner = SegmentScanner::new(temp_dir.path()).with_metrics(metrics.clone());
    let records = scanner.scan_collect(GAME, PERIOD, None).await.unwrap();

    let by_file = group_by_file(&records);
    assert_eq!(by_file[&2].len(), 20);
    assert_eq!(by_file[&1], (0..16).collect::<Vec<_>>());
    assert_eq!(metrics.snapshot().early_stops, 1);
    assert!(intact.exists());
}

#[tokio::test]
async fn test_garbage_segment_does_not_fail_scan() {
    let temp_dir = TempDir::new().unwrap();
    write_segment(&temp_dir, 0, 1, 12, 1024);

    let dir = partition_dir(temp_dir.path(), GAME, PERIOD);
    fs::write(dir.join("g03_p20240701_s0000_1.seg"), b"this is not a segment at all").unwrap();

    let scanner = SegmentScanner::new(temp_dir.path());
    let records = scanner.scan_collect(GAME, PERIOD, None).await.unwrap();
    assert_eq!(records.len(), 12);
}

#[tokio::test]
async fn test_concurrent_scans_agree() {
    let temp_dir = TempDir::new().unwrap();
    for tag in 0..3 {
        write_segment(&temp_dir, 0, tag, 100, 2048);
    }

    let scanner = SegmentScanner::new(temp_dir.path());
    let (a, b) = tokio::join!(
        scanner.scan_collect(GAME, PERIOD, None),
        scanner.scan_collect(GAME, PERIOD, None)
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.len(), 300);
    assert_eq!(group_by_file(&a), group_by_file(&b));
}
