//! # Segment Writer Tests
//!
//! Covers:
//! - Flush threshold behaviour
//! - Sidecar index coarseness and reload
//! - Close semantics
//! - Concurrent appends on one writer
//! - Partial-block durability

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use tempfile::TempDir;

use wagerlog_core::{crypto::chain_hash, verify_chain, HashChain, Metrics, Record};
use wagerlog_storage::block::{encode_block, BlockReader};
use wagerlog_storage::segment::{
    index_path_for, split_records, BlockIndex, SegmentConfig, SegmentReader, SegmentWriter,
};
use wagerlog_storage::{verify_segment, StopReason};

const GAME: u32 = 12;
const PERIOD: u32 = 20240601;

fn bet(seq: u32, payload_len: usize) -> Record {
    Record::new(GAME, PERIOD, seq)
        .with_machine(0xCAFE)
        .with_bettor(1_000 + seq as u64)
        .with_bet_time(1_717_200_000 + seq as u64)
        .with_data(vec![b'x'; payload_len])
}

fn create(dir: &TempDir, threshold: usize) -> SegmentWriter {
    let config = SegmentConfig::default().with_block_threshold(threshold);
    SegmentWriter::create(dir.path(), GAME, PERIOD, 0, config).unwrap()
}

// =============================================================================
// Flushing
// =============================================================================

#[test]
fn test_buffer_resets_exactly_when_threshold_reached() {
    let temp_dir = TempDir::new().unwrap();
    // 108 + 92 = 200 bytes per record
    let writer = create(&temp_dir, 1000);

    for seq in 0..4 {
        writer.append(&mut bet(seq, 92)).unwrap();
        assert_eq!(writer.buffered_len(), (seq as usize + 1) * 200);
        assert_eq!(writer.size(), 0);
    }

    writer.append(&mut bet(4, 92)).unwrap();
    assert_eq!(writer.buffered_len(), 0);
    let after_first = writer.size();
    assert!(after_first > 0);

    writer.append(&mut bet(5, 92)).unwrap();
    assert_eq!(writer.buffered_len(), 200);
    assert_eq!(writer.size(), after_first);
}

#[test]
fn test_buffer_overruns_by_at_most_one_record() {
    let temp_dir = TempDir::new().unwrap();
    let writer = create(&temp_dir, 150);
    let metrics = Metrics::new();
    let writer = writer.with_metrics(metrics.clone());

    writer.append(&mut bet(1, 10)).unwrap();
    assert_eq!(writer.buffered_len(), 118);

    // One large record crosses the threshold and triggers a flush on the spot
    writer.append(&mut bet(2, 4096)).unwrap();
    assert_eq!(writer.buffered_len(), 0);
    assert_eq!(metrics.snapshot().blocks_flushed, 1);
}

#[test]
fn test_max_size_is_not_enforced() {
    let temp_dir = TempDir::new().unwrap();
    let config = SegmentConfig::default()
        .with_block_threshold(1)
        .with_max_size(256);
    let writer = SegmentWriter::create(temp_dir.path(), GAME, PERIOD, 0, config).unwrap();

    for seq in 0..20 {
        writer.append(&mut bet(seq, 64)).unwrap();
    }
    writer.close().unwrap();

    assert_eq!(writer.max_size(), 256);
    assert!(writer.size() > 256);

    let files: Vec<_> = fs::read_dir(writer.path().parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "seg"))
        .collect();
    assert_eq!(files.len(), 1);
}

// =============================================================================
// Index
// =============================================================================

#[test]
fn test_index_entry_uses_size_before_flush() {
    let temp_dir = TempDir::new().unwrap();
    let writer = create(&temp_dir, 300);

    for seq in 0..3 {
        writer.append(&mut bet(seq, 0)).unwrap();
    }
    let size = writer.size();
    assert!(size > 0);

    writer.append(&mut bet(7, 0)).unwrap();
    writer.close().unwrap();

    let index = BlockIndex::load(writer.index_path()).unwrap();
    assert_eq!(index.entries().len(), 4);
    assert_eq!(index.offset_of(0), Some(0));
    assert_eq!(index.offset_of(2), Some(0));
    assert_eq!(index.offset_of(7), Some(size));
}

#[test]
fn test_index_offsets_open_the_right_block() {
    let temp_dir = TempDir::new().unwrap();
    let writer = create(&temp_dir, 500);

    for seq in 0..30 {
        writer.append(&mut bet(seq, 40)).unwrap();
    }
    writer.close().unwrap();

    let index = BlockIndex::load(&index_path_for(writer.path())).unwrap();
    let offset = index.offset_of(20).unwrap();

    let seqs: Vec<u32> = SegmentReader::open_at(writer.path(), offset)
        .unwrap()
        .map(|r| r.seq_no)
        .collect();
    assert!(seqs.contains(&20));
    assert_eq!(*seqs.last().unwrap(), 29);
    assert!(seqs.windows(2).all(|w| w[1] == w[0] + 1));
}

// =============================================================================
// Close
// =============================================================================

#[test]
fn test_close_flushes_tail_and_keeps_order() {
    let temp_dir = TempDir::new().unwrap();
    let writer = create(&temp_dir, 64 * 1024);

    for seq in 0..50 {
        writer.append(&mut bet(seq, 32)).unwrap();
    }
    assert_eq!(writer.size(), 0);
    writer.close().unwrap();

    let mut reader = SegmentReader::open(writer.path()).unwrap();
    let records: Vec<Record> = reader.by_ref().collect();
    assert_eq!(records.len(), 50);
    assert_eq!(reader.blocks_read(), 1);
    assert_eq!(reader.stop_reason(), Some(StopReason::EndOfFile));
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.seq_no, i as u32);
        assert_eq!(record.bettor_id, 1_000 + i as u64);
    }
    verify_chain(&records).unwrap();
}

#[test]
fn test_close_with_zero_records() {
    let temp_dir = TempDir::new().unwrap();
    let writer = create(&temp_dir, 1024);
    writer.close().unwrap();

    assert_eq!(fs::metadata(writer.path()).unwrap().len(), 0);
    assert_eq!(SegmentReader::open(writer.path()).unwrap().count(), 0);
}

#[test]
fn test_append_after_close_fails() {
    let temp_dir = TempDir::new().unwrap();
    let writer = create(&temp_dir, 1024);
    writer.close().unwrap();

    let err = writer.append(&mut bet(1, 0)).unwrap_err();
    assert_eq!(err.error_code(), "SEGMENT_CLOSED");
    assert!(!err.is_recoverable());
}

// =============================================================================
// Chain
// =============================================================================

#[test]
fn test_chain_links_consecutive_records() {
    let temp_dir = TempDir::new().unwrap();
    let writer = create(&temp_dir, 1024);

    let mut first = bet(1, 8);
    let mut second = bet(2, 8);
    writer.append(&mut first).unwrap();
    writer.append(&mut second).unwrap();

    assert_eq!(first.chain_hash, chain_hash(None, &first.this_hash));
    assert_eq!(second.chain_hash, chain_hash(Some(&first.chain_hash), &second.this_hash));
}

#[test]
fn test_new_writer_starts_a_new_chain() {
    let temp_dir = TempDir::new().unwrap();

    let mut a = bet(1, 8);
    let mut b = bet(1, 8);
    create(&temp_dir, 1024).append(&mut a).unwrap();
    create(&temp_dir, 1024).append(&mut b).unwrap();

    assert_eq!(a.chain_hash, b.chain_hash);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_appends_form_one_chain() {
    let temp_dir = TempDir::new().unwrap();
    let writer = Arc::new(create(&temp_dir, 2048));

    let handles: Vec<_> = (0..8u32)
        .map(|t| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                for i in 0..50u32 {
                    writer.append(&mut bet(t * 1000 + i, 24)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    writer.close().unwrap();

    let report = verify_segment(writer.path()).unwrap();
    assert_eq!(report.records, 400);
    assert_eq!(report.last_chain_hash, writer.chain_hash());

    let seqs: HashSet<u32> = SegmentReader::open(writer.path())
        .unwrap()
        .map(|r| r.seq_no)
        .collect();
    assert_eq!(seqs.len(), 400);
}

// =============================================================================
// Durability
// =============================================================================

#[test]
fn test_unflushed_tail_is_lost_on_crash() {
    let temp_dir = TempDir::new().unwrap();
    let writer = create(&temp_dir, 400);

    // 2 full blocks of 4 records each, then 2 buffered records
    for seq in 0..10 {
        writer.append(&mut bet(seq, 0)).unwrap();
    }
    assert_eq!(writer.buffered_len(), 216);

    // Simulate a crash: copy the file as it is on disk right now
    let snapshot = temp_dir.path().join("snapshot.seg");
    fs::copy(writer.path(), &snapshot).unwrap();

    let records: Vec<Record> = SegmentReader::open(&snapshot).unwrap().collect();
    assert_eq!(records.len(), 8);
    verify_chain(&records).unwrap();
}

// =============================================================================
// Block round trip
// =============================================================================

proptest! {
    #[test]
    fn prop_block_returns_its_records_in_order(
        payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..300), 1..40),
        level in 1i32..10,
    ) {
        let mut chain = HashChain::new();
        let mut raw = Vec::new();
        let mut expected = Vec::new();
        for (seq, payload) in payloads.into_iter().enumerate() {
            let mut record = bet(seq as u32, 0).with_data(payload);
            raw.extend(record.serialize(chain.last_hash().as_ref()));
            chain.advance_to(record.chain_hash);
            expected.push(record);
        }

        let frame = encode_block(&raw, level).unwrap();
        let mut blocks = BlockReader::new(std::io::Cursor::new(frame));
        let block = blocks.next().unwrap();
        prop_assert!(blocks.next().is_none());
        prop_assert_eq!(blocks.stop_reason(), Some(StopReason::EndOfFile));
        prop_assert_eq!(block.data.len(), raw.len());

        let decoded = split_records(&block.data);
        prop_assert_eq!(&decoded, &expected);
        prop_assert!(verify_chain(&decoded).is_ok());
    }
}
