//! # Wagerlog Storage
//!
//! Append-only, block-compressed segment files for wagering records.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Write Path                             │
//! │                                                             │
//! │  Record ──> SegmentWriter ──> block buffer ──> zstd frame   │
//! │               │  (hash chain)                    │          │
//! │               ▼                                  ▼          │
//! │          .seg.blkidx                           .seg         │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Read Path                              │
//! │                                                             │
//! │  scan(game, period, shard) ──> one worker per .seg file     │
//! │                                  │                          │
//! │                                  ▼                          │
//! │          BlockReader ──> split_records ──> RecordStream     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod block;
pub mod scanner;
pub mod segment;
pub mod verify;

pub use block::{BlockReader, StopReason};
pub use scanner::{RecordStream, SegmentScanner};
pub use segment::{BlockIndex, SegmentConfig, SegmentReader, SegmentWriter};
pub use verify::{verify_segment, VerifyReport};
