//! Segment files and their sidecar block index.
//!
//! ```text
//! SegmentWriter::append(record)
//!   │
//!   ├─► Record::serialize(prev chain hash) ──► block buffer
//!   ├─► <segment>.seg.blkidx  += (SeqNo, size before flush)
//!   └─► buffer >= threshold ? ──► BlockCompressor ──► <segment>.seg
//!
//! SegmentReader ◄── BlockReader ◄── <segment>.seg  (optionally from an index offset)
//! ```

mod index;
mod layout;
mod reader;
mod types;
mod writer;

pub use index::{append_index_entry, BlockIndex, IndexEntry, INDEX_ENTRY_SIZE};
pub use layout::{index_path_for, partition_dir, SegmentName, INDEX_SUFFIX, SEGMENT_EXTENSION};
pub use reader::{split_records, SegmentReader};
pub use types::SegmentConfig;
pub use writer::SegmentWriter;
