//! Sidecar block index.
//!
//! One 12-byte entry per appended record: `[seq_no: u32][offset: u64]`,
//! big-endian, no header. The offset is the segment size *before* the block
//! that will hold the record is flushed, i.e. the position of that block's
//! frame, not of the record itself.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use wagerlog_core::error::{Error, Result, ResultExt};

pub const INDEX_ENTRY_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub seq_no: u32,
    pub offset: u64,
}

/// Append one entry. The file is opened and closed on every call.
pub fn append_index_entry(path: &Path, entry: IndexEntry) -> Result<()> {
    let mut buf = Vec::with_capacity(INDEX_ENTRY_SIZE);
    buf.write_u32::<BigEndian>(entry.seq_no)?;
    buf.write_u64::<BigEndian>(entry.offset)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open block index {:?}", path))?;
    file.write_all(&buf)
        .with_context(|| format!("Failed to append block index {:?}", path))?;
    Ok(())
}

/// Coarse SeqNo → block offset map, rebuilt from the sidecar on every load.
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    entries: Vec<IndexEntry>,
    by_seq: HashMap<u32, u64>,
}

impl BlockIndex {
    /// Read the sidecar at `path`. A trailing partial entry is ignored; a
    /// repeated SeqNo keeps its last offset.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open block index {:?}", path))?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut index = BlockIndex::default();
        for chunk in bytes.chunks_exact(INDEX_ENTRY_SIZE) {
            index.insert(IndexEntry::try_from(chunk)?);
        }
        Ok(index)
    }

    fn insert(&mut self, entry: IndexEntry) {
        self.by_seq.insert(entry.seq_no, entry.offset);
        self.entries.push(entry);
    }

    /// Offset of the block frame that holds `seq_no`
    pub fn offset_of(&self, seq_no: u32) -> Option<u64> {
        self.by_seq.get(&seq_no).copied()
    }

    /// Entries in file order, duplicates included
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of distinct SeqNos
    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }

    /// Distinct block offsets, ascending
    pub fn block_offsets(&self) -> Vec<u64> {
        let mut offsets: Vec<u64> = self.entries.iter().map(|e| e.offset).collect();
        offsets.sort_unstable();
        offsets.dedup();
        offsets
    }
}

impl TryFrom<&[u8]> for IndexEntry {
    type Error = Error;

    fn try_from(buf: &[u8]) -> Result<Self> {
        if buf.len() < INDEX_ENTRY_SIZE {
            return Err(Error::BlockIndex {
                message: format!("Index entry needs {} bytes, got {}", INDEX_ENTRY_SIZE, buf.len()),
            });
        }
        Ok(IndexEntry {
            seq_no: BigEndian::read_u32(&buf[0..4]),
            offset: BigEndian::read_u64(&buf[4..12]),
        })
    }
}
