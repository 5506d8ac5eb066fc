use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::vec;

use bytes::Bytes;

use wagerlog_core::{
    error::{Result, ResultExt},
    record::record_len,
    Record,
};

use crate::block::{BlockReader, StopReason};

/// Sequential record reader over one segment file.
///
/// Yields records in on-disk order and ends quietly at the first block that
/// cannot be decoded; the remainder of the file is never looked at.
pub struct SegmentReader {
    path: PathBuf,
    blocks: BlockReader<BufReader<File>>,
    pending: vec::IntoIter<Record>,
    blocks_read: u64,
}

impl SegmentReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_at(path, 0)
    }

    /// Start decoding at the block frame at `offset`, typically taken from
    /// the sidecar index.
    pub fn open_at(path: impl AsRef<Path>, offset: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)
            .with_context(|| format!("Failed to open segment {:?}", path))?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .with_context(|| format!("Failed to seek segment {:?} to {}", path, offset))?;
        }

        Ok(Self {
            path,
            blocks: BlockReader::starting_at(BufReader::new(file), offset),
            pending: Vec::new().into_iter(),
            blocks_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Why decoding ended; `None` until it has
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.blocks.stop_reason()
    }

    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }
}

impl Iterator for SegmentReader {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.next() {
                return Some(record);
            }
            let block = self.blocks.next()?;
            self.blocks_read += 1;
            self.pending = split_records(&block.data).into_iter();
        }
    }
}

/// Walk one decompressed block, record by record.
///
/// Each record's length prefix locates the next one. Parsing stops at the
/// first record that does not fit in what is left of the block.
pub fn split_records(raw: &Bytes) -> Vec<Record> {
    let mut records = Vec::new();
    let mut pos = 0;
    while let Some(len) = record_len(&raw[pos..]) {
        let Ok(record) = Record::parse_shared(&raw.slice(pos..pos + len)) else {
            break;
        };
        records.push(record);
        pos += len;
    }
    records
}
