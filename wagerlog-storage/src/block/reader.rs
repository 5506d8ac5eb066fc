use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;
use tracing::{debug, warn};

use super::{decompress_block, BlockHeader, BLOCK_HEADER_SIZE};

/// Why a block stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Clean end of file on a frame boundary
    EndOfFile,
    /// File ends inside a frame header or payload
    Truncated,
    /// Frame header does not start with the block magic
    BadMagic,
    /// zstd rejected the payload
    Decompression,
    /// Underlying read failed for another reason
    ReadError,
}

impl StopReason {
    /// Anything but a clean EOF
    pub fn is_early(&self) -> bool {
        !matches!(self, StopReason::EndOfFile)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::EndOfFile => "end of file",
            StopReason::Truncated => "truncated frame",
            StopReason::BadMagic => "bad block magic",
            StopReason::Decompression => "decompression failure",
            StopReason::ReadError => "read error",
        };
        f.write_str(s)
    }
}

/// A decoded block
#[derive(Debug, Clone)]
pub struct Block {
    /// File offset of the frame header
    pub offset: u64,
    pub header: BlockHeader,
    /// Decompressed record bytes
    pub data: Bytes,
}

/// Streaming iterator over the block frames of one reader.
///
/// Ends at the first frame that cannot be fully read and decompressed;
/// [`BlockReader::stop_reason`] tells why.
pub struct BlockReader<R> {
    reader: R,
    offset: u64,
    stop: Option<StopReason>,
}

impl<R: Read> BlockReader<R> {
    pub fn new(reader: R) -> Self {
        Self::starting_at(reader, 0)
    }

    /// `reader` is already positioned at `offset`
    pub fn starting_at(reader: R, offset: u64) -> Self {
        Self {
            reader,
            offset,
            stop: None,
        }
    }

    /// Offset of the next frame to be read
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// `None` while the stream is still live
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    fn read_block(&mut self) -> Result<Block, StopReason> {
        let mut header_buf = [0u8; BLOCK_HEADER_SIZE];
        match read_full(&mut self.reader, &mut header_buf) {
            Ok(0) => return Err(StopReason::EndOfFile),
            Ok(n) if n < BLOCK_HEADER_SIZE => return Err(StopReason::Truncated),
            Ok(_) => {}
            Err(e) => {
                warn!("Block header read failed at offset {}: {}", self.offset, e);
                return Err(StopReason::ReadError);
            }
        }

        let header = BlockHeader::from_bytes(&header_buf).ok_or(StopReason::BadMagic)?;

        let mut compressed = vec![0u8; header.compressed_len as usize];
        match read_full(&mut self.reader, &mut compressed) {
            Ok(n) if n < compressed.len() => return Err(StopReason::Truncated),
            Ok(_) => {}
            Err(e) => {
                warn!("Block payload read failed at offset {}: {}", self.offset, e);
                return Err(StopReason::ReadError);
            }
        }

        let raw = decompress_block(&compressed).map_err(|e| {
            debug!("Stopping at offset {}: {}", self.offset, e);
            StopReason::Decompression
        })?;

        let block = Block {
            offset: self.offset,
            header,
            data: Bytes::from(raw),
        };
        self.offset += header.frame_len();
        Ok(block)
    }
}

impl<R: Read> Iterator for BlockReader<R> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stop.is_some() {
            return None;
        }
        match self.read_block() {
            Ok(block) => Some(block),
            Err(reason) => {
                self.stop = Some(reason);
                None
            }
        }
    }
}

/// Like `read_exact`, but reports how many bytes arrived before EOF.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
