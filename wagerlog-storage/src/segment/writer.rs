use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use wagerlog_core::{
    crypto::{Hash256, HashChain},
    error::{Error, Result, ResultExt},
    metrics::Metrics,
    utils::{format_bytes, now_nanos},
    Record,
};

use super::index::{append_index_entry, IndexEntry};
use super::layout::{index_path_for, partition_dir, SegmentName};
use super::types::SegmentConfig;
use crate::block::BlockCompressor;

/// Append-only writer for one segment file.
///
/// Every operation takes the writer's lock, so one instance can be shared
/// between threads. The hash chain starts from the genesis predecessor when
/// the writer is created and is never persisted.
pub struct SegmentWriter {
    path: PathBuf,
    index_path: PathBuf,
    name: SegmentName,
    config: SegmentConfig,
    metrics: Metrics,
    state: Mutex<WriterState>,
}

struct WriterState {
    /// `None` once closed
    file: Option<File>,
    compressor: Option<BlockCompressor>,
    /// Bytes of block frames written so far
    size: u64,
    chain: HashChain,
    block_buf: Vec<u8>,
    /// Set after a block write fails; the writer refuses further work
    failed: bool,
}

impl SegmentWriter {
    /// Create a fresh segment for `game`/`period`/`shard` under `data_dir`.
    pub fn create(
        data_dir: impl AsRef<Path>,
        game: u32,
        period: u32,
        shard: u32,
        config: SegmentConfig,
    ) -> Result<Self> {
        let dir = partition_dir(data_dir, game, period);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create partition directory {:?}", dir))?;

        let mut nanos = now_nanos();
        let (name, path, file) = loop {
            let name = SegmentName::new(game, period, shard, nanos);
            let path = dir.join(name.file_name());
            match OpenOptions::new().create_new(true).append(true).open(&path) {
                Ok(file) => break (name, path, file),
                // Another writer got the same nanosecond
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => nanos += 1,
                Err(e) => {
                    return Err(Error::Io {
                        message: format!("Failed to create segment {:?}: {}", path, e),
                        source: e,
                    })
                }
            }
        };

        let compressor = BlockCompressor::new(config.compression_level)?;
        let index_path = index_path_for(&path);

        info!(
            "Created segment {:?} (block threshold {}, level {})",
            path,
            config.block_threshold,
            compressor.level()
        );

        Ok(Self {
            path,
            index_path,
            name,
            config,
            metrics: Metrics::new(),
            state: Mutex::new(WriterState {
                file: Some(file),
                compressor: Some(compressor),
                size: 0,
                chain: HashChain::new(),
                block_buf: Vec::new(),
                failed: false,
            }),
        })
    }

    /// Report into a shared metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Serialize `record` onto this writer's chain and buffer it.
    ///
    /// The computed hashes are written back into `record`. One index entry
    /// is appended per call, pointing at the block that will hold the
    /// record. Flushes once the buffer reaches the block threshold.
    pub fn append(&self, record: &mut Record) -> Result<&Path> {
        let mut state = self.state.lock();
        self.check_writable(&state)?;

        let entry = IndexEntry {
            seq_no: record.seq_no,
            offset: state.size,
        };
        let buffered = state.block_buf.len();
        let chain = state.chain.clone();

        let bytes = record.serialize(state.chain.last_hash().as_ref());
        state.chain.advance_to(record.chain_hash);
        state.block_buf.extend_from_slice(&bytes);

        if let Err(e) = append_index_entry(&self.index_path, entry) {
            // Unindexed record never reaches a block; earlier ones stay buffered
            state.block_buf.truncate(buffered);
            state.chain = chain;
            self.metrics.record_write_error();
            return Err(e);
        }
        self.metrics.record_append(bytes.len() as u64);
        self.metrics.record_index_entry();

        if state.block_buf.len() >= self.config.block_threshold {
            flush_state(&mut state, &self.path, &self.metrics)?;
        }
        Ok(&self.path)
    }

    /// Append a record received in wire form. Its stored hashes are
    /// replaced by this writer's chain.
    pub fn append_bytes(&self, bytes: &[u8]) -> Result<&Path> {
        let mut record = Record::parse(bytes)?;
        self.append(&mut record)
    }

    /// Write out the pending block, if any
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.failed {
            return Err(self.failed_error());
        }
        flush_state(&mut state, &self.path, &self.metrics)
    }

    /// Flush, release the compressor and close the file.
    ///
    /// Fails if buffered records had to be dropped because an earlier block
    /// write failed. Later calls do nothing.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.file.is_none() {
            return Ok(());
        }

        let flushed = if state.failed && !state.block_buf.is_empty() {
            let dropped = std::mem::take(&mut state.block_buf);
            Err(Error::Segment {
                message: format!(
                    "Discarded {} buffered bytes of failed writer {:?}",
                    dropped.len(),
                    self.path
                ),
                source: None,
            })
        } else {
            flush_state(&mut state, &self.path, &self.metrics)
        };
        state.compressor = None;
        let file = state.file.take();
        flushed?;

        if let Some(file) = file {
            file.sync_all()
                .with_context(|| format!("Failed to sync segment {:?}", self.path))?;
        }

        info!(
            "Closed segment {:?}: {} records, {}",
            self.path,
            state.chain.len(),
            format_bytes(state.size)
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn name(&self) -> SegmentName {
        self.name
    }

    /// Bytes of block frames on disk
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Serialized bytes waiting for the next flush
    pub fn buffered_len(&self) -> usize {
        self.state.lock().block_buf.len()
    }

    /// Records appended in this session
    pub fn record_count(&self) -> u64 {
        self.state.lock().chain.len()
    }

    /// Configured size limit. Not enforced; segments never rotate.
    pub fn max_size(&self) -> u64 {
        self.config.max_size
    }

    /// ChainHash of the last appended record
    pub fn chain_hash(&self) -> Option<Hash256> {
        self.state.lock().chain.last_hash()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().file.is_none()
    }

    fn check_writable(&self, state: &WriterState) -> Result<()> {
        if state.file.is_none() {
            return Err(Error::SegmentClosed {
                path: self.path.display().to_string(),
            });
        }
        if state.failed {
            return Err(self.failed_error());
        }
        Ok(())
    }

    fn failed_error(&self) -> Error {
        Error::Segment {
            message: format!("Writer for {:?} failed on an earlier write", self.path),
            source: None,
        }
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.file.is_none() {
            return;
        }
        if state.failed {
            if !state.block_buf.is_empty() {
                warn!(
                    "Failed segment {:?} dropped with {} unwritten bytes",
                    self.path,
                    state.block_buf.len()
                );
            }
            return;
        }
        warn!("Segment {:?} dropped without close", self.path);
        if let Err(e) = flush_state(state, &self.path, &self.metrics) {
            warn!("Final flush of {:?} failed: {}", self.path, e);
        }
    }
}

/// Compress and write the pending buffer as one block frame.
fn flush_state(state: &mut WriterState, path: &Path, metrics: &Metrics) -> Result<()> {
    if state.block_buf.is_empty() {
        return Ok(());
    }

    match state.write_block(path) {
        Ok(frame_len) => {
            metrics.record_block_flush(frame_len);
            debug!(
                "Flushed {} byte block to {:?}, segment size {}",
                frame_len, path, state.size
            );
            Ok(())
        }
        Err(e) => {
            state.failed = true;
            metrics.record_write_error();
            Err(e)
        }
    }
}

impl WriterState {
    fn write_block(&mut self, path: &Path) -> Result<u64> {
        let (file, compressor) = match (self.file.as_mut(), self.compressor.as_mut()) {
            (Some(file), Some(compressor)) => (file, compressor),
            _ => {
                return Err(Error::SegmentClosed {
                    path: path.display().to_string(),
                })
            }
        };

        let frame = compressor.encode(&self.block_buf)?;
        file.write_all(&frame)
            .with_context(|| format!("Failed to write block to {:?}", path))?;

        let frame_len = frame.len() as u64;
        self.size += frame_len;
        self.block_buf.clear();
        Ok(frame_len)
    }
}
