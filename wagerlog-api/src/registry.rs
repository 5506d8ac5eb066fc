//! Long-lived segment writers, one per game/period partition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use wagerlog_core::{
    error::{Error, Result},
    metrics::Metrics,
    Record,
};
use wagerlog_storage::segment::{SegmentConfig, SegmentWriter};

/// Writers are created on first use and stay open, so one writer session
/// (and one hash chain) spans many requests.
pub struct WriterRegistry {
    data_dir: PathBuf,
    shard: u32,
    config: SegmentConfig,
    metrics: Metrics,
    /// Flush after every append so an acknowledged record is on disk
    flush_each_write: bool,
    writers: DashMap<(u32, u32), Arc<SegmentWriter>>,
}

impl WriterRegistry {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        shard: u32,
        config: SegmentConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            shard,
            config,
            metrics,
            flush_each_write: true,
            writers: DashMap::new(),
        }
    }

    /// Leave records buffered until the block threshold is reached
    pub fn with_flush_each_write(mut self, flush_each_write: bool) -> Self {
        self.flush_each_write = flush_each_write;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn shard(&self) -> u32 {
        self.shard
    }

    /// Writer for a partition, creating its segment if needed
    pub fn writer_for(&self, game: u32, period: u32) -> Result<Arc<SegmentWriter>> {
        if let Some(writer) = self.writers.get(&(game, period)) {
            return Ok(Arc::clone(writer.value()));
        }

        match self.writers.entry((game, period)) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let writer = SegmentWriter::create(
                    &self.data_dir,
                    game,
                    period,
                    self.shard,
                    self.config.clone(),
                )?
                .with_metrics(self.metrics.clone());
                let writer = Arc::new(writer);
                entry.insert(Arc::clone(&writer));
                Ok(writer)
            }
        }
    }

    /// Route `record` to its partition's writer. Returns the record with the
    /// hashes assigned by that writer.
    ///
    /// A writer that fails is closed and dropped from the registry; the next
    /// record for the partition opens a fresh segment.
    pub fn append(&self, mut record: Record) -> Result<Record> {
        let key = (record.game_code, record.period_id);
        let writer = self.writer_for(key.0, key.1)?;

        let written = writer.append(&mut record).and_then(|_| {
            if self.flush_each_write {
                writer.flush()
            } else {
                Ok(())
            }
        });

        if let Err(e) = written {
            if !e.is_recoverable() {
                self.retire(key, &writer, &e);
            }
            return Err(e);
        }
        Ok(record)
    }

    fn retire(&self, key: (u32, u32), writer: &Arc<SegmentWriter>, cause: &Error) {
        warn!("Retiring writer {:?}: {}", writer.path(), cause);
        self.writers.remove_if(&key, |_, w| Arc::ptr_eq(w, writer));
        if let Err(e) = writer.close() {
            warn!("Failed to close retired writer {:?}: {}", writer.path(), e);
        }
    }

    /// Open writers
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Close and forget every writer. Returns the first close error.
    pub fn close_all(&self) -> Result<()> {
        let keys: Vec<(u32, u32)> = self.writers.iter().map(|e| *e.key()).collect();
        let mut first_err = None;

        for key in keys {
            if let Some((_, writer)) = self.writers.remove(&key) {
                if let Err(e) = writer.close() {
                    warn!("Failed to close {:?}: {}", writer.path(), e);
                    first_err.get_or_insert(e);
                }
            }
        }

        info!("Closed all segment writers");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
