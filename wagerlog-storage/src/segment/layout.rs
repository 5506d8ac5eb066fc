//! On-disk naming for partitions, segments and sidecar indexes.
//!
//! ```text
//! data/
//! ├── 07/                                   game code, 2 digits
//! │   └── 20240315/                         period id, 8 digits
//! │       ├── g07_p20240315_s0000_1710460800123456789.seg
//! │       ├── g07_p20240315_s0000_1710460800123456789.seg.blkidx
//! │       └── g07_p20240315_s0001_1710460800987654321.seg
//! ```

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

pub const SEGMENT_EXTENSION: &str = "seg";
pub const INDEX_SUFFIX: &str = ".blkidx";

/// Directory holding every segment of one game/period partition
pub fn partition_dir(base: impl AsRef<Path>, game: u32, period: u32) -> PathBuf {
    base.as_ref()
        .join(format!("{:02}", game))
        .join(format!("{:08}", period))
}

/// Sidecar index path for a segment
pub fn index_path_for(segment: &Path) -> PathBuf {
    let mut name = OsString::from(segment.as_os_str());
    name.push(INDEX_SUFFIX);
    PathBuf::from(name)
}

/// Parsed segment filename.
///
/// The creation timestamp keeps concurrently created writers for the same
/// partition and shard from colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentName {
    pub game: u32,
    pub period: u32,
    pub shard: u32,
    pub created_nanos: u64,
}

impl SegmentName {
    pub fn new(game: u32, period: u32, shard: u32, created_nanos: u64) -> Self {
        Self {
            game,
            period,
            shard,
            created_nanos,
        }
    }

    /// Parse `g{game}_p{period}_s{shard}_{nanos}.seg`; `None` for anything else.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(&format!(".{}", SEGMENT_EXTENSION))?;
        let mut parts = stem.split('_');

        let game = parts.next()?.strip_prefix('g')?.parse().ok()?;
        let period = parts.next()?.strip_prefix('p')?.parse().ok()?;
        let shard = parts.next()?.strip_prefix('s')?.parse().ok()?;
        let created_nanos = parts.next()?.parse().ok()?;

        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(game, period, shard, created_nanos))
    }

    /// Parse the final component of `path`
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()?.to_str().and_then(Self::parse)
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "g{:02}_p{:08}_s{:04}_{}.{}",
            self.game, self.period, self.shard, self.created_nanos, SEGMENT_EXTENSION
        )
    }
}
