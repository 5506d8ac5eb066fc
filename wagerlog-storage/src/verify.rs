//! Offline tamper check for one segment file.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use wagerlog_core::{
    crypto::{ChainVerifier, Hash256},
    error::Result,
};

use crate::block::StopReason;
use crate::segment::SegmentReader;

/// Outcome of a successful verification pass
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub path: PathBuf,
    pub records: u64,
    pub blocks: u64,
    /// Why the read stopped; anything but `EndOfFile` means a damaged tail
    #[serde(serialize_with = "stop_reason_str")]
    pub stop_reason: Option<StopReason>,
    #[serde(serialize_with = "hash_hex")]
    pub last_chain_hash: Option<Hash256>,
}

impl VerifyReport {
    /// Every block decoded up to a clean end of file
    pub fn is_complete(&self) -> bool {
        matches!(self.stop_reason, Some(StopReason::EndOfFile))
    }
}

/// Recompute every ThisHash and the running ChainHash of a segment,
/// starting from the genesis predecessor.
///
/// Returns the first mismatch as an error. A damaged tail is not a
/// mismatch: the report says where decoding stopped.
pub fn verify_segment(path: impl AsRef<Path>) -> Result<VerifyReport> {
    let path = path.as_ref();
    let mut reader = SegmentReader::open(path)?;
    let mut verifier = ChainVerifier::new();

    for record in reader.by_ref() {
        if let Err(e) = verifier.check(&record) {
            warn!("Verification of {:?} failed: {}", path, e);
            return Err(e);
        }
    }

    let report = VerifyReport {
        path: path.to_path_buf(),
        records: verifier.verified(),
        blocks: reader.blocks_read(),
        stop_reason: reader.stop_reason(),
        last_chain_hash: verifier.last_hash(),
    };
    info!(
        "Verified {:?}: {} records in {} blocks",
        path, report.records, report.blocks
    );
    Ok(report)
}

fn stop_reason_str<S: serde::Serializer>(
    reason: &Option<StopReason>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match reason {
        Some(reason) => s.serialize_str(&reason.to_string()),
        None => s.serialize_none(),
    }
}

fn hash_hex<S: serde::Serializer>(
    hash: &Option<Hash256>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match hash {
        Some(hash) => s.serialize_str(&hex::encode(hash)),
        None => s.serialize_none(),
    }
}
