//! # Cryptographic Primitives
//!
//! Hashing for record integrity.
//!
//! Every serialized record carries two SHA-256 digests:
//!
//! ```text
//! ThisHash  = H(header || length-prefix || payload)
//! ChainHash = H(prev ChainHash || ThisHash)      prev is empty for genesis
//!
//! Record 1: chain1 = H(this1)
//! Record 2: chain2 = H(chain1 || this2)
//! Record 3: chain3 = H(chain2 || this3)
//! ```
//!
//! If any record is modified, its ThisHash and every later ChainHash change.
//! Nothing checks this on the read path; [`ChainVerifier`] is the explicit
//! verification pass that recomputes both hashes and compares.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::record::Record;

/// Length of a SHA-256 digest in bytes
pub const HASH_SIZE: usize = 32;

/// A SHA-256 digest
pub type Hash256 = [u8; HASH_SIZE];

/// SHA-256 of `data`
pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// Chain digest linking `this_hash` to the previous record's chain hash.
///
/// `prev` is `None` for the first record of a writer session, which hashes
/// an empty predecessor.
pub fn chain_hash(prev: Option<&Hash256>, this_hash: &Hash256) -> Hash256 {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev {
        hasher.update(prev);
    }
    hasher.update(this_hash);
    hasher.finalize().into()
}

/// Running chain state for one writer session.
#[derive(Debug, Clone, Default)]
pub struct HashChain {
    last_hash: Option<Hash256>,
    length: u64,
}

impl HashChain {
    /// Create a chain with an empty (genesis) predecessor
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain hash of the most recent link, `None` before the first record
    pub fn last_hash(&self) -> Option<Hash256> {
        self.last_hash
    }

    /// Number of links added so far
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Compute the next chain hash for `this_hash` and advance to it
    pub fn link(&mut self, this_hash: &Hash256) -> Hash256 {
        let next = chain_hash(self.last_hash.as_ref(), this_hash);
        self.advance_to(next);
        next
    }

    /// Advance to a chain hash computed elsewhere (e.g. during serialization)
    pub fn advance_to(&mut self, chain_hash: Hash256) {
        self.last_hash = Some(chain_hash);
        self.length += 1;
    }
}

/// Streaming verifier for records read back from one writer session.
#[derive(Debug, Default)]
pub struct ChainVerifier {
    chain: HashChain,
}

impl ChainVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records verified so far
    pub fn verified(&self) -> u64 {
        self.chain.len()
    }

    /// Chain hash of the last verified record
    pub fn last_hash(&self) -> Option<Hash256> {
        self.chain.last_hash()
    }

    /// Recompute ThisHash and the running ChainHash for `record`.
    pub fn check(&mut self, record: &Record) -> Result<()> {
        let position = self.chain.len();

        let computed = record.compute_this_hash();
        if computed != record.this_hash {
            return Err(Error::TamperingDetected {
                position,
                expected: hex::encode(record.this_hash),
                computed: hex::encode(computed),
            });
        }

        let expected_chain = self.chain.link(&computed);
        if expected_chain != record.chain_hash {
            return Err(Error::ChainValidation {
                position,
                reason: format!(
                    "chain hash mismatch: stored {}, computed {}",
                    hex::encode(record.chain_hash),
                    hex::encode(expected_chain)
                ),
            });
        }

        Ok(())
    }
}

/// Verify a complete writer session, starting from the genesis predecessor.
pub fn verify_chain<'a, I>(records: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut verifier = ChainVerifier::new();
    for record in records {
        verifier.check(record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_hashes_empty_predecessor() {
        let this = sha256(b"record");
        assert_eq!(chain_hash(None, &this), sha256(&this));
    }

    #[test]
    fn test_chain_links_previous_hash() {
        let mut chain = HashChain::new();
        let first = chain.link(&sha256(b"one"));
        let second = chain.link(&sha256(b"two"));

        let mut joined = first.to_vec();
        joined.extend_from_slice(&sha256(b"two"));
        assert_eq!(second, sha256(&joined));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.last_hash(), Some(second));
    }

    #[test]
    fn test_verifier_detects_altered_payload() {
        let mut first = Record::new(1, 20240101, 1).with_data(b"alpha".to_vec());
        let mut second = Record::new(1, 20240101, 2).with_data(b"beta".to_vec());
        first.serialize(None);
        second.serialize(Some(&first.chain_hash));

        assert!(verify_chain([&first, &second]).is_ok());

        second.data = bytes::Bytes::from_static(b"gamma");
        let err = verify_chain([&first, &second]).unwrap_err();
        assert!(matches!(err, Error::TamperingDetected { position: 1, .. }));
    }

    #[test]
    fn test_verifier_detects_broken_link() {
        let mut first = Record::new(1, 20240101, 1);
        let mut second = Record::new(1, 20240101, 2);
        first.serialize(None);
        // Chained off nothing instead of `first`
        second.serialize(None);

        let err = verify_chain([&first, &second]).unwrap_err();
        assert!(matches!(err, Error::ChainValidation { position: 1, .. }));
    }
}
