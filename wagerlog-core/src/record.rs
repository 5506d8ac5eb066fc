//! Wagering record and its binary codec.
//!
//! ```text
//! offset  field          size
//! ──────  ─────────────  ────
//!  0      Version        1
//!  1      Flags          1
//!  2      (reserved)     2
//!  4      MachineID      8
//! 12      GameCode       4
//! 16      PeriodID       4
//! 20      SeqNo          4
//! 24      BettorID       8
//! 32      BetTime        8
//! 40      PayloadLength  4
//! 44      Payload        L
//! 44+L    ThisHash       32
//! 76+L    ChainHash      32
//! ```
//!
//! All integers are big-endian. Hashes are filled in by [`Record::serialize`];
//! [`Record::parse`] copies them out verbatim and never recomputes them.

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use crate::crypto::{chain_hash, sha256, Hash256, HASH_SIZE};
use crate::error::{Error, Result};

/// Version byte written by this codec
pub const RECORD_VERSION: u8 = 1;
/// Fixed header size, up to the payload length prefix
pub const HEADER_SIZE: usize = 40;
pub const LENGTH_PREFIX_SIZE: usize = 4;
/// ThisHash followed by ChainHash
pub const HASHES_SIZE: usize = 2 * HASH_SIZE;
/// Size of a record with an empty payload
pub const MIN_RECORD_SIZE: usize = HEADER_SIZE + LENGTH_PREFIX_SIZE + HASHES_SIZE;

/// One immutable wagering event.
///
/// SeqNo is assigned by the caller and is not checked for uniqueness or
/// monotonicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub version: u8,
    pub flags: u8,
    pub machine_id: u64,
    pub game_code: u32,
    pub period_id: u32,
    pub seq_no: u32,
    pub bettor_id: u64,
    pub bet_time: u64,
    pub data: Bytes,
    pub this_hash: Hash256,
    pub chain_hash: Hash256,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            version: RECORD_VERSION,
            flags: 0,
            machine_id: 0,
            game_code: 0,
            period_id: 0,
            seq_no: 0,
            bettor_id: 0,
            bet_time: 0,
            data: Bytes::new(),
            this_hash: [0u8; HASH_SIZE],
            chain_hash: [0u8; HASH_SIZE],
        }
    }
}

impl Record {
    /// Create a record for a game/period partition
    pub fn new(game_code: u32, period_id: u32, seq_no: u32) -> Self {
        Self {
            game_code,
            period_id,
            seq_no,
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_machine(mut self, machine_id: u64) -> Self {
        self.machine_id = machine_id;
        self
    }

    pub fn with_bettor(mut self, bettor_id: u64) -> Self {
        self.bettor_id = bettor_id;
        self
    }

    pub fn with_bet_time(mut self, bet_time: u64) -> Self {
        self.bet_time = bet_time;
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Serialized size of this record
    pub fn encoded_len(&self) -> usize {
        MIN_RECORD_SIZE + self.data.len()
    }

    /// Serialize the record, chaining it off `prev_chain`.
    ///
    /// `prev_chain` must be `None` for the first record of a writer session
    /// and the previous record's ChainHash otherwise. The computed hashes are
    /// written back into `self`, and `version` is set to [`RECORD_VERSION`].
    pub fn serialize(&mut self, prev_chain: Option<&Hash256>) -> Vec<u8> {
        self.version = RECORD_VERSION;

        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_body(&mut out);

        let this_hash = sha256(&out);
        out.extend_from_slice(&this_hash);

        let chain = chain_hash(prev_chain, &this_hash);
        out.extend_from_slice(&chain);

        self.this_hash = this_hash;
        self.chain_hash = chain;
        out
    }

    /// Recompute ThisHash from the current field values without touching the
    /// stored hashes.
    pub fn compute_this_hash(&self) -> Hash256 {
        let mut body = Vec::with_capacity(HEADER_SIZE + LENGTH_PREFIX_SIZE + self.data.len());
        self.encode_body(&mut body);
        sha256(&body)
    }

    /// Parse one record from the front of `buf`, copying the payload.
    ///
    /// Bytes past the end of the record are ignored.
    pub fn parse(buf: &[u8]) -> Result<Record> {
        let payload_len = check_bounds(buf)?;
        let data = Bytes::copy_from_slice(&buf[payload_start()..payload_start() + payload_len]);
        Ok(decode_fields(buf, payload_len, data))
    }

    /// Like [`Record::parse`], but the payload shares `buf`'s allocation.
    pub fn parse_shared(buf: &Bytes) -> Result<Record> {
        let payload_len = check_bounds(buf)?;
        let data = buf.slice(payload_start()..payload_start() + payload_len);
        Ok(decode_fields(buf, payload_len, data))
    }

    /// Header, length prefix and payload: the bytes ThisHash covers.
    fn encode_body(&self, out: &mut Vec<u8>) {
        let mut header = [0u8; HEADER_SIZE];
        header[0] = self.version;
        header[1] = self.flags;
        BigEndian::write_u64(&mut header[4..12], self.machine_id);
        BigEndian::write_u32(&mut header[12..16], self.game_code);
        BigEndian::write_u32(&mut header[16..20], self.period_id);
        BigEndian::write_u32(&mut header[20..24], self.seq_no);
        BigEndian::write_u64(&mut header[24..32], self.bettor_id);
        BigEndian::write_u64(&mut header[32..40], self.bet_time);

        out.extend_from_slice(&header);
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
    }
}

/// Total length of the record at the front of `buf`, if it fits.
pub fn record_len(buf: &[u8]) -> Option<usize> {
    check_bounds(buf).ok().map(|payload_len| MIN_RECORD_SIZE + payload_len)
}

#[inline]
fn payload_start() -> usize {
    HEADER_SIZE + LENGTH_PREFIX_SIZE
}

/// Validate sizes and return the declared payload length.
fn check_bounds(buf: &[u8]) -> Result<usize> {
    if buf.len() < MIN_RECORD_SIZE {
        return Err(Error::BufferTooSmall {
            len: buf.len(),
            required: MIN_RECORD_SIZE,
        });
    }

    let payload_len = BigEndian::read_u32(&buf[HEADER_SIZE..payload_start()]) as usize;
    let available = buf.len() - MIN_RECORD_SIZE;
    if payload_len > available {
        return Err(Error::Truncated {
            declared: payload_len,
            available,
        });
    }
    Ok(payload_len)
}

fn decode_fields(buf: &[u8], payload_len: usize, data: Bytes) -> Record {
    let hashes = payload_start() + payload_len;
    let mut this_hash = [0u8; HASH_SIZE];
    let mut chain_hash = [0u8; HASH_SIZE];
    this_hash.copy_from_slice(&buf[hashes..hashes + HASH_SIZE]);
    chain_hash.copy_from_slice(&buf[hashes + HASH_SIZE..hashes + HASHES_SIZE]);

    Record {
        version: buf[0],
        flags: buf[1],
        machine_id: BigEndian::read_u64(&buf[4..12]),
        game_code: BigEndian::read_u32(&buf[12..16]),
        period_id: BigEndian::read_u32(&buf[16..20]),
        seq_no: BigEndian::read_u32(&buf[20..24]),
        bettor_id: BigEndian::read_u64(&buf[24..32]),
        bet_time: BigEndian::read_u64(&buf[32..40]),
        data,
        this_hash,
        chain_hash,
    }
}
