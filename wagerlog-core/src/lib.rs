//! # wagerlog core
//!
//! Building blocks shared by every wagerlog crate:
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  wagerlog-core                  │
//! ├─────────────────────────────────────────────────┤
//! │  • record   - Record entity and wire codec      │
//! │  • crypto   - SHA-256 hash chain, verification  │
//! │  • error    - Error handling                    │
//! │  • config   - Storage/API/logging settings      │
//! │  • metrics  - Atomic counters                   │
//! │  • utils    - Common utilities                  │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod metrics;
pub mod record;
pub mod utils;

// Re-export commonly used types
pub use crypto::{verify_chain, ChainVerifier, Hash256, HashChain, HASH_SIZE};
pub use error::{Error, Result};
pub use metrics::{Metrics, MetricsSnapshot};
pub use record::{Record, MIN_RECORD_SIZE, RECORD_VERSION};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
