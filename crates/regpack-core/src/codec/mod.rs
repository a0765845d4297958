//! Register-table codec.
//!
//! ## Pipeline
//!
//! Encoding a table runs five passes over it:
//!
//! 1. [`unroll()`] expands any bursts already present in the source
//! 2. [`RunMetrics::scan`] measures runs and zero-runs
//! 3. [`compress_zero_runs`] collapses long zero-runs into `Switch` markers
//! 4. [`RunMetrics::scan`] again, since collapsing moved the run boundaries
//! 5. [`encode_bursts`] packs the remaining long runs as bursts
//!
//! Decoding unrolls bursts and then expands `Switch` markers, yielding the
//! flat list of register writes the table stands for.
//!
//! ## Extensibility
//!
//! The [`SequenceCodec`] trait lets callers swap in a different table codec:
//!
//! ```
//! use regpack_core::codec::SequenceCodec;
//! use regpack_core::{Entry, Result};
//!
//! struct Identity;
//!
//! impl SequenceCodec for Identity {
//!     fn encode(&self, entries: &[Entry]) -> Result<Vec<Entry>> {
//!         Ok(entries.to_vec())
//!     }
//!
//!     fn decode(&self, entries: &[Entry]) -> Result<Vec<Entry>> {
//!         Ok(entries.to_vec())
//!     }
//! }
//! ```

mod burst;
mod metrics;
mod unroll;
mod zero_run;

use crate::entry::{Entry, EntrySequence};
use crate::error::Result;
use tracing::debug;

pub use burst::encode_bursts;
pub use metrics::RunMetrics;
pub use unroll::unroll;
pub use zero_run::{compress_zero_runs, expand_zero_runs};

/// Zero-runs must be strictly longer than this to be collapsed
pub const MIN_ZEROS: usize = 4;

/// Runs must be strictly longer than this to be packed as a burst
pub const MIN_SEQ: usize = 2;

/// Largest `Switch` count the codec emits or expands; a 16-bit register
/// space holds no longer run
pub const MAX_SWITCH_COUNT: u32 = u16::MAX as u32;

/// Configuration for the codec
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Zero-run threshold
    pub min_zeros: usize,
    /// Run threshold for bursts
    pub min_seq: usize,
    /// Largest count a `Switch` marker may carry (None = unlimited)
    pub max_switch_count: Option<u32>,
    /// Largest count a `Burst` marker may carry (None = unlimited)
    pub max_burst_count: Option<u32>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            min_zeros: MIN_ZEROS,
            min_seq: MIN_SEQ,
            max_switch_count: None,
            max_burst_count: None,
        }
    }
}

impl CodecConfig {
    /// Creates a new codec config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the zero-run threshold
    pub fn min_zeros(mut self, min: usize) -> Self {
        self.min_zeros = min;
        self
    }

    /// Sets the burst run threshold
    pub fn min_seq(mut self, min: usize) -> Self {
        self.min_seq = min;
        self
    }

    /// Caps the count of emitted `Switch` markers
    pub fn max_switch_count(mut self, max: u32) -> Self {
        self.max_switch_count = Some(max);
        self
    }

    /// Caps the count of emitted `Burst` markers
    pub fn max_burst_count(mut self, max: u32) -> Self {
        self.max_burst_count = Some(max);
        self
    }
}

/// Trait for table codecs
pub trait SequenceCodec: Send + Sync {
    /// Encodes a table into its denser form
    fn encode(&self, entries: &[Entry]) -> Result<EntrySequence>;

    /// Reconstructs the flat list of register writes a table stands for
    fn decode(&self, entries: &[Entry]) -> Result<EntrySequence>;
}

/// Zero-run and burst codec
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    /// Creates a new codec with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new codec with custom configuration
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl SequenceCodec for Codec {
    fn encode(&self, entries: &[Entry]) -> Result<EntrySequence> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let expanded = unroll(entries)?;
        let metrics = RunMetrics::scan(&expanded);
        let compressed = compress_zero_runs(&expanded, &metrics, &self.config);
        let metrics = RunMetrics::scan(&compressed);
        let encoded = encode_bursts(&compressed, &metrics, &self.config);

        debug!(
            "Encoded {} entries ({} unrolled, {} after zero-runs) into {}",
            entries.len(),
            expanded.len(),
            compressed.len(),
            encoded.len()
        );
        Ok(encoded)
    }

    fn decode(&self, entries: &[Entry]) -> Result<EntrySequence> {
        let unrolled = unroll(entries)?;
        expand_zero_runs(&unrolled)
    }
}
