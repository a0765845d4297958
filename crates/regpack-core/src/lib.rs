//! # regpack-core
//!
//! A library for shrinking the register-initialization tables that embedded
//! firmware carries in its headers.
//!
//! This crate provides the core functionality for:
//! - Collapsing long runs of zero writes into a single `Switch` marker
//! - Packing long runs of sequential register writes into bursts
//! - Reconstructing the flat list of register writes from either form
//! - Reading and rewriting tables held in C array initializers
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`entry`]: The typed table model
//! - [`codec`]: Run metrics, unrolling, zero-run and burst passes
//! - [`header`]: C header scanning and rendering
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use regpack_core::{Codec, Entry, MetaKind, SequenceCodec};
//!
//! let table: Vec<Entry> = (0x1c..0x24).map(|address| Entry::register(address, 0)).collect();
//!
//! let codec = Codec::new();
//! let encoded = codec.encode(&table)?;
//! assert_eq!(
//!     encoded,
//!     vec![Entry::register(0x1c, 0), Entry::meta(MetaKind::Switch, 7)]
//! );
//! assert_eq!(codec.decode(&encoded)?, table);
//! # Ok::<(), regpack_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! The library provides several traits for customization:
//!
//! - [`SequenceCodec`]: Swap in a different table codec
//! - [`EntryWriter`]: Customize how tables are written
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod entry;
pub mod error;
pub mod header;

// Re-export primary types for convenience
pub use codec::{Codec, CodecConfig, RunMetrics, SequenceCodec};
pub use entry::{Entry, EntrySequence, Key, MetaKind};
pub use error::{Error, Result};
pub use header::{
    BlockPolicy, EntryWriter, Header, HeaderScanner, NullWriter, ScannerConfig, StatsWriter,
    TransformReport,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
