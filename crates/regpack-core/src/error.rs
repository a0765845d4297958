//! Error types for the regpack-core library.
//!
//! Codec failures are always local to the sequence being processed: a block
//! either transforms completely or fails as a whole. Header parsing failures
//! carry the line they were found on.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for regpack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all regpack operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A burst declares more entries than the sequence still holds
    #[error("burst at entry {position} declares {declared} writes but the sequence ends {missing} short")]
    TruncatedBurst {
        /// Position of the burst marker
        position: usize,
        /// Count carried by the burst marker
        declared: u32,
        /// Register writes that could not be reconstructed
        missing: u32,
    },

    /// A meta entry carries a count that is not a usable non-negative integer
    #[error("invalid meta count '{count}' at entry {position}")]
    InvalidMetaCount {
        /// Position of the offending entry
        position: usize,
        /// The count as written
        count: String,
    },

    /// A burst header or continuation slot holds something other than a register pair
    #[error("malformed burst at entry {position}: {details}")]
    MalformedBurst {
        /// Position of the offending entry
        position: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// A zero-run marker with no register write before it
    #[error("zero-run marker at entry {position} has no preceding register write")]
    OrphanSwitch {
        /// Position of the marker
        position: usize,
    },

    /// Sequential address arithmetic left the 32-bit address space
    #[error("register address overflow after 0x{address:x} at entry {position}")]
    AddressOverflow {
        /// Position of the entry whose expansion overflowed
        position: usize,
        /// Last address that could be represented
        address: u32,
    },

    /// An initializer line that is not a two-field pair
    #[error("malformed pair on line {line}: {details}")]
    MalformedPair {
        /// 1-based source line
        line: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Encoding a table failed
    #[error("table opened on line {line} could not be encoded: {source}")]
    BlockFailed {
        /// 1-based line of the table's opening statement
        line: usize,
        /// The codec failure
        #[source]
        source: Box<Error>,
    },

    /// Decoding an encoded table does not reproduce the original writes
    #[error("encoded table opened on line {line} does not decode to the original writes")]
    RoundTripMismatch {
        /// 1-based line of the table's opening statement
        line: usize,
    },

    /// A numeric field that does not parse
    #[error("invalid integer literal '{literal}' on line {line}")]
    InvalidLiteral {
        /// 1-based source line
        line: usize,
        /// The literal as written
        literal: String,
    },

    /// A `META` token that names no known marker
    #[error("unknown meta token '{token}' on line {line}")]
    UnknownMetaToken {
        /// 1-based source line
        line: usize,
        /// The token as written
        token: String,
    },

    /// Input ended inside an initializer block
    #[error("initializer block opened on line {line} is never terminated")]
    UnterminatedBlock {
        /// 1-based line of the block's opening statement
        line: usize,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new truncated burst error
    pub fn truncated_burst(position: usize, declared: u32, missing: u32) -> Self {
        Self::TruncatedBurst {
            position,
            declared,
            missing,
        }
    }

    /// Creates a new invalid meta count error
    pub fn invalid_meta_count(position: usize, count: impl ToString) -> Self {
        Self::InvalidMetaCount {
            position,
            count: count.to_string(),
        }
    }

    /// Creates a new malformed burst error
    pub fn malformed_burst(position: usize, details: impl Into<String>) -> Self {
        Self::MalformedBurst {
            position,
            details: details.into(),
        }
    }

    /// Creates a new malformed pair error
    pub fn malformed_pair(line: usize, details: impl Into<String>) -> Self {
        Self::MalformedPair {
            line,
            details: details.into(),
        }
    }

    /// Creates a new invalid literal error
    pub fn invalid_literal(line: usize, literal: impl Into<String>) -> Self {
        Self::InvalidLiteral {
            line,
            literal: literal.into(),
        }
    }

    /// Creates a new block failure, tagging a codec error with its table
    pub fn block_failed(line: usize, source: Error) -> Self {
        Self::BlockFailed {
            line,
            source: Box::new(source),
        }
    }

    /// Returns true if the failure concerns a single block and the rest of
    /// the file can still be processed
    pub fn is_block_local(&self) -> bool {
        match self {
            Self::BlockFailed { source, .. } => source.is_block_local(),
            _ => matches!(
                self,
                Self::TruncatedBurst { .. }
                    | Self::InvalidMetaCount { .. }
                    | Self::MalformedBurst { .. }
                    | Self::OrphanSwitch { .. }
                    | Self::AddressOverflow { .. }
            ),
        }
    }
}
