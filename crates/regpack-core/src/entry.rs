//! Typed register-table entries.
//!
//! A table is an ordered list of `(key, value)` pairs. The key is either a
//! hardware register address or one of the loader's meta markers, whose
//! value is then a count rather than a register payload.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// An ordered register table, as extracted from one initializer block
pub type EntrySequence = Vec<Entry>;

/// Meta markers understood by the register loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    /// Write `count` zero bytes after the previous register
    Switch,
    /// Burst write: one header pair followed by packed value pairs
    Burst,
    /// Sleep for `count` milliseconds
    Delay,
}

impl MetaKind {
    /// All marker kinds
    pub const ALL: [MetaKind; 3] = [MetaKind::Switch, MetaKind::Burst, MetaKind::Delay];

    /// Returns the token used for this marker in header sources
    pub fn token(&self) -> &'static str {
        match self {
            MetaKind::Switch => "CFG_META_SWITCH",
            MetaKind::Burst => "CFG_META_BURST",
            MetaKind::Delay => "CFG_META_DELAY",
        }
    }
}

impl fmt::Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Error returned when a token names no known marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetaKind(
    /// The token as written
    pub String,
);

impl FromStr for MetaKind {
    type Err = UnknownMetaKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MetaKind::ALL
            .into_iter()
            .find(|kind| kind.token() == s)
            .ok_or_else(|| UnknownMetaKind(s.to_string()))
    }
}

impl UnknownMetaKind {
    /// Attaches the source line the token was found on
    pub fn at_line(self, line: usize) -> Error {
        Error::UnknownMetaToken { line, token: self.0 }
    }
}

/// Left half of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A hardware register address
    Address(u32),
    /// A meta marker
    Meta(MetaKind),
}

/// One table row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Register address or marker
    pub key: Key,
    /// Register payload, or the marker's count
    pub value: u32,
}

impl Entry {
    /// Creates a register write
    pub const fn register(address: u32, value: u32) -> Self {
        Self {
            key: Key::Address(address),
            value,
        }
    }

    /// Creates a meta marker
    pub const fn meta(kind: MetaKind, count: u32) -> Self {
        Self {
            key: Key::Meta(kind),
            value: count,
        }
    }

    /// Returns the register address, if this is a register write
    pub fn address(&self) -> Option<u32> {
        match self.key {
            Key::Address(address) => Some(address),
            Key::Meta(_) => None,
        }
    }

    /// Returns the marker kind, if this is a meta entry
    pub fn meta_kind(&self) -> Option<MetaKind> {
        match self.key {
            Key::Address(_) => None,
            Key::Meta(kind) => Some(kind),
        }
    }

    /// Returns true if this is a meta entry of the given kind
    pub fn is_meta(&self, kind: MetaKind) -> bool {
        self.meta_kind() == Some(kind)
    }

    /// Returns true if this register write sits at the address directly
    /// below `next`, i.e. the two continue one sequential run
    pub fn precedes(&self, next: Option<u32>) -> bool {
        match (self.address(), next) {
            (Some(address), Some(next)) => address.checked_add(1) == Some(next),
            _ => false,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key {
            Key::Address(address) => write!(f, "{{ 0x{:02x}, 0x{:02x} }}", address, self.value),
            Key::Meta(kind) => write!(f, "{{ {}, {} }}", kind, self.value),
        }
    }
}
