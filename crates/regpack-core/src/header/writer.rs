//! Extensible header writing traits.
//!
//! This module provides the [`EntryWriter`] trait for customizing how a
//! parsed header is written back out.

use crate::entry::{Entry, Key, MetaKind};
use std::fmt::{Result, Write};

/// Trait for writing header segments to output.
///
/// [`Header::write_to`](super::Header::write_to) drives a writer through
/// every line and entry of a header in source order. All methods default
/// to doing nothing.
pub trait EntryWriter {
    /// Write a line outside any table, or a table's opening, note or
    /// terminating line
    fn write_line(&mut self, line: &str) -> Result {
        let _ = line;
        Ok(())
    }

    /// Write one table entry
    fn write_entry(&mut self, entry: &Entry) -> Result {
        let _ = entry;
        Ok(())
    }
}

/// A no-op writer that discards all output
pub struct NullWriter;

impl EntryWriter for NullWriter {}

/// A writer that counts table entries by kind
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsWriter {
    /// Number of plain register writes
    pub register_count: usize,
    /// Number of zero-run markers
    pub switch_count: usize,
    /// Number of burst markers
    pub burst_count: usize,
    /// Number of delay markers
    pub delay_count: usize,
}

impl StatsWriter {
    /// Total number of table entries seen
    pub fn entry_count(&self) -> usize {
        self.register_count + self.switch_count + self.burst_count + self.delay_count
    }
}

impl EntryWriter for StatsWriter {
    fn write_entry(&mut self, entry: &Entry) -> Result {
        match entry.key {
            Key::Address(_) => self.register_count += 1,
            Key::Meta(MetaKind::Switch) => self.switch_count += 1,
            Key::Meta(MetaKind::Burst) => self.burst_count += 1,
            Key::Meta(MetaKind::Delay) => self.delay_count += 1,
        }
        Ok(())
    }
}

/// Writes C header text
///
/// Entries are written as `{ 0x1c, 0x00 },` or `{ CFG_META_BURST, 9 },`
/// behind the configured indent. Lines are separated by `\n` with no
/// trailing newline.
pub struct HeaderWriter<'a, W: Write> {
    writer: &'a mut W,
    indent: &'a str,
    first_line: bool,
}

impl<'a, W: Write> HeaderWriter<'a, W> {
    /// Creates a writer that appends to `writer`
    pub fn new(writer: &'a mut W, indent: &'a str) -> Self {
        Self {
            writer,
            indent,
            first_line: true,
        }
    }

    fn start_line(&mut self) -> Result {
        if !std::mem::take(&mut self.first_line) {
            self.writer.write_char('\n')?;
        }
        Ok(())
    }
}

impl<W: Write> EntryWriter for HeaderWriter<'_, W> {
    fn write_line(&mut self, line: &str) -> Result {
        self.start_line()?;
        self.writer.write_str(line)
    }

    fn write_entry(&mut self, entry: &Entry) -> Result {
        self.start_line()?;
        write!(self.writer, "{}{},", self.indent, entry)
    }
}
