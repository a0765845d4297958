//! C header adapter.
//!
//! Finds register tables written as C array initializers, hands each one to
//! a [`SequenceCodec`], and writes the header back out with every other line
//! left as it was.
//!
//! ## Table Layout
//!
//! ```c
//! const tas5805m_cfg_reg_t channel_config[] = {
//!     { 0x00, 0x00 },     // Page 0
//!     { CFG_META_BURST, 5 },
//!     { 0x1C, 0x00 },
//!     { 0x80, 0x00 },
//!     { 0x00, 0x00 },
//! };
//! ```
//!
//! A line containing the block marker (`const` by default) opens a table and
//! the next line containing `;` closes it. Inside, every line with both `{`
//! and `}` is one entry. Other non-empty lines are kept as notes and written
//! ahead of the entries; trailing comments on entry lines are dropped.

mod writer;

use crate::codec::SequenceCodec;
use crate::entry::{Entry, EntrySequence, MetaKind};
use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;
use tracing::{debug, trace, warn};

pub use writer::{EntryWriter, HeaderWriter, NullWriter, StatsWriter};

/// Fields containing this are meta tokens rather than numbers
const META_MARKER: &str = "META";

/// Configuration for header scanning and rendering
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Substring that marks a table's opening line
    pub block_marker: String,
    /// Indentation written ahead of each entry
    pub indent: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            block_marker: "const".to_string(),
            indent: "\t".to_string(),
        }
    }
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block marker
    pub fn block_marker(mut self, marker: impl Into<String>) -> Self {
        self.block_marker = marker.into();
        self
    }

    /// Sets the entry indentation
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}

/// What to do when a table fails to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockPolicy {
    /// Fail the whole header
    #[default]
    Abort,
    /// Keep the failing table exactly as written and carry on
    Retain,
}

/// One register table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// 1-based line of the opening statement
    pub line: usize,
    /// The opening statement, e.g. `const cfg_reg_t table[] = {`
    pub opening: String,
    /// Non-entry lines found inside the table
    pub notes: Vec<String>,
    /// The table's entries in source order
    pub entries: EntrySequence,
    /// The closing statement, e.g. `};`
    pub terminator: String,
    body: Vec<String>,
    verbatim: bool,
}

impl Block {
    /// Returns true if this table is written back exactly as it was read
    pub fn is_verbatim(&self) -> bool {
        self.verbatim
    }

    fn with_entries(&self, entries: EntrySequence) -> Self {
        Self {
            entries,
            ..self.clone()
        }
    }

    fn retained(&self) -> Self {
        Self {
            verbatim: true,
            ..self.clone()
        }
    }
}

/// A piece of a header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A line outside any table
    Line(String),
    /// A register table
    Block(Block),
}

/// A parsed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    segments: Vec<Segment>,
    indent: String,
}

/// Outcome of running a codec over every table in a header
#[derive(Debug, Default)]
pub struct TransformReport {
    /// Tables seen
    pub blocks: usize,
    /// Tables re-encoded
    pub encoded: usize,
    /// Entries across re-encoded tables, before
    pub entries_before: usize,
    /// Entries across re-encoded tables, after
    pub entries_after: usize,
    /// Failures of tables kept as written
    pub retained: Vec<Error>,
}

impl TransformReport {
    /// Entries removed across all re-encoded tables
    pub fn entries_saved(&self) -> usize {
        self.entries_before.saturating_sub(self.entries_after)
    }
}

impl Header {
    /// Returns all segments in source order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the register tables in source order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Block(block) => Some(block),
            Segment::Line(_) => None,
        })
    }

    /// Runs `codec` over every table
    ///
    /// A table either encodes completely or, under [`BlockPolicy::Retain`],
    /// is kept exactly as written. Under [`BlockPolicy::Abort`] the first
    /// failure is returned and nothing is produced.
    pub fn transform(
        &self,
        codec: &dyn SequenceCodec,
        policy: BlockPolicy,
    ) -> Result<(Header, TransformReport)> {
        let mut report = TransformReport::default();
        let mut segments = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            let Segment::Block(block) = segment else {
                segments.push(segment.clone());
                continue;
            };
            report.blocks += 1;

            match codec.encode(&block.entries) {
                Ok(encoded) => {
                    debug!(
                        "Table on line {}: {} -> {} entries",
                        block.line,
                        block.entries.len(),
                        encoded.len()
                    );
                    report.encoded += 1;
                    report.entries_before += block.entries.len();
                    report.entries_after += encoded.len();
                    segments.push(Segment::Block(block.with_entries(encoded)));
                }
                Err(e) => {
                    let e = Error::block_failed(block.line, e);
                    if policy == BlockPolicy::Retain && e.is_block_local() {
                        warn!("Keeping table as written: {}", e);
                        report.retained.push(e);
                        segments.push(Segment::Block(block.retained()));
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        let header = Header {
            segments,
            indent: self.indent.clone(),
        };
        Ok((header, report))
    }

    /// Checks that every re-encoded table in `encoded` decodes to the same
    /// register writes as its counterpart in `self`
    pub fn verify(&self, encoded: &Header, codec: &dyn SequenceCodec) -> Result<()> {
        for (original, block) in self.blocks().zip(encoded.blocks()) {
            if block.is_verbatim() {
                continue;
            }
            let expected = codec
                .decode(&original.entries)
                .map_err(|e| Error::block_failed(original.line, e))?;
            let actual = codec
                .decode(&block.entries)
                .map_err(|e| Error::block_failed(block.line, e))?;
            if expected != actual {
                return Err(Error::RoundTripMismatch { line: block.line });
            }
            trace!("Table on line {} verified", block.line);
        }
        Ok(())
    }

    /// Writes the header as C source
    pub fn render(&self) -> String {
        let mut output = String::new();
        self.render_to(&mut output).expect("String write cannot fail");
        output
    }

    /// Writes the header as C source to a formatter
    pub fn render_to(&self, w: &mut impl fmt::Write) -> fmt::Result {
        let mut writer = HeaderWriter::new(w, &self.indent);
        self.write_to(&mut writer)
    }

    /// Drives `writer` through every line and entry in source order
    pub fn write_to(&self, writer: &mut impl EntryWriter) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Line(line) => writer.write_line(line)?,
                Segment::Block(block) => {
                    writer.write_line(&block.opening)?;
                    if block.verbatim {
                        for line in &block.body {
                            writer.write_line(line)?;
                        }
                    } else {
                        for note in &block.notes {
                            writer.write_line(note)?;
                        }
                        for entry in &block.entries {
                            writer.write_entry(entry)?;
                        }
                    }
                    writer.write_line(&block.terminator)?;
                }
            }
        }
        Ok(())
    }
}

/// Parser for headers holding register tables
#[derive(Debug, Clone, Default)]
pub struct HeaderScanner {
    config: ScannerConfig,
}

impl HeaderScanner {
    /// Creates a new scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Parses header text
    pub fn parse(&self, text: &str) -> Result<Header> {
        let mut segments = Vec::new();
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

        while let Some((line_no, line)) = lines.next() {
            // A statement that closes on its own line is not a table.
            if !line.contains(self.config.block_marker.as_str()) || line.contains(';') {
                segments.push(Segment::Line(line.to_string()));
                continue;
            }

            trace!("Table opens on line {}", line_no);
            let mut block = Block {
                line: line_no,
                opening: line.to_string(),
                notes: Vec::new(),
                entries: Vec::new(),
                terminator: String::new(),
                body: Vec::new(),
                verbatim: false,
            };

            let mut terminated = false;
            for (line_no, line) in lines.by_ref() {
                if line.contains('{') && line.contains('}') {
                    let entry = parse_entry(line, line_no, block.entries.len())?;
                    block.entries.push(entry);
                } else if line.contains(';') {
                    block.terminator = line.to_string();
                    terminated = true;
                    break;
                } else if !line.trim().is_empty() {
                    block.notes.push(line.to_string());
                }
                block.body.push(line.to_string());
            }

            if !terminated {
                return Err(Error::UnterminatedBlock { line: block.line });
            }
            debug!(
                "Parsed table on line {} with {} entries",
                block.line,
                block.entries.len()
            );
            segments.push(Segment::Block(block));
        }

        Ok(Header {
            segments,
            indent: self.config.indent.clone(),
        })
    }
}

/// Parses one `{ key, value }` line; `position` is the entry's index in its table
fn parse_entry(line: &str, line_no: usize, position: usize) -> Result<Entry> {
    let after_brace = line.rsplit('{').next().unwrap_or(line);
    let inner = after_brace.split('}').next().unwrap_or(after_brace);

    let fields: Vec<&str> = inner.split(',').map(str::trim).collect();
    let [key, value] = fields.as_slice() else {
        return Err(Error::malformed_pair(
            line_no,
            format!("expected two fields, found {}", fields.len()),
        ));
    };

    if value.contains(META_MARKER) {
        return Err(Error::malformed_pair(
            line_no,
            format!("meta token '{}' in the value field", value),
        ));
    }

    if key.contains(META_MARKER) {
        let kind = key
            .parse::<MetaKind>()
            .map_err(|e| e.at_line(line_no))?;
        let count = parse_integer(value)
            .and_then(|count| u32::try_from(count).ok())
            .ok_or_else(|| Error::invalid_meta_count(position, value))?;
        return Ok(Entry::meta(kind, count));
    }

    let address = parse_register_field(key, line_no)?;
    let value = parse_register_field(value, line_no)?;
    Ok(Entry::register(address, value))
}

fn parse_register_field(field: &str, line_no: usize) -> Result<u32> {
    parse_integer(field)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| Error::invalid_literal(line_no, field))
}

/// Parses a decimal or `0x`-prefixed hex literal, with an optional sign
fn parse_integer(literal: &str) -> Option<i64> {
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Parses a header file with the default scanner
pub fn parse_file(path: impl AsRef<Path>) -> Result<Header> {
    parse_file_with_config(path, ScannerConfig::default())
}

/// Parses a header file with custom configuration
pub fn parse_file_with_config(path: impl AsRef<Path>, config: ScannerConfig) -> Result<Header> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    HeaderScanner::with_config(config).parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, CodecConfig};
    use pretty_assertions::assert_eq;

    const CHANNEL_CONFIG: &str = "#pragma once
#include \"tas5805m.h\"

// TAS5805M Set to left only mode
const tas5805m_cfg_reg_t tas5805m_channel_left_config[] = {
    { 0x00, 0x00 },     // Page 0
    { 0x7f, 0x8C },     // Book 0x8C
    { 0x00, 0x2C },     // Page 0x2A
    { CFG_META_BURST, 5 }, // Left channel to left output
    { 0x1C, 0x00 },
    { 0x80, 0x00 },
    { 0x00, 0x00 },

    { CFG_META_DELAY, 5 }, // Settle
    { 0x24, 0x00 },
};

#define TAS5805M_CHANNEL_LEFT_REGISTERS_SIZE (sizeof(tas5805m_channel_left_config))";

    #[test]
    fn test_parse_tables() {
        let header = HeaderScanner::new().parse(CHANNEL_CONFIG).unwrap();
        let blocks: Vec<&Block> = header.blocks().collect();
        assert_eq!(blocks.len(), 1);

        let block = blocks[0];
        assert_eq!(block.line, 5);
        assert_eq!(block.terminator, "};");
        assert!(block.notes.is_empty());
        assert_eq!(
            block.entries,
            vec![
                Entry::register(0x00, 0x00),
                Entry::register(0x7f, 0x8c),
                Entry::register(0x00, 0x2c),
                Entry::meta(MetaKind::Burst, 5),
                Entry::register(0x1c, 0x00),
                Entry::register(0x80, 0x00),
                Entry::register(0x00, 0x00),
                Entry::meta(MetaKind::Delay, 5),
                Entry::register(0x24, 0x00),
            ]
        );
        assert_eq!(header.segments().len(), 7);
    }

    #[test]
    fn test_render_normalises_entries() {
        let header = HeaderScanner::new().parse(CHANNEL_CONFIG).unwrap();
        let rendered = header.render();
        assert!(rendered.starts_with("#pragma once\n#include \"tas5805m.h\"\n\n"));
        assert!(rendered.contains("\t{ 0x7f, 0x8c },\n"));
        assert!(rendered.contains("\t{ CFG_META_BURST, 5 },\n"));
        assert!(!rendered.contains("Page 0"));
        assert!(rendered.ends_with("};\n\n#define TAS5805M_CHANNEL_LEFT_REGISTERS_SIZE (sizeof(tas5805m_channel_left_config))"));
    }

    #[test]
    fn test_notes_are_kept_ahead_of_entries() {
        let text = "const cfg_reg_t t[] = {\n    { 0x01, 0x02 },\n    // mid-table comment\n};";
        let header = HeaderScanner::new().parse(text).unwrap();
        assert_eq!(
            header.render(),
            "const cfg_reg_t t[] = {\n    // mid-table comment\n\t{ 0x01, 0x02 },\n};"
        );
    }

    #[test]
    fn test_transform_compresses_tables() {
        let text = "const cfg_reg_t t[] = {
    { 0x00, 0x00 },
    { 0x1e, 0x00 },
    { 0x1f, 0x00 },
    { 0x20, 0x00 },
    { 0x21, 0x00 },
    { 0x22, 0x00 },
    { 0x23, 0x00 },
    { 0x24, 0x00 },
    { 0x25, 0x07 },
};";
        let header = HeaderScanner::new().parse(text).unwrap();
        let codec = Codec::new();
        let (encoded, report) = header.transform(&codec, BlockPolicy::Abort).unwrap();

        assert_eq!(
            encoded.render(),
            "const cfg_reg_t t[] = {
\t{ 0x00, 0x00 },
\t{ 0x1e, 0x00 },
\t{ CFG_META_SWITCH, 6 },
\t{ 0x25, 0x07 },
};"
        );
        assert_eq!(report.blocks, 1);
        assert_eq!(report.encoded, 1);
        assert_eq!(report.entries_saved(), 5);
        header.verify(&encoded, &codec).unwrap();
    }

    #[test]
    fn test_retain_policy_keeps_failing_table() {
        let text = "const cfg_reg_t good[] = {
    { 0x10, 0x01 },
};
const cfg_reg_t bad[] = {
    { CFG_META_BURST, 9 }, // truncated
    { 0x14, 0x00 },
};";
        let header = HeaderScanner::new().parse(text).unwrap();
        let codec = Codec::new();

        let err = header.transform(&codec, BlockPolicy::Abort).unwrap_err();
        assert!(matches!(err, Error::BlockFailed { line: 4, .. }));

        let (encoded, report) = header.transform(&codec, BlockPolicy::Retain).unwrap();
        assert_eq!(report.encoded, 1);
        assert_eq!(report.retained.len(), 1);
        assert_eq!(
            encoded.render(),
            "const cfg_reg_t good[] = {
\t{ 0x10, 0x01 },
};
const cfg_reg_t bad[] = {
    { CFG_META_BURST, 9 }, // truncated
    { 0x14, 0x00 },
};"
        );
        header.verify(&encoded, &codec).unwrap();
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let original = HeaderScanner::new()
            .parse("const t[] = {\n{ 0x01, 0x02 },\n};")
            .unwrap();
        let tampered = HeaderScanner::new()
            .parse("const t[] = {\n{ 0x01, 0x03 },\n};")
            .unwrap();
        let err = original.verify(&tampered, &Codec::new()).unwrap_err();
        assert!(matches!(err, Error::RoundTripMismatch { line: 1 }));
    }

    #[test]
    fn test_codec_config_reaches_tables() {
        let mut text = String::from("const t[] = {\n");
        for address in 0..10 {
            text.push_str(&format!("{{ 0x{:02x}, 0x00 }},\n", address));
        }
        text.push_str("};");

        let header = HeaderScanner::new().parse(&text).unwrap();
        let codec = Codec::with_config(CodecConfig::new().min_zeros(20));
        let (encoded, _) = header.transform(&codec, BlockPolicy::Abort).unwrap();
        let stats = {
            let mut stats = StatsWriter::default();
            encoded.write_to(&mut stats).unwrap();
            stats
        };
        assert_eq!(stats.switch_count, 0);
        assert_eq!(stats.burst_count, 1);
    }

    #[test]
    fn test_one_line_statement_is_not_a_table() {
        let text = "static const int answer = 42;\nint x;";
        let header = HeaderScanner::new().parse(text).unwrap();
        assert_eq!(header.blocks().count(), 0);
        assert_eq!(header.render(), text);
    }

    #[test]
    fn test_unterminated_table() {
        let err = HeaderScanner::new()
            .parse("// header\nconst t[] = {\n{ 0x01, 0x02 },\n")
            .unwrap_err();
        assert!(matches!(err, Error::UnterminatedBlock { line: 2 }));
    }

    #[test]
    fn test_parse_errors() {
        let scanner = HeaderScanner::new();

        let err = scanner.parse("const t[] = {\n{ 0x01 },\n};").unwrap_err();
        assert!(matches!(err, Error::MalformedPair { line: 2, .. }));

        let err = scanner.parse("const t[] = {\n{ 0xZZ, 0x00 },\n};").unwrap_err();
        assert!(matches!(err, Error::InvalidLiteral { line: 2, .. }));

        let err = scanner
            .parse("const t[] = {\n{ CFG_META_JUMP, 1 },\n};")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMetaToken { line: 2, .. }));

        let err = scanner
            .parse("const t[] = {\n{ 0x01, 0x00 },\n{ CFG_META_SWITCH, -3 },\n};")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMetaCount { position: 1, .. }));

        let err = scanner
            .parse("const t[] = {\n{ CFG_META_DELAY, soon },\n};")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMetaCount { position: 0, .. }));
    }

    #[test]
    fn test_meta_token_in_value_field() {
        let err = HeaderScanner::new()
            .parse("const t[] = {\n{ 0x10, 0x00 },\n{ 0x10, CFG_META_DELAY },\n};")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPair { line: 3, .. }));
        assert!(err.to_string().contains("'CFG_META_DELAY' in the value field"));
    }

    #[test]
    fn test_parse_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("eco_5805_channel.h");
        std::fs::write(&path, CHANNEL_CONFIG).unwrap();

        let header = parse_file(&path).unwrap();
        assert_eq!(header, HeaderScanner::new().parse(CHANNEL_CONFIG).unwrap());
        assert_eq!(header.blocks().next().unwrap().entries.len(), 9);

        let config = ScannerConfig::new().block_marker("TABLE");
        let header = parse_file_with_config(&path, config).unwrap();
        assert_eq!(header.blocks().count(), 0);

        let missing = temp_dir.path().join("eco_5805_missing.h");
        let err = parse_file(&missing).unwrap_err();
        assert!(matches!(err, Error::FileRead { ref path, .. } if *path == missing));
        assert!(!err.is_block_local());
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("0x1C"), Some(0x1c));
        assert_eq!(parse_integer("0X1c"), Some(0x1c));
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-3"), Some(-3));
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("0x"), None);
        assert_eq!(parse_integer("12ab"), None);
    }

    #[test]
    fn test_custom_block_marker() {
        let config = ScannerConfig::new().block_marker("TABLE").indent("    ");
        let header = HeaderScanner::with_config(config)
            .parse("TABLE(t) {\n{ 1, 2 },\n};")
            .unwrap();
        assert_eq!(header.render(), "TABLE(t) {\n    { 0x01, 0x02 },\n};");
    }
}
