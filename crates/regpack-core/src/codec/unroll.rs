//! Burst unrolling.
//!
//! A `(Burst, n)` marker is followed by one explicit header pair and then
//! `ceil((n - 2) / 2)` packed entries, each carrying two register values in
//! its key and value slots. Unrolling rewrites this back into `n - 1`
//! sequential register writes starting at the header's address.

use crate::entry::{Entry, EntrySequence, Key, MetaKind};
use crate::error::{Error, Result};
use tracing::trace;

/// Expands every burst in `entries` into individual register writes
///
/// All other entries pass through unchanged and in order.
pub fn unroll(entries: &[Entry]) -> Result<EntrySequence> {
    let mut output = Vec::with_capacity(entries.len());
    let mut input = entries.iter().enumerate();

    while let Some((position, entry)) = input.next() {
        if !entry.is_meta(MetaKind::Burst) {
            output.push(*entry);
            continue;
        }

        let declared = entry.value;
        if declared < 2 {
            return Err(Error::invalid_meta_count(position, declared));
        }
        let mut remaining = declared - 2;

        let Some((header_position, header)) = input.next() else {
            return Err(Error::truncated_burst(position, declared, remaining + 1));
        };
        let Key::Address(mut address) = header.key else {
            return Err(Error::malformed_burst(
                header_position,
                "burst header must be a register write",
            ));
        };
        output.push(*header);

        while remaining > 0 {
            let Some((packed_position, packed)) = input.next() else {
                return Err(Error::truncated_burst(position, declared, remaining));
            };
            let Key::Address(first) = packed.key else {
                return Err(Error::malformed_burst(
                    packed_position,
                    "packed burst values must not be meta markers",
                ));
            };

            for value in [first, packed.value] {
                if remaining == 0 {
                    break;
                }
                address = address
                    .checked_add(1)
                    .ok_or(Error::AddressOverflow { position, address })?;
                output.push(Entry::register(address, value));
                remaining -= 1;
            }
        }

        trace!(
            "Unrolled burst at entry {} into {} writes",
            position,
            declared - 1
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_passthrough_without_bursts() {
        let entries = vec![
            Entry::register(0x00, 0x00),
            Entry::meta(MetaKind::Switch, 7),
            Entry::meta(MetaKind::Delay, 5),
            Entry::register(0x7f, 0x8c),
        ];
        assert_eq!(unroll(&entries).unwrap(), entries);
    }

    #[test]
    fn test_even_burst() {
        let entries = [
            Entry::meta(MetaKind::Burst, 6),
            Entry::register(0x20, 0xaa),
            Entry::register(0x11, 0x22),
            Entry::register(0x33, 0x44),
        ];
        assert_eq!(
            unroll(&entries).unwrap(),
            vec![
                Entry::register(0x20, 0xaa),
                Entry::register(0x21, 0x11),
                Entry::register(0x22, 0x22),
                Entry::register(0x23, 0x33),
                Entry::register(0x24, 0x44),
            ]
        );
    }

    #[test]
    fn test_odd_burst_ignores_padding() {
        let entries = [
            Entry::meta(MetaKind::Burst, 5),
            Entry::register(0x1c, 0x00),
            Entry::register(0x80, 0x00),
            Entry::register(0x00, 0x00),
            Entry::register(0x7f, 0x8c),
        ];
        assert_eq!(
            unroll(&entries).unwrap(),
            vec![
                Entry::register(0x1c, 0x00),
                Entry::register(0x1d, 0x80),
                Entry::register(0x1e, 0x00),
                Entry::register(0x1f, 0x00),
                Entry::register(0x7f, 0x8c),
            ]
        );
    }

    #[test]
    fn test_minimal_burst_is_header_only() {
        let entries = [
            Entry::meta(MetaKind::Burst, 2),
            Entry::register(0x40, 0x01),
            Entry::register(0x10, 0x02),
        ];
        assert_eq!(
            unroll(&entries).unwrap(),
            vec![Entry::register(0x40, 0x01), Entry::register(0x10, 0x02)]
        );
    }

    #[test]
    fn test_truncated_burst() {
        let entries = [
            Entry::meta(MetaKind::Burst, 9),
            Entry::register(0x14, 0x00),
            Entry::register(0x80, 0x00),
        ];
        let err = unroll(&entries).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedBurst {
                position: 0,
                declared: 9,
                missing: 5
            }
        ));
    }

    #[test]
    fn test_burst_without_header() {
        let entries = [Entry::register(0x01, 0x01), Entry::meta(MetaKind::Burst, 4)];
        let err = unroll(&entries).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedBurst {
                position: 1,
                missing: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_burst_count() {
        let entries = [Entry::meta(MetaKind::Burst, 1), Entry::register(0x01, 0x01)];
        assert!(matches!(
            unroll(&entries).unwrap_err(),
            Error::InvalidMetaCount { position: 0, .. }
        ));
    }

    #[test]
    fn test_meta_inside_burst() {
        let entries = [
            Entry::meta(MetaKind::Burst, 4),
            Entry::register(0x01, 0x01),
            Entry::meta(MetaKind::Delay, 1),
        ];
        assert!(matches!(
            unroll(&entries).unwrap_err(),
            Error::MalformedBurst { position: 2, .. }
        ));

        let entries = [
            Entry::meta(MetaKind::Burst, 4),
            Entry::meta(MetaKind::Switch, 1),
        ];
        assert!(matches!(
            unroll(&entries).unwrap_err(),
            Error::MalformedBurst { position: 1, .. }
        ));
    }

    #[test]
    fn test_address_overflow() {
        let entries = [
            Entry::meta(MetaKind::Burst, 3),
            Entry::register(u32::MAX, 0x01),
            Entry::register(0x02, 0x00),
        ];
        assert!(matches!(
            unroll(&entries).unwrap_err(),
            Error::AddressOverflow {
                position: 0,
                address: u32::MAX
            }
        ));
    }
}
