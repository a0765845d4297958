//! Zero-run compression.
//!
//! A long stretch of zero writes to sequential registers collapses into the
//! first write plus a `(Switch, count)` marker standing for the `count`
//! zero writes that follow it.

use super::metrics::RunMetrics;
use super::{CodecConfig, MAX_SWITCH_COUNT};
use crate::entry::{Entry, EntrySequence, Key, MetaKind};
use crate::error::{Error, Result};
use tracing::trace;

/// Collapses zero-runs longer than `config.min_zeros`
///
/// `metrics` must have been scanned over `entries`. The pass is greedy and
/// non-overlapping: scanning resumes right after a collapsed span.
pub fn compress_zero_runs(
    entries: &[Entry],
    metrics: &RunMetrics,
    config: &CodecConfig,
) -> EntrySequence {
    debug_assert_eq!(entries.len(), metrics.len());

    let cap = config
        .max_switch_count
        .unwrap_or(MAX_SWITCH_COUNT)
        .min(MAX_SWITCH_COUNT) as usize;
    let mut output = Vec::with_capacity(entries.len());
    let mut i = 0;

    while i < entries.len() {
        output.push(entries[i]);

        let zeros = metrics.zero_run(i);
        let mut count = zeros;
        // Switch n writes n zeros after the previous register, so a payload on
        // the chain link after the zero-run stays explicit.
        if zeros > 0 && entries[i + zeros].value != 0 {
            count -= 1;
        }
        count = count.min(cap);

        if count > config.min_zeros {
            trace!("Collapsing {} zero writes after entry {}", count, i);
            output.push(Entry::meta(MetaKind::Switch, count as u32));
            i += count + 1;
        } else {
            i += 1;
        }
    }

    output
}

/// Expands every `(Switch, n)` marker back into `n` zero writes
///
/// The writes continue from the most recent register address. Delay
/// markers leave that address untouched; any other marker clears it.
/// Counts of zero or above [`MAX_SWITCH_COUNT`] are rejected before
/// anything is expanded.
pub fn expand_zero_runs(entries: &[Entry]) -> Result<EntrySequence> {
    let mut output = Vec::with_capacity(entries.len());
    let mut last_address: Option<u32> = None;

    for (position, entry) in entries.iter().enumerate() {
        match entry.key {
            Key::Address(address) => {
                output.push(*entry);
                last_address = Some(address);
            }
            Key::Meta(MetaKind::Switch) => {
                let mut address = last_address.ok_or(Error::OrphanSwitch { position })?;
                if entry.value == 0 || entry.value > MAX_SWITCH_COUNT {
                    return Err(Error::invalid_meta_count(position, entry.value));
                }
                if address.checked_add(entry.value).is_none() {
                    return Err(Error::AddressOverflow { position, address });
                }
                for _ in 0..entry.value {
                    address = address
                        .checked_add(1)
                        .ok_or(Error::AddressOverflow { position, address })?;
                    output.push(Entry::register(address, 0));
                }
                last_address = Some(address);
            }
            Key::Meta(MetaKind::Delay) => output.push(*entry),
            Key::Meta(MetaKind::Burst) => {
                output.push(*entry);
                last_address = None;
            }
        }
    }

    Ok(output)
}
