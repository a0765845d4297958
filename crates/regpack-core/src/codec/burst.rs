//! Burst re-encoding.
//!
//! Packs a sequential run back into `(Burst, seq + 2)`, the run's first
//! write, and `ceil(seq / 2)` packed entries holding two register values
//! each. This is the inverse of [`unroll()`](super::unroll()).

use super::metrics::RunMetrics;
use super::CodecConfig;
use crate::entry::{Entry, EntrySequence, MetaKind};
use tracing::trace;

/// Re-encodes every run longer than `config.min_seq` as a burst
///
/// `metrics` must have been scanned over `entries` after zero-run
/// compression, since removing zero writes moves run boundaries.
pub fn encode_bursts(
    entries: &[Entry],
    metrics: &RunMetrics,
    config: &CodecConfig,
) -> EntrySequence {
    debug_assert_eq!(entries.len(), metrics.len());

    // The marker counts the header pair and one reserved slot on top of `seq`.
    let cap = config.max_burst_count.unwrap_or(u32::MAX).saturating_sub(2) as usize;
    let mut output = Vec::with_capacity(entries.len());
    let mut i = 0;

    while i < entries.len() {
        let seq = metrics.run(i).min(cap);
        if seq <= config.min_seq {
            output.push(entries[i]);
            i += 1;
            continue;
        }

        trace!("Packing run of {} writes at entry {}", seq + 1, i);
        output.push(Entry::meta(MetaKind::Burst, seq as u32 + 2));
        output.push(entries[i]);
        for pair in entries[i + 1..=i + seq].chunks(2) {
            let second = pair.get(1).map_or(0, |entry| entry.value);
            output.push(Entry::register(pair[0].value, second));
        }
        i += seq + 1;
    }

    output
}
