//! Per-position run metrics.
//!
//! For every position `i`, `run[i]` is the number of further entries that
//! continue the sequential-address chain starting at `i`, and `zero_run[i]`
//! is the number of zero-valued writes, starting at `i`, that lie on that
//! chain before its last link. Both are computed in one backward pass.

use crate::entry::Entry;

/// Run and zero-run lengths for each position of a sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetrics {
    run: Vec<usize>,
    zero_run: Vec<usize>,
}

impl RunMetrics {
    /// Scans `entries` from the end toward the start
    ///
    /// Meta entries never join a run; they reset both counters and the
    /// remembered address.
    pub fn scan(entries: &[Entry]) -> Self {
        let mut run = vec![0; entries.len()];
        let mut zero_run = vec![0; entries.len()];

        let mut next_address: Option<u32> = None;
        let mut seq = 0;
        let mut zeros = 0;

        for (i, entry) in entries.iter().enumerate().rev() {
            if entry.precedes(next_address) {
                seq += 1;
                zeros = if entry.value == 0 { zeros + 1 } else { 0 };
            } else {
                seq = 0;
                zeros = 0;
            }
            next_address = entry.address();
            run[i] = seq;
            zero_run[i] = zeros;
        }

        Self { run, zero_run }
    }

    /// Number of positions covered
    pub fn len(&self) -> usize {
        self.run.len()
    }

    /// Returns true if the scanned sequence was empty
    pub fn is_empty(&self) -> bool {
        self.run.is_empty()
    }

    /// Remaining run length at position `i`
    pub fn run(&self, i: usize) -> usize {
        self.run[i]
    }

    /// Zero-run length anchored at position `i`
    pub fn zero_run(&self, i: usize) -> usize {
        self.zero_run[i]
    }

    /// All run lengths in sequence order
    pub fn runs(&self) -> &[usize] {
        &self.run
    }

    /// All zero-run lengths in sequence order
    pub fn zero_runs(&self) -> &[usize] {
        &self.zero_run
    }
}
