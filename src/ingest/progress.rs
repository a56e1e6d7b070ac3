//! Batch throughput reporting for ingestion runs.

use std::time::Instant;

use tracing::info;

/// How many processed messages make up one reporting batch.
pub const BATCH_SIZE: u64 = 100;

/// Counts processed messages and emits one throughput line per batch.
///
/// Purely an observability aid: it never blocks and never fails the run.
/// The cumulative total is monotonically non-decreasing for the lifetime
/// of one run, across all root paths.
pub struct BatchProgress {
    in_batch: u64,
    total: u64,
    batches_emitted: u64,
    batch_start: Instant,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self {
            in_batch: 0,
            total: 0,
            batches_emitted: 0,
            batch_start: Instant::now(),
        }
    }

    /// Record one processed message.
    ///
    /// Every [`BATCH_SIZE`] messages, logs the cumulative total (grouped
    /// thousands) and the time spent on the batch, then restarts the
    /// interval clock. Returns `true` when this tick emitted a batch line.
    pub fn tick(&mut self) -> bool {
        self.in_batch += 1;
        self.total += 1;

        if self.in_batch == BATCH_SIZE {
            info!(
                "[{}] {} messages in {:.2?}",
                group_thousands(self.total),
                BATCH_SIZE,
                self.batch_start.elapsed()
            );
            self.in_batch = 0;
            self.batches_emitted += 1;
            self.batch_start = Instant::now();
            return true;
        }
        false
    }

    /// Total messages processed so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// How many batch lines have been emitted so far.
    pub fn batches_emitted(&self) -> u64 {
        self.batches_emitted
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Format an integer with comma thousands separators: `1234567` → `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
