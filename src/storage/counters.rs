use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::Tally;

/// The process-wide trial counters every worker flushes into.
///
/// They only ever grow through `fetch_add`, reading them never mutates anything. Workers share
/// it behind an `Arc`.
#[derive(Debug, Default)]
pub struct TrialCounters {
    plays: AtomicU64,
    wins: AtomicU64,
    halted: AtomicBool,
}

impl TrialCounters {
    /// Creates a new `TrialCounters` with both counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a worker's local tally into the shared counters.
    ///
    /// Plays are published before wins, paired with `snapshot` reading wins first, any observer
    /// sees at most as many wins as plays.
    ///
    /// # Arguments
    /// * `tally` - The counts accumulated since the worker's last flush.
    #[inline]
    pub fn flush(&self, tally: Tally) {
        if tally.is_empty() {
            return;
        }

        self.plays.fetch_add(tally.plays, Ordering::Release);
        self.wins.fetch_add(tally.wins, Ordering::Release);
    }

    /// Reads both counters.
    ///
    /// The two values may come from slightly different instants, but `wins <= plays` always holds.
    ///
    /// # Returns
    /// The current `(plays, wins)` pair as a `Tally`.
    pub fn snapshot(&self) -> Tally {
        let wins = self.wins.load(Ordering::Acquire);
        let plays = self.plays.load(Ordering::Acquire);
        Tally { plays, wins }
    }

    /// Asks every worker to stop at its next batch boundary.
    ///
    /// Only the control task calls this, after a worker already failed.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }
}
