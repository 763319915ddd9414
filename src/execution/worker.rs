use std::num::NonZeroU64;

use log::debug;
use rand::{RngCore, rngs::SmallRng};

use super::Partition;
use crate::{
    entropy::EntropySource,
    error::Result,
    storage::{Tally, TrialCounters},
    trial::TrialEngine,
};

/// What a worker hands back once its partition is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub tally: Tally,
    pub flushes: u64,
    pub words_drawn: u64,
}

/// Plays the trials of a single partition.
///
/// Outcomes are counted in a local `Tally` and only published to the shared counters once every
/// `batch_size` trials, keeping the atomic traffic to a small fraction of the work. The worker
/// never reads the shared counts back.
pub struct Worker<R: RngCore = SmallRng> {
    partition: Partition,
    batch_size: NonZeroU64,
    entropy: EntropySource<R>,
    engine: TrialEngine,
}

impl Worker<SmallRng> {
    /// Creates a new `Worker` seeded from its partition.
    ///
    /// # Arguments
    /// * `partition` - The share of trials to play.
    /// * `batch_size` - Trials played between two flushes.
    ///
    /// # Returns
    /// A new `Worker` instance.
    pub fn new(partition: Partition, batch_size: NonZeroU64) -> Self {
        let entropy = EntropySource::seeded(partition.seed());
        Self::with_entropy(partition, batch_size, entropy)
    }
}

impl<R: RngCore> Worker<R> {
    /// Creates a new `Worker` drawing from an already built entropy source.
    ///
    /// # Arguments
    /// * `partition` - The share of trials to play.
    /// * `batch_size` - Trials played between two flushes.
    /// * `entropy` - The worker's private source of randomness.
    ///
    /// # Returns
    /// A new `Worker` instance.
    pub fn with_entropy(
        partition: Partition,
        batch_size: NonZeroU64,
        entropy: EntropySource<R>,
    ) -> Self {
        Self {
            partition,
            batch_size,
            entropy,
            engine: TrialEngine::new(),
        }
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Plays every trial of the partition, flushing into `counters` after each batch.
    ///
    /// The last batch may be shorter than `batch_size`, it's flushed all the same so every
    /// played trial reaches the counters. If `counters` gets halted the worker stops at the next
    /// batch boundary.
    ///
    /// # Arguments
    /// * `counters` - The shared counters to flush into.
    ///
    /// # Returns
    /// The worker's `WorkerReport`, or an `UnreachableOutcome` if a trial broke the door invariants.
    pub fn run(mut self, counters: &TrialCounters) -> Result<WorkerReport> {
        let worker = self.partition.index();
        let batch_size = self.batch_size.get();
        let mut remaining = self.partition.trials();

        let mut report = WorkerReport {
            worker,
            tally: Tally::default(),
            flushes: 0,
            words_drawn: 0,
        };

        debug!(worker = worker, trials = remaining; "worker started");

        while remaining > 0 {
            if counters.is_halted() {
                debug!(worker = worker; "halted, {remaining} trials left unplayed");
                break;
            }

            let batch = remaining.min(batch_size);
            let mut local = Tally::default();

            for _ in 0..batch {
                match self.engine.play(&mut self.entropy) {
                    Ok(won) => local.record(won),
                    Err(e) => {
                        counters.flush(local);
                        return Err(e);
                    }
                }
            }

            counters.flush(local);
            report.tally.plays += local.plays;
            report.tally.wins += local.wins;
            report.flushes += 1;
            remaining -= batch;
        }

        report.words_drawn = self.entropy.words_drawn();
        debug!(
            worker = worker,
            plays = report.tally.plays,
            wins = report.tally.wins,
            flushes = report.flushes;
            "worker finished"
        );

        Ok(report)
    }
}
