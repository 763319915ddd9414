use std::{mem, num::NonZeroU64, sync::Arc};

use log::{debug, warn};
use tokio::task::JoinSet;

use super::{Partition, Worker, WorkerReport};
use crate::{
    error::{Result, SimErr},
    storage::TrialCounters,
};

/// Runs a fixed set of workers in parallel, each one on its own blocking thread.
///
/// There is no coordination between workers: each plays its partition and flushes into the
/// shared `TrialCounters` as fast as it can.
pub struct WorkerPool {
    pending: Vec<Worker>,
    tasks: JoinSet<Result<WorkerReport>>,
}

impl WorkerPool {
    /// Creates a new `WorkerPool` with one worker per partition, none of them running yet.
    ///
    /// # Arguments
    /// * `partitions` - The shares of trials, one per worker.
    /// * `batch_size` - Trials each worker plays between two flushes.
    pub fn new(partitions: Vec<Partition>, batch_size: NonZeroU64) -> Self {
        let pending = partitions
            .into_iter()
            .map(|partition| Worker::new(partition, batch_size))
            .collect();

        Self {
            pending,
            tasks: JoinSet::new(),
        }
    }

    /// Returns the amount of workers in the pool.
    pub fn len(&self) -> usize {
        self.pending.len() + self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Launches every pending worker onto tokio's blocking pool.
    ///
    /// # Arguments
    /// * `counters` - The shared counters the workers flush into.
    ///
    /// # Panics
    /// If called outside of a tokio runtime.
    pub fn start(&mut self, counters: &Arc<TrialCounters>) {
        for worker in mem::take(&mut self.pending) {
            self.spawn_task(counters, move |counters| worker.run(counters));
        }

        debug!("started {} workers", self.tasks.len());
    }

    /// Runs `task` on the blocking pool alongside the workers, joined like any of them.
    ///
    /// # Arguments
    /// * `counters` - The shared counters handed to `task`.
    /// * `task` - The work to run, returning a report or the error that aborts the run.
    pub(crate) fn spawn_task<F>(&mut self, counters: &Arc<TrialCounters>, task: F)
    where
        F: FnOnce(&TrialCounters) -> Result<WorkerReport> + Send + 'static,
    {
        let counters = Arc::clone(counters);
        self.tasks.spawn_blocking(move || task(&counters));
    }

    /// Waits for the next worker to finish.
    ///
    /// # Returns
    /// `None` once every worker has been joined, otherwise the worker's report or its error.
    pub async fn join_next(&mut self) -> Option<Result<WorkerReport>> {
        let joined = self.tasks.join_next().await?;
        Some(
            joined
                .map_err(|e| SimErr::WorkerPanicked(e.to_string()))
                .and_then(|report| report),
        )
    }

    /// Waits for every worker to finish.
    ///
    /// # Returns
    /// Every report ordered by worker index, or the first error any worker returned.
    pub async fn join_all(&mut self) -> Result<Vec<WorkerReport>> {
        let mut reports = Vec::with_capacity(self.tasks.len());

        while let Some(joined) = self.join_next().await {
            reports.push(joined?);
        }

        reports.sort_by_key(|report| report.worker);
        Ok(reports)
    }

    /// Waits for every remaining worker discarding their results.
    ///
    /// Used after a worker failed, together with `TrialCounters::halt`, to let the rest wind down.
    pub async fn drain(&mut self) {
        while let Some(joined) = self.join_next().await {
            if let Err(e) = joined {
                warn!("worker failed while draining the pool: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::{execution::partition, trial::Door};

    #[tokio::test(flavor = "multi_thread")]
    async fn joins_every_worker() {
        const TRIALS: u64 = 123_457;

        let counters = Arc::new(TrialCounters::new());
        let partitions = partition(TRIALS, NonZeroUsize::new(6).unwrap(), 17).unwrap();
        let mut pool = WorkerPool::new(partitions, NonZeroU64::new(1_000).unwrap());
        assert_eq!(pool.len(), 6);

        pool.start(&counters);
        let reports = pool.join_all().await.unwrap();

        assert_eq!(reports.len(), 6);
        assert!(reports.iter().enumerate().all(|(i, r)| r.worker == i));

        let plays: u64 = reports.iter().map(|r| r.tally.plays).sum();
        let wins: u64 = reports.iter().map(|r| r.tally.wins).sum();
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.plays, TRIALS);
        assert_eq!(snapshot.plays, plays);
        assert_eq!(snapshot.wins, wins);
        assert!(pool.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn join_on_empty_pool() {
        let mut pool = WorkerPool::new(Vec::new(), NonZeroU64::new(1).unwrap());
        pool.start(&Arc::new(TrialCounters::new()));

        assert!(pool.join_next().await.is_none());
        assert!(pool.join_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drain_outlasts_a_failed_task() {
        let counters = Arc::new(TrialCounters::new());
        let partitions = partition(40_000, NonZeroUsize::new(4).unwrap(), 3).unwrap();
        let mut pool = WorkerPool::new(partitions, NonZeroU64::new(500).unwrap());

        pool.start(&counters);
        pool.spawn_task(&counters, |_| {
            Err(SimErr::UnreachableOutcome {
                first_pick: Door::Second,
                revealed: Door::Second,
            })
        });
        assert_eq!(pool.len(), 5);

        pool.drain().await;

        assert!(pool.is_empty());
        assert_eq!(counters.snapshot().plays, 40_000);
    }
}
