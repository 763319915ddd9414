use std::{io::Write, pin::pin, sync::Arc};

use log::{error, info, warn};
use tokio::time::Instant;

use crate::{
    config::SimConfig,
    error::Result,
    execution::{WorkerPool, WorkerReport, partition},
    storage::{Tally, TrialCounters},
    telemetry::{Renderer, Snapshot, Telemetry},
};

/// The outcome of a whole run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub seed: u64,
    pub totals: Tally,
    pub last: Snapshot,
    pub reports: Vec<WorkerReport>,
}

/// Plays every trial of `config`, rendering telemetry into `out` while the workers run.
///
/// The partitions are checked before any worker starts. If a worker fails, the rest are halted
/// at their next batch boundary and the failure is returned.
///
/// # Arguments
/// * `config` - The run's parameters.
/// * `out` - Where to render the telemetry snapshots.
///
/// # Returns
/// A `RunSummary` once every worker has been joined.
///
/// # Errors
/// `PartitionMismatch` before starting, `UnreachableOutcome` or `WorkerPanicked` from the
/// workers, `Io` if rendering fails.
pub async fn run<W: Write>(config: &SimConfig, out: W) -> Result<RunSummary> {
    let seed = config.base_seed();
    let partitions = partition(config.trials(), config.workers(), seed)?;

    info!(
        trials = config.trials(),
        workers = config.workers().get(),
        batch = config.batch_size().get(),
        seed = seed;
        "starting simulation"
    );

    let counters = Arc::new(TrialCounters::new());
    let mut pool = WorkerPool::new(partitions, config.batch_size());
    let mut telemetry = Telemetry::new(config.trials(), config.alpha(), config.poll_interval());
    let mut renderer = Renderer::new(config.format(), out);

    let start = Instant::now();
    pool.start(&counters);

    let (last, reports) =
        supervise(&mut pool, &counters, &mut telemetry, &mut renderer, start).await?;

    let totals = counters.snapshot();
    info!(
        plays = totals.plays,
        wins = totals.wins,
        elapsed = last.elapsed_secs;
        "simulation finished, switching won {:.4}% of the games",
        totals.win_rate() * 100.
    );

    Ok(RunSummary {
        seed,
        totals,
        last,
        reports,
    })
}

/// Watches the counters while joining the started workers of `pool`.
///
/// On the first worker failure the halt flag is raised, the remaining workers are drained and
/// the status line is terminated before the failure is returned.
///
/// # Arguments
/// * `pool` - The already started workers.
/// * `counters` - The counters they flush into.
/// * `telemetry` - The sampler turning counter readings into snapshots.
/// * `renderer` - Where to write the snapshots.
/// * `start` - When the workers were started.
///
/// # Returns
/// The final snapshot and every report ordered by worker index.
async fn supervise<W: Write>(
    pool: &mut WorkerPool,
    counters: &TrialCounters,
    telemetry: &mut Telemetry,
    renderer: &mut Renderer<W>,
    start: Instant,
) -> Result<(Snapshot, Vec<WorkerReport>)> {
    let mut reports = Vec::with_capacity(pool.len());

    let watched = {
        let mut watch = pin!(telemetry.watch(start, counters, &mut *renderer));

        loop {
            tokio::select! {
                snapshot = &mut watch => break snapshot,
                Some(joined) = pool.join_next() => match joined {
                    Ok(report) => reports.push(report),
                    Err(e) => break Err(e),
                },
            }
        }
    };

    let last = match watched {
        Ok(last) => last,
        Err(e) => {
            error!("aborting simulation: {e}");
            counters.halt();
            pool.drain().await;

            if let Err(io) = renderer.abort() {
                warn!("couldn't terminate the status line: {io}");
            }

            return Err(e);
        }
    };

    reports.extend(pool.join_all().await?);
    reports.sort_by_key(|report| report.worker);
    Ok((last, reports))
}

#[cfg(test)]
mod tests {
    use std::{
        num::{NonZeroU64, NonZeroUsize},
        time::Duration,
    };

    use super::*;
    use crate::{error::SimErr, telemetry::RenderFormat, trial::Door};

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_worker_halts_the_others() {
        const TRIALS: u64 = 200_000_000;

        let counters = Arc::new(TrialCounters::new());
        let partitions = partition(TRIALS, NonZeroUsize::new(4).unwrap(), 11).unwrap();
        let mut pool = WorkerPool::new(partitions, NonZeroU64::new(1_000).unwrap());
        let mut telemetry = Telemetry::new(TRIALS, 0.05, Duration::from_millis(1));
        let mut renderer = Renderer::new(RenderFormat::Text, Vec::new());

        let start = Instant::now();
        pool.start(&counters);
        pool.spawn_task(&counters, |_| {
            std::thread::sleep(Duration::from_millis(20));
            Err(SimErr::UnreachableOutcome {
                first_pick: Door::Third,
                revealed: Door::Third,
            })
        });

        let res = supervise(&mut pool, &counters, &mut telemetry, &mut renderer, start).await;

        assert!(matches!(
            res,
            Err(SimErr::UnreachableOutcome {
                first_pick: Door::Third,
                revealed: Door::Third,
            })
        ));
        assert!(counters.is_halted());
        assert!(pool.is_empty());

        let totals = counters.snapshot();
        assert!(totals.plays < TRIALS, "{totals:?}");
        assert_eq!(totals.plays % 1_000, 0, "workers stop on a batch boundary");

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.is_empty() || out.ends_with('\n'), "{out:?}");
    }
}
