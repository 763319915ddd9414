use std::{fmt, io::Write, time::Duration};

use serde::Serialize;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::Renderer;
use crate::{
    error::Result,
    storage::{Tally, TrialCounters},
};

/// A rendered view of the run at a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    pub goal: u64,
    pub completed: u64,
    pub wins: u64,
    /// Share of switching wins, in percent rounded to two decimals.
    pub win_pct: f64,
    pub win_pct_std_error: f64,
    pub instant_rate: f64,
    pub overall_rate: f64,
    pub smoothed_rate: f64,
    pub elapsed_secs: f64,
    /// `None` while the smoothed rate is still zero.
    pub remaining_secs: Option<f64>,
}

impl Snapshot {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.goal
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "goal {} | plays {} | wins {} ({:.2}% ± {:.2}) | rate {:.0}/s avg {:.0}/s ema {:.0}/s | elapsed {:.1}s | eta ",
            self.goal,
            self.completed,
            self.wins,
            self.win_pct,
            self.win_pct_std_error,
            self.instant_rate,
            self.overall_rate,
            self.smoothed_rate,
            self.elapsed_secs,
        )?;

        match self.remaining_secs {
            Some(secs) => write!(f, "{secs:.1}s"),
            None => f.write_str("--"),
        }
    }
}

/// Turns raw counter readings into throughput and ETA estimates.
///
/// Keeps the previous reading around so every new one yields the instantaneous rate since the
/// last tick, plus an exponential moving average of it seeded with the first sample.
#[derive(Debug, Clone)]
pub struct Telemetry {
    goal: u64,
    alpha: f64,
    interval: Duration,
    last_elapsed: Duration,
    last_plays: u64,
    smoothed: Option<f64>,
}

impl Telemetry {
    /// Creates a new `Telemetry` sampler.
    ///
    /// # Arguments
    /// * `goal` - The amount of trials the run is going to play.
    /// * `alpha` - Weight of the newest sample in the moving average.
    /// * `interval` - Time between two samples when watching the counters.
    ///
    /// # Returns
    /// A new `Telemetry` instance.
    pub fn new(goal: u64, alpha: f64, interval: Duration) -> Self {
        Self {
            goal,
            alpha,
            interval,
            last_elapsed: Duration::ZERO,
            last_plays: 0,
            smoothed: None,
        }
    }

    /// Returns the current moving average of the throughput, if any sample was taken.
    pub fn smoothed_rate(&self) -> Option<f64> {
        self.smoothed
    }

    /// Folds a new counter reading into the estimates.
    ///
    /// # Arguments
    /// * `elapsed` - Time since the start of the run.
    /// * `tally` - The counters read at `elapsed`.
    ///
    /// # Returns
    /// The resulting `Snapshot`.
    pub fn observe(&mut self, elapsed: Duration, tally: Tally) -> Snapshot {
        let dt = elapsed.saturating_sub(self.last_elapsed).as_secs_f64();
        let delta = tally.plays.saturating_sub(self.last_plays);
        let instant_rate = if dt > 0. { delta as f64 / dt } else { 0. };

        let smoothed_rate = match self.smoothed {
            Some(prev) => self.alpha * instant_rate + (1. - self.alpha) * prev,
            None => instant_rate,
        };

        self.smoothed = Some(smoothed_rate);
        self.last_elapsed = elapsed;
        self.last_plays = tally.plays;

        let elapsed_secs = elapsed.as_secs_f64();
        let overall_rate = if elapsed_secs > 0. {
            tally.plays as f64 / elapsed_secs
        } else {
            0.
        };

        let remaining = self.goal.saturating_sub(tally.plays);
        let remaining_secs = if remaining == 0 {
            Some(0.)
        } else if smoothed_rate > 0. {
            Some(remaining as f64 / smoothed_rate)
        } else {
            None
        };

        Snapshot {
            goal: self.goal,
            completed: tally.plays,
            wins: tally.wins,
            win_pct: (tally.win_rate() * 10_000.).round() / 100.,
            win_pct_std_error: tally.std_error() * 100.,
            instant_rate,
            overall_rate,
            smoothed_rate,
            elapsed_secs,
            remaining_secs,
        }
    }

    /// Samples `counters` every `interval` until they reach the goal.
    ///
    /// Every snapshot is rendered, the one reaching the goal through `Renderer::finish`.
    ///
    /// # Arguments
    /// * `start` - When the run started, the origin of every elapsed time.
    /// * `counters` - The shared counters to watch.
    /// * `renderer` - Where to write each snapshot.
    ///
    /// # Returns
    /// The final snapshot, or an `Io` error if rendering failed.
    pub async fn watch<W: Write>(
        &mut self,
        start: Instant,
        counters: &TrialCounters,
        renderer: &mut Renderer<W>,
    ) -> Result<Snapshot> {
        let mut ticker = time::interval_at(start + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let snapshot = self.observe(start.elapsed(), counters.snapshot());
            if snapshot.is_complete() {
                renderer.finish(&snapshot)?;
                return Ok(snapshot);
            }

            renderer.render(&snapshot)?;
        }
    }
}
