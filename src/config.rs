use std::{
    env,
    num::{NonZeroU64, NonZeroUsize},
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::{
    error::{Result, SimErr},
    telemetry::RenderFormat,
};

pub const DEFAULT_TRIALS: NonZeroU64 = NonZeroU64::new(1_000_000_000).unwrap();
pub const DEFAULT_WORKERS: NonZeroUsize = NonZeroUsize::new(32).unwrap();
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(33);
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_BATCH_SIZE: NonZeroU64 = NonZeroU64::new(100_000).unwrap();

const TRIALS_VAR: &str = "MONTY_TRIALS";
const WORKERS_VAR: &str = "MONTY_WORKERS";
const POLL_MS_VAR: &str = "MONTY_POLL_MS";
const ALPHA_VAR: &str = "MONTY_ALPHA";
const BATCH_VAR: &str = "MONTY_BATCH";
const SEED_VAR: &str = "MONTY_SEED";
const FORMAT_VAR: &str = "MONTY_FORMAT";

/// Immutable parameters of a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    trials: NonZeroU64,
    workers: NonZeroUsize,
    poll_interval: Duration,
    alpha: f64,
    batch_size: NonZeroU64,
    seed: Option<u64>,
    format: RenderFormat,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            workers: DEFAULT_WORKERS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            alpha: DEFAULT_ALPHA,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
            format: RenderFormat::Text,
        }
    }
}

impl SimConfig {
    /// Creates a new simulation configuration.
    ///
    /// # Args
    /// * `trials` - Total amount of trials to play.
    /// * `workers` - Amount of parallel workers.
    /// * `poll_interval` - Time between two telemetry samples.
    /// * `alpha` - Smoothing factor of the throughput moving average, in `(0, 1]`.
    /// * `batch_size` - Trials a worker plays between two flushes.
    ///
    /// # Returns
    /// A `SimConfig` instance, or `InvalidConfig` if `alpha` or `poll_interval` are out of range.
    pub fn new(
        trials: NonZeroU64,
        workers: NonZeroUsize,
        poll_interval: Duration,
        alpha: f64,
        batch_size: NonZeroU64,
    ) -> Result<Self> {
        if !(alpha > 0. && alpha <= 1.) {
            return Err(SimErr::InvalidConfig(format!(
                "smoothing factor must be in (0, 1], got {alpha}"
            )));
        }

        if poll_interval.is_zero() {
            return Err(SimErr::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }

        Ok(Self {
            trials,
            workers,
            poll_interval,
            alpha,
            batch_size,
            seed: None,
            format: RenderFormat::Text,
        })
    }

    /// Pins the base seed every worker seed derives from, making the run reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets how telemetry snapshots are rendered.
    pub fn with_format(mut self, format: RenderFormat) -> Self {
        self.format = format;
        self
    }

    /// Builds a configuration from the defaults, overridden by any `MONTY_*` environment variable.
    ///
    /// # Returns
    /// An `InvalidConfig` error if a variable is set but can't be parsed or is out of range.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let trials = parse_var(&lookup, TRIALS_VAR)?.unwrap_or(defaults.trials);
        let workers = parse_var(&lookup, WORKERS_VAR)?.unwrap_or(defaults.workers);
        let poll_interval = parse_var::<_, u64>(&lookup, POLL_MS_VAR)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        let alpha = parse_var(&lookup, ALPHA_VAR)?.unwrap_or(defaults.alpha);
        let batch_size = parse_var(&lookup, BATCH_VAR)?.unwrap_or(defaults.batch_size);

        let mut config = Self::new(trials, workers, poll_interval, alpha, batch_size)?;
        config.seed = parse_var(&lookup, SEED_VAR)?;
        config.format = parse_var(&lookup, FORMAT_VAR)?.unwrap_or(defaults.format);
        Ok(config)
    }

    /// Returns the total number of trials to play.
    ///
    /// # Returns
    /// The goal of the run.
    pub fn trials(&self) -> u64 {
        self.trials.get()
    }

    /// Returns the number of parallel workers.
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns how many trials a worker plays between two flushes.
    pub fn batch_size(&self) -> NonZeroU64 {
        self.batch_size
    }

    pub fn format(&self) -> RenderFormat {
        self.format
    }

    /// Returns the configured seed, or one taken from the current time.
    pub fn base_seed(&self) -> u64 {
        self.seed.unwrap_or_else(clock_seed)
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e| SimErr::InvalidConfig(format!("{key}={raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = SimConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.trials(), DEFAULT_TRIALS.get());
        assert_eq!(config.workers(), DEFAULT_WORKERS);
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(config.alpha(), DEFAULT_ALPHA);
        assert_eq!(config.batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(config.format(), RenderFormat::Text);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn overrides_are_applied() {
        let config = SimConfig::from_lookup(lookup_from(&[
            ("MONTY_TRIALS", "1000"),
            ("MONTY_WORKERS", "3"),
            ("MONTY_POLL_MS", "250"),
            ("MONTY_ALPHA", "0.5"),
            ("MONTY_BATCH", "64"),
            ("MONTY_SEED", "42"),
            ("MONTY_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.trials(), 1000);
        assert_eq!(config.workers().get(), 3);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.alpha(), 0.5);
        assert_eq!(config.batch_size().get(), 64);
        assert_eq!(config.base_seed(), 42);
        assert_eq!(config.format(), RenderFormat::Json);
    }

    #[test]
    fn rejects_zero_workers() {
        let err = SimConfig::from_lookup(lookup_from(&[("MONTY_WORKERS", "0")])).unwrap_err();
        assert!(matches!(err, SimErr::InvalidConfig(_)));
    }

    #[test]
    fn rejects_garbage() {
        let err = SimConfig::from_lookup(lookup_from(&[("MONTY_TRIALS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MONTY_TRIALS"));
    }

    #[test]
    fn rejects_alpha_out_of_range() {
        for alpha in ["0", "-0.1", "1.5", "NaN"] {
            let res = SimConfig::from_lookup(lookup_from(&[("MONTY_ALPHA", alpha)]));
            assert!(res.is_err(), "alpha {alpha} accepted");
        }
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let res = SimConfig::from_lookup(lookup_from(&[("MONTY_POLL_MS", "0")]));
        assert!(res.is_err());
    }
}
