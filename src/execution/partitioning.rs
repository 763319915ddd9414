use std::num::NonZeroUsize;

use crate::error::{Result, SimErr};

/// The share of the total trials assigned to a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    index: usize,
    trials: u64,
    seed: u64,
}

impl Partition {
    /// Creates a new `Partition`.
    ///
    /// # Arguments
    /// * `index` - The worker this share belongs to.
    /// * `trials` - The amount of trials the worker plays.
    /// * `seed` - The seed of the worker's random stream.
    ///
    /// # Returns
    /// A new `Partition` instance.
    pub fn new(index: usize, trials: u64, seed: u64) -> Self {
        Self {
            index,
            trials,
            seed,
        }
    }

    /// Returns the index of the worker owning this share.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the amount of trials in this share.
    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Returns the seed for the worker's random stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Splits `total` trials among `workers` partitions.
///
/// Every worker but the last one gets `total / workers` trials, the last one also takes the
/// remainder of the division. Each partition's seed is `base_seed` XORed with its index so no two
/// workers replay the same stream.
///
/// # Arguments
/// * `total` - The amount of trials to split.
/// * `workers` - The amount of partitions.
/// * `base_seed` - The seed shared by the whole run.
///
/// # Returns
/// The partitions ordered by index, or a `PartitionMismatch` if their shares don't add up to
/// `total`.
pub fn partition(total: u64, workers: NonZeroUsize, base_seed: u64) -> Result<Vec<Partition>> {
    let workers = workers.get();
    let base = total / workers as u64;
    let last = total - base * (workers as u64 - 1);

    let partitions: Vec<_> = (0..workers)
        .map(|index| {
            let trials = if index == workers - 1 { last } else { base };
            Partition::new(index, trials, base_seed ^ index as u64)
        })
        .collect();

    let assigned: u64 = partitions.iter().map(Partition::trials).sum();
    if assigned != total {
        return Err(SimErr::PartitionMismatch {
            assigned,
            requested: total,
        });
    }

    Ok(partitions)
}
