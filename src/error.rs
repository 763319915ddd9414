use std::{error::Error, fmt, io};

use crate::trial::Door;

/// The simulation's result type.
pub type Result<T> = std::result::Result<T, SimErr>;

/// Every failure the simulation can surface.
///
/// None of these are transient: they either describe an invalid configuration, caught before any
/// worker starts, or a broken internal invariant that aborts the run.
#[derive(Debug)]
pub enum SimErr {
    /// A configuration value is missing its constraints.
    InvalidConfig(String),
    /// The per-worker shares don't add up to the requested amount of trials.
    PartitionMismatch { assigned: u64, requested: u64 },
    /// The trial engine couldn't find a door to switch to.
    UnreachableOutcome { first_pick: Door, revealed: Door },
    /// A worker task panicked or was torn down before returning its report.
    WorkerPanicked(String),
    /// Rendering a snapshot failed.
    Io(io::Error),
}

impl fmt::Display for SimErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::PartitionMismatch {
                assigned,
                requested,
            } => write!(
                f,
                "partition mismatch: assigned {assigned} trials, requested {requested}"
            ),
            Self::UnreachableOutcome {
                first_pick,
                revealed,
            } => write!(
                f,
                "no door left to switch to: first pick {first_pick}, revealed {revealed}"
            ),
            Self::WorkerPanicked(msg) => write!(f, "worker task failed: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for SimErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SimErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<SimErr> for io::Error {
    fn from(value: SimErr) -> Self {
        match value {
            SimErr::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}
