use serde::Serialize;

/// A count of played trials and how many of them were won.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub plays: u64,
    pub wins: u64,
}

impl Tally {
    /// Creates a tally of `plays` trials, `wins` of them won.
    pub fn new(plays: u64, wins: u64) -> Self {
        Self { plays, wins }
    }

    /// Records the outcome of a single trial.
    #[inline]
    pub fn record(&mut self, won: bool) {
        self.plays += 1;
        self.wins += won as u64;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.plays == 0
    }

    /// Returns the fraction of won trials, `0` if nothing was played yet.
    pub fn win_rate(&self) -> f64 {
        if self.plays == 0 {
            return 0.;
        }

        self.wins as f64 / self.plays as f64
    }

    /// Returns the standard error of `win_rate`, `sqrt(p * (1 - p) / n)`.
    pub fn std_error(&self) -> f64 {
        if self.plays == 0 {
            return 0.;
        }

        let p = self.win_rate();
        (p * (1. - p) / self.plays as f64).sqrt()
    }
}
