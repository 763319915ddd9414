mod counters;
mod tally;

pub use counters::TrialCounters;
pub use tally::Tally;
