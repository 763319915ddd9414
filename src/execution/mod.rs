mod partitioning;
mod pool;
mod worker;

pub use partitioning::{Partition, partition};
pub use pool::WorkerPool;
pub use worker::{Worker, WorkerReport};
