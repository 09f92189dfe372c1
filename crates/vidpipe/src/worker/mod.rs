pub mod job;
pub mod pool;

pub use job::{Job, JobOutcome, JobReport};
pub use pool::JobRunner;
