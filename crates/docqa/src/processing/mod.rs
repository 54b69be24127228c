//! Worker pool and deadlines for document processing

mod worker;

pub use worker::{run_with_timeout, BlockingPool};
