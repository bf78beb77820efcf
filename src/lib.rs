//! Contention benchmark for four mutual-exclusion primitives: an atomic
//! counter, the std monitor mutex, a futex mutex and a counting semaphore.

pub mod barrier;
pub mod config;
pub mod context;
pub mod error;
pub mod latch;
pub mod logging;
pub mod mutex;
pub mod queue;
pub mod report;
pub mod runner;
pub mod semaphore;
pub mod state;
pub mod workload;

pub use config::{BenchConfig, Mode};
pub use context::{BenchContext, Snapshot};
pub use error::{BenchError, ConfigError};
pub use runner::{Row, run_row, run_trial, run_workers, warm_up};
pub use workload::Primitive;
