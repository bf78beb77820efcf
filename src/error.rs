use thiserror::Error;

use crate::state::Imbalance;
use crate::workload::Primitive;

/// Fatal benchmark failures. None of these are retried: each one means the
/// timings of the current run cannot be trusted.
#[derive(Error, Debug)]
pub enum BenchError {
    /// The primitive let two threads into its critical section.
    #[error("{primitive} critical section violated")]
    Unbalanced {
        primitive: Primitive,
        #[source]
        source: Imbalance,
    },

    #[error("{0} lock poisoned by a panicking worker")]
    Poisoned(Primitive),

    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),

    #[error("start barrier broken before all workers arrived")]
    BarrierBroken,

    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),

    #[error("a trial needs at least one worker thread")]
    NoThreads,

    #[error("target {target} leaves no headroom for {threads} threads")]
    TargetTooLarge { target: u32, threads: usize },
}

/// Rejected command line or environment settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),

    #[error("expected at most one argument, got {0}")]
    TooManyArguments(usize),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("{var} = {value} exceeds the maximum of {max}")]
    OutOfRange {
        var: &'static str,
        value: String,
        max: u32,
    },
}
