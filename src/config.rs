use crate::error::ConfigError;
use crate::workload::Primitive;

/// Thread counts swept by a full run.
pub const THREAD_COUNTS: [usize; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 24];

pub const TEST_COUNT: u32 = 10_000_000;
/// Largest accepted iteration count. The atomic workload overshoots by up to
/// one increment per thread before undoing it, so the counter needs headroom.
pub const MAX_COUNT: u32 = u32::MAX - 1024;
pub const WARM_LOOPS: u32 = 4;
pub const WARM_COUNT: u32 = 10_000_000;
pub const WARM_THREADS: usize = 3;

const TEST_COUNT_VAR: &str = "SYNCBENCH_TEST_COUNT";
const WARM_LOOPS_VAR: &str = "SYNCBENCH_WARM_LOOPS";
const WARM_COUNT_VAR: &str = "SYNCBENCH_WARM_COUNT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every primitive over [`THREAD_COUNTS`].
    All,
    /// Only the explicit mutex, optionally at a single thread count.
    MutexOnly { threads: Option<usize> },
}

impl Mode {
    /// Parses the optional mode argument: none, `lock` (or `mutex`), `2` or `3`.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<_> = args.into_iter().collect();
        match args.as_slice() {
            [] => Ok(Mode::All),
            [arg] => match arg.as_ref() {
                "lock" | "mutex" => Ok(Mode::MutexOnly { threads: None }),
                "2" => Ok(Mode::MutexOnly { threads: Some(2) }),
                "3" => Ok(Mode::MutexOnly { threads: Some(3) }),
                other => Err(ConfigError::UnknownArgument(other.to_owned())),
            },
            more => Err(ConfigError::TooManyArguments(more.len())),
        }
    }

    pub fn primitives(self) -> &'static [Primitive] {
        match self {
            Mode::All => &Primitive::ALL,
            Mode::MutexOnly { .. } => &[Primitive::Mutex],
        }
    }

    pub fn thread_counts(self) -> Vec<usize> {
        match self {
            Mode::MutexOnly { threads: Some(n) } => vec![n],
            _ => THREAD_COUNTS.to_vec(),
        }
    }
}

/// Everything a run needs to know, from the command line and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub mode: Mode,
    /// Critical-section operations per timed trial.
    pub test_count: u32,
    pub warm_loops: u32,
    pub warm_count: u32,
    pub warm_threads: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            mode: Mode::All,
            test_count: TEST_COUNT,
            warm_loops: WARM_LOOPS,
            warm_count: WARM_COUNT,
            warm_threads: WARM_THREADS,
        }
    }
}

impl BenchConfig {
    /// Reads the process arguments (program name excluded) and environment.
    pub fn from_env<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self::from_sources(args, |var| std::env::var(var).ok())
    }

    pub fn from_sources<I, F>(args: I, env: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            mode: Mode::from_args(args)?,
            test_count: env_u32(&env, TEST_COUNT_VAR, defaults.test_count)?,
            warm_loops: env_u32(&env, WARM_LOOPS_VAR, defaults.warm_loops)?,
            warm_count: env_u32(&env, WARM_COUNT_VAR, defaults.warm_count)?,
            warm_threads: defaults.warm_threads,
        })
    }
}

fn env_u32<F>(env: &F, var: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = env(var) else {
        return Ok(default);
    };
    match value.trim().replace(['_', ','], "").parse::<u32>() {
        Ok(n) if n <= MAX_COUNT => Ok(n),
        Ok(_) => Err(ConfigError::OutOfRange {
            var,
            value,
            max: MAX_COUNT,
        }),
        Err(_) => Err(ConfigError::InvalidEnv { var, value }),
    }
}
