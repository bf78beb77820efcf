use std::any::Any;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::barrier::Rendezvous;
use crate::config::BenchConfig;
use crate::context::BenchContext;
use crate::error::BenchError;
use crate::latch::CountDownLatch;
use crate::workload::Primitive;

/// Timings of every tested primitive at one thread count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub threads: usize,
    pub elapsed: Vec<(Primitive, Duration)>,
}

/// Runs one timed trial and resets the context afterwards, whether the
/// trial succeeded or not.
pub fn run_trial(
    ctx: &BenchContext,
    primitive: Primitive,
    threads: usize,
    target: u32,
) -> Result<Duration, BenchError> {
    let outcome = run_workers(ctx, primitive, threads, target);
    let reset = ctx.reset();
    let elapsed = outcome?;
    reset?;
    Ok(elapsed)
}

/// Runs one timed trial without resetting, leaving the final state of
/// `primitive` in `ctx` for inspection.
///
/// `threads` workers line up on a start barrier together with the calling
/// thread. The clock starts when the barrier opens and stops when the last
/// worker has counted down the completion latch.
pub fn run_workers(
    ctx: &BenchContext,
    primitive: Primitive,
    threads: usize,
    target: u32,
) -> Result<Duration, BenchError> {
    if threads == 0 {
        return Err(BenchError::NoThreads);
    }
    let too_large = || BenchError::TargetTooLarge { target, threads };
    let parties = u32::try_from(threads + 1).map_err(|_| too_large())?;
    // the atomic workload overshoots by up to one increment per worker
    if target > u32::MAX - parties {
        return Err(too_large());
    }

    let workload = primitive.workload();
    let started = Rendezvous::new(parties);
    let completed = CountDownLatch::new(parties - 1);

    debug!(%primitive, threads, target, "starting trial");

    thread::scope(|s| {
        let mut workers = Vec::with_capacity(threads);
        for id in 0..threads {
            let (started, completed) = (&started, &completed);
            let spawned = thread::Builder::new()
                .name(format!("{primitive}-{id}"))
                .spawn_scoped(s, move || {
                    let _arrival = completed.arrive_on_drop();
                    started.wait()?;
                    workload(ctx, target).inspect_err(|e| {
                        error!(%primitive, worker = id, error = %e, "worker failed");
                    })
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // the missing workers would never arrive, release the rest
                    started.break_barrier();
                    let _ = join_all(workers);
                    return Err(BenchError::Spawn(e));
                }
            }
        }

        started.wait()?;
        let start = Instant::now();
        completed.wait();
        let elapsed = start.elapsed();

        join_all(workers)?;
        debug!(
            %primitive,
            threads,
            elapsed_ms = elapsed.as_millis() as u64,
            "trial complete"
        );
        Ok(elapsed)
    })
}

fn join_all(
    workers: Vec<thread::ScopedJoinHandle<'_, Result<(), BenchError>>>,
) -> Result<(), BenchError> {
    let mut first = Ok(());
    for worker in workers {
        let result = worker
            .join()
            .unwrap_or_else(|payload| Err(BenchError::WorkerPanicked(panic_message(&*payload))));
        if first.is_ok() {
            first = result;
        }
    }
    first
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Times each of `primitives` at `threads` threads, in order.
pub fn run_row(
    ctx: &BenchContext,
    primitives: &[Primitive],
    threads: usize,
    target: u32,
) -> Result<Row, BenchError> {
    let elapsed = primitives
        .iter()
        .map(|&p| run_trial(ctx, p, threads, target).map(|d| (p, d)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row { threads, elapsed })
}

/// Runs the configured primitives `warm_loops` times with untimed results
/// so caches, branch predictors and the scheduler settle before measuring.
///
/// `progress` receives the number of rounds left, counting down to 1.
pub fn warm_up(
    ctx: &BenchContext,
    config: &BenchConfig,
    mut progress: impl FnMut(u32),
) -> Result<(), BenchError> {
    for round in (1..=config.warm_loops).rev() {
        progress(round);
        for &primitive in config.mode.primitives() {
            run_trial(ctx, primitive, config.warm_threads, config.warm_count)?;
        }
    }
    Ok(())
}
