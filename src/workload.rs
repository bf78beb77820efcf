use std::fmt;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::Ordering;

use crate::context::BenchContext;
use crate::error::BenchError;
use crate::mutex::Mutex;
use crate::semaphore::SemaphoreLock;
use crate::state::GuardedState;

/// The primitives under test, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Atomic,
    Monitor,
    Mutex,
    Semaphore,
}

/// A critical-section loop that runs until the primitive's counter hits the
/// target.
pub type Workload = fn(&BenchContext, u32) -> Result<(), BenchError>;

const WORKLOADS: [Workload; 4] = [
    atomic_workload,
    monitor_workload,
    mutex_workload,
    semaphore_workload,
];

impl Primitive {
    pub const ALL: [Primitive; 4] = [
        Primitive::Atomic,
        Primitive::Monitor,
        Primitive::Mutex,
        Primitive::Semaphore,
    ];

    pub fn workload(self) -> Workload {
        WORKLOADS[self as usize]
    }

    /// Column heading in the results table.
    pub fn label(self) -> &'static str {
        match self {
            Primitive::Atomic => "Atomic",
            Primitive::Monitor => "Monitor",
            Primitive::Mutex => "Mutex",
            Primitive::Semaphore => "Semaphore",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Primitive::Atomic => "atomic",
            Primitive::Monitor => "monitor",
            Primitive::Mutex => "mutex",
            Primitive::Semaphore => "semaphore",
        })
    }
}

/// Anything that can give one thread at a time `&mut GuardedState`.
pub trait CriticalSection: Sync {
    const PRIMITIVE: Primitive;

    fn enter<R>(&self, body: impl FnOnce(&mut GuardedState) -> R) -> Result<R, BenchError>;
}

impl CriticalSection for StdMutex<GuardedState> {
    const PRIMITIVE: Primitive = Primitive::Monitor;

    #[inline]
    fn enter<R>(&self, body: impl FnOnce(&mut GuardedState) -> R) -> Result<R, BenchError> {
        let mut state = self
            .lock()
            .map_err(|_| BenchError::Poisoned(Self::PRIMITIVE))?;
        Ok(body(&mut *state))
    }
}

impl CriticalSection for Mutex<GuardedState> {
    const PRIMITIVE: Primitive = Primitive::Mutex;

    #[inline]
    fn enter<R>(&self, body: impl FnOnce(&mut GuardedState) -> R) -> Result<R, BenchError> {
        let mut state = self.lock();
        Ok(body(&mut *state))
    }
}

impl CriticalSection for SemaphoreLock<GuardedState> {
    const PRIMITIVE: Primitive = Primitive::Semaphore;

    #[inline]
    fn enter<R>(&self, body: impl FnOnce(&mut GuardedState) -> R) -> Result<R, BenchError> {
        let mut state = self.lock();
        Ok(body(&mut *state))
    }
}

/// Lock-free baseline: a bare fetch-add.
///
/// A thread whose increment lands past `target` takes it back, so the
/// counter settles at exactly `target` once every worker has stopped. The
/// counter peaks at `target` plus one per worker, so callers keep `target`
/// that far below `u32::MAX`.
fn atomic_workload(ctx: &BenchContext, target: u32) -> Result<(), BenchError> {
    loop {
        let prev = ctx.atomic.fetch_add(1, Ordering::AcqRel);
        if prev >= target {
            ctx.atomic.fetch_sub(1, Ordering::AcqRel);
            return Ok(());
        }
        // prev < target, so this cannot overflow
        if prev + 1 == target {
            return Ok(());
        }
    }
}

fn guarded_workload<L: CriticalSection>(lock: &L, target: u32) -> Result<(), BenchError> {
    loop {
        match lock.enter(|state| state.advance(target))? {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(()),
            Err(source) => {
                return Err(BenchError::Unbalanced {
                    primitive: L::PRIMITIVE,
                    source,
                });
            }
        }
    }
}

fn monitor_workload(ctx: &BenchContext, target: u32) -> Result<(), BenchError> {
    guarded_workload(&ctx.monitor, target)
}

fn mutex_workload(ctx: &BenchContext, target: u32) -> Result<(), BenchError> {
    guarded_workload(&ctx.mutex, target)
}

fn semaphore_workload(ctx: &BenchContext, target: u32) -> Result<(), BenchError> {
    guarded_workload(&ctx.semaphore, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Snapshot;

    #[test]
    fn table_matches_selector() {
        for (i, primitive) in Primitive::ALL.into_iter().enumerate() {
            assert_eq!(primitive as usize, i);
        }
        assert_eq!(Primitive::Semaphore.label(), "Semaphore");
        assert_eq!(Primitive::Monitor.to_string(), "monitor");
    }

    #[test]
    fn lock_workloads_stop_at_target() {
        let ctx = BenchContext::new();
        for primitive in [Primitive::Monitor, Primitive::Mutex, Primitive::Semaphore] {
            primitive.workload()(&ctx, 100).unwrap();
            assert_eq!(
                ctx.snapshot(primitive).unwrap(),
                Snapshot { counter: 100, queued: 0 }
            );
        }
    }

    #[test]
    fn atomic_overshoot_is_undone() {
        let ctx = BenchContext::new();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| atomic_workload(&ctx, 50_000).unwrap());
            }
        });

        assert_eq!(ctx.snapshot(Primitive::Atomic).unwrap().counter, 50_000);
    }

    #[test]
    fn atomic_target_near_u32_max() {
        let ctx = BenchContext::new();
        let threads = 4;
        let target = u32::MAX - threads;
        ctx.atomic.store(target - 2, Ordering::Relaxed);

        std::thread::scope(|s| {
            let workers: Vec<_> = (0..threads)
                .map(|_| s.spawn(|| atomic_workload(&ctx, target)))
                .collect();
            for w in workers {
                assert!(w.join().unwrap().is_ok());
            }
        });

        assert_eq!(ctx.snapshot(Primitive::Atomic).unwrap().counter, target);
    }

    #[test]
    fn zero_target_does_nothing() {
        let ctx = BenchContext::new();
        for primitive in Primitive::ALL {
            primitive.workload()(&ctx, 0).unwrap();
            assert_eq!(ctx.snapshot(primitive).unwrap().counter, 0);
        }
    }

    #[test]
    fn contended_lock_workloads_stay_balanced() {
        let ctx = BenchContext::new();
        for primitive in [Primitive::Monitor, Primitive::Mutex, Primitive::Semaphore] {
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| primitive.workload()(&ctx, 20_001).unwrap());
                }
            });
            assert_eq!(
                ctx.snapshot(primitive).unwrap(),
                Snapshot { counter: 20_001, queued: 1 }
            );
        }
    }
}
