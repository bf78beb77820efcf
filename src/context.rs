use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::BenchError;
use crate::mutex::Mutex;
use crate::semaphore::SemaphoreLock;
use crate::state::GuardedState;
use crate::workload::{CriticalSection, Primitive};

/// State shared by every trial of a run, one slot per primitive.
///
/// Built once at startup and reused; [`BenchContext::reset`] puts it back to
/// its initial state between trials.
pub struct BenchContext {
    pub(crate) atomic: AtomicU32,
    pub(crate) monitor: StdMutex<GuardedState>,
    pub(crate) mutex: Mutex<GuardedState>,
    pub(crate) semaphore: SemaphoreLock<GuardedState>,
}

/// Counter and queue depth of one primitive, read under its own guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub counter: u32,
    pub queued: usize,
}

impl BenchContext {
    pub fn new() -> Self {
        Self {
            atomic: AtomicU32::new(0),
            monitor: StdMutex::new(GuardedState::new("monitor")),
            mutex: Mutex::new(GuardedState::new("mutex")),
            semaphore: SemaphoreLock::new(GuardedState::new("sem")),
        }
    }

    /// Zeroes every counter and empties every queue, each under the
    /// discipline of the primitive that owns it.
    pub fn reset(&self) -> Result<(), BenchError> {
        // no workers are running between trials
        self.atomic.store(0, Ordering::Release);

        self.monitor.enter(GuardedState::reset)?;
        self.mutex.enter(GuardedState::reset)?;
        self.semaphore.enter(GuardedState::reset)?;
        Ok(())
    }

    pub fn snapshot(&self, primitive: Primitive) -> Result<Snapshot, BenchError> {
        let read = |s: &mut GuardedState| Snapshot {
            counter: s.counter(),
            queued: s.queue().len(),
        };

        match primitive {
            Primitive::Atomic => Ok(Snapshot {
                counter: self.atomic.load(Ordering::Acquire),
                queued: 0,
            }),
            Primitive::Monitor => self.monitor.enter(read),
            Primitive::Mutex => self.mutex.enter(read),
            Primitive::Semaphore => self.semaphore.enter(read),
        }
    }
}

impl Default for BenchContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_every_primitive() {
        let ctx = BenchContext::new();
        ctx.atomic.store(41, Ordering::Relaxed);
        for _ in 0..3 {
            ctx.monitor.lock().unwrap().step().unwrap();
            ctx.mutex.lock().step().unwrap();
            ctx.semaphore.lock().step().unwrap();
        }
        assert_eq!(
            ctx.snapshot(Primitive::Mutex).unwrap(),
            Snapshot { counter: 3, queued: 1 }
        );

        ctx.reset().unwrap();
        for primitive in Primitive::ALL {
            assert_eq!(
                ctx.snapshot(primitive).unwrap(),
                Snapshot { counter: 0, queued: 0 },
                "{primitive} not reset"
            );
        }
    }

    #[test]
    fn poisoned_monitor_is_reported() {
        let ctx = BenchContext::new();
        std::thread::scope(|s| {
            let h: std::thread::ScopedJoinHandle<'_, ()> = s.spawn(|| {
                let _g = ctx.monitor.lock().unwrap();
                panic!("die holding the monitor");
            });
            assert!(h.join().is_err());
        });

        assert!(matches!(
            ctx.reset(),
            Err(BenchError::Poisoned(Primitive::Monitor))
        ));
    }
}
