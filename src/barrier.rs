use atomic_wait::{wait, wake_all};
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};

use crate::error::BenchError;

const BROKEN: u32 = 1 << 31;

/// One-shot rendezvous: `wait` returns once `parties` threads have arrived.
///
/// The high bit of `state` marks the barrier as broken, the rest counts
/// arrivals. A broken barrier fails every pending and future `wait`.
pub struct Rendezvous {
    state: AtomicU32,
    parties: u32,
}

impl Rendezvous {
    pub fn new(parties: u32) -> Self {
        assert!(parties > 0 && parties < BROKEN, "bad party count: {parties}");
        Self {
            state: AtomicU32::new(0),
            parties,
        }
    }

    pub fn wait(&self) -> Result<(), BenchError> {
        let s = self.state.fetch_add(1, AcqRel) + 1;
        if s & BROKEN != 0 {
            return Err(BenchError::BarrierBroken);
        }
        if s == self.parties {
            wake_all(&self.state);
            return Ok(());
        }

        loop {
            let s = self.state.load(Acquire);
            if s & BROKEN != 0 {
                return Err(BenchError::BarrierBroken);
            }
            if s >= self.parties {
                return Ok(());
            }
            wait(&self.state, s);
        }
    }

    /// Releases every waiter with [`BenchError::BarrierBroken`].
    pub fn break_barrier(&self) {
        self.state.fetch_or(BROKEN, Release);
        wake_all(&self.state);
    }
}
