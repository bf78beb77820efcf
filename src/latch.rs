use atomic_wait::{wait, wake_all};
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::{AcqRel, Acquire};

/// Completion countdown. Waiters block until the count hits zero.
pub struct CountDownLatch {
    count: AtomicU32,
}

impl CountDownLatch {
    pub const fn new(count: u32) -> Self {
        Self {
            count: AtomicU32::new(count),
        }
    }

    pub fn count_down(&self) {
        let prev = self
            .count
            .fetch_update(AcqRel, Acquire, |c| c.checked_sub(1))
            .unwrap_or(0);
        if prev == 1 {
            wake_all(&self.count);
        }
    }

    /// Counts down when the returned handle is dropped, panics included.
    pub fn arrive_on_drop(&self) -> Arrival<'_> {
        Arrival { latch: self }
    }

    pub fn wait(&self) {
        loop {
            let c = self.count.load(Acquire);
            if c == 0 {
                return;
            }
            wait(&self.count, c);
        }
    }
}

pub struct Arrival<'a> {
    latch: &'a CountDownLatch,
}

impl Drop for Arrival<'_> {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn waits_for_every_arrival() {
        let latch = CountDownLatch::new(4);
        let finished = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    finished.fetch_add(1, Ordering::SeqCst);
                    latch.count_down();
                });
            }
            latch.wait();
            assert_eq!(finished.load(Ordering::SeqCst), 4);
        });
    }

    #[test]
    fn saturates_at_zero() {
        let latch = CountDownLatch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.count.load(Acquire), 0);
        latch.wait();
    }

    #[test]
    fn arrival_counts_down_on_panic() {
        let latch = CountDownLatch::new(1);

        std::thread::scope(|s| {
            let h: std::thread::ScopedJoinHandle<'_, ()> = s.spawn(|| {
                let _arrival = latch.arrive_on_drop();
                panic!("worker blew up");
            });
            latch.wait();
            assert!(h.join().is_err());
        });
    }
}
