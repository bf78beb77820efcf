use std::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU32, Ordering},
};

use atomic_wait::{wait, wake_one};

/// Counting semaphore on top of futex waits.
pub struct Semaphore {
    permits: AtomicU32,
    /// Threads that found no permit and may be asleep on `permits`.
    waiters: AtomicU32,
}

pub struct Permit<'a> {
    sem: &'a Semaphore,
}

impl Semaphore {
    pub const fn new(permits: u32) -> Self {
        Self {
            permits: AtomicU32::new(permits),
            waiters: AtomicU32::new(0),
        }
    }

    pub fn acquire(&self) -> Permit<'_> {
        loop {
            if let Some(permit) = self.try_acquire() {
                return permit;
            }

            self.waiters.fetch_add(1, Ordering::SeqCst);
            // re-check after announcing ourselves, a release in between
            // either bumped the count or will see the waiter
            if self.permits.load(Ordering::SeqCst) == 0 {
                wait(&self.permits, 0);
            }
            self.waiters.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut p = self.permits.load(Ordering::Relaxed);
        while p > 0 {
            match self
                .permits
                .compare_exchange_weak(p, p - 1, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return Some(Permit { sem: self }),
                Err(e) => p = e,
            }
        }
        None
    }

    fn release(&self) {
        self.permits.fetch_add(1, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) > 0 {
            wake_one(&self.permits);
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}

/// A value bracketed by a single-permit [`Semaphore`].
pub struct SemaphoreLock<T> {
    sem: Semaphore,
    value: UnsafeCell<T>,
}

unsafe impl<T> Sync for SemaphoreLock<T> where T: Send {}

pub struct SemaphoreGuard<'a, T> {
    // held for the guard's lifetime; dropping it hands the permit back
    _permit: Permit<'a>,
    value: &'a UnsafeCell<T>,
}

impl<T> SemaphoreLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            sem: Semaphore::new(1),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> SemaphoreGuard<'_, T> {
        SemaphoreGuard {
            _permit: self.sem.acquire(),
            value: &self.value,
        }
    }
}

impl<T> Deref for SemaphoreGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.value.get() }
    }
}

impl<T> DerefMut for SemaphoreGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.value.get() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn permits_are_counted() {
        let sem = Semaphore::new(2);
        let a = sem.acquire();
        let b = sem.try_acquire();
        assert!(b.is_some());
        assert!(sem.try_acquire().is_none());
        assert_eq!(sem.permits.load(Ordering::Relaxed), 0);

        drop(a);
        assert_eq!(sem.permits.load(Ordering::Relaxed), 1);
        drop(b);
        assert_eq!(sem.permits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn never_exceeds_permit_count() {
        let sem = Semaphore::new(3);
        let inside = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..2000 {
                        let _permit = sem.acquire();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        assert!(now <= 3, "{now} threads inside a 3-permit section");
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(sem.permits.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn lock_is_exclusive() {
        let x = SemaphoreLock::new(Vec::new());

        std::thread::scope(|s| {
            s.spawn(|| x.lock().push(1));
            s.spawn(|| {
                let mut v = x.lock();
                v.push(2);
                v.push(3);
            });
        });

        let g = x.lock();
        assert!(g.as_slice() == [1, 2, 3] || g.as_slice() == [2, 3, 1]);
    }
}
