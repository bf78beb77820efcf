use thiserror::Error;

use crate::queue::{Link, SharedQueue};

/// What one critical-section step did to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Enqueue,
    Dequeue,
}

/// Evidence that two threads were inside the critical section at once.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imbalance {
    #[error("queue empty on dequeue at counter {counter}")]
    QueueEmpty { counter: u32 },

    #[error("link still queued on enqueue at counter {counter}")]
    LinkInFlight { counter: u32 },
}

/// The counter, queue and reusable link owned by one lock-guarded primitive.
///
/// Even counter values enqueue the link, odd values dequeue it again, so
/// under mutual exclusion the queue holds at most one entry.
pub struct GuardedState {
    name: &'static str,
    counter: u32,
    queue: SharedQueue,
    /// Home of the link while it is not queued.
    link: Option<Box<Link>>,
}

impl GuardedState {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            counter: 0,
            queue: SharedQueue::new(),
            link: Some(Box::new(Link::new(name))),
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    /// Runs one step unless `target` has been reached, in which case `None`.
    #[inline]
    pub fn advance(&mut self, target: u32) -> Result<Option<Op>, Imbalance> {
        if self.counter >= target {
            return Ok(None);
        }
        self.step().map(Some)
    }

    pub fn step(&mut self) -> Result<Op, Imbalance> {
        let counter = self.counter;
        let op = if counter % 2 == 0 {
            let mut link = self
                .link
                .take()
                .ok_or(Imbalance::LinkInFlight { counter })?;
            link.set_payload(counter);
            self.queue.enqueue(link);
            Op::Enqueue
        } else {
            let link = self
                .queue
                .dequeue()
                .ok_or(Imbalance::QueueEmpty { counter })?;
            self.link = Some(link);
            Op::Dequeue
        };
        self.counter += 1;
        Ok(op)
    }

    /// Zeroes the counter and empties the queue, bringing the link home.
    pub fn reset(&mut self) {
        if self.link.is_none() {
            let link = self
                .queue
                .dequeue()
                .unwrap_or_else(|| Box::new(Link::new(self.name)));
            self.link = Some(link);
        }
        self.queue.clear();
        self.counter = 0;
    }
}
