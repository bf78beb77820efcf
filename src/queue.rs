use std::{fmt, marker::PhantomData, ptr::NonNull};

/// A named node carrying an integer payload.
pub struct Link {
    name: &'static str,
    payload: u32,
    /// Only ever set while the link sits inside a [`SharedQueue`].
    next: Option<NonNull<Link>>,
}

// `next` is owned by the queue holding the link and cleared on dequeue.
unsafe impl Send for Link {}

impl Link {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            payload: 0,
            next: None,
        }
    }

    pub fn payload(&self) -> u32 {
        self.payload
    }

    pub fn set_payload(&mut self, payload: u32) {
        self.payload = payload;
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.payload)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Singly linked FIFO of boxed [`Link`]s.
///
/// Queued links are owned through raw pointers from `Box::into_raw` and
/// handed back with `Box::from_raw` on dequeue. `tail` is `None` exactly when
/// `head` is. It does no synchronization of its own, callers put it behind a
/// lock.
pub struct SharedQueue {
    head: Option<NonNull<Link>>,
    tail: Option<NonNull<Link>>,
    _owns: PhantomData<Box<Link>>,
}

unsafe impl Send for SharedQueue {}

impl SharedQueue {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            _owns: PhantomData,
        }
    }

    pub fn clear(&mut self) {
        while self.dequeue().is_some() {}
    }

    pub fn enqueue(&mut self, mut link: Box<Link>) {
        link.next = None;
        let raw = NonNull::from(Box::leak(link));

        match self.tail {
            None => self.head = Some(raw),
            // tail came from Box::leak and is still owned by this queue
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(raw) },
        }
        self.tail = Some(raw);
    }

    pub fn dequeue(&mut self) -> Option<Box<Link>> {
        let head = self.head?;
        // head came from Box::leak in enqueue and nothing else refers to it
        // once it is unhooked here
        let mut link = unsafe { Box::from_raw(head.as_ptr()) };
        self.head = link.next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        Some(link)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        // every queued pointer stays valid while `self` is borrowed
        std::iter::successors(self.head.map(|p| unsafe { &*p.as_ptr() }), |link| {
            link.next.map(|p| unsafe { &*p.as_ptr() })
        })
    }
}

impl Default for SharedQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SharedQueue {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for SharedQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(name: &'static str, payload: u32) -> Box<Link> {
        let mut l = Box::new(Link::new(name));
        l.set_payload(payload);
        l
    }

    #[test]
    fn keeps_fifo_order() {
        let mut q = SharedQueue::new();
        q.enqueue(link("a", 1));
        q.enqueue(link("b", 2));
        q.enqueue(link("c", 3));
        assert_eq!(q.len(), 3);

        let order: Vec<_> = std::iter::from_fn(|| q.dequeue())
            .map(|l| l.to_string())
            .collect();
        assert_eq!(order, ["a(1)", "b(2)", "c(3)"]);
        assert!(q.is_empty());
    }

    #[test]
    fn dequeue_on_empty_is_none() {
        let mut q = SharedQueue::new();
        assert!(q.dequeue().is_none());

        q.enqueue(link("a", 0));
        assert!(q.dequeue().is_some());
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn tail_resets_when_drained() {
        let mut q = SharedQueue::new();
        q.enqueue(link("a", 0));
        q.dequeue();
        // a stale tail would hang "b" off the freed node
        q.enqueue(link("b", 1));
        q.enqueue(link("c", 2));
        assert_eq!(q.dequeue().map(|l| l.payload()), Some(1));
        assert_eq!(q.dequeue().map(|l| l.payload()), Some(2));
    }

    #[test]
    fn dequeued_link_is_detached() {
        let mut q = SharedQueue::new();
        q.enqueue(link("a", 0));
        q.enqueue(link("b", 1));
        let a = q.dequeue().unwrap();
        assert!(a.next.is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn reused_link_round_trips() {
        let mut q = SharedQueue::new();
        let mut slot = Some(Box::new(Link::new("mutex")));

        for counter in 0..10 {
            if counter % 2 == 0 {
                let mut l = slot.take().unwrap();
                l.set_payload(counter);
                q.enqueue(l);
            } else {
                slot = Some(q.dequeue().expect("balanced queue underflowed"));
            }
        }
        assert!(q.is_empty());
        assert_eq!(slot.unwrap().payload(), 8);
    }

    #[test]
    fn interleaved_multi_element_use() {
        let mut q = SharedQueue::new();
        q.enqueue(link("a", 0));
        q.enqueue(link("b", 1));
        q.enqueue(link("c", 2));
        assert_eq!(q.dequeue().map(|l| l.payload()), Some(0));
        // writes through tail after a dequeue from a longer chain
        q.enqueue(link("d", 3));
        assert_eq!(q.dequeue().map(|l| l.payload()), Some(1));
        q.enqueue(link("e", 4));

        assert_eq!(format!("{q:?}"), "[c(2), d(3), e(4)]");
        drop(q);
    }

    #[test]
    fn clear_drops_long_chains() {
        let mut q = SharedQueue::new();
        for i in 0..200_000 {
            q.enqueue(link("x", i));
        }
        q.clear();
        assert!(q.is_empty());
        assert!(q.dequeue().is_none());
        q.enqueue(link("y", 7));
        assert_eq!(format!("{q:?}"), "[y(7)]");
    }
}
