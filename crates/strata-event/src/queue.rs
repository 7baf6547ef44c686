//! Shared FIFO event queue.
//!
//! [`EventQueue`] is a cheap cloneable handle. Every clone pushes into
//! and drains from the same underlying buffer, which is how a composite
//! hands its owning machine's inbox to itself without holding the
//! machine.
//!
//! Enqueue never blocks on anything but the queue lock and the buffer
//! is unbounded: events stay until an observer drains them.

use crate::Event;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Unbounded FIFO of [`Event`]s behind a shared lock.
///
/// # Example
///
/// ```
/// use strata_event::{Event, EventQueue};
/// use strata_types::IdentityId;
///
/// let queue = EventQueue::new();
/// let handle = queue.clone();
///
/// let src = IdentityId::new();
/// handle.push(Event::single(src, "a", "n", 1).unwrap());
/// handle.push(Event::single(src, "b", "n", 2).unwrap());
///
/// let drained = queue.drain();
/// assert_eq!(drained.len(), 2);
/// assert_eq!(drained[0].channel, "a");
/// assert!(handle.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<VecDeque<Event>>>,
}

impl EventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event at the back.
    pub fn push(&self, event: Event) {
        self.inner.lock().push_back(event);
    }

    /// Takes every pending event in FIFO order.
    #[must_use]
    pub fn drain(&self) -> Vec<Event> {
        self.inner.lock().drain(..).collect()
    }

    /// Takes the pending events of one channel, leaving the rest queued.
    ///
    /// Relative order is preserved in both the returned and the
    /// remaining events.
    #[must_use]
    pub fn drain_channel(&self, channel: &str) -> Vec<Event> {
        let mut queue = self.inner.lock();
        let (taken, kept): (VecDeque<Event>, VecDeque<Event>) =
            queue.drain(..).partition(|e| e.channel == channel);
        *queue = kept;
        taken.into()
    }

    /// Returns a copy of the pending events without removing them.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Event> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns `true` if both handles share one buffer.
    #[must_use]
    pub fn same_queue(&self, other: &EventQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::IdentityId;

    fn evt(channel: &str, n: i64) -> Event {
        Event::single(IdentityId::new(), channel, "n", n).unwrap()
    }

    #[test]
    fn fifo_order() {
        let q = EventQueue::new();
        for i in 0..5 {
            q.push(evt("ch", i));
        }
        let ns: Vec<i64> = q
            .drain()
            .iter()
            .map(|e| e.decode::<i64>("n").unwrap())
            .collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
        assert!(q.is_empty());
    }

    #[test]
    fn drain_channel_keeps_others() {
        let q = EventQueue::new();
        q.push(evt("a", 1));
        q.push(evt("b", 2));
        q.push(evt("a", 3));
        q.push(evt("b", 4));

        let a = q.drain_channel("a");
        assert_eq!(a.len(), 2);
        assert_eq!(a[1].decode::<i64>("n").unwrap(), 3);

        let rest = q.drain();
        assert_eq!(rest.len(), 2);
        assert!(rest.iter().all(|e| e.channel == "b"));
        assert_eq!(rest[0].decode::<i64>("n").unwrap(), 2);
    }

    #[test]
    fn snapshot_does_not_consume() {
        let q = EventQueue::new();
        q.push(evt("a", 1));
        assert_eq!(q.snapshot().len(), 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn clones_share_buffer() {
        let q = EventQueue::new();
        let other = q.clone();
        assert!(q.same_queue(&other));
        assert!(!q.same_queue(&EventQueue::new()));

        other.push(evt("a", 1));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn concurrent_push_loses_nothing() {
        let q = EventQueue::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let q = q.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        q.push(evt("ch", t * 1000 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(q.drain().len(), 800);
    }
}
