//! Deferred work on the logical clock
//!
//! Side effects that must not run inside the tick that caused them are
//! queued here and drained at the start of a later step. Ordering is
//! (due time, insertion order), so equal due times run FIFO.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::events::EventId;

/// Work the tick engine can defer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Replace the particles lost to a supernova
    ReplacementSpawn { supernova: EventId },
}

#[derive(Debug, Clone)]
struct Scheduled<T> {
    due_ms: u64,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_ms
            .cmp(&other.due_ms)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-heap of tasks keyed by due time
#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    heap: BinaryHeap<Reverse<Scheduled<T>>>,
    next_seq: u64,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: u64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { due_ms, seq, task }));
    }

    /// Pop every task due at or before `now`, earliest first
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<T> {
        let mut due = Vec::new();
        while self
            .heap
            .peek()
            .is_some_and(|Reverse(next)| next.due_ms <= now_ms)
        {
            if let Some(Reverse(scheduled)) = self.heap.pop() {
                due.push(scheduled.task);
            }
        }
        due
    }

    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(next)| next.due_ms)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_respects_due_time() {
        let mut queue = DeferredQueue::new();
        queue.schedule(300, "late");
        queue.schedule(100, "early");
        assert_eq!(queue.next_due(), Some(100));

        assert!(queue.drain_due(99).is_empty());
        assert_eq!(queue.drain_due(100), vec!["early"]);
        assert_eq!(queue.drain_due(250), Vec::<&str>::new());
        assert_eq!(queue.drain_due(1000), vec!["late"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_due_times_are_fifo() {
        let mut queue = DeferredQueue::new();
        for i in 0..5 {
            queue.schedule(200, i);
        }
        queue.schedule(150, 99);
        assert_eq!(queue.drain_due(200), vec![99, 0, 1, 2, 3, 4]);
    }
}
