//! Deadline queue for the controller's one-shot timers.
//!
//! The queue never sleeps: the event loop asks for [`TimerQueue::next_deadline`]
//! and hands the current instant back to [`TimerQueue::pop_due`].

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Send the coalesced input buffer
    InputFlush,
    /// Animation frame: refit and resize
    ResizeFrame,
    /// Hide the warning banner
    BannerDismiss,
}

#[derive(Debug)]
struct Entry {
    id: TimerId,
    kind: TimerKind,
    deadline: Instant,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<Entry>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: TimerKind, deadline: Instant) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, kind, deadline });
        id
    }

    /// Returns false if the timer already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.deadline).min()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn pop_due(&mut self, now: Instant) -> Vec<(TimerId, TimerKind)> {
        let mut due = Vec::new();
        self.entries.retain(|entry| {
            if entry.deadline <= now {
                due.push((entry.deadline, entry.id, entry.kind));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(deadline, id, _)| (deadline, id));
        due.into_iter().map(|(_, id, kind)| (id, kind)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
