//! Keystroke coalescing.
//!
//! Input is appended to a buffer and sent as one `write_stdin` when the
//! flush timer fires. Only the first chunk of a batch arms the timer.

use std::time::{Duration, Instant};

use super::timers::{TimerId, TimerKind, TimerQueue};

/// Delay between the first chunk of a batch and the flush
pub const INPUT_FLUSH_DELAY: Duration = Duration::from_millis(4);

#[derive(Debug, Default)]
pub struct InputBuffer {
    pending: String,
    flush_timer: Option<TimerId>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &str, timers: &mut TimerQueue, now: Instant) {
        self.pending.push_str(data);
        if self.flush_timer.is_none() {
            self.flush_timer = Some(timers.schedule(TimerKind::InputFlush, now + INPUT_FLUSH_DELAY));
        }
    }

    /// Take the batch when the flush timer fired
    pub fn take(&mut self) -> Option<String> {
        self.flush_timer = None;
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    /// Drop pending input and its timer
    pub fn cancel(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.flush_timer.take() {
            timers.cancel(id);
        }
        self.pending.clear();
    }

    pub fn is_pending(&self) -> bool {
        self.flush_timer.is_some()
    }
}
