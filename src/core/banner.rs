//! Transient warning banner.
//!
//! The banner stays visible for [`BANNER_DURATION`] after the most recent
//! message; showing a new message restarts the countdown.

use std::time::{Duration, Instant};

use super::host::Host;
use super::timers::{TimerId, TimerKind, TimerQueue};

pub const BANNER_DURATION: Duration = Duration::from_millis(4500);

#[derive(Debug, Default)]
pub struct WarningBanner {
    message: Option<String>,
    dismiss_timer: Option<TimerId>,
}

impl WarningBanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show<H: Host>(&mut self, host: &mut H, timers: &mut TimerQueue, message: &str, now: Instant) {
        host.show_banner(message);
        self.message = Some(message.to_string());
        if let Some(id) = self.dismiss_timer.take() {
            timers.cancel(id);
        }
        self.dismiss_timer = Some(timers.schedule(TimerKind::BannerDismiss, now + BANNER_DURATION));
    }

    /// Called when the dismiss timer fired
    pub fn dismiss<H: Host>(&mut self, host: &mut H) {
        self.dismiss_timer = None;
        if self.message.take().is_some() {
            host.hide_banner();
        }
    }

    /// Cancel the countdown and hide a visible banner
    pub fn clear<H: Host>(&mut self, host: &mut H, timers: &mut TimerQueue) {
        if let Some(id) = self.dismiss_timer.take() {
            timers.cancel(id);
        }
        self.dismiss(host);
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
