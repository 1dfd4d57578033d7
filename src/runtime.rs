//! Application event loop.
//!
//! Every callback the controller reacts to (keystrokes, geometry changes,
//! color-scheme changes, backend pushes) arrives as a [`LoopEvent`] on one
//! mpsc channel and is handled sequentially on the loop thread. Producers
//! on other threads only hold a [`LoopSender`].

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::{Backend, BackendEvent, Host, RenderingSurface, SessionController};

/// Longest wait when no timer is pending
pub const IDLE_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub enum LoopEvent {
    /// Keystrokes or pasted text
    Input(String),
    ContainerResized,
    WindowResized,
    /// New system preference: `true` = dark
    ColorSchemeChanged(bool),
    Backend(BackendEvent),
    Shutdown,
}

/// Cloneable producer side of the loop
#[derive(Debug, Clone)]
pub struct LoopSender {
    tx: Sender<LoopEvent>,
}

impl LoopSender {
    /// Returns false once the loop has stopped
    pub fn send(&self, event: LoopEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Publish a raw backend event; malformed payloads are dropped
    pub fn publish(&self, topic: &str, payload: Value) -> bool {
        match BackendEvent::decode(topic, payload) {
            Ok(event) => self.send(LoopEvent::Backend(event)),
            Err(err) => {
                warn!("Dropping backend event: {}", err);
                true
            }
        }
    }
}

/// Connected sender/receiver pair
pub fn channel() -> (LoopSender, Receiver<LoopEvent>) {
    let (tx, rx) = mpsc::channel();
    (LoopSender { tx }, rx)
}

pub struct EventLoop {
    sender: LoopSender,
    rx: Receiver<LoopEvent>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        let (sender, rx) = channel();
        Self { sender, rx }
    }

    pub fn sender(&self) -> LoopSender {
        self.sender.clone()
    }

    /// Initialize the controller and process events until `Shutdown` or
    /// until every sender is gone. The controller is always disposed.
    pub fn run<S, B, H>(self, controller: &mut SessionController<S, B, H>) -> anyhow::Result<()>
    where
        S: RenderingSurface,
        B: Backend,
        H: Host,
    {
        let EventLoop { sender, rx } = self;
        drop(sender);

        if let Err(err) = controller.init(Instant::now()) {
            controller.dispose();
            return Err(err.into());
        }
        info!("Event loop running ({:?})", controller.state());

        loop {
            let now = Instant::now();
            let timeout = controller
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(now))
                .unwrap_or(IDLE_TIMEOUT);

            match rx.recv_timeout(timeout) {
                Ok(LoopEvent::Shutdown) => {
                    debug!("Shutdown requested");
                    break;
                }
                Ok(event) => dispatch(controller, event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("All event producers gone");
                    break;
                }
            }

            controller.poll_timers(Instant::now());
        }

        controller.dispose();
        info!("Event loop stopped");
        Ok(())
    }
}

fn dispatch<S, B, H>(controller: &mut SessionController<S, B, H>, event: LoopEvent)
where
    S: RenderingSurface,
    B: Backend,
    H: Host,
{
    let now = Instant::now();
    match event {
        LoopEvent::Input(data) => controller.handle_input(&data, now),
        LoopEvent::ContainerResized | LoopEvent::WindowResized => controller.request_resize(now),
        LoopEvent::ColorSchemeChanged(prefers_dark) => controller.set_prefers_dark(prefers_dark),
        LoopEvent::Backend(event) => controller.handle_backend_event(event, now),
        LoopEvent::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{Call, Fakes};
    use crate::core::SessionState;
    use serde_json::json;

    fn shutdown_after(sender: LoopSender, delay: Duration) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            sender.send(LoopEvent::Shutdown);
        })
    }

    #[test]
    fn test_input_is_flushed_once() {
        let fakes = Fakes::new();
        let mut controller = SessionController::new(fakes.surface(), fakes.backend(), fakes.host());
        let event_loop = EventLoop::new();
        let sender = event_loop.sender();

        sender.send(LoopEvent::Input("a".to_string()));
        sender.send(LoopEvent::Input("b".to_string()));
        let stopper = shutdown_after(sender, Duration::from_millis(150));

        event_loop.run(&mut controller).unwrap();
        stopper.join().unwrap();

        let writes: Vec<Call> = fakes
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::WriteStdin(_)))
            .collect();
        assert_eq!(writes, vec![Call::WriteStdin("ab".to_string())]);
        assert_eq!(controller.state(), SessionState::Disposed);
    }

    #[test]
    fn test_geometry_events_share_one_frame() {
        let fakes = Fakes::new();
        let mut controller = SessionController::new(fakes.surface(), fakes.backend(), fakes.host());
        let event_loop = EventLoop::new();
        let sender = event_loop.sender();

        sender.send(LoopEvent::ContainerResized);
        sender.send(LoopEvent::WindowResized);
        sender.send(LoopEvent::ContainerResized);
        let stopper = shutdown_after(sender, Duration::from_millis(150));

        event_loop.run(&mut controller).unwrap();
        stopper.join().unwrap();

        // One resize from init, one from the frame
        assert_eq!(fakes.count(|call| matches!(call, Call::Resize(..))), 2);
    }

    #[test]
    fn test_published_events_are_decoded() {
        let fakes = Fakes::new();
        let mut controller = SessionController::new(fakes.surface(), fakes.backend(), fakes.host());
        let event_loop = EventLoop::new();
        let sender = event_loop.sender();

        sender.publish("pty:data", json!({ "data": "hello" }));
        sender.publish("pty:data", json!({ "data": 17 }));
        sender.publish("bell", json!({}));
        sender.send(LoopEvent::ColorSchemeChanged(false));
        sender.send(LoopEvent::Shutdown);

        event_loop.run(&mut controller).unwrap();

        assert_eq!(fakes.count(|call| matches!(call, Call::Write(_))), 1);
        assert!(fakes.calls().contains(&Call::Write("hello".to_string())));
        assert!(fakes
            .calls()
            .contains(&Call::ThemeMarker(crate::theme::ThemeMarker::Light)));
    }

    #[test]
    fn test_init_failure_disposes() {
        let fakes = Fakes::new();
        let mut backend = fakes.backend();
        backend.fail_start = true;
        let mut controller = SessionController::new(fakes.surface(), backend, fakes.host());
        let event_loop = EventLoop::new();

        assert!(event_loop.run(&mut controller).is_err());
        assert_eq!(controller.state(), SessionState::Disposed);
        assert_eq!(controller.active_listeners(), 0);
        assert!(fakes.calls().contains(&Call::DisposeSurface));
    }

    #[test]
    fn test_stops_when_senders_are_gone() {
        let fakes = Fakes::new();
        let mut controller = SessionController::new(fakes.surface(), fakes.backend(), fakes.host());
        let event_loop = EventLoop::new();

        event_loop.run(&mut controller).unwrap();
        assert_eq!(controller.state(), SessionState::Disposed);
    }
}
