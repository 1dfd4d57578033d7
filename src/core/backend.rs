//! Backend channel: commands and pushed events.
//!
//! The backend process owns the PTY. The controller reaches it through an
//! invoke-style command interface ([`Backend`]) and receives pushed
//! [`BackendEvent`]s on the topics it subscribed to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend is not available")]
    Unavailable,

    #[error("Command {command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },

    #[error("Unknown event topic: {0}")]
    UnknownTopic(String),

    #[error("Malformed {topic} payload: {source}")]
    Payload {
        topic: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Event topics published by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PtyData,
    SessionExit,
    Warning,
    ConfigUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::PtyData,
        EventKind::SessionExit,
        EventKind::Warning,
        EventKind::ConfigUpdated,
    ];

    /// Wire name of the topic
    pub fn topic(&self) -> &'static str {
        match self {
            Self::PtyData => "pty:data",
            Self::SessionExit => "session:exit",
            Self::Warning => "warning",
            Self::ConfigUpdated => "config:updated",
        }
    }

    pub fn from_topic(topic: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.topic() == topic)
    }
}

/// Handle of a live subscription, released with [`Backend::unlisten`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Result of `start_session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub pid: Option<u32>,
    /// Command line actually executed
    pub command: String,
    /// The configured shell/multiplexer could not be launched and the
    /// default shell was started instead
    #[serde(default)]
    pub fallback_used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtyDataPayload {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExitPayload {
    pub code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningPayload {
    pub message: String,
}

/// Live configuration change; `config` is untrusted until normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdatedPayload {
    #[serde(default)]
    pub config: Value,
    /// Source file, empty when the backend did not say
    #[serde(default)]
    pub path: String,
}

/// Event pushed by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    PtyData(PtyDataPayload),
    SessionExit(SessionExitPayload),
    Warning(WarningPayload),
    ConfigUpdated(ConfigUpdatedPayload),
}

impl BackendEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PtyData(_) => EventKind::PtyData,
            Self::SessionExit(_) => EventKind::SessionExit,
            Self::Warning(_) => EventKind::Warning,
            Self::ConfigUpdated(_) => EventKind::ConfigUpdated,
        }
    }

    /// Decode a raw `(topic, payload)` pair as published on the wire
    pub fn decode(topic: &str, payload: Value) -> Result<Self> {
        let kind =
            EventKind::from_topic(topic).ok_or_else(|| BackendError::UnknownTopic(topic.to_string()))?;
        let wrap = |source| BackendError::Payload {
            topic: kind.topic(),
            source,
        };

        Ok(match kind {
            EventKind::PtyData => Self::PtyData(serde_json::from_value(payload).map_err(wrap)?),
            EventKind::SessionExit => {
                Self::SessionExit(serde_json::from_value(payload).map_err(wrap)?)
            }
            EventKind::Warning => Self::Warning(serde_json::from_value(payload).map_err(wrap)?),
            EventKind::ConfigUpdated => {
                Self::ConfigUpdated(serde_json::from_value(payload).map_err(wrap)?)
            }
        })
    }
}

/// Command/subscription interface of the session host.
///
/// All calls are made from the controller's loop thread. `write_stdin` and
/// `resize` are best-effort: the controller discards their errors.
pub trait Backend {
    /// Whether a backend process is reachable at all
    fn is_available(&self) -> bool;

    /// Subscribe to a topic; events are delivered through the event loop
    fn listen(&mut self, kind: EventKind) -> Result<ListenerId>;

    fn unlisten(&mut self, id: ListenerId);

    fn start_session(&mut self, cols: u16, rows: u16) -> Result<SessionInfo>;

    fn stop_session(&mut self) -> Result<()>;

    fn write_stdin(&mut self, data: &str) -> Result<()>;

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()>;
}

/// Stand-in used when no backend process can be reached (preview mode)
#[derive(Debug, Default)]
pub struct DetachedBackend;

impl Backend for DetachedBackend {
    fn is_available(&self) -> bool {
        false
    }

    fn listen(&mut self, _kind: EventKind) -> Result<ListenerId> {
        Err(BackendError::Unavailable)
    }

    fn unlisten(&mut self, _id: ListenerId) {}

    fn start_session(&mut self, _cols: u16, _rows: u16) -> Result<SessionInfo> {
        Err(BackendError::Unavailable)
    }

    fn stop_session(&mut self) -> Result<()> {
        Err(BackendError::Unavailable)
    }

    fn write_stdin(&mut self, _data: &str) -> Result<()> {
        Err(BackendError::Unavailable)
    }

    fn resize(&mut self, _cols: u16, _rows: u16) -> Result<()> {
        Err(BackendError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topics_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_topic(kind.topic()), Some(kind));
        }
        assert_eq!(EventKind::from_topic("pty-data"), None);
    }

    #[test]
    fn test_decode_events() {
        let event = BackendEvent::decode("pty:data", json!({ "data": "hi\r\n" })).unwrap();
        assert_eq!(
            event,
            BackendEvent::PtyData(PtyDataPayload {
                data: "hi\r\n".to_string()
            })
        );

        let event = BackendEvent::decode("session:exit", json!({ "code": null })).unwrap();
        assert_eq!(event, BackendEvent::SessionExit(SessionExitPayload { code: None }));

        let event = BackendEvent::decode("warning", json!({ "message": "careful" })).unwrap();
        assert_eq!(event.kind(), EventKind::Warning);

        let event = BackendEvent::decode(
            "config:updated",
            json!({ "config": { "terminal": { "font_size": "big" } }, "path": "/tmp/config.toml" }),
        )
        .unwrap();
        match event {
            BackendEvent::ConfigUpdated(payload) => {
                assert_eq!(payload.path, "/tmp/config.toml");
                assert_eq!(payload.config["terminal"]["font_size"], "big");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_config_update_without_path() {
        let event =
            BackendEvent::decode("config:updated", json!({ "config": { "terminal": {} } })).unwrap();
        assert_eq!(
            event,
            BackendEvent::ConfigUpdated(ConfigUpdatedPayload {
                config: json!({ "terminal": {} }),
                path: String::new(),
            })
        );
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(
            BackendEvent::decode("bell", json!({})),
            Err(BackendError::UnknownTopic(topic)) if topic == "bell"
        ));
        assert!(matches!(
            BackendEvent::decode("pty:data", json!({ "data": 5 })),
            Err(BackendError::Payload { topic: "pty:data", .. })
        ));
    }

    #[test]
    fn test_session_info_wire_format() {
        let info: SessionInfo = serde_json::from_value(json!({
            "pid": 4242,
            "command": "zellij attach -c d3term",
            "fallback_used": true,
        }))
        .unwrap();
        assert_eq!(info.pid, Some(4242));
        assert!(info.fallback_used);

        let info: SessionInfo =
            serde_json::from_value(json!({ "pid": null, "command": "/bin/zsh -l" })).unwrap();
        assert_eq!(info.pid, None);
        assert!(!info.fallback_used);
    }

    #[test]
    fn test_detached_backend_refuses_everything() {
        let mut backend = DetachedBackend;
        assert!(!backend.is_available());
        assert!(backend.listen(EventKind::PtyData).is_err());
        assert!(backend.start_session(80, 24).is_err());
        assert!(backend.write_stdin("x").is_err());
    }
}
