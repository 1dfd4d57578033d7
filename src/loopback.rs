//! In-process loopback backend.
//!
//! Stands in for the desktop session host when running in a plain console:
//! it resolves the launch command the way the host would, but instead of
//! spawning it echoes stdin back as `pty:data`. Events are published through
//! the event loop and only on topics with a live subscription.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{normalize, MultiplexerMode, StartupConfig};
use crate::core::backend::{Backend, BackendError, EventKind, ListenerId, Result, SessionInfo};
use crate::runtime::LoopSender;

/// End of transmission; ends the loopback session
const EOT: char = '\x04';

/// Command the session host would launch for a startup configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub fallback_used: bool,
    /// Reason for the fallback, published as a `warning` event
    pub warning: Option<String>,
}

impl LaunchCommand {
    /// Command line as shown to the user
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Split a command line with shell quoting rules
pub fn parse_command_line(input: &str) -> Result<(String, Vec<String>)> {
    let invalid = |message: String| BackendError::Command {
        command: "start_session",
        message,
    };
    let mut parts = shell_words::split(input)
        .map_err(|err| invalid(format!("invalid command: {}", err)))?
        .into_iter();
    let program = parts
        .next()
        .ok_or_else(|| invalid("command is empty".to_string()))?;
    Ok((program, parts.collect()))
}

/// Pick the multiplexer command, falling back to the login shell when its
/// program cannot be found. A command line that cannot be parsed is an error.
pub fn resolve_launch<F>(startup: &StartupConfig, program_exists: F) -> Result<LaunchCommand>
where
    F: Fn(&str) -> bool,
{
    let (name, command_line) = match startup.multiplexer {
        MultiplexerMode::None => return Ok(shell_command(startup, None)),
        MultiplexerMode::Tmux => ("tmux", &startup.tmux_command),
        MultiplexerMode::Zellij => ("zellij", &startup.zellij_command),
    };

    let (program, mut args) = parse_command_line(command_line)?;

    // A bare `zellij attach -c` would create an unnamed session
    if program == "zellij" && args == ["attach", "-c"] {
        args.push("d3term".to_string());
    }

    if program_exists(&program) {
        return Ok(LaunchCommand {
            program,
            args,
            fallback_used: false,
            warning: None,
        });
    }

    let warning = format!(
        "{} が見つからないため通常シェルで起動します: {}",
        name, command_line
    );
    Ok(shell_command(startup, Some(warning)))
}

fn shell_command(startup: &StartupConfig, warning: Option<String>) -> LaunchCommand {
    let program = startup
        .shell
        .as_deref()
        .map(str::trim)
        .filter(|shell| !shell.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_shell);

    let mut args = startup.shell_args.clone();
    if args.is_empty() {
        args.push("-l".to_string());
    }

    LaunchCommand {
        program,
        args,
        fallback_used: warning.is_some(),
        warning,
    }
}

fn default_shell() -> String {
    env::var("SHELL")
        .ok()
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| "/bin/zsh".to_string())
}

/// Look a program up the way a shell would
pub fn program_on_path(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).exists();
    }
    match env::var_os("PATH") {
        Some(path) => env::split_paths(&path).any(|dir| dir.join(program).is_file()),
        None => false,
    }
}

/// Render typed input the way a cooked terminal would echo it
fn echo(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for ch in data.chars() {
        match ch {
            '\r' => out.push_str("\r\n"),
            '\x7f' => out.push_str("\x08 \x08"),
            _ => out.push(ch),
        }
    }
    out
}

pub struct LoopbackBackend {
    sender: LoopSender,
    /// Raw configuration, republished unmodified
    config: Value,
    config_path: String,
    listeners: HashMap<ListenerId, EventKind>,
    next_listener: u64,
    running: bool,
    size: (u16, u16),
}

impl LoopbackBackend {
    pub fn new(sender: LoopSender, config: Value, config_path: impl Into<String>) -> Self {
        Self {
            sender,
            config,
            config_path: config_path.into(),
            listeners: HashMap::new(),
            next_listener: 0,
            running: false,
            size: (0, 0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    fn is_subscribed(&self, kind: EventKind) -> bool {
        self.listeners.values().any(|listened| *listened == kind)
    }

    fn publish(&self, kind: EventKind, payload: Value) {
        if !self.is_subscribed(kind) {
            debug!("No listener for {}, event dropped", kind.topic());
            return;
        }
        self.sender.publish(kind.topic(), payload);
    }

    fn require_running(&self, command: &'static str) -> Result<()> {
        if self.running {
            Ok(())
        } else {
            Err(BackendError::Command {
                command,
                message: "session is not running".to_string(),
            })
        }
    }
}

impl Backend for LoopbackBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn listen(&mut self, kind: EventKind) -> Result<ListenerId> {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.insert(id, kind);
        Ok(id)
    }

    fn unlisten(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn start_session(&mut self, cols: u16, rows: u16) -> Result<SessionInfo> {
        self.stop_session()?;

        let startup = normalize(&self.config).startup;
        let launch = resolve_launch(&startup, program_on_path)?;
        if let Some(warning) = &launch.warning {
            self.publish(EventKind::Warning, json!({ "message": warning }));
        }

        self.running = true;
        self.size = (cols, rows);
        let command = launch.display();
        info!("Loopback session for `{}` ({}x{})", command, cols, rows);

        self.publish(
            EventKind::ConfigUpdated,
            json!({ "config": self.config.clone(), "path": self.config_path }),
        );
        self.publish(
            EventKind::PtyData,
            json!({ "data": format!("loopback: {}\r\nCtrl+D ends the session, Ctrl+Q quits.\r\n", command) }),
        );

        Ok(SessionInfo {
            pid: Some(std::process::id()),
            command,
            fallback_used: launch.fallback_used,
        })
    }

    fn stop_session(&mut self) -> Result<()> {
        if self.running {
            debug!("Stopping loopback session");
            self.running = false;
        }
        Ok(())
    }

    fn write_stdin(&mut self, data: &str) -> Result<()> {
        self.require_running("write_stdin")?;

        let (typed, ended) = match data.split_once(EOT) {
            Some((typed, _)) => (typed, true),
            None => (data, false),
        };
        if !typed.is_empty() {
            self.publish(EventKind::PtyData, json!({ "data": echo(typed) }));
        }
        if ended {
            self.running = false;
            self.publish(EventKind::SessionExit, json!({ "code": 0 }));
        }
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.require_running("resize")?;
        self.size = (cols.max(2), rows.max(1));
        Ok(())
    }
}
