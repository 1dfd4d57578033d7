//! Recording doubles for the controller's collaborators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::backend::{Backend, BackendError, EventKind, ListenerId, Result, SessionInfo};
use super::host::{Host, Observer};
use super::surface::{DisplayOptions, RenderingSurface, SurfaceSettings};
use crate::theme::{Palette, ThemeMarker};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open,
    Write(String),
    Focus,
    SetOptions(DisplayOptions),
    SetPalette(Palette),
    Fit,
    DisposeSurface,

    Listen(EventKind),
    Unlisten(ListenerId),
    StartSession(u16, u16),
    StopSession,
    WriteStdin(String),
    Resize(u16, u16),

    Attach(Observer),
    Detach(Observer),
    ThemeMarker(ThemeMarker),
    ShowBanner(String),
    HideBanner,
}

pub type Log = Rc<RefCell<Vec<Call>>>;

pub struct FakeSurface {
    log: Log,
    size: Rc<Cell<(u16, u16)>>,
}

impl RenderingSurface for FakeSurface {
    fn open(&mut self, _settings: &SurfaceSettings) {
        self.log.borrow_mut().push(Call::Open);
    }

    fn write(&mut self, data: &str) {
        self.log.borrow_mut().push(Call::Write(data.to_string()));
    }

    fn size(&self) -> (u16, u16) {
        self.size.get()
    }

    fn focus(&mut self) {
        self.log.borrow_mut().push(Call::Focus);
    }

    fn set_options(&mut self, options: &DisplayOptions) {
        self.log.borrow_mut().push(Call::SetOptions(options.clone()));
    }

    fn set_palette(&mut self, palette: &Palette) {
        self.log.borrow_mut().push(Call::SetPalette(*palette));
    }

    fn fit(&mut self) {
        self.log.borrow_mut().push(Call::Fit);
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().push(Call::DisposeSurface);
    }
}

pub struct FakeBackend {
    log: Log,
    pub available: bool,
    pub fail_start: bool,
    pub fail_commands: bool,
    pub fallback_used: bool,
    next_listener: u64,
}

impl Backend for FakeBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn listen(&mut self, kind: EventKind) -> Result<ListenerId> {
        self.log.borrow_mut().push(Call::Listen(kind));
        self.next_listener += 1;
        Ok(ListenerId(self.next_listener))
    }

    fn unlisten(&mut self, id: ListenerId) {
        self.log.borrow_mut().push(Call::Unlisten(id));
    }

    fn start_session(&mut self, cols: u16, rows: u16) -> Result<SessionInfo> {
        self.log.borrow_mut().push(Call::StartSession(cols, rows));
        if self.fail_start {
            return Err(BackendError::Command {
                command: "start_session",
                message: "failed to open PTY".to_string(),
            });
        }
        Ok(SessionInfo {
            pid: Some(4242),
            command: "zellij attach -c d3term".to_string(),
            fallback_used: self.fallback_used,
        })
    }

    fn stop_session(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Call::StopSession);
        self.command_result("stop_session")
    }

    fn write_stdin(&mut self, data: &str) -> Result<()> {
        self.log.borrow_mut().push(Call::WriteStdin(data.to_string()));
        self.command_result("write_stdin")
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.log.borrow_mut().push(Call::Resize(cols, rows));
        self.command_result("resize")
    }
}

impl FakeBackend {
    fn command_result(&self, command: &'static str) -> Result<()> {
        if self.fail_commands {
            Err(BackendError::Command {
                command,
                message: "session is not running".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

pub struct FakeHost {
    log: Log,
    pub prefers_dark: bool,
}

impl Host for FakeHost {
    fn prefers_dark(&self) -> bool {
        self.prefers_dark
    }

    fn attach(&mut self, observer: Observer) {
        self.log.borrow_mut().push(Call::Attach(observer));
    }

    fn detach(&mut self, observer: Observer) {
        self.log.borrow_mut().push(Call::Detach(observer));
    }

    fn set_theme_marker(&mut self, marker: ThemeMarker) {
        self.log.borrow_mut().push(Call::ThemeMarker(marker));
    }

    fn show_banner(&mut self, message: &str) {
        self.log.borrow_mut().push(Call::ShowBanner(message.to_string()));
    }

    fn hide_banner(&mut self) {
        self.log.borrow_mut().push(Call::HideBanner);
    }
}

/// Shared handles onto a set of fakes
pub struct Fakes {
    pub log: Log,
    pub size: Rc<Cell<(u16, u16)>>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            size: Rc::new(Cell::new((80, 24))),
        }
    }

    pub fn surface(&self) -> FakeSurface {
        FakeSurface {
            log: self.log.clone(),
            size: self.size.clone(),
        }
    }

    pub fn backend(&self) -> FakeBackend {
        FakeBackend {
            log: self.log.clone(),
            available: true,
            fail_start: false,
            fail_commands: false,
            fallback_used: false,
            next_listener: 0,
        }
    }

    pub fn host(&self) -> FakeHost {
        FakeHost {
            log: self.log.clone(),
            prefers_dark: true,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    /// Return and forget the calls recorded so far
    pub fn drain(&self) -> Vec<Call> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.log.borrow().iter().filter(|call| pred(call)).count()
    }
}
