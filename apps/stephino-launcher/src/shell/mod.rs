//! Window/view shell: one window, one embedded view, two surfaces.
//!
//! Handles are created on first use and dropped on close. Every entry point
//! checks the handle first so late signals after a close do nothing.

pub mod launcher;
pub mod terminal;

use crate::auth::AuthError;
use crate::session::{HandshakeEvent, LoginForm, SessionSignal};
use std::io;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub use launcher::{Launcher, LoginOutcome};
pub use terminal::TerminalBackend;

pub const LOADING_MESSAGE: &str = "Preparing account...";
pub const CHECKING_MESSAGE: &str = "Checking server version...";

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("window is closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to load {url}: {reason}")]
    LoadFailed { url: String, reason: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSurface {
    Login,
    Remote,
}

/// Rendering side of the shell. Implementations own no lifecycle state.
pub trait SurfaceBackend {
    fn open_window(&mut self, spec: &WindowSpec) -> Result<(), ShellError>;
    fn render_login(&mut self, prefill: &LoginForm) -> Result<(), ShellError>;
    fn render_remote(&mut self, url: &Url) -> Result<(), ShellError>;
    fn toast(&mut self, message: &str, succeeded: bool);
    fn loading(&mut self, message: Option<&str>);
    fn close_window(&mut self) {}
}

#[derive(Debug)]
struct WindowHandle {
    active: ActiveSurface,
    loading: bool,
    playing: bool,
}

#[derive(Debug, Default)]
struct ViewHandle {
    url: Option<Url>,
}

pub struct WindowShell<B: SurfaceBackend> {
    backend: B,
    spec: WindowSpec,
    window: Option<WindowHandle>,
    view: Option<ViewHandle>,
}

impl<B: SurfaceBackend> WindowShell<B> {
    pub fn new(backend: B, spec: WindowSpec) -> Self {
        Self {
            backend,
            spec,
            window: None,
            view: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_open(&self) -> bool {
        self.window.is_some()
    }

    pub fn active_surface(&self) -> Option<ActiveSurface> {
        self.window.as_ref().map(|window| window.active)
    }

    pub fn remote_url(&self) -> Option<&Url> {
        self.view.as_ref().and_then(|view| view.url.as_ref())
    }

    /// Form submissions are accepted only when idle and not already playing.
    pub fn form_enabled(&self) -> bool {
        self.window
            .as_ref()
            .is_some_and(|window| !window.loading && !window.playing)
    }

    fn window_mut(&mut self) -> Result<&mut WindowHandle, ShellError> {
        if self.window.is_none() {
            self.backend.open_window(&self.spec)?;
            debug!(target: "stephino::shell", title = %self.spec.title, "window created");
            self.window = Some(WindowHandle {
                active: ActiveSurface::Login,
                loading: false,
                playing: false,
            });
        }
        self.window.as_mut().ok_or(ShellError::Closed)
    }

    pub fn show_login_surface(&mut self, prefill: &LoginForm) -> Result<(), ShellError> {
        let window = self.window_mut()?;
        window.active = ActiveSurface::Login;
        window.loading = false;
        window.playing = false;
        // the view instance survives, only detached
        if let Some(view) = self.view.as_mut() {
            view.url = None;
        }
        self.backend.render_login(prefill)
    }

    pub fn show_remote_surface(&mut self, url: &Url) -> Result<(), ShellError> {
        self.window_mut()?;
        self.backend.render_remote(url)?;
        if let Some(window) = self.window.as_mut() {
            window.active = ActiveSurface::Remote;
        }
        self.view.get_or_insert_with(ViewHandle::default).url = Some(url.clone());
        Ok(())
    }

    pub fn notify(&mut self, message: &str, succeeded: bool) {
        if self.window.is_none() {
            debug!(target: "stephino::shell", %message, "window closed; dropping toast");
            return;
        }
        self.backend.toast(message, succeeded);
    }

    pub fn set_loading(&mut self, message: Option<&str>) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        window.loading = message.is_some();
        self.backend.loading(message);
    }

    pub fn mark_playing(&mut self) {
        if let Some(window) = self.window.as_mut() {
            window.playing = true;
        }
    }

    pub fn handle_signal(&mut self, signal: &SessionSignal) {
        match signal {
            SessionSignal::Phase(phase) => {
                debug!(target: "stephino::shell", %phase, "handshake phase");
            }
            SessionSignal::Handshake(HandshakeEvent {
                succeeded, message, ..
            }) => self.notify(message, *succeeded),
            SessionSignal::Error(message) => {
                self.set_loading(None);
                self.notify(message, false);
            }
        }
    }

    pub fn close(&mut self) {
        if self.window.take().is_some() {
            self.backend.close_window();
        }
        self.view = None;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Rendered {
        Window(String),
        Login(String),
        Remote(String),
        Toast(String, bool),
        Loading(Option<String>),
        Closed,
    }

    #[derive(Default)]
    pub struct RecordingBackend {
        pub rendered: Vec<Rendered>,
        pub fail_remote: bool,
    }

    impl RecordingBackend {
        pub fn toasts(&self) -> Vec<(String, bool)> {
            self.rendered
                .iter()
                .filter_map(|entry| match entry {
                    Rendered::Toast(message, ok) => Some((message.clone(), *ok)),
                    _ => None,
                })
                .collect()
        }
    }

    impl SurfaceBackend for RecordingBackend {
        fn open_window(&mut self, spec: &WindowSpec) -> Result<(), ShellError> {
            self.rendered.push(Rendered::Window(spec.title.clone()));
            Ok(())
        }

        fn render_login(&mut self, prefill: &LoginForm) -> Result<(), ShellError> {
            self.rendered.push(Rendered::Login(prefill.user_email.clone()));
            Ok(())
        }

        fn render_remote(&mut self, url: &Url) -> Result<(), ShellError> {
            if self.fail_remote {
                return Err(ShellError::LoadFailed {
                    url: url.to_string(),
                    reason: "did-fail-load".into(),
                });
            }
            self.rendered.push(Rendered::Remote(url.to_string()));
            Ok(())
        }

        fn toast(&mut self, message: &str, succeeded: bool) {
            self.rendered.push(Rendered::Toast(message.to_string(), succeeded));
        }

        fn loading(&mut self, message: Option<&str>) {
            self.rendered.push(Rendered::Loading(message.map(str::to_string)));
        }

        fn close_window(&mut self) {
            self.rendered.push(Rendered::Closed);
        }
    }

    pub fn spec() -> WindowSpec {
        WindowSpec {
            title: "Stephino RPG".into(),
            width: 1280,
            height: 720,
        }
    }
}
