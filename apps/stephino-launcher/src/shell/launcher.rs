use crate::session::{HandshakeEvent, LoginForm, SessionBootstrap, pause};
use crate::shell::{CHECKING_MESSAGE, LOADING_MESSAGE, ShellError, SurfaceBackend, WindowShell};
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Handshake succeeded and the remote surface is showing.
    Playing(Url),
    /// The server answered but refused the credentials.
    Rejected(HandshakeEvent),
    /// The form was busy; nothing was submitted.
    Ignored,
}

/// Wires the shell to the session bootstrap: the two inbound signals live here.
pub struct Launcher<B: SurfaceBackend> {
    shell: WindowShell<B>,
    bootstrap: SessionBootstrap,
    default_server_url: String,
}

impl<B: SurfaceBackend> Launcher<B> {
    pub fn new(
        shell: WindowShell<B>,
        bootstrap: SessionBootstrap,
        default_server_url: impl Into<String>,
    ) -> Self {
        Self {
            shell,
            bootstrap,
            default_server_url: default_server_url.into(),
        }
    }

    pub fn shell(&self) -> &WindowShell<B> {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut WindowShell<B> {
        &mut self.shell
    }

    /// Shows the login surface pre-filled from the stores.
    pub fn open(&mut self) -> Result<LoginForm, ShellError> {
        let prefill = self.bootstrap.prefill(&self.default_server_url)?;
        self.shell.show_login_surface(&prefill)?;
        Ok(prefill)
    }

    /// Inbound submit-login.
    pub async fn submit_login(&mut self, form: LoginForm) -> Result<LoginOutcome, ShellError> {
        if !self.shell.form_enabled() {
            warn!(target: "stephino::shell", "login already in progress; ignoring submission");
            return Ok(LoginOutcome::Ignored);
        }

        self.shell.set_loading(Some(LOADING_MESSAGE));
        self.shell.notify(CHECKING_MESSAGE, true);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let bootstrap = &self.bootstrap;
        let shell = &mut self.shell;
        let submit = async move {
            let outcome = bootstrap.submit(&form, &tx).await;
            drop(tx);
            outcome
        };
        let relay = async {
            while let Some(signal) = rx.recv().await {
                shell.handle_signal(&signal);
            }
        };
        let (outcome, ()) = tokio::join!(submit, relay);

        let event = outcome?;
        self.shell.set_loading(None);
        if !event.succeeded {
            return Ok(LoginOutcome::Rejected(event));
        }

        self.shell.mark_playing();
        pause(self.bootstrap.delays().settle).await;
        if !self.shell.is_open() {
            return Err(ShellError::Closed);
        }
        self.play().map(LoginOutcome::Playing)
    }

    /// Inbound request-play-transition.
    pub fn play(&mut self) -> Result<Url, ShellError> {
        let target = match self.bootstrap.play_target(&self.default_server_url) {
            Ok(target) => target,
            Err(err) => {
                self.shell.notify(&err.to_string(), false);
                return Err(err.into());
            }
        };

        match self.shell.show_remote_surface(&target) {
            Ok(()) => {
                info!(target: "stephino::shell", url = %target, "remote surface shown");
                Ok(target)
            }
            Err(err) => {
                warn!(target: "stephino::shell", error = %err, "remote surface failed to load; back to login");
                self.shell.notify(&err.to_string(), false);
                self.open()?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::gate::ExchangeResponse;
    use crate::auth::{AuthError, MemorySecretStore, SessionTransport, SettingsStore};
    use crate::session::HandshakeDelays;
    use crate::session::connectivity::StaticConnectivity;
    use crate::shell::ActiveSurface;
    use crate::shell::testing::{RecordingBackend, Rendered, spec};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedTransport {
        status: u16,
    }

    #[async_trait]
    impl SessionTransport for FixedTransport {
        async fn probe_version(&self, _server: &Url) -> Result<String, AuthError> {
            Ok("1.2.3".into())
        }

        async fn exchange_credentials(
            &self,
            _server: &Url,
            _user_email: &str,
            _user_password: &str,
        ) -> Result<ExchangeResponse, AuthError> {
            Ok(ExchangeResponse {
                status: self.status,
                result: Some("tok-abc".into()),
                message: (self.status != 200).then(|| "bad password".to_string()),
            })
        }
    }

    fn launcher(status: u16, backend: RecordingBackend, dir: &std::path::Path) -> Launcher<RecordingBackend> {
        let bootstrap = SessionBootstrap::new(
            Arc::new(FixedTransport { status }),
            MemorySecretStore::new(),
            SettingsStore::open(dir),
            Arc::new(StaticConnectivity(true)),
            HandshakeDelays::immediate(),
        );
        Launcher::new(
            WindowShell::new(backend, spec()),
            bootstrap,
            "https://stephino.com",
        )
    }

    fn form() -> LoginForm {
        LoginForm {
            user_email: "player@example.com".into(),
            user_password: "hunter2".into(),
            server_url: "https://game.example.com".into(),
        }
    }

    #[tokio::test]
    async fn success_swaps_to_remote_surface() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = launcher(200, RecordingBackend::default(), dir.path());
        launcher.open().unwrap();

        let outcome = launcher.submit_login(form()).await.unwrap();
        let expected =
            Url::parse("https://game.example.com/wp-admin/admin-ajax.php?action=stephino_rpg")
                .unwrap();
        assert_eq!(outcome, LoginOutcome::Playing(expected.clone()));
        assert_eq!(launcher.shell().active_surface(), Some(ActiveSurface::Remote));
        assert_eq!(launcher.shell().remote_url(), Some(&expected));
        assert_eq!(
            launcher.shell().backend().toasts(),
            vec![
                (CHECKING_MESSAGE.to_string(), true),
                ("Stephino RPG v.1.2.3 detected".to_string(), true),
                ("Loading game...".to_string(), true),
            ]
        );
        assert!(!launcher.shell().form_enabled());
    }

    #[tokio::test]
    async fn rejection_keeps_login_surface() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = launcher(403, RecordingBackend::default(), dir.path());
        launcher.open().unwrap();

        let outcome = launcher.submit_login(form()).await.unwrap();
        match outcome {
            LoginOutcome::Rejected(event) => {
                assert!(!event.succeeded);
                assert_eq!(event.message, "bad password");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(launcher.shell().active_surface(), Some(ActiveSurface::Login));
        assert!(launcher.shell().form_enabled());
        assert!(
            launcher
                .shell()
                .backend()
                .toasts()
                .contains(&("bad password".to_string(), false))
        );
    }

    #[tokio::test]
    async fn validation_error_is_toasted_and_form_reenabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = launcher(200, RecordingBackend::default(), dir.path());
        launcher.open().unwrap();

        let mut bad = form();
        bad.server_url = "http://game.example.com".into();
        let err = launcher.submit_login(bad).await.unwrap_err();
        assert!(matches!(err, ShellError::Auth(AuthError::InsecureScheme)));
        assert!(launcher.shell().form_enabled());
        assert!(
            launcher
                .shell()
                .backend()
                .toasts()
                .contains(&("Your website must use SSL".to_string(), false))
        );
    }

    #[tokio::test]
    async fn busy_form_ignores_second_submission() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = launcher(200, RecordingBackend::default(), dir.path());
        launcher.open().unwrap();
        launcher.shell_mut().set_loading(Some(LOADING_MESSAGE));

        let outcome = launcher.submit_login(form()).await.unwrap();
        assert_eq!(outcome, LoginOutcome::Ignored);
    }

    #[tokio::test]
    async fn remote_load_failure_returns_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RecordingBackend {
            fail_remote: true,
            ..Default::default()
        };
        let mut launcher = launcher(200, backend, dir.path());
        launcher.open().unwrap();

        let err = launcher.submit_login(form()).await.unwrap_err();
        assert!(matches!(err, ShellError::LoadFailed { .. }));
        assert_eq!(launcher.shell().active_surface(), Some(ActiveSurface::Login));
        let logins = launcher
            .shell()
            .backend()
            .rendered
            .iter()
            .filter(|entry| matches!(entry, Rendered::Login(_)))
            .count();
        assert_eq!(logins, 2);
    }
}
