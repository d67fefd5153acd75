//! Session bootstrap: validation gates, the two-call handshake, and token caching.
//!
//! One call to [`SessionBootstrap::submit`] is one login attempt. Attempts do
//! not share state; a failure anywhere ends the attempt and the user has to
//! submit again.

pub mod connectivity;
pub mod events;

use crate::auth::gate::endpoint;
use crate::auth::{
    AuthError, CacheKey, SecretStore, SessionTransport, SettingsStore, validate_email,
    validate_server_url,
};
use connectivity::Connectivity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

pub use events::{DEFAULT_FINAL_MESSAGE, HandshakeEvent, HandshakePhase, SessionSignal};

pub const GAME_PATH: &str = "/wp-admin/admin-ajax.php";
pub const GAME_QUERY: &str = "action=stephino_rpg";

pub type SignalSender = mpsc::UnboundedSender<SessionSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<SessionSignal>;

/// Pacing between user-visible steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeDelays {
    /// After the form is persisted, before validation starts.
    pub submit: Duration,
    /// Between the version probe and the credential exchange.
    pub between_steps: Duration,
    /// After a successful handshake, before the remote surface is shown.
    pub settle: Duration,
}

impl Default for HandshakeDelays {
    fn default() -> Self {
        Self {
            submit: Duration::from_millis(1500),
            between_steps: Duration::from_millis(1500),
            settle: Duration::from_millis(2000),
        }
    }
}

impl HandshakeDelays {
    pub fn immediate() -> Self {
        Self {
            submit: Duration::ZERO,
            between_steps: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Raw login form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub user_email: String,
    pub user_password: String,
    pub server_url: String,
}

/// Phase bookkeeping for a single attempt. Signals go nowhere once the
/// receiver is gone, so a closed shell never sees late callbacks.
pub struct HandshakeAttempt<'a> {
    phase: HandshakePhase,
    signals: &'a SignalSender,
}

impl<'a> HandshakeAttempt<'a> {
    pub fn new(signals: &'a SignalSender) -> Self {
        Self {
            phase: HandshakePhase::Idle,
            signals,
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    pub fn advance(&mut self, next: HandshakePhase) {
        if !self.phase.can_advance_to(next) {
            warn!(
                target: "stephino::session",
                from = %self.phase,
                to = %next,
                "ignoring out-of-order phase transition"
            );
            return;
        }
        debug!(target: "stephino::session", from = %self.phase, to = %next, "handshake phase");
        self.phase = next;
        self.send(SessionSignal::Phase(next));
    }

    pub fn relay(&self, event: HandshakeEvent) {
        self.send(SessionSignal::Handshake(event));
    }

    fn fail(&mut self, err: &AuthError) {
        self.advance(HandshakePhase::Failed);
        self.send(SessionSignal::Error(err.to_string()));
    }

    fn send(&self, signal: SessionSignal) {
        if self.signals.send(signal).is_err() {
            debug!(target: "stephino::session", "signal receiver closed; dropping signal");
        }
    }
}

/// Runs version probe then credential exchange against one server.
pub struct RemoteSessionClient {
    transport: Arc<dyn SessionTransport>,
    secrets: Arc<dyn SecretStore>,
    between_steps: Duration,
}

impl RemoteSessionClient {
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        secrets: Arc<dyn SecretStore>,
        between_steps: Duration,
    ) -> Self {
        Self {
            transport,
            secrets,
            between_steps,
        }
    }

    /// Returns the terminal event. Any error means no terminal event was sent.
    pub async fn run(
        &self,
        server: &Url,
        user_email: &str,
        attempt: &mut HandshakeAttempt<'_>,
    ) -> Result<HandshakeEvent, AuthError> {
        attempt.advance(HandshakePhase::ProbingVersion);
        let version = self.transport.probe_version(server).await?;
        info!(target: "stephino::session", %version, host = ?server.host_str(), "server version detected");
        attempt.relay(HandshakeEvent::version_detected(&version));

        pause(self.between_steps).await;

        attempt.advance(HandshakePhase::ExchangingCredentials);
        let key = CacheKey::for_server(server, user_email);
        let secret = match self.secrets.get(&key) {
            Ok(secret) => secret.unwrap_or_default(),
            Err(err) => {
                warn!(
                    target: "stephino::session",
                    cache_key = %key,
                    error = %err,
                    "cached secret unreadable; exchanging with an empty one"
                );
                String::new()
            }
        };
        let reply = self
            .transport
            .exchange_credentials(server, user_email, &secret)
            .await?;

        if let Some(rotated) = reply.rotated_secret() {
            match self.secrets.set(&key, rotated) {
                Ok(()) => {
                    debug!(target: "stephino::session", cache_key = %key, "cached rotated secret")
                }
                Err(err) => warn!(
                    target: "stephino::session",
                    cache_key = %key,
                    error = %err,
                    "failed to cache rotated secret"
                ),
            }
        }

        let event =
            HandshakeEvent::authenticated(reply.is_ok(), reply.message.clone(), reply.result.clone());
        attempt.relay(event.clone());
        attempt.advance(if event.succeeded {
            HandshakePhase::Succeeded
        } else {
            HandshakePhase::Failed
        });
        Ok(event)
    }
}

/// Checks the form without touching the network. Email first, then URL.
pub fn validate_form(form: &LoginForm) -> Result<Url, AuthError> {
    validate_email(&form.user_email)?;
    validate_server_url(&form.server_url)
}

/// Remote game surface for a validated server.
pub fn game_url(server: &Url) -> Url {
    let mut url = endpoint(server, GAME_PATH);
    url.set_query(Some(GAME_QUERY));
    url
}

pub struct SessionBootstrap {
    client: RemoteSessionClient,
    secrets: Arc<dyn SecretStore>,
    settings: SettingsStore,
    connectivity: Arc<dyn Connectivity>,
    delays: HandshakeDelays,
}

impl SessionBootstrap {
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        secrets: Arc<dyn SecretStore>,
        settings: SettingsStore,
        connectivity: Arc<dyn Connectivity>,
        delays: HandshakeDelays,
    ) -> Self {
        Self {
            client: RemoteSessionClient::new(transport, secrets.clone(), delays.between_steps),
            secrets,
            settings,
            connectivity,
            delays,
        }
    }

    pub fn delays(&self) -> HandshakeDelays {
        self.delays
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Form contents for the login surface: last submitted values plus the cached secret.
    pub fn prefill(&self, default_server_url: &str) -> Result<LoginForm, AuthError> {
        let settings = self.settings.load()?;
        let user_email = settings.user_email_or_default().to_string();
        let server_url = settings.server_url_or(default_server_url).to_string();
        let user_password =
            match crate::auth::cached_secret(self.secrets.as_ref(), &server_url, &user_email) {
                Ok(secret) => secret.unwrap_or_default(),
                Err(err) => {
                    warn!(target: "stephino::session", error = %err, "cached secret unreadable; not pre-filled");
                    String::new()
                }
            };
        Ok(LoginForm {
            user_email,
            user_password,
            server_url,
        })
    }

    /// Persists the form as typed so the next launch is pre-filled, whatever happens next.
    /// Only the settings write is fatal; an unwritable secret store is logged and skipped.
    pub fn remember(&self, form: &LoginForm) -> Result<(), AuthError> {
        self.settings.remember(&form.user_email, &form.server_url)?;
        let server = match Url::parse(form.server_url.trim()) {
            Ok(server) => server,
            Err(err) => {
                debug!(target: "stephino::session", error = %err, "server URL unparseable; secret not cached");
                return Ok(());
            }
        };
        let key = CacheKey::for_server(&server, &form.user_email);
        if let Err(err) = self.secrets.set(&key, &form.user_password) {
            warn!(
                target: "stephino::session",
                cache_key = %key,
                error = %err,
                "failed to cache submitted secret"
            );
        }
        Ok(())
    }

    /// One login attempt: persist, gate, handshake.
    pub async fn submit(
        &self,
        form: &LoginForm,
        signals: &SignalSender,
    ) -> Result<HandshakeEvent, AuthError> {
        let mut attempt = HandshakeAttempt::new(signals);
        let outcome = self.run_attempt(form, &mut attempt).await;
        if let Err(err) = &outcome {
            warn!(
                target: "stephino::session",
                error = %err,
                kind = ?err.kind(),
                phase = %attempt.phase(),
                "login attempt failed"
            );
            attempt.fail(err);
        }
        outcome
    }

    async fn run_attempt(
        &self,
        form: &LoginForm,
        attempt: &mut HandshakeAttempt<'_>,
    ) -> Result<HandshakeEvent, AuthError> {
        self.remember(form)?;
        pause(self.delays.submit).await;

        attempt.advance(HandshakePhase::Validating);
        if !self.connectivity.is_online() {
            return Err(AuthError::NoInternet);
        }
        let server = validate_form(form)?;

        self.client.run(&server, &form.user_email, attempt).await
    }

    /// Target of the play transition, from the stored server URL or the default.
    pub fn play_target(&self, default_server_url: &str) -> Result<Url, AuthError> {
        let settings = self.settings.load()?;
        let server = validate_server_url(settings.server_url_or(default_server_url))?;
        Ok(game_url(&server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemorySecretStore;
    use crate::auth::gate::ExchangeResponse;
    use async_trait::async_trait;
    use connectivity::StaticConnectivity;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        version: Option<String>,
        exchange: Option<ExchangeResponse>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SessionTransport for ScriptedTransport {
        async fn probe_version(&self, server: &Url) -> Result<String, AuthError> {
            self.calls.lock().push(format!("version {}", server.host_str().unwrap_or_default()));
            self.version.clone().ok_or(AuthError::ServerOffline)
        }

        async fn exchange_credentials(
            &self,
            _server: &Url,
            user_email: &str,
            user_password: &str,
        ) -> Result<ExchangeResponse, AuthError> {
            self.calls.lock().push(format!("auth {user_email} {user_password}"));
            self.exchange
                .clone()
                .ok_or_else(|| AuthError::MalformedResponse("no scripted reply".into()))
        }
    }

    fn form() -> LoginForm {
        LoginForm {
            user_email: "player@example.com".into(),
            user_password: "hunter2".into(),
            server_url: "https://game.example.com".into(),
        }
    }

    fn bootstrap(
        transport: Arc<ScriptedTransport>,
        secrets: Arc<MemorySecretStore>,
        dir: &std::path::Path,
        online: bool,
    ) -> SessionBootstrap {
        SessionBootstrap::new(
            transport,
            secrets,
            SettingsStore::open(dir),
            Arc::new(StaticConnectivity(online)),
            HandshakeDelays::immediate(),
        )
    }

    fn drain(mut rx: SignalReceiver) -> Vec<SessionSignal> {
        let mut out = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            out.push(signal);
        }
        out
    }

    #[tokio::test]
    async fn successful_attempt_walks_every_phase() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport {
            version: Some("1.2.3".into()),
            exchange: Some(ExchangeResponse {
                status: 200,
                result: Some("tok-abc".into()),
                message: None,
            }),
            ..Default::default()
        });
        let secrets = MemorySecretStore::new();
        let boot = bootstrap(transport.clone(), secrets.clone(), dir.path(), true);
        let (tx, rx) = mpsc::unbounded_channel();

        let event = boot.submit(&form(), &tx).await.unwrap();
        assert!(event.succeeded);
        assert_eq!(event.payload.as_deref(), Some("tok-abc"));
        assert_eq!(event.message, DEFAULT_FINAL_MESSAGE);

        let phases: Vec<HandshakePhase> = drain(rx)
            .into_iter()
            .filter_map(|signal| match signal {
                SessionSignal::Phase(phase) => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                HandshakePhase::Validating,
                HandshakePhase::ProbingVersion,
                HandshakePhase::ExchangingCredentials,
                HandshakePhase::Succeeded,
            ]
        );

        // the submitted password went out, then got rotated
        assert_eq!(
            transport.calls.lock().as_slice(),
            ["version game.example.com", "auth player@example.com hunter2"]
        );
        let key = CacheKey::derive("game.example.com", "player@example.com");
        assert_eq!(secrets.get(&key).unwrap().as_deref(), Some("tok-abc"));
    }

    #[tokio::test]
    async fn offline_host_fails_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::default());
        let boot = bootstrap(transport.clone(), MemorySecretStore::new(), dir.path(), false);
        let (tx, rx) = mpsc::unbounded_channel();

        let err = boot.submit(&form(), &tx).await.unwrap_err();
        assert!(matches!(err, AuthError::NoInternet));
        assert!(transport.calls.lock().is_empty());
        let signals = drain(rx);
        assert!(signals.contains(&SessionSignal::Phase(HandshakePhase::Failed)));
        assert!(signals.contains(&SessionSignal::Error("No Internet connection".into())));
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_transport() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::default());
        let boot = bootstrap(transport.clone(), MemorySecretStore::new(), dir.path(), true);
        let (tx, _rx) = mpsc::unbounded_channel();

        for (email, url) in [
            ("player", "https://game.example.com"),
            ("player@example.com", "http://game.example.com"),
            ("player@example.com", "https://localhost"),
        ] {
            let attempt = LoginForm {
                user_email: email.into(),
                user_password: "pw".into(),
                server_url: url.into(),
            };
            let err = boot.submit(&attempt, &tx).await.unwrap_err();
            assert_eq!(err.kind(), crate::auth::ErrorKind::Validation, "{email} {url}");
        }
        assert!(transport.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_attempt_still_remembers_form() {
        let dir = tempfile::tempdir().unwrap();
        let boot = bootstrap(
            Arc::new(ScriptedTransport::default()),
            MemorySecretStore::new(),
            dir.path(),
            true,
        );
        let (tx, _rx) = mpsc::unbounded_channel();

        assert!(boot.submit(&form(), &tx).await.is_err());

        let prefill = boot.prefill("https://stephino.com").unwrap();
        assert_eq!(prefill, form());
    }

    #[tokio::test]
    async fn closed_receiver_does_not_break_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport {
            version: Some("2.0".into()),
            exchange: Some(ExchangeResponse {
                status: 401,
                result: None,
                message: Some("bad password".into()),
            }),
            ..Default::default()
        });
        let boot = bootstrap(transport, MemorySecretStore::new(), dir.path(), true);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let event = boot.submit(&form(), &tx).await.unwrap();
        assert!(!event.succeeded);
        assert_eq!(event.message, "bad password");
    }

    /// Refuses every read and write, like a keyring-less host without a passphrase.
    struct LockedSecretStore;

    impl SecretStore for LockedSecretStore {
        fn get(&self, _key: &CacheKey) -> Result<Option<String>, AuthError> {
            Err(AuthError::PassphraseMissing)
        }

        fn set(&self, _key: &CacheKey, _secret: &str) -> Result<(), AuthError> {
            Err(AuthError::PassphraseMissing)
        }
    }

    #[tokio::test]
    async fn locked_secret_store_does_not_block_login() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport {
            version: Some("1.2.3".into()),
            exchange: Some(ExchangeResponse {
                status: 200,
                result: Some("tok-abc".into()),
                message: None,
            }),
            ..Default::default()
        });
        let boot = SessionBootstrap::new(
            transport.clone(),
            Arc::new(LockedSecretStore),
            SettingsStore::open(dir.path()),
            Arc::new(StaticConnectivity(true)),
            HandshakeDelays::immediate(),
        );
        let (tx, rx) = mpsc::unbounded_channel();

        let event = boot.submit(&form(), &tx).await.unwrap();
        assert!(event.is_final_step);
        assert!(event.succeeded);
        assert_eq!(event.payload.as_deref(), Some("tok-abc"));

        // nothing could be read back, so the exchange went out with an empty secret
        assert_eq!(
            transport.calls.lock().as_slice(),
            ["version game.example.com", "auth player@example.com "]
        );
        let signals = drain(rx);
        assert!(signals.contains(&SessionSignal::Handshake(event)));
        assert!(signals.contains(&SessionSignal::Phase(HandshakePhase::Succeeded)));
        assert!(!signals.iter().any(|signal| matches!(signal, SessionSignal::Error(_))));

        let settings = boot.settings().load().unwrap();
        assert_eq!(settings.user_email.as_deref(), Some("player@example.com"));
        assert_eq!(settings.server_url.as_deref(), Some("https://game.example.com"));

        let prefill = boot.prefill("https://stephino.com").unwrap();
        assert_eq!(prefill.user_email, "player@example.com");
        assert_eq!(prefill.user_password, "");
    }

    #[test]
    fn play_target_uses_stored_or_default_server() {
        let dir = tempfile::tempdir().unwrap();
        let boot = bootstrap(
            Arc::new(ScriptedTransport::default()),
            MemorySecretStore::new(),
            dir.path(),
            true,
        );
        assert_eq!(
            boot.play_target("https://stephino.com").unwrap().as_str(),
            "https://stephino.com/wp-admin/admin-ajax.php?action=stephino_rpg"
        );

        boot.settings()
            .remember("p@example.com", "http://game.example.com")
            .unwrap();
        assert!(matches!(
            boot.play_target("https://stephino.com"),
            Err(AuthError::InsecureScheme)
        ));
    }

    #[test]
    fn game_url_drops_path_and_query() {
        let server = Url::parse("https://game.example.com/blog/?p=1").unwrap();
        assert_eq!(
            game_url(&server).as_str(),
            "https://game.example.com/wp-admin/admin-ajax.php?action=stephino_rpg"
        );
    }
}
