pub mod credentials;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod passphrase;
pub mod settings;
pub mod validate;

pub use credentials::{CacheKey, CredentialsStore, MemorySecretStore, SecretStore};
pub use error::{AuthError, ErrorKind};
pub use gate::{ExchangeResponse, GateClient, SessionTransport};
pub use settings::{LauncherSettings, SettingsStore};
pub use validate::{validate_email, validate_server_url};

use url::Url;

/// Secret cached for `user_email` on `server_url`, if the URL parses.
pub fn cached_secret(
    secrets: &dyn SecretStore,
    server_url: &str,
    user_email: &str,
) -> Result<Option<String>, AuthError> {
    let Ok(server) = Url::parse(server_url) else {
        return Ok(None);
    };
    secrets.get(&CacheKey::for_server(&server, user_email))
}
