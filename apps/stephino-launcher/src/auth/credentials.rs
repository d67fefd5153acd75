use crate::auth::crypto::{self, SealedSecret};
use crate::auth::error::AuthError;
use crate::auth::passphrase;
use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

pub const KEYRING_SERVICE: &str = "stephino-rpg-creds";
pub const CREDENTIALS_FILE: &str = "credentials";

/// Namespace for one cached secret: a digest of `hostname/email`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(hostname: &str, user_email: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(hostname.as_bytes());
        hasher.update(b"/");
        hasher.update(user_email.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn for_server(server: &Url, user_email: &str) -> Self {
        Self::derive(server.host_str().unwrap_or_default(), user_email)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait SecretStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, AuthError>;
    fn set(&self, key: &CacheKey, secret: &str) -> Result<(), AuthError>;
}

/// In-memory secrets for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<CacheKey, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, AuthError> {
        Ok(self.secrets.lock().get(key).cloned())
    }

    fn set(&self, key: &CacheKey, secret: &str) -> Result<(), AuthError> {
        self.secrets.lock().insert(key.clone(), secret.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretRecord {
    Keyring { service: String, account: String },
    Sealed { sealed: SealedSecret },
}

impl SecretRecord {
    fn read(&self, passphrase: Option<&str>) -> Result<Option<String>, AuthError> {
        match self {
            SecretRecord::Keyring { service, account } => {
                let entry = Entry::new(service, account)
                    .map_err(|err| AuthError::Keyring(err.to_string()))?;
                match entry.get_password() {
                    Ok(secret) => Ok(Some(secret)),
                    Err(keyring::Error::NoEntry) => Ok(None),
                    Err(err) => Err(AuthError::Keyring(err.to_string())),
                }
            }
            SecretRecord::Sealed { sealed } => {
                let passphrase = passphrase.ok_or(AuthError::PassphraseMissing)?;
                crypto::open(passphrase, sealed).map(Some)
            }
        }
    }

    fn write_keyring(key: &CacheKey, secret: &str) -> Result<Self, AuthError> {
        let account = key.as_str().to_string();
        let entry = Entry::new(KEYRING_SERVICE, &account)
            .map_err(|err| AuthError::Keyring(err.to_string()))?;
        entry
            .set_password(secret)
            .map_err(|err| AuthError::Keyring(err.to_string()))?;
        Ok(SecretRecord::Keyring {
            service: KEYRING_SERVICE.to_string(),
            account,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSecret {
    pub record: SecretRecord,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialIndex {
    #[serde(default)]
    secrets: BTreeMap<String, StoredSecret>,
}

/// File-indexed secret store.
///
/// The index lives at `<data_dir>/credentials`; each entry points at a keyring
/// item or carries a passphrase-sealed blob when the keyring is unavailable.
pub struct CredentialsStore {
    path: PathBuf,
    use_keyring: bool,
    passphrase: Option<String>,
    lock: Mutex<()>,
}

impl CredentialsStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(CREDENTIALS_FILE),
            use_keyring: true,
            passphrase: passphrase::optional_passphrase(),
            lock: Mutex::new(()),
        }
    }

    /// Store that never touches the keyring and seals everything with `passphrase`.
    pub fn sealed(data_dir: &Path, passphrase: impl Into<String>) -> Self {
        Self {
            path: data_dir.join(CREDENTIALS_FILE),
            use_keyring: false,
            passphrase: Some(passphrase.into()),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_index(&self) -> Result<CredentialIndex, AuthError> {
        if !self.path.exists() {
            return Ok(CredentialIndex::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&raw)?)
    }

    fn save_index(&self, index: &CredentialIndex) -> Result<(), AuthError> {
        let serialized = toml::to_string_pretty(index)?;
        write_private(&self.path, serialized.as_bytes())
    }

    fn seal_record(&self, secret: &str) -> Result<SecretRecord, AuthError> {
        let passphrase = self
            .passphrase
            .as_deref()
            .ok_or(AuthError::PassphraseMissing)?;
        Ok(SecretRecord::Sealed {
            sealed: crypto::seal(passphrase, secret)?,
        })
    }
}

impl SecretStore for CredentialsStore {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, AuthError> {
        let _guard = self.lock.lock();
        let index = self.load_index()?;
        match index.secrets.get(key.as_str()) {
            Some(stored) => stored.record.read(self.passphrase.as_deref()),
            None => Ok(None),
        }
    }

    fn set(&self, key: &CacheKey, secret: &str) -> Result<(), AuthError> {
        let _guard = self.lock.lock();
        let mut index = self.load_index()?;

        let record = if self.use_keyring {
            match SecretRecord::write_keyring(key, secret) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(
                        target: "stephino::auth",
                        error = %err,
                        "keyring unavailable; falling back to passphrase-protected storage"
                    );
                    self.seal_record(secret)?
                }
            }
        } else {
            self.seal_record(secret)?
        };

        index.secrets.insert(
            key.as_str().to_string(),
            StoredSecret {
                record,
                updated_at: OffsetDateTime::now_utc(),
            },
        );
        self.save_index(&index)
    }
}

/// Writes `contents` to `path`, creating parents, readable only by the owner on Unix.
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
