use std::io;
use thiserror::Error;

/// Coarse failure class used when deciding how an error reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NetworkUnavailable,
    Server,
    Unhandled,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid e-mail address")]
    InvalidEmail,
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("Your website must use SSL")]
    InsecureScheme,
    #[error("Invalid hostname")]
    InvalidHostname,
    #[error("No Internet connection")]
    NoInternet,
    #[error("Server offline or Stephino RPG not installed")]
    ServerOffline,
    #[error("Could not detect Stephino RPG version")]
    VersionUndetected,
    #[error("malformed server response: {0}")]
    MalformedResponse(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Toml(String),
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("encryption error: {0}")]
    Encryption(String),
    #[error("passphrase required to unlock stored credentials (set STEPHINO_PASSPHRASE)")]
    PassphraseMissing,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidEmail
            | AuthError::InvalidUrl(_)
            | AuthError::InsecureScheme
            | AuthError::InvalidHostname => ErrorKind::Validation,
            AuthError::NoInternet => ErrorKind::NetworkUnavailable,
            AuthError::Http(err) if err.is_connect() || err.is_timeout() => {
                ErrorKind::NetworkUnavailable
            }
            AuthError::ServerOffline
            | AuthError::VersionUndetected
            | AuthError::MalformedResponse(_)
            | AuthError::Http(_) => ErrorKind::Server,
            _ => ErrorKind::Unhandled,
        }
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(value: toml::de::Error) -> Self {
        AuthError::Toml(value.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(value: toml::ser::Error) -> Self {
        AuthError::Toml(value.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(value: serde_json::Error) -> Self {
        AuthError::MalformedResponse(value.to_string())
    }
}
