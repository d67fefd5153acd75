use std::env;
use std::sync::OnceLock;

pub const PASSPHRASE_ENV: &str = "STEPHINO_PASSPHRASE";

static PASSPHRASE: OnceLock<Option<String>> = OnceLock::new();

fn read_env() -> Option<String> {
    env::var(PASSPHRASE_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Passphrase from the environment, read once per process.
pub fn optional_passphrase() -> Option<String> {
    PASSPHRASE.get_or_init(read_env).clone()
}
