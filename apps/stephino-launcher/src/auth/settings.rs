use crate::auth::credentials::write_private;
use crate::auth::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "launcher.toml";

/// Values remembered between launches to pre-fill the login form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherSettings {
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
}

impl LauncherSettings {
    pub fn user_email_or_default(&self) -> &str {
        self.user_email.as_deref().unwrap_or_default()
    }

    pub fn server_url_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.server_url.as_deref().unwrap_or(fallback)
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LauncherSettings, AuthError> {
        if !self.path.exists() {
            return Ok(LauncherSettings::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save(&self, settings: &LauncherSettings) -> Result<(), AuthError> {
        let serialized = toml::to_string_pretty(settings)?;
        write_private(&self.path, serialized.as_bytes())
    }

    /// Overwrites both fields in one write.
    pub fn remember(&self, user_email: &str, server_url: &str) -> Result<(), AuthError> {
        self.save(&LauncherSettings {
            user_email: Some(user_email.to_string()),
            server_url: Some(server_url.to_string()),
        })
    }
}
