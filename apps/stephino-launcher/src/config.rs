use crate::session::HandshakeDelays;
use directories::BaseDirs;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "https://stephino.com";
pub const DEFAULT_PLUGIN_URL: &str = "https://wordpress.org/plugins/stephino-rpg/";
pub const WINDOW_TITLE: &str = "Stephino RPG";

/// Launcher configuration
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Server used when nothing has been submitted yet
    pub default_server_url: String,
    /// Where "learn more" points
    pub plugin_url: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Upper bound for each handshake request
    pub request_timeout: Duration,
    pub delays: HandshakeDelays,
    /// Directory holding `launcher.toml` and the credentials index
    pub data_dir: PathBuf,
    pub debug: bool,
}

fn env_millis(name: &str, fallback: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(fallback)
}

fn env_truthy(name: &str) -> bool {
    env::var(name)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

pub fn default_data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|base| base.home_dir().join(".stephino-rpg"))
        .unwrap_or_else(|| PathBuf::from(".stephino-rpg"))
}

impl LauncherConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let delays = HandshakeDelays {
            submit: env_millis("STEPHINO_SUBMIT_DELAY_MS", defaults.delays.submit),
            between_steps: env_millis("STEPHINO_STEP_DELAY_MS", defaults.delays.between_steps),
            settle: env_millis("STEPHINO_SETTLE_DELAY_MS", defaults.delays.settle),
        };

        Self {
            default_server_url: env::var("STEPHINO_SERVER_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.default_server_url),
            plugin_url: env::var("STEPHINO_PLUGIN_URL").unwrap_or(defaults.plugin_url),
            window_width: env::var("STEPHINO_WINDOW_WIDTH")
                .ok()
                .and_then(|w| w.parse().ok())
                .unwrap_or(defaults.window_width),
            window_height: env::var("STEPHINO_WINDOW_HEIGHT")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(defaults.window_height),
            request_timeout: env::var("STEPHINO_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            delays,
            data_dir: env::var_os("STEPHINO_HOME")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            debug: env_truthy("STEPHINO_DEBUG"),
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            default_server_url: DEFAULT_SERVER_URL.to_string(),
            plugin_url: DEFAULT_PLUGIN_URL.to_string(),
            window_width: 1280,
            window_height: 720,
            request_timeout: crate::auth::gate::DEFAULT_REQUEST_TIMEOUT,
            delays: HandshakeDelays::default(),
            data_dir: default_data_dir(),
            debug: false,
        }
    }
}
