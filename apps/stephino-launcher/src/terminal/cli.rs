use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "stephino",
    about = "🎮 Sign in to a Stephino RPG server and launch the game",
    version
)]
pub struct Cli {
    #[arg(
        long = "data-dir",
        global = true,
        env = "STEPHINO_HOME",
        value_name = "DIR",
        help = "Directory holding launcher settings and the credentials index"
    )]
    pub data_dir: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "STEPHINO_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "STEPHINO_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and launch the game (default when no subcommand given)
    Login(LoginArgs),
    /// Launch the game for the last submitted server without signing in again
    Play(PlayArgs),
    /// Show the remembered e-mail, server, and cached credential state
    Status,
}

#[derive(Args, Debug, Default)]
pub struct LoginArgs {
    #[arg(long = "email", value_name = "EMAIL", help = "Account e-mail (prompted when omitted)")]
    pub email: Option<String>,

    #[arg(
        long = "server-url",
        value_name = "URL",
        help = "Stephino RPG website, e.g. https://game.example.com (prompted when omitted)"
    )]
    pub server_url: Option<String>,

    #[arg(
        long = "password-stdin",
        action = clap::ArgAction::SetTrue,
        help = "Read the password from the first line of stdin instead of prompting"
    )]
    pub password_stdin: bool,

    #[arg(
        long = "skip-online-check",
        action = clap::ArgAction::SetTrue,
        help = "Do not require a non-loopback network interface before connecting"
    )]
    pub skip_online_check: bool,

    #[command(flatten)]
    pub surface: SurfaceArgs,
}

#[derive(Args, Debug, Default)]
pub struct PlayArgs {
    #[command(flatten)]
    pub surface: SurfaceArgs,
}

#[derive(Args, Debug, Default, Clone, Copy)]
pub struct SurfaceArgs {
    #[arg(
        long = "no-browser",
        action = clap::ArgAction::SetTrue,
        help = "Print the game URL instead of opening it in the system browser"
    )]
    pub no_browser: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
