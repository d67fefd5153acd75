use crate::auth::{self, CredentialsStore, GateClient, SecretStore, SettingsStore};
use crate::config::{LauncherConfig, WINDOW_TITLE};
use crate::session::connectivity::{Connectivity, InterfaceConnectivity, StaticConnectivity};
use crate::session::{LoginForm, SessionBootstrap};
use crate::shell::terminal::{self, TerminalBackend};
use crate::shell::{Launcher, LoginOutcome, WindowShell, WindowSpec};
use crate::terminal::cli::{self, Command, LoginArgs, PlayArgs, SurfaceArgs};
use crate::terminal::error::CliError;
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing::info;

pub async fn run(cli: cli::Cli, mut config: LauncherConfig) -> Result<(), CliError> {
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Some(Command::Login(args)) => login(&config, args).await,
        Some(Command::Play(args)) => play(&config, args),
        Some(Command::Status) => status(&config),
        None => login(&config, LoginArgs::default()).await,
    }
}

fn build_launcher(
    config: &LauncherConfig,
    surface: SurfaceArgs,
    skip_online_check: bool,
) -> Result<Launcher<TerminalBackend>, CliError> {
    let transport = Arc::new(GateClient::new(config.request_timeout)?);
    let secrets: Arc<dyn SecretStore> = Arc::new(CredentialsStore::open(&config.data_dir));
    let connectivity: Arc<dyn Connectivity> = if skip_online_check {
        Arc::new(StaticConnectivity(true))
    } else {
        Arc::new(InterfaceConnectivity)
    };
    let bootstrap = SessionBootstrap::new(
        transport,
        secrets,
        SettingsStore::open(&config.data_dir),
        connectivity,
        config.delays,
    );
    let shell = WindowShell::new(
        TerminalBackend::new(!surface.no_browser),
        WindowSpec {
            title: WINDOW_TITLE.to_string(),
            width: config.window_width,
            height: config.window_height,
        },
    );
    Ok(Launcher::new(shell, bootstrap, config.default_server_url.clone()))
}

async fn login(config: &LauncherConfig, args: LoginArgs) -> Result<(), CliError> {
    let mut launcher = build_launcher(config, args.surface, args.skip_online_check)?;
    let prefill = launcher.open()?;

    let form = if args.password_stdin {
        let mut password = String::new();
        io::stdin().lock().read_line(&mut password)?;
        LoginForm {
            user_email: args.email.unwrap_or(prefill.user_email),
            user_password: password.trim_end_matches(['\r', '\n']).to_string(),
            server_url: args.server_url.unwrap_or(prefill.server_url),
        }
    } else {
        terminal::prompt_login(&prefill, args.email, args.server_url)?
    };

    match launcher.submit_login(form).await? {
        LoginOutcome::Playing(url) => {
            info!(target: "stephino::shell", %url, "launched");
            Ok(())
        }
        LoginOutcome::Rejected(event) => Err(CliError::Rejected(event.message)),
        LoginOutcome::Ignored => Ok(()),
    }
}

fn play(config: &LauncherConfig, args: PlayArgs) -> Result<(), CliError> {
    let mut launcher = build_launcher(config, args.surface, true)?;
    launcher.play()?;
    Ok(())
}

fn status(config: &LauncherConfig) -> Result<(), CliError> {
    let settings = SettingsStore::open(&config.data_dir).load()?;
    let secrets = CredentialsStore::open(&config.data_dir);

    let user_email = settings.user_email_or_default();
    let server_url = settings.server_url_or(&config.default_server_url);
    let has_secret = auth::cached_secret(&secrets, server_url, user_email)?.is_some();

    println!("Stephino RPG launcher");
    println!(
        "  E-mail:     {}",
        if user_email.is_empty() { "(none)" } else { user_email }
    );
    println!("  Server:     {server_url}");
    println!(
        "  Credential: {}",
        if has_secret { "cached ✅" } else { "not cached" }
    );
    println!("  Data dir:   {}", config.data_dir.display());
    println!("  Learn more: {}", config.plugin_url);
    Ok(())
}
