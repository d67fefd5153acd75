use stephino_launcher_core::config::LauncherConfig;
use stephino_launcher_core::telemetry::logging::{self, LogLevel};
use stephino_launcher_core::terminal::{app, cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = cli::parse();
    let config = LauncherConfig::from_env();

    let mut log_config = cli.logging.to_config();
    if config.debug && log_config.level < LogLevel::Debug {
        log_config.level = LogLevel::Debug;
    }
    if let Err(err) = logging::init(&log_config) {
        eprintln!("⚠️  logging initialization failed: {err}");
    }

    if let Err(err) = app::run(cli, config).await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
