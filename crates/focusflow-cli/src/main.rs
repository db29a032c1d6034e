use std::time::Duration;

use clap::{Parser, Subcommand};
use focusflow_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "focusflow", version, about = "FocusFlow Pomodoro timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Interval lengths and auto-start behaviour
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Current task label
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Account used to sync settings between devices
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env("FOCUSFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(&config);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "falling back to default config");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async move {
        match cli.command {
            Commands::Timer { action } => commands::timer::run(action, config).await,
            Commands::Settings { action } => commands::settings::run(action, config).await,
            Commands::Task { action } => commands::task::run(action, config).await,
            Commands::Auth { action } => commands::auth::run(action, config).await,
            Commands::Config { action } => commands::config::run(action),
        }
    });
    // stdin reads park a blocking thread that would otherwise hold up exit
    runtime.shutdown_timeout(Duration::from_millis(100));

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
