use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vpn_dash::config::{AppConfig, LogFormat, LoggingConfig};
use vpn_dash::executor::SystemRunner;
use vpn_dash::server::{self, AppState};
use vpn_dash::status::{self, StatusSnapshot};

/// vpn-dash — JSON status backend for a WireGuard/OpenVPN server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "vpn-dash",
    version,
    about = "JSON status backend for a WireGuard/OpenVPN server.",
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used if it does not exist.
    #[arg(long, default_value = "vpn-dash.toml")]
    config: PathBuf,

    /// Listen address, e.g. 0.0.0.0:5000.
    #[arg(long)]
    bind: Option<String>,

    /// Log filter directive (overridden by RUST_LOG).
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Log output format: pretty or json.
    #[arg(long = "log-format")]
    log_format: Option<LogFormat>,

    /// Build one status snapshot, print it as JSON and exit.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// With --once, write the snapshot to this path instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::load(Some(cli.config.as_path()))?
    } else {
        AppConfig::default()
    };
    config = config.with_env_overrides();

    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging)?;

    tracing::info!(
        config = %cli.config.display(),
        bind = %config.server.bind,
        timeout_secs = config.probe.timeout_secs,
        wireguard_interface = %config.services.wireguard_interface,
        "vpn-dash configuration loaded"
    );

    let runner = Arc::new(SystemRunner::new(config.probe.timeout()));

    if cli.once {
        let snapshot = status::build_snapshot(runner.as_ref(), &config).await;
        return match cli.output.as_deref() {
            Some(path) => {
                write_snapshot_json(path, &snapshot)
                    .with_context(|| format!("failed to write JSON to {}", path.display()))?;
                tracing::info!(path = %path.display(), "wrote status snapshot");
                Ok(())
            }
            None => {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                Ok(())
            }
        };
    }

    let shutdown = CancellationToken::new();
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown requested");
        on_ctrl_c.cancel();
    });

    let state = AppState::new(config, runner);
    server::spawn_server(state, shutdown).await
}

fn write_snapshot_json(path: &std::path::Path, snapshot: &StatusSnapshot) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}
