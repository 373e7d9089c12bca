use std::net::SocketAddr;
use std::path::PathBuf;

use eyre::{Result, WrapErr};
use log::{info, warn};

mod cli;

use cli::Cli;
use ytbrief::config::{Config, config_path};
use ytbrief::server::{AppState, router};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytbrief.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytbrief")
        .join("logs")
}

fn build_after_help() -> String {
    format!(
        "\nENDPOINTS:\n  \
POST /api/summarize   {{ \"videoUrl\": ... }}\n  \
POST /api/chat        {{ \"message\": ..., \"videoContext\": {{ ... }} }}\n  \
GET  /api/test-api\n  \
GET  /health\n\n\
Config is read from: {}\n\
Logs are written to: {}",
        config_path().display(),
        log_dir().join("ytbrief.log").display()
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cmd = <Cli as clap::CommandFactory>::command().after_help(build_after_help());
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // An explicit --config must load; the default location is optional
    let file_config = match cli.config.as_deref() {
        Some(path) => Config::load(Some(path))?,
        None => Config::load(None).unwrap_or_else(|e| {
            warn!("Ignoring config file: {e:#}");
            Config::default()
        }),
    };
    let settings = file_config.overlay(cli.overrides()).settings();

    let state = AppState::from_settings(&settings)?;
    let addr: SocketAddr = settings
        .bind
        .parse()
        .wrap_err_with(|| format!("invalid bind address: {}", settings.bind))?;

    if cli.verbose {
        eprintln!(
            "Summary strategy: {}\nChat strategy: {}\nModel: {}\nCaptions: {}",
            state.summaries.strategy_name(),
            state.chat.strategy_name(),
            settings.model,
            settings.captions,
        );
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind to {addr}"))?;
    info!("Listening on http://{addr}");
    eprintln!("ytbrief listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server failed")?;
    Ok(())
}
