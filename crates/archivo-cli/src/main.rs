//! Archivo - a local web page archive with full-text search

mod cli;
mod commands;

use archivo_core::{Config, Context};
use archivo_storage::{PageStore, PoolConfig, SqliteStore};
use clap::Parser;
use cli::Cli;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::find);
    let config = match &config_path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::default(),
    };

    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // The level comes from the config, so its loading is reported afterwards
    match &config_path {
        Some(path) => tracing::info!("Loaded config from {}", path.display()),
        None => tracing::debug!("No config file found, using defaults"),
    }

    let path = match &cli.db {
        Some(path) => path.clone(),
        None => config.database_path()?,
    };
    tracing::debug!("Using archive at {}", path.display());

    // Read before the signal handler exists, so Ctrl-C still ends the process
    let input = commands::read_input(&cli.command)?;

    let store: Arc<dyn PageStore> = Arc::new(
        SqliteStore::open_with_config(&path, PoolConfig::from(&config.storage))
            .map_err(|e| anyhow::anyhow!("Failed to open archive: {}", e))?,
    );

    let ctx = match cli.timeout {
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => Context::background(),
    };

    let worker = {
        let store = Arc::clone(&store);
        let ctx = ctx.clone();
        let command = cli.command.clone();
        tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            commands::execute(store.as_ref(), &ctx, &command, input, &mut out).map(|_| out)
        })
    };
    tokio::pin!(worker);

    let result = tokio::select! {
        joined = &mut worker => joined?,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling");
            ctx.cancel();
            worker.await?
        }
    };

    store.close()?;

    let output = result?;
    std::io::stdout().write_all(&output)?;
    Ok(())
}
