//! scouter-conf - runtime configuration store for the scouter host agent.
//!
//! The store loads a property file, layers environment variables and system
//! properties over it, serves typed settings with defaults and legacy keys,
//! and re-reads the file while the agent keeps running.

pub mod cli;
pub mod config;
pub mod error;
pub mod notify;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{Cli, Commands, OutputFormat};
use crate::config::{snapshot, ConfigStore, ConfigStoreBuilder, OverrideLayer};
use crate::notify::ObserverRegistry;

/// Runs the command selected on the command line.
pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.log_level())?;

    let builder = store_builder(&cli);

    match cli.command {
        Commands::Run => run_store(builder).await,
        Commands::ConfigShow { format } => show_config(builder, format),
        Commands::ConfigDefaults => {
            print!("{}", snapshot::format_defaults());
            Ok(())
        }
        Commands::ConfigGet { key } => get_value(builder, &key),
        Commands::ConfigStatus => show_status(builder),
        Commands::ConfigText => print_text(builder),
        Commands::ConfigWrite { source } => write_text(builder, &source),
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so command output on stdout stays clean.
fn setup_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Captures the process environment and `-D` properties into a store builder.
fn store_builder(cli: &Cli) -> ConfigStoreBuilder {
    let overrides = OverrideLayer::from_process(cli.defines.iter().cloned());
    let builder = ConfigStore::builder().overrides(overrides);

    match &cli.config {
        Some(path) => builder.config_path(path),
        None => builder,
    }
}

/// Installs the global store, whose poller keeps it reloading until Ctrl+C.
async fn run_store(builder: ConfigStoreBuilder) -> Result<()> {
    let observers = Arc::new(ObserverRegistry::new());
    observers.register("reload-log", || info!("Configuration observers notified"));

    let store = config::init_global(builder.observer(observers))?;
    let state = store.current();

    info!(
        path = ?store.config_path(),
        obj_type = %state.identity.obj_type,
        obj_name = %state.identity.obj_name,
        obj_hash = state.identity.obj_hash,
        collector = %state.settings.net_collector_ip,
        "Configuration store ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    store.stop();

    Ok(())
}

/// Displays current and default values for every setting.
fn show_config(builder: ConfigStoreBuilder, format: OutputFormat) -> Result<()> {
    let store = builder.build();
    let rows = store.snapshot();

    match format {
        OutputFormat::Table => print!("{}", snapshot::format_table(&rows)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&snapshot::to_columns(&rows))?
        ),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&rows)?),
    }

    Ok(())
}

/// Prints the resolved value of a single key.
fn get_value(builder: ConfigStoreBuilder, key: &str) -> Result<()> {
    let store = builder.build();

    match store.value(key) {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => anyhow::bail!("Key '{}' is not set", key),
    }
}

/// Loads the file once and reports what was read.
fn show_status(builder: ConfigStoreBuilder) -> Result<()> {
    let store = builder.build();
    println!("{}", status_line(&store));
    Ok(())
}

fn status_line(store: &ConfigStore) -> String {
    let state = store.current();

    format!(
        "{}: mtime {} entries {} fingerprint {} obj_name {}",
        store.config_path().display(),
        state.loaded_mtime.unwrap_or(0),
        state.properties.len(),
        state.properties.fingerprint(),
        state.identity.obj_name
    )
}

/// Prints the raw configuration file.
fn print_text(builder: ConfigStoreBuilder) -> Result<()> {
    let store = builder.build();
    let text = store
        .load_text()
        .with_context(|| format!("Cannot read {}", store.config_path().display()))?;

    print!("{}", text);
    Ok(())
}

/// Replaces the configuration file from another file or stdin.
fn write_text(builder: ConfigStoreBuilder, source: &Path) -> Result<()> {
    let text = if source == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read {}", source.display()))?
    };

    let store = builder.build();
    if !store.save_text(&text) {
        anyhow::bail!("Failed to write {}", store.config_path().display());
    }

    println!("Wrote {} byte(s) to {}.", text.len(), store.config_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostEnvironment;
    use tempfile::TempDir;

    fn store_with(text: Option<&str>) -> (TempDir, Arc<ConfigStore>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scouter.conf");
        if let Some(text) = text {
            std::fs::write(&path, text).unwrap();
        }
        let store = ConfigStore::builder()
            .config_path(&path)
            .host(HostEnvironment::new("linux", "status-host"))
            .build();
        (dir, store)
    }

    #[test]
    fn status_reports_the_initial_load() {
        let (_dir, store) = store_with(Some("log_keep_days=7\nobj_name=edge\n"));
        let line = status_line(&store);

        assert!(line.contains("entries 2"));
        assert!(line.contains(&store.current().properties.fingerprint()));
        assert!(line.contains("obj_name /edge"));
        assert!(!line.contains("mtime 0 "));
    }

    #[test]
    fn status_of_missing_file_shows_zero_mtime() {
        let (_dir, store) = store_with(None);
        let line = status_line(&store);

        assert!(line.contains("mtime 0 entries 0"));
        assert!(line.contains("obj_name /status-host"));
    }
}
