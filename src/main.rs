//! modhost - HTTP host for pluggable feature modules
//!
//! Usage:
//!   modhost [--config <path>] [--listen <addr>] [--log-filter <filter>] [serve]
//!   modhost modules
//!   modhost check-config

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use modhost::config::{HostConfig, LoggingConfig};
use modhost::modules::{builtin_catalog, builtin_surfaces};
use modhost::utils::init_logging_from_config;

#[derive(Parser, Debug)]
#[command(name = "modhost", version, about = "HTTP host for pluggable feature modules")]
struct Args {
    /// Configuration file (TOML, or JSON by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Listening address, overrides config and environment
    #[arg(long, global = true)]
    listen: Option<SocketAddr>,

    /// Log filter, e.g. "debug" or "modhost=debug"
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Load modules and serve HTTP (default)
    Serve,
    /// List the module catalog
    Modules,
    /// Validate configuration and exit
    CheckConfig,
}

fn load_config(args: &Args) -> anyhow::Result<HostConfig> {
    let mut config = match &args.config {
        Some(path) => HostConfig::from_file(path)?,
        None => HostConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(addr) = args.listen {
        config.http.listen_addr = addr;
    }
    if let Some(filter) = &args.log_filter {
        config
            .logging
            .get_or_insert_with(LoggingConfig::default)
            .filter = Some(filter.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let catalog = builtin_catalog()?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            init_logging_from_config(config.logging.as_ref());
            info!("modhost {} starting", env!("CARGO_PKG_VERSION"));
            modhost::host::run(config, catalog, builtin_surfaces()).await
        }
        Command::Modules => {
            for descriptor in catalog.descriptors() {
                println!(
                    "{:<16} {:<24} {}",
                    descriptor.name,
                    descriptor.base_path,
                    descriptor.capabilities.names().join(",")
                );
            }
            Ok(())
        }
        Command::CheckConfig => {
            config.validate()?;
            for name in &config.modules.enabled_modules {
                if !catalog.contains(name) {
                    anyhow::bail!("enabled module {} is not in the catalog", name);
                }
            }
            println!("configuration ok");
            Ok(())
        }
    }
}
