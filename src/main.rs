//! Poolstats - in-memory quantile service
//!
//! Entry point for the HTTP server.

use anyhow::Result;
use poolstats::config::AppConfig;
use poolstats::server::{self, AppState};
use poolstats::PoolStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("poolstats=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut port: Option<u16> = std::env::var("PORT").ok().and_then(|p| p.parse().ok());
    let mut bind_addr: Option<String> = None;
    let mut write_config = false;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-v" => {
                println!("poolstats {}", poolstats::VERSION);
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --config requires a path");
                    return Ok(());
                }
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
                continue;
            }
            "--port" | "-p" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --port requires a value");
                    return Ok(());
                }
                port = args[i + 1].parse().ok();
                if port.is_none() {
                    eprintln!("Error: Invalid port: {}", args[i + 1]);
                    return Ok(());
                }
                i += 2;
                continue;
            }
            "--bind" | "-b" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --bind requires an address");
                    return Ok(());
                }
                bind_addr = Some(args[i + 1].clone());
                i += 2;
                continue;
            }
            "--write-config" => {
                write_config = true;
                i += 1;
                continue;
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                return Ok(());
            }
        }
    }

    let config_path = config_path.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path);
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind_addr) = bind_addr {
        config.bind_addr = bind_addr;
    }

    if write_config {
        config.save(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    info!("Starting Poolstats v{}", poolstats::VERSION);

    let pools = Arc::new(PoolStore::new());
    let state = AppState::new(Arc::clone(&pools), config.server_config());

    server::start_server(state).await?;

    info!(pools = pools.pool_count(), "Discarding pool store");
    Ok(())
}

fn print_help() {
    println!("Usage: poolstats [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>   Config file (default: <config_dir>/poolstats/config.json)");
    println!("  -p, --port <PORT>     Port to listen on (overrides config and $PORT)");
    println!("  -b, --bind <ADDR>     Address to bind (overrides config)");
    println!("      --write-config    Save the effective config to the config path and exit");
    println!("  -v, --version         Print version and exit");
    println!("  -h, --help            Print this help and exit");
    println!();
    println!("Environment:");
    println!("  PORT                  Port to listen on");
    println!("  RUST_LOG              Log filter (default: poolstats=info)");
}
