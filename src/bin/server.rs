//! easyfind-server: HTTP server for the EasyFind demo marketplace.
//!
//! Usage:
//!   easyfind-server [--port 6000] [--bind 0.0.0.0] [--db path/to/db.json] [--config path]
//!
//! Environment variables:
//!   PORT          - Port to listen on (default: 6000)
//!   EASYFIND_BIND - Address to bind (default: 0.0.0.0)
//!   EASYFIND_DB   - Path to a db.json document (default: bundled demo data)
//!   RUST_LOG      - tracing filter (default: easyfind=info)

use anyhow::Result;
use easyfind::config::Config;
use easyfind::{logging, server};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(1);
        }
    };
    // Before overrides, so invalid values get logged
    logging::init(&config.log_filter);
    apply_overrides(&mut config, &args);

    tracing::info!(
        port = config.port,
        bind = %config.bind,
        db = config.db_path.as_deref().unwrap_or("bundled demo"),
        "easyfind-server starting"
    );

    if let Err(e) = server::run(config).await {
        tracing::error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

fn load_config(args: &[String]) -> Result<Config> {
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].clone());
    match config_path {
        Some(path) => Config::load_from(Path::new(&path)),
        None => Config::load(),
    }
}

fn apply_overrides(config: &mut Config, args: &[String]) {
    // Environment variable overrides
    config.apply_env();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.set_port(&args[i + 1], "--port");
                i += 2;
            }
            "--bind" if i + 1 < args.len() => {
                config.bind = args[i + 1].clone();
                i += 2;
            }
            "--db" if i + 1 < args.len() => {
                config.db_path = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
}
