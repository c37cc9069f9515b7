//! Command-line interface.

use crate::auth;
use crate::client::{RemoteClient, RemoteLogin};
use crate::config::Config;
use crate::dashboard::provider::SNAPSHOT_FILE_NAME;
use crate::server;
use crate::store::Store;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// EasyFind - find and book local service providers
#[derive(Debug, Parser)]
#[command(name = "easyfind", version, about = "EasyFind demo marketplace")]
pub struct Args {
    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "EASYFIND_DB",
        help = "Path to a db.json document (bundled demo data when unset)"
    )]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        #[arg(long, help = "Port to listen on")]
        port: Option<u16>,

        #[arg(long, help = "Address to bind")]
        bind: Option<String>,
    },

    /// Check a set of credentials
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "EASYFIND_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, default_value = "user", help = "Role to log in as (user, provider, admin)")]
        role: String,

        #[arg(long, help = "Ask a running server instead of the local document")]
        server: Option<String>,
    },

    /// List the demo accounts
    DemoUsers,

    /// Write the store document as JSON
    Snapshot {
        #[arg(long, help = "Output file (stdout when unset)")]
        out: Option<PathBuf>,
    },
}

impl Args {
    /// Resolve configuration: file, then environment, then flags
    pub fn load_config(&self) -> Result<Config> {
        let mut cfg = self.load_config_file()?;
        self.apply_overrides(&mut cfg);
        Ok(cfg)
    }

    /// `--config`, or the default location
    pub fn load_config_file(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    /// Environment, then flags
    pub fn apply_overrides(&self, cfg: &mut Config) {
        cfg.apply_env();
        if let Some(db) = &self.db {
            cfg.db_path = Some(db.clone());
        }
        if let Command::Serve { port, bind } = &self.command {
            if let Some(port) = port {
                cfg.port = *port;
            }
            if let Some(bind) = bind {
                cfg.bind = bind.clone();
            }
        }
    }
}

/// Dispatch a parsed command line
pub fn run(args: Args, cfg: Config) -> Result<()> {
    match args.command {
        Command::Serve { .. } => serve(cfg),
        Command::Login {
            email,
            password,
            role,
            server,
        } => match server {
            Some(url) => login_remote(&url, &email, &password, &role),
            None => login_local(&cfg, &email, &password, &role),
        },
        Command::DemoUsers => demo_users(&cfg),
        Command::Snapshot { out } => snapshot(&cfg, out),
    }
}

fn serve(cfg: Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    rt.block_on(server::run(cfg))
}

fn login_local(cfg: &Config, email: &str, password: &str, role: &str) -> Result<()> {
    let db = cfg.load_database()?;
    match auth::attempt_login(&db.users, email, password, role) {
        Ok(user) => {
            println!(
                "Logged in as {} ({}), landing on {}",
                user.name,
                user.role,
                auth::landing_path(user.role)
            );
            Ok(())
        }
        Err(e) => Err(anyhow!("{} ({})", e, e.reason())),
    }
}

fn login_remote(url: &str, email: &str, password: &str, role: &str) -> Result<()> {
    let client = RemoteClient::new(url)?;
    match client.login(email, password, role)? {
        RemoteLogin::Ok(logged) => {
            println!(
                "Logged in as {} ({}), landing on {}",
                logged.name, logged.role, logged.redirect
            );
            println!("Session token: {}", logged.token);
            Ok(())
        }
        RemoteLogin::Refused { reason, message } => Err(anyhow!("{} ({})", message, reason)),
    }
}

fn demo_users(cfg: &Config) -> Result<()> {
    let db = cfg.load_database()?;
    for cred in auth::demo_credentials(&db.users) {
        println!("{:<28} {:<28} {}", cred.label, cred.email, cred.password);
    }
    Ok(())
}

fn snapshot(cfg: &Config, out: Option<PathBuf>) -> Result<()> {
    let store = Store::new(cfg.load_database()?);
    let json = store.snapshot_json()?;
    match out {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(SNAPSHOT_FILE_NAME)
            } else {
                path
            };
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Snapshot written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_parse_login() {
        let args = Args::parse_from([
            "easyfind",
            "login",
            "--email",
            "amit.user@gmail.com",
            "--password",
            "123456",
        ]);
        match args.command {
            Command::Login { email, role, server, .. } => {
                assert_eq!(email, "amit.user@gmail.com");
                assert_eq!(role, "user");
                assert!(server.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_serve_flags_override_config() {
        std::env::remove_var("PORT");
        std::env::remove_var("EASYFIND_BIND");
        std::env::remove_var("EASYFIND_DB");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 7000\nbind = \"127.0.0.1\"\n").unwrap();

        let args = Args::parse_from([
            "easyfind",
            "--config",
            path.to_str().unwrap(),
            "serve",
            "--port",
            "7100",
        ]);
        let cfg = args.load_config().unwrap();
        assert_eq!(cfg.port, 7100);
        assert_eq!(cfg.bind, "127.0.0.1");
    }

    #[test]
    #[serial]
    fn test_login_local_against_demo_data() {
        std::env::remove_var("EASYFIND_DB");
        let cfg = Config::default();
        assert!(login_local(&cfg, "admin@easyfind.com", "admin123", "admin").is_ok());

        let err = login_local(&cfg, "admin@easyfind.com", "admin123", "user").unwrap_err();
        assert!(err.to_string().contains("role-mismatch"));
    }

    #[test]
    fn test_snapshot_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        snapshot(&Config::default(), Some(dir.path().to_path_buf())).unwrap();
        let written = std::fs::read_to_string(dir.path().join(SNAPSHOT_FILE_NAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["users"].as_array().unwrap().len(), 6);
    }
}
