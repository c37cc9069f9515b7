//! Server configuration.
//!
//! Precedence, lowest first: built-in defaults, TOML file, environment,
//! command-line flags.

use crate::models::Database;
use crate::store;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to a `db.json` document (supports ~ expansion).
    /// The bundled demo document is used when unset.
    #[serde(default)]
    pub db_path: Option<String>,

    /// Default `tracing` filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    6000
}

fn default_log_filter() -> String {
    "easyfind=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            db_path: None,
            log_filter: default_log_filter(),
        }
    }
}

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".easyfind")
        .join("config.toml")
}

impl Config {
    /// Load from an explicit TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `PORT`, `EASYFIND_BIND` and `EASYFIND_DB` overrides
    pub fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            self.set_port(&port, "PORT");
        }

        if let Ok(bind) = std::env::var("EASYFIND_BIND") {
            self.bind = bind;
        }

        if let Ok(db) = std::env::var("EASYFIND_DB") {
            self.db_path = Some(db);
        }
    }

    /// Set the port from text; an invalid value is logged and ignored
    pub fn set_port(&mut self, value: &str, source: &str) -> bool {
        match value.trim().parse() {
            Ok(port) => {
                self.port = port;
                true
            }
            Err(e) => {
                tracing::warn!(value, source, error = %e, "ignoring invalid port");
                false
            }
        }
    }

    /// Expand ~ in db_path
    pub fn resolve_db_path(&self) -> Option<PathBuf> {
        self.db_path.as_ref().map(|p| {
            if let Some(rest) = p.strip_prefix("~/") {
                if let Some(home) = dirs::home_dir() {
                    return home.join(rest);
                }
            }
            PathBuf::from(p)
        })
    }

    /// The document the store starts from
    pub fn load_database(&self) -> Result<Database> {
        match self.resolve_db_path() {
            Some(path) => store::load_database(&path),
            None => Ok(store::demo_database()),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
