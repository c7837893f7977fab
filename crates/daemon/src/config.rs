//! Command-line flags, the optional JSON config file, and how they merge.
//!
//! Precedence: built-in defaults, then the config file, then flags given explicitly.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use mgosd_core::model::{DEFAULT_INTERVAL, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, LOCALHOST};
use mgosd_core::{default_output_dir, parse_interval, DumpError, DumperConfig, MongoConfig};
use serde::Deserialize;

/// Flags accepted by the `mgosd` binary.
#[derive(Debug, Parser)]
#[command(name = "mgosd", version, about = "Periodic JSON snapshots of MongoDB collections")]
pub struct Cli {
    /// Collections to dump. Replaces `collections` from the config file when given.
    pub collections: Vec<String>,

    /// JSON config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database name.
    #[arg(long)]
    pub db: Option<String>,

    /// Database server address [default: 127.0.0.1]
    #[arg(long)]
    pub host: Option<String>,

    /// Database server port [default: 27017]
    #[arg(long)]
    pub port: Option<u16>,

    /// Database username. Enables authentication.
    #[arg(long)]
    pub login: Option<String>,

    /// Database user password. Enables authentication.
    #[arg(long)]
    pub password: Option<String>,

    /// Connect and server-selection timeout in seconds [default: 10]
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Output directory [default: ~/mgosd/]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Dump interval: integer plus h, m or s, e.g. 12h [default: 12h]
    #[arg(short, long)]
    pub interval: Option<String>,

    /// Log level (env-filter syntax). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    pub log: String,
}

/// Shape of the JSON config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Collections to dump.
    #[serde(default)]
    pub collections: Option<Vec<String>>,
    /// Dump interval, same syntax as `--interval`.
    #[serde(default)]
    pub interval: Option<String>,
    /// Output directory.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Connection settings.
    #[serde(default)]
    pub db: DbSection,
}

/// `db` object of the config file.
#[derive(Debug, Default, Deserialize)]
pub struct DbSection {
    /// Server address.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
    /// Database name.
    pub database: Option<String>,
    /// Username.
    pub login: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Force authentication even without credentials.
    pub auth: Option<bool>,
    /// Connect and server-selection timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Reads and parses a config file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let cfg: ConfigFile = serde_json::from_str(&s)
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(cfg)
    }
}

/// Loads the config file named by `--config` (if any) and merges it with `cli`.
pub fn resolve(cli: &Cli) -> anyhow::Result<DumperConfig> {
    let file = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::default(),
    };
    let config = merge(file, cli)?;
    Ok(config)
}

/// Merges a parsed config file with explicit flags.
pub fn merge(file: ConfigFile, cli: &Cli) -> Result<DumperConfig, DumpError> {
    let db = file.db;

    let login = cli.login.clone().or(db.login).unwrap_or_default();
    let password = cli.password.clone().or(db.password).unwrap_or_default();
    let auth = db.auth.unwrap_or(false) || !login.is_empty() || !password.is_empty();

    let db = MongoConfig {
        host: cli
            .host
            .clone()
            .or(db.host)
            .unwrap_or_else(|| LOCALHOST.to_string()),
        port: cli.port.or(db.port).unwrap_or(DEFAULT_PORT),
        database: cli.db.clone().or(db.database).unwrap_or_default(),
        auth,
        login,
        password,
        timeout_secs: cli
            .timeout_secs
            .or(db.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    };
    if db.database.is_empty() {
        return Err(DumpError::Config(
            "database name is required (--db or db.database)".into(),
        ));
    }

    let listed = if cli.collections.is_empty() {
        file.collections.unwrap_or_default()
    } else {
        cli.collections.clone()
    };
    let mut collections: Vec<String> = Vec::with_capacity(listed.len());
    for name in listed {
        if !collections.contains(&name) {
            collections.push(name);
        }
    }

    let raw_interval = cli
        .interval
        .clone()
        .or(file.interval)
        .unwrap_or_else(|| DEFAULT_INTERVAL.to_string());
    let interval = parse_interval(&raw_interval)?;

    let output = cli
        .output
        .clone()
        .or(file.output)
        .unwrap_or_else(default_output_dir);

    Ok(DumperConfig {
        collections,
        interval,
        output,
        db,
    })
}
