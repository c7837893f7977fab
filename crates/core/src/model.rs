use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default database host.
pub const LOCALHOST: &str = "127.0.0.1";
/// Default MongoDB port.
pub const DEFAULT_PORT: u16 = 27017;
/// Default dump interval string.
pub const DEFAULT_INTERVAL: &str = "12h";
/// Default connect / server-selection timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// One database record: field name to JSON value, in the order the server returned it.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// All documents fetched from one collection during one tick.
pub type Snapshot = Vec<Document>;

/// Connection parameters for the document database.
///
/// Immutable once a worker starts; only used to open a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MongoConfig {
    /// Server address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database holding the collections to dump.
    #[serde(default)]
    pub database: String,
    /// Whether `login`/`password` go into the connection string.
    #[serde(default)]
    pub auth: bool,
    /// Username.
    #[serde(default)]
    pub login: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Connect and server-selection timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    LOCALHOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: String::new(),
            auth: false,
            login: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MongoConfig {
    /// Builds `mongodb://[login:password@]host:port/database`.
    pub fn connection_url(&self) -> String {
        if self.auth {
            format!(
                "mongodb://{}:{}@{}:{}/{}",
                self.login, self.password, self.host, self.port, self.database
            )
        } else {
            format!("mongodb://{}:{}/{}", self.host, self.port, self.database)
        }
    }

    /// Session timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fully resolved settings for one `mgosd` run.
///
/// Built once at startup and handed to the supervisor; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumperConfig {
    /// Collections to dump, one worker each.
    pub collections: Vec<String>,
    /// Parsed dump interval.
    pub interval: Duration,
    /// Root of the snapshot tree.
    pub output: PathBuf,
    /// Database connection parameters.
    pub db: MongoConfig,
}
