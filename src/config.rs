//! Client configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{NowdbError, Result};
use crate::native::client::DEFAULT_CLIENT_LIBRARY;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 55505;

/// Session encoding requested at connect time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Binary in the library's native byte order.
    #[default]
    Binary,
    Text,
    LittleEndian,
    BigEndian,
}

impl Encoding {
    /// Value of the `flags` argument of `nowdb_connect`.
    pub fn flags(self) -> i32 {
        match self {
            Encoding::Binary => 0,
            Encoding::Text => 1,
            Encoding::LittleEndian => 2,
            Encoding::BigEndian => 4,
        }
    }
}

/// Everything needed to open a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Path or file name of `libnowdbclient.so`
    pub library: PathBuf,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Database selected with `use` right after connecting
    pub database: Option<String>,
    pub encoding: Encoding,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            library: PathBuf::from(DEFAULT_CLIENT_LIBRARY),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: None,
            password: None,
            database: None,
            encoding: Encoding::Binary,
        }
    }
}

impl ClientConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Self::default()
        }
    }

    pub fn library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = path.into();
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Parse `nowdb://[user[:password]@]host[:port][/database]`.
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("nowdb://")
            .ok_or_else(|| NowdbError::Config(format!("Unsupported URL scheme: {url}")))?;

        let mut config = Self::default();

        let (authority, database) = match rest.split_once('/') {
            Some((a, db)) => (a, Some(db)),
            None => (rest, None),
        };
        if let Some(db) = database.filter(|db| !db.is_empty()) {
            config.database = Some(db.to_string());
        }

        let host_port = match authority.rsplit_once('@') {
            Some((credentials, host_port)) => {
                match credentials.split_once(':') {
                    Some((user, password)) => {
                        config.user = Some(user.to_string());
                        config.password = Some(password.to_string());
                    }
                    None => config.user = Some(credentials.to_string()),
                }
                host_port
            }
            None => authority,
        };

        match host_port.rsplit_once(':') {
            Some((host, port)) => {
                config.port = parse_port(port)?;
                if !host.is_empty() {
                    config.host = host.to_string();
                }
            }
            None if !host_port.is_empty() => config.host = host_port.to_string(),
            None => {}
        }

        Ok(config)
    }

    /// Read `NOWDB_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(library) = std::env::var("NOWDB_LIBRARY") {
            config.library = PathBuf::from(library);
        }
        if let Ok(host) = std::env::var("NOWDB_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("NOWDB_PORT") {
            config.port = parse_port(&port)?;
        }
        config.user = std::env::var("NOWDB_USER").ok();
        config.password = std::env::var("NOWDB_PASSWORD").ok();
        config.database = std::env::var("NOWDB_DATABASE").ok();
        Ok(config)
    }
}

/// Parse a port or service number.
pub fn parse_port(s: &str) -> Result<u16> {
    s.trim()
        .parse::<u16>()
        .map_err(|_| NowdbError::Config(format!("invalid port: {s}")))
}
