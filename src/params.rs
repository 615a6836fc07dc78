//! Connection parameters and how they resolve to a server address.
//!
//! Values are kept as the caller wrote them and only interpreted
//! when a connection is attempted, the same way libpq treats a
//! connection string.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Port used when none is given.
pub const DEFAULT_PORT: u16 = 5432;

/// Where the server's Unix socket lives when no host is given.
pub const DEFAULT_SOCKET_DIR: &str = "/var/run/postgresql";

/// Connection parameters: host, port, database, user and password.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectParams {
    host: String,
    port: Option<String>,
    dbname: Option<String>,
    user: String,
    password: Option<String>,
    socket_dir: PathBuf,
}

/// Where a connection goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// TCP host name or address.
    Tcp { host: String, port: u16 },
    /// Unix socket directory.
    Socket { dir: PathBuf, port: u16 },
}

impl Target {
    /// Port number.
    pub fn port(&self) -> u16 {
        match self {
            Target::Tcp { port, .. } => *port,
            Target::Socket { port, .. } => *port,
        }
    }

    /// Full path of the socket file, e.g. `/tmp/.s.PGSQL.5432`.
    pub fn socket_path(&self) -> Option<PathBuf> {
        match self {
            Target::Socket { dir, port } => Some(dir.join(format!(".s.PGSQL.{}", port))),
            Target::Tcp { .. } => None,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Target::Socket { .. } => {
                let path = self.socket_path().unwrap_or_default();
                write!(f, "{}", path.display())
            }
        }
    }
}

impl ConnectParams {
    /// Parameters for `user`, everything else at its default.
    pub fn new(user: &str) -> Self {
        Self {
            host: String::new(),
            port: None,
            dbname: None,
            user: user.to_string(),
            password: None,
            socket_dir: PathBuf::from(DEFAULT_SOCKET_DIR),
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: &str) -> Self {
        self.port = Some(port.to_string());
        self
    }

    pub fn without_port(mut self) -> Self {
        self.port = None;
        self
    }

    pub fn dbname(mut self, dbname: &str) -> Self {
        self.dbname = Some(dbname.to_string());
        self
    }

    pub fn without_dbname(mut self) -> Self {
        self.dbname = None;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn socket_dir(mut self, dir: &Path) -> Self {
        self.socket_dir = dir.to_path_buf();
        self
    }

    /// Database to connect to. Defaults to the user name.
    pub fn dbname_or_user(&self) -> &str {
        self.dbname.as_deref().unwrap_or(&self.user)
    }

    /// Password, if one was supplied. An empty password counts as none.
    pub fn password_value(&self) -> Option<&str> {
        self.password.as_deref().filter(|password| !password.is_empty())
    }

    /// Port number. Must be between 1 and 65535.
    pub fn port_number(&self) -> Result<u16, Error> {
        let Some(ref port) = self.port else {
            return Ok(DEFAULT_PORT);
        };

        match port.trim().parse::<i64>() {
            Ok(number) if (1..=65535).contains(&number) => Ok(number as u16),
            _ => Err(Error::InvalidPort(port.clone())),
        }
    }

    /// Resolve where this connection should go.
    pub fn target(&self) -> Result<Target, Error> {
        let port = self.port_number()?;

        let target = if self.host.is_empty() {
            Target::Socket {
                dir: self.socket_dir.clone(),
                port,
            }
        } else if self.host.starts_with('/') {
            Target::Socket {
                dir: PathBuf::from(&self.host),
                port,
            }
        } else {
            Target::Tcp {
                host: self.host.clone(),
                port,
            }
        };

        Ok(target)
    }

    /// Driver configuration for the given target.
    pub fn config(&self, target: &Target) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .user(self.user())
            .dbname(self.dbname_or_user())
            .port(target.port())
            .application_name("pglogin");

        match target {
            Target::Tcp { host, .. } => config.host(host.as_str()),
            Target::Socket { dir, .. } => config.host(&*dir.to_string_lossy()),
        };

        if let Some(password) = self.password_value() {
            config.password(password);
        }

        config
    }
}
