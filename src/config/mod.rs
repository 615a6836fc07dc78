//! Configuration.

pub mod error;
pub mod overrides;

pub use error::Error;
pub use overrides::Overrides;

use std::env::var;
use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::params::ConnectParams;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "pglogin.toml";

/// Load settings from `PGLOGIN_CONFIG` (or `pglogin.toml`)
/// and apply `PGLOGIN_*` overrides.
pub fn settings() -> Result<Settings, Error> {
    let path = var("PGLOGIN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut settings = Settings::load(&path)?;
    settings.apply(Overrides::from_env());
    Ok(settings)
}

/// pglogin.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Server host. Empty string means the local Unix socket.
    pub host: String,
    /// Server port, kept as text so invalid values reach the driver literally.
    pub port: String,
    /// Database the test role connects to.
    pub dbname: String,
    /// Privileged role used to create and drop the test role.
    pub root_user: String,
    /// Password of the privileged role.
    pub root_password: String,
    /// Name of the scoped test role.
    pub test_user: String,
    /// Password of the scoped test role.
    pub test_password: String,
    /// Directory holding the server's Unix socket.
    pub socket_dir: PathBuf,
    /// Pool sizes used by the pool checks.
    pub pool: PoolSizes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: "5432".into(),
            dbname: "test_db".into(),
            root_user: "sbt".into(),
            root_password: "test_pswd".into(),
            test_user: "test_user".into(),
            test_password: "test_pswd2024".into(),
            socket_dir: PathBuf::from(crate::params::DEFAULT_SOCKET_DIR),
            pool: PoolSizes::default(),
        }
    }
}

/// Minimum and maximum pool sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSizes {
    /// Minimum of a pool the server can serve.
    pub small_min: usize,
    /// Maximum of a pool the server can serve.
    pub small_max: usize,
    /// Minimum of a pool larger than the server's free connection slots.
    pub oversized_min: usize,
    /// Maximum of that pool.
    pub oversized_max: usize,
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self {
            small_min: 5,
            small_max: 10,
            oversized_min: 100,
            oversized_max: 110,
        }
    }
}

impl Settings {
    /// Load configuration from disk or use defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        match read_to_string(path) {
            Ok(source) => {
                let settings = Self::parse(&source)?;
                info!("loaded \"{}\"", path.display());
                Ok(settings)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "\"{}\" doesn't exist, loading defaults instead",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parse settings from TOML text.
    pub fn parse(source: &str) -> Result<Self, Error> {
        toml::from_str(source).map_err(|err| Error::config(source, err))
    }

    /// Apply environment overrides.
    pub fn apply(&mut self, overrides: Overrides) {
        let Overrides {
            host,
            port,
            dbname,
            root_user,
            root_password,
            test_user,
            test_password,
            socket_dir,
        } = overrides;

        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(dbname) = dbname {
            self.dbname = dbname;
        }
        if let Some(root_user) = root_user {
            self.root_user = root_user;
        }
        if let Some(root_password) = root_password {
            self.root_password = root_password;
        }
        if let Some(test_user) = test_user {
            self.test_user = test_user;
        }
        if let Some(test_password) = test_password {
            self.test_password = test_password;
        }
        if let Some(socket_dir) = socket_dir {
            self.socket_dir = PathBuf::from(socket_dir);
        }
    }

    /// Parameters for the privileged role.
    pub fn root_params(&self) -> ConnectParams {
        self.params_for(&self.root_user, &self.root_password)
    }

    /// Parameters for the scoped test role.
    pub fn test_params(&self) -> ConnectParams {
        self.params_for(&self.test_user, &self.test_password)
    }

    fn params_for(&self, user: &str, password: &str) -> ConnectParams {
        ConnectParams::new(user)
            .host(&self.host)
            .port(&self.port)
            .dbname(&self.dbname)
            .password(password)
            .socket_dir(&self.socket_dir)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.test_user, "test_user");
        assert_eq!(settings.port, "5432");
        assert_eq!(settings.pool.oversized_min, 100);
    }

    #[test]
    fn test_parse() {
        let settings = Settings::parse(
            r#"
host = "127.0.0.1"
port = "5433"
test_user = "alice"

[pool]
oversized_min = 250
oversized_max = 260
"#,
        )
        .unwrap();

        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, "5433");
        assert_eq!(settings.test_user, "alice");
        assert_eq!(settings.dbname, "test_db");
        assert_eq!(settings.pool.oversized_min, 250);
        assert_eq!(settings.pool.small_min, 5);
    }

    #[test]
    fn test_unknown_field() {
        let err = Settings::parse("hots = \"localhost\"\n").unwrap_err();
        assert!(matches!(err, Error::Syntax(..)));
    }

    #[test]
    fn test_missing_file() {
        let settings = Settings::load(Path::new("/nonexistent/pglogin.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_overrides() {
        let env = HashMap::from([
            ("PGLOGIN_HOST", "db.internal"),
            ("PGLOGIN_TEST_PASSWORD", "hunter2"),
        ]);
        let overrides = Overrides::from_lookup(|name| env.get(name).map(|v| v.to_string()));

        let mut settings = Settings::default();
        settings.apply(overrides);

        assert_eq!(settings.host, "db.internal");
        assert_eq!(settings.test_password, "hunter2");
        assert_eq!(settings.root_user, "sbt");
    }

    #[test]
    fn test_role_params() {
        let settings = Settings::default();
        let root = settings.root_params();
        let test = settings.test_params();

        assert_eq!(root.user(), "sbt");
        assert_eq!(test.user(), "test_user");
        assert_eq!(test.dbname_or_user(), "test_db");
        assert_eq!(test.password_value(), Some("test_pswd2024"));
    }
}
