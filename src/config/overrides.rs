use std::env::var;

/// Settings taken from the environment, applied on top of the configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<String>,
    pub dbname: Option<String>,
    pub root_user: Option<String>,
    pub root_password: Option<String>,
    pub test_user: Option<String>,
    pub test_password: Option<String>,
    pub socket_dir: Option<String>,
}

impl Overrides {
    /// Read `PGLOGIN_*` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| var(name).ok())
    }

    /// Read overrides through an arbitrary lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("PGLOGIN_HOST"),
            port: lookup("PGLOGIN_PORT"),
            dbname: lookup("PGLOGIN_DBNAME"),
            root_user: lookup("PGLOGIN_ROOT_USER"),
            root_password: lookup("PGLOGIN_ROOT_PASSWORD"),
            test_user: lookup("PGLOGIN_TEST_USER"),
            test_password: lookup("PGLOGIN_TEST_PASSWORD"),
            socket_dir: lookup("PGLOGIN_SOCKET_DIR"),
        }
    }
}
