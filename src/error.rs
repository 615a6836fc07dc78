//! Connection errors.
//!
//! Messages are worded the way libpq words them, so expectations
//! written against other PostgreSQL clients match ours too.

use std::fmt::Display;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;
use tokio_postgres::error::SqlState;

use crate::params::Target;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid port number: \"{0}\"")]
    InvalidPort(String),

    #[error("could not translate host name \"{host}\" to address: {reason}")]
    UnknownHost { host: String, reason: String },

    #[error("connection to server {endpoint} failed: {reason}{}", .endpoint.hint())]
    Unreachable { endpoint: Endpoint, reason: String },

    #[error("connection to server {endpoint} failed: fe_sendauth: no password supplied")]
    NoPassword { endpoint: Endpoint },

    #[error("connection to server {endpoint} failed: {severity}:  {message}")]
    Server {
        endpoint: Endpoint,
        severity: String,
        code: String,
        message: String,
    },

    #[error("{}", chain(.0))]
    Driver(#[from] tokio_postgres::Error),

    #[error("{0}")]
    Admin(#[from] sqlx::Error),

    #[error("config: {0}")]
    Config(#[from] crate::config::Error),

    #[error("pool minimum ({min}) is larger than its maximum ({max})")]
    PoolSize { min: usize, max: usize },

    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("connection pool is closed")]
    PoolClosed,
}

/// What went wrong, independent of the exact wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Wrong password, or no such role.
    PasswordAuthentication,
    /// Server asked for a password and none was given.
    NoPassword,
    /// Role exists but has NOLOGIN.
    LoginNotPermitted,
    /// Database does not exist.
    UnknownDatabase,
    /// Server is out of connection slots for this role.
    TooManyConnections,
    /// Host name does not resolve.
    UnknownHost,
    /// Port is not a valid port number.
    InvalidPort,
    /// Nothing is listening at the address or socket.
    Unreachable,
    Other,
}

/// The server a connection was attempted against, as libpq prints it.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Tcp {
        host: String,
        addr: Option<IpAddr>,
        port: u16,
    },
    Socket {
        path: PathBuf,
    },
}

impl Endpoint {
    /// Endpoint for a resolved target.
    pub fn new(target: &Target, addr: Option<IpAddr>) -> Self {
        match target {
            Target::Tcp { host, port } => Endpoint::Tcp {
                host: host.clone(),
                // Only shown when it tells the reader something new.
                addr: addr.filter(|addr| addr.to_string() != *host),
                port: *port,
            },
            Target::Socket { .. } => Endpoint::Socket {
                path: target.socket_path().unwrap_or_default(),
            },
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Endpoint::Tcp { .. } => {
                "\n\tIs the server running on that host and accepting TCP/IP connections?"
            }
            Endpoint::Socket { .. } => {
                "\n\tIs the server running locally and accepting connections on that socket?"
            }
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp {
                host,
                addr: Some(addr),
                port,
            } => write!(f, "at \"{}\" ({}), port {}", host, addr, port),
            Endpoint::Tcp {
                host,
                addr: None,
                port,
            } => write!(f, "at \"{}\", port {}", host, port),
            Endpoint::Socket { path } => write!(f, "on socket \"{}\"", path.display()),
        }
    }
}

impl Error {
    /// Translate a driver error raised while connecting to `endpoint`.
    pub fn connect(err: tokio_postgres::Error, endpoint: Endpoint) -> Self {
        if let Some(db) = err.as_db_error() {
            return Error::Server {
                endpoint,
                severity: db.severity().to_string(),
                code: db.code().code().to_string(),
                message: db.message().to_string(),
            };
        }

        // tokio-postgres reports a missing password as a configuration
        // error, with the reason only in its source.
        if chain(&err).contains("password missing") {
            return Error::NoPassword { endpoint };
        }

        let io = std::error::Error::source(&err)
            .and_then(|source| source.downcast_ref::<io::Error>());
        if let Some(io) = io {
            return Error::Unreachable {
                endpoint,
                reason: os_reason(io),
            };
        }

        Error::Driver(err)
    }

    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::InvalidPort(_) => FailureKind::InvalidPort,
            Error::UnknownHost { .. } => FailureKind::UnknownHost,
            Error::Unreachable { .. } => FailureKind::Unreachable,
            Error::NoPassword { .. } => FailureKind::NoPassword,
            Error::Server { code, message, .. } => classify(code, message),
            Error::Driver(err) => match err.as_db_error() {
                Some(db) => classify(db.code().code(), db.message()),
                None => FailureKind::Other,
            },
            _ => FailureKind::Other,
        }
    }

    /// SQLSTATE reported by the server, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Server { code, .. } => Some(code),
            Error::Driver(err) => err.code().map(|code| code.code()),
            _ => None,
        }
    }
}

fn classify(code: &str, message: &str) -> FailureKind {
    if code == SqlState::INVALID_PASSWORD.code() {
        FailureKind::PasswordAuthentication
    } else if code == SqlState::INVALID_CATALOG_NAME.code() {
        FailureKind::UnknownDatabase
    } else if code == SqlState::TOO_MANY_CONNECTIONS.code() {
        FailureKind::TooManyConnections
    } else if code == SqlState::INVALID_AUTHORIZATION_SPECIFICATION.code()
        && message.contains("not permitted to log in")
    {
        FailureKind::LoginNotPermitted
    } else {
        FailureKind::Other
    }
}

/// Error message followed by every cause, joined with ": ".
pub(crate) fn chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_message = cause.to_string();
        // Some errors already print their cause.
        if !message.ends_with(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }

    message
}

/// OS error text without the trailing " (os error N)".
pub(crate) fn os_reason(err: &io::Error) -> String {
    let reason = err.to_string();
    match reason.rfind(" (os error ") {
        Some(idx) => reason[..idx].to_string(),
        None => reason,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tcp() -> Endpoint {
        Endpoint::Tcp {
            host: "localhost".into(),
            addr: Some("127.0.0.1".parse().unwrap()),
            port: 5432,
        }
    }

    fn server(code: &str, message: &str) -> Error {
        Error::Server {
            endpoint: tcp(),
            severity: "FATAL".into(),
            code: code.into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_server_wording() {
        let err = server(
            "28P01",
            "password authentication failed for user \"test_user\"",
        );
        assert_eq!(
            err.to_string(),
            "connection to server at \"localhost\" (127.0.0.1), port 5432 failed: FATAL:  password authentication failed for user \"test_user\""
        );
        assert_eq!(err.kind(), FailureKind::PasswordAuthentication);
        assert_eq!(err.code(), Some("28P01"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            server("3D000", "database \"test_db1\" does not exist").kind(),
            FailureKind::UnknownDatabase
        );
        assert_eq!(
            server(
                "53300",
                "remaining connection slots are reserved for roles with the SUPERUSER attribute"
            )
            .kind(),
            FailureKind::TooManyConnections
        );
        assert_eq!(
            server("28000", "role \"test_user\" is not permitted to log in").kind(),
            FailureKind::LoginNotPermitted
        );
        assert_eq!(
            server("28000", "no pg_hba.conf entry for host").kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn test_endpoint() {
        let target = Target::Tcp {
            host: "127.0.0.1".into(),
            port: 5432,
        };
        let endpoint = Endpoint::new(&target, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(endpoint.to_string(), "at \"127.0.0.1\", port 5432");

        let target = Target::Socket {
            dir: "/tmp".into(),
            port: 5432,
        };
        let endpoint = Endpoint::new(&target, None);
        assert_eq!(endpoint.to_string(), "on socket \"/tmp/.s.PGSQL.5432\"");
    }

    #[test]
    fn test_client_side_wording() {
        let err = Error::NoPassword { endpoint: tcp() };
        assert!(err.to_string().ends_with("fe_sendauth: no password supplied"));
        assert_eq!(err.kind(), FailureKind::NoPassword);

        let err = Error::Unreachable {
            endpoint: Endpoint::Socket {
                path: "/tmp/.s.PGSQL.5432".into(),
            },
            reason: "No such file or directory".into(),
        };
        assert_eq!(
            err.to_string(),
            "connection to server on socket \"/tmp/.s.PGSQL.5432\" failed: No such file or directory\n\tIs the server running locally and accepting connections on that socket?"
        );

        let err = Error::UnknownHost {
            host: "somehost".into(),
            reason: "Name or service not known".into(),
        };
        assert_eq!(err.kind(), FailureKind::UnknownHost);
        assert!(err
            .to_string()
            .starts_with("could not translate host name \"somehost\" to address"));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("invalid configuration")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("password missing")]
    struct Inner;

    #[derive(Debug, thiserror::Error)]
    #[error("invalid configuration: password missing")]
    struct Repeats(#[source] Inner);

    #[test]
    fn test_chain() {
        assert_eq!(chain(&Outer(Inner)), "invalid configuration: password missing");
        assert_eq!(
            chain(&Repeats(Inner)),
            "invalid configuration: password missing"
        );
        assert_eq!(chain(&Inner), "password missing");
    }

    #[test]
    fn test_os_reason() {
        let err = io::Error::from_raw_os_error(2);
        assert!(!os_reason(&err).contains("os error"));
    }
}
