//! pglogin, authentication and connection pool checks
//! for PostgreSQL-compatible servers.

pub mod config;
pub mod connection;
pub mod error;
pub mod harness;
pub mod params;
pub mod pool;
pub mod role;
pub mod scenario;

pub use config::{settings, Settings};
pub use connection::{connect, Connection};
pub use error::{Error, FailureKind};
pub use params::ConnectParams;
pub use pool::SimplePool;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use std::io::IsTerminal;

/// Setup the logger, so `info!`, `debug!`
/// and other macros actually output something.
///
/// Using try_init and ignoring errors to allow
/// for use in tests (setting up multiple times).
pub fn logger() {
    let format = fmt::layer()
        .with_ansi(std::io::stderr().is_terminal())
        .with_file(false)
        .with_test_writer();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .try_init();
}
