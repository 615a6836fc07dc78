//! Connection attempts and what the server should answer.

use regex::escape;

use crate::config::Settings;
use crate::connection::connect;
use crate::error::FailureKind;
use crate::harness::{assert_connected, assert_failure};
use crate::params::ConnectParams;
use crate::pool::SimplePool;

/// Password that is never the test role's.
pub const WRONG_PASSWORD: &str = "test_pswd1";

/// Host name that doesn't resolve.
pub const INVALID_HOST: &str = "somehost";

/// Port that parses but isn't a valid port number.
pub const INVALID_PORT: &str = "0000";

/// Expected outcome of a connection attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Expect {
    /// An open connection.
    Connected,
    /// A failure of this kind, with a message matching the pattern.
    Failure { kind: FailureKind, pattern: String },
}

/// A single connection attempt by the test role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Success,
    WrongPassword,
    MissingPassword,
    UnknownUser,
    PaddedUser,
    InvalidHost,
    MissingHost,
    InvalidPort,
    MissingPort,
    InvalidDatabase,
    MissingDatabase,
}

impl Scenario {
    pub const ALL: [Scenario; 11] = [
        Scenario::Success,
        Scenario::WrongPassword,
        Scenario::MissingPassword,
        Scenario::UnknownUser,
        Scenario::PaddedUser,
        Scenario::InvalidHost,
        Scenario::MissingHost,
        Scenario::InvalidPort,
        Scenario::MissingPort,
        Scenario::InvalidDatabase,
        Scenario::MissingDatabase,
    ];

    /// Parameters for this attempt.
    pub fn params(&self, settings: &Settings) -> ConnectParams {
        let params = settings.test_params();

        match self {
            Scenario::Success => params,
            Scenario::WrongPassword => params.password(WRONG_PASSWORD),
            Scenario::MissingPassword => params.password(""),
            Scenario::UnknownUser => params.with_user(&unknown_user(settings)),
            Scenario::PaddedUser => params.with_user(&padded_user(settings)),
            Scenario::InvalidHost => params.host(INVALID_HOST),
            Scenario::MissingHost => params.host(""),
            Scenario::InvalidPort => params.port(INVALID_PORT),
            Scenario::MissingPort => params.without_port(),
            Scenario::InvalidDatabase => params.dbname(&invalid_database(settings)),
            Scenario::MissingDatabase => params.without_dbname(),
        }
    }

    /// What the server (or driver) should answer.
    pub fn expect(&self, settings: &Settings) -> Expect {
        use FailureKind::*;

        let failure = |kind, pattern: String| Expect::Failure { kind, pattern };

        match self {
            Scenario::Success | Scenario::MissingPort => Expect::Connected,
            Scenario::WrongPassword => failure(
                PasswordAuthentication,
                password_failed(&settings.test_user),
            ),
            Scenario::MissingPassword => failure(NoPassword, ".*no password supplied".into()),
            Scenario::UnknownUser => failure(
                PasswordAuthentication,
                password_failed(&unknown_user(settings)),
            ),
            Scenario::PaddedUser => failure(
                PasswordAuthentication,
                password_failed(&padded_user(settings)),
            ),
            Scenario::InvalidHost => failure(
                UnknownHost,
                format!(
                    "could not translate host name \"{}\" to address",
                    escape(INVALID_HOST)
                ),
            ),
            Scenario::MissingHost => failure(
                Unreachable,
                r".*Is the server running locally and accepting connections on that socket\?"
                    .into(),
            ),
            Scenario::InvalidPort => failure(
                InvalidPort,
                format!(".*invalid port number: \"{}\".*", escape(INVALID_PORT)),
            ),
            Scenario::InvalidDatabase => failure(
                UnknownDatabase,
                database_missing(&invalid_database(settings)),
            ),
            Scenario::MissingDatabase => {
                failure(UnknownDatabase, database_missing(&settings.test_user))
            }
        }
    }

    /// Attempt the connection and assert the outcome.
    ///
    /// # Panics
    ///
    /// If the outcome is not the expected one.
    pub async fn verify(&self, settings: &Settings) {
        let result = connect(&self.params(settings)).await;

        match self.expect(settings) {
            Expect::Connected => {
                let conn = assert_connected(result);
                conn.close().await;
            }
            Expect::Failure { kind, pattern } => {
                let err = assert_failure(result, &pattern);
                assert_eq!(err.kind(), kind, "{:?}: {}", self, err);
            }
        }
    }
}

/// Ask for a pool larger than the server's free connection slots
/// and assert it's refused.
///
/// # Panics
///
/// If the pool is created, or fails for another reason.
pub async fn oversized_pool(settings: &Settings) {
    let sizes = settings.pool;
    let result = SimplePool::new(
        sizes.oversized_min,
        sizes.oversized_max,
        settings.test_params(),
    )
    .await;

    let err = assert_failure(result, &slots_reserved());
    assert_eq!(err.kind(), FailureKind::TooManyConnections, "{}", err);
}

/// Create a pool the server can serve, use it up to its maximum
/// and close it.
///
/// # Panics
///
/// If any connection can't be opened or the pool miscounts.
pub async fn small_pool(settings: &Settings) {
    let sizes = settings.pool;
    let pool = match SimplePool::new(sizes.small_min, sizes.small_max, settings.test_params()).await
    {
        Ok(pool) => pool,
        Err(err) => panic!("expected a pool, got: {}", err),
    };

    let state = pool.state();
    assert_eq!(state.idle, sizes.small_min);
    assert_eq!(state.total, sizes.small_min);

    let mut conns = vec![];
    for _ in 0..sizes.small_max {
        let conn = assert_connected(pool.get().await);
        if let Err(err) = conn.ping().await {
            panic!("ping failed: {}", err);
        }
        conns.push(conn);
    }
    assert_eq!(pool.state().checked_out, sizes.small_max);
    assert_failure(pool.get().await, "connection pool exhausted");

    for conn in conns {
        pool.put(conn).await;
    }
    assert_eq!(pool.state().idle, sizes.small_max);

    pool.close_all().await;
    assert_eq!(pool.state().total, 0);
}

/// A role that was never created.
pub fn unknown_user(settings: &Settings) -> String {
    format!("{}1", settings.test_user)
}

/// The test role's name with a trailing space.
pub fn padded_user(settings: &Settings) -> String {
    format!("{} ", settings.test_user)
}

/// A database that doesn't exist.
pub fn invalid_database(settings: &Settings) -> String {
    format!("{}1", settings.dbname)
}

pub fn password_failed(user: &str) -> String {
    format!(
        ".*FATAL:  password authentication failed for user \"{}\".*",
        escape(user)
    )
}

pub fn database_missing(dbname: &str) -> String {
    format!(".*FATAL:  database \"{}\" does not exist", escape(dbname))
}

pub fn login_not_permitted(user: &str) -> String {
    format!(".*FATAL:  role \"{}\" is not permitted to log in", escape(user))
}

/// Matches both current and pre-16 server wording.
pub fn slots_reserved() -> String {
    ".*FATAL:  remaining connection slots are reserved for".into()
}
