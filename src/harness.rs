//! Per-test role lifecycle and outcome assertions.

use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};

use futures_util::FutureExt;
use regex::Regex;
use tracing::error;

use crate::config::Settings;
use crate::connection::Connection;
use crate::error::Error;
use crate::role::Admin;

/// Create the test role, dropping a leftover one first.
pub async fn setup(settings: &Settings) -> Result<(), Error> {
    let mut admin = Admin::connect(settings).await?;
    admin.drop_user(&settings.test_user).await?;
    admin
        .create_user(&settings.test_user, &settings.test_password)
        .await?;
    admin.close().await
}

/// Drop the test role.
pub async fn teardown(settings: &Settings) -> Result<(), Error> {
    let mut admin = Admin::connect(settings).await?;
    admin.drop_user(&settings.test_user).await?;
    admin.close().await
}

/// Take away the test role's permission to log in.
pub async fn disable_login(settings: &Settings) -> Result<(), Error> {
    let mut admin = Admin::connect(settings).await?;
    admin.disable_login(&settings.test_user).await?;
    admin.close().await
}

/// Run `body` between [`setup`] and [`teardown`].
///
/// The role is dropped even if `body` panics; the panic
/// is raised again afterwards.
pub async fn run<F, Fut>(settings: Settings, body: F) -> Result<(), Error>
where
    F: FnOnce(Settings) -> Fut,
    Fut: Future<Output = ()>,
{
    crate::logger();

    setup(&settings).await?;
    let outcome = AssertUnwindSafe(body(settings.clone()))
        .catch_unwind()
        .await;
    let cleanup = teardown(&settings).await;

    if let Err(panic) = outcome {
        if let Err(err) = cleanup {
            error!("teardown failed: {}", err);
        }
        resume_unwind(panic);
    }

    cleanup
}

/// Assert the connection was opened and is not closed.
///
/// # Panics
///
/// If connecting failed or the connection is already closed.
pub fn assert_connected(result: Result<Connection, Error>) -> Connection {
    match result {
        Ok(conn) => {
            assert!(!conn.is_closed(), "connection is closed");
            conn
        }
        Err(err) => panic!("expected a connection, got: {}", err),
    }
}

/// Assert the attempt failed with a message matching `pattern`.
///
/// # Panics
///
/// If the attempt succeeded, `pattern` is not a valid regex,
/// or the message doesn't match.
pub fn assert_failure<T>(result: Result<T, Error>, pattern: &str) -> Error {
    let err = match result {
        Ok(_) => panic!("expected failure matching /{}/, but it succeeded", pattern),
        Err(err) => err,
    };

    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(regex_err) => panic!("bad pattern /{}/: {}", pattern, regex_err),
    };

    let message = err.to_string();
    assert!(
        regex.is_match(&message),
        "\"{}\" does not match /{}/",
        message,
        pattern
    );

    err
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_assert_failure() {
        let result: Result<(), Error> = Err(Error::InvalidPort("0000".into()));
        let err = assert_failure(result, r#".*invalid port number: "0000".*"#);
        assert!(matches!(err, Error::InvalidPort(_)));
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_assert_failure_mismatch() {
        let result: Result<(), Error> = Err(Error::PoolExhausted);
        assert_failure(result, "no password supplied");
    }

    #[test]
    #[should_panic(expected = "but it succeeded")]
    fn test_assert_failure_success() {
        assert_failure(Ok::<(), Error>(()), "anything");
    }

    #[test]
    #[should_panic(expected = "expected a connection")]
    fn test_assert_connected_error() {
        assert_connected(Err(Error::PoolClosed));
    }
}
