//! Privileged role administration.

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection};
use tracing::info;

use crate::config::Settings;
use crate::error::Error;
use crate::params::Target;

/// Connection as the privileged role.
pub struct Admin {
    conn: PgConnection,
}

impl Admin {
    /// Connect with the root credentials from the settings.
    pub async fn connect(settings: &Settings) -> Result<Self, Error> {
        let params = settings.root_params();
        let target = params.target()?;

        let options = PgConnectOptions::new()
            .username(params.user())
            .database(params.dbname_or_user())
            .port(target.port())
            .application_name("pglogin");

        let options = match &target {
            Target::Socket { dir, .. } => options.socket(dir),
            Target::Tcp { host, .. } => options.host(host),
        };

        let options = match params.password_value() {
            Some(password) => options.password(password),
            None => options,
        };

        let conn = PgConnection::connect_with(&options).await?;

        Ok(Self { conn })
    }

    /// `CREATE USER ... WITH PASSWORD ...`
    pub async fn create_user(&mut self, name: &str, password: &str) -> Result<(), Error> {
        self.conn
            .execute(create_user(name, password).as_str())
            .await?;
        info!("created role \"{}\"", name);
        Ok(())
    }

    /// `ALTER ROLE ... WITH NOLOGIN`
    pub async fn disable_login(&mut self, name: &str) -> Result<(), Error> {
        self.conn.execute(disable_login(name).as_str()).await?;
        info!("disabled login for role \"{}\"", name);
        Ok(())
    }

    /// `DROP USER IF EXISTS ...`
    pub async fn drop_user(&mut self, name: &str) -> Result<(), Error> {
        self.conn.execute(drop_user(name).as_str()).await?;
        info!("dropped role \"{}\"", name);
        Ok(())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await?;
        Ok(())
    }
}

fn create_user(name: &str, password: &str) -> String {
    format!(
        "CREATE USER {} WITH PASSWORD {}",
        quote_ident(name),
        quote_literal(password)
    )
}

fn disable_login(name: &str) -> String {
    format!("ALTER ROLE {} WITH NOLOGIN", quote_ident(name))
}

fn drop_user(name: &str) -> String {
    format!("DROP USER IF EXISTS {}", quote_ident(name))
}

/// Quote an identifier, keeping its case and spaces.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal.
pub fn quote_literal(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_statements() {
        assert_eq!(
            create_user("test_user", "test_pswd2024"),
            "CREATE USER \"test_user\" WITH PASSWORD 'test_pswd2024'"
        );
        assert_eq!(
            disable_login("test_user"),
            "ALTER ROLE \"test_user\" WITH NOLOGIN"
        );
        assert_eq!(drop_user("test_user"), "DROP USER IF EXISTS \"test_user\"");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
