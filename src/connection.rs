//! A single connection to the server under test.

use std::net::IpAddr;

use tokio::net::lookup_host;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, warn};

use crate::error::{os_reason, Endpoint, Error};
use crate::params::{ConnectParams, Target};

/// Open connection. Owned by whoever opened it.
pub struct Connection {
    client: Client,
    handle: JoinHandle<()>,
    endpoint: Endpoint,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Connect to the server with the given parameters.
pub async fn connect(params: &ConnectParams) -> Result<Connection, Error> {
    let target = params.target()?;
    let addr = resolve(&target).await?;
    let endpoint = Endpoint::new(&target, addr);

    debug!(
        "connecting to {} as \"{}\" [{}]",
        target,
        params.user(),
        params.dbname_or_user()
    );

    let (client, connection) = params
        .config(&target)
        .connect(NoTls)
        .await
        .map_err(|err| Error::connect(err, endpoint.clone()))?;

    let handle = tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!("connection error: {}", err);
        }
    });

    Ok(Connection {
        client,
        handle,
        endpoint,
    })
}

/// Resolve the host name before handing it to the driver, so a
/// name that doesn't resolve is reported as such.
async fn resolve(target: &Target) -> Result<Option<IpAddr>, Error> {
    let Target::Tcp { host, port } = target else {
        return Ok(None);
    };

    if let Ok(addr) = host.parse::<IpAddr>() {
        return Ok(Some(addr));
    }

    let mut addrs = lookup_host((host.as_str(), *port))
        .await
        .map_err(|err| Error::UnknownHost {
            host: host.clone(),
            reason: os_reason(&err),
        })?;

    match addrs.next() {
        Some(addr) => Ok(Some(addr.ip())),
        None => Err(Error::UnknownHost {
            host: host.clone(),
            reason: "no address associated with hostname".into(),
        }),
    }
}

impl Connection {
    /// The connection has been closed, by us or by the server.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Run `SELECT 1`.
    pub async fn ping(&self) -> Result<(), Error> {
        self.client.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Close the connection and wait for it to shut down.
    pub async fn close(self) {
        let Connection { client, handle, .. } = self;
        drop(client);

        if let Err(err) = handle.await {
            warn!("connection task failed: {}", err);
        }
    }
}
