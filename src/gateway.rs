//! Short-lived connections: open, run one operation, release.
//!
//! There is no pooling and no reconnect. A failed round-trip surfaces to the
//! caller immediately.

use std::future::Future;
use std::time::Duration;

use redis::aio::MultiplexedConnection;

use crate::config::EndpointConfig;
use crate::error::BrowseError;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Opens and releases connections for [`with_connection`].
///
/// `Conn` is a cheap handle: the operation receives a clone while the
/// gateway keeps the original so it can release it on every exit path.
pub trait Connector: Send + Sync {
    type Conn: Clone + Send + Sync + 'static;

    fn open(
        &self,
        endpoint: &EndpointConfig,
    ) -> impl Future<Output = Result<Self::Conn, BrowseError>> + Send;

    /// Errors returned here are logged and dropped.
    fn release(&self, conn: Self::Conn) -> Result<(), BrowseError>;
}

/// Connects with redis-rs multiplexed connections, which never reconnect on
/// their own.
#[derive(Debug, Clone, Copy)]
pub struct RedisConnector {
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisConnector {
    pub fn new(connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            command_timeout,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }
}

impl Default for RedisConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_COMMAND_TIMEOUT)
    }
}

impl Connector for RedisConnector {
    type Conn = MultiplexedConnection;

    fn open(
        &self,
        endpoint: &EndpointConfig,
    ) -> impl Future<Output = Result<Self::Conn, BrowseError>> + Send {
        let connect_timeout = self.connect_timeout;
        let command_timeout = self.command_timeout;
        let target = endpoint.connection_url();

        async move {
            let client = redis::Client::open(target?.as_str())?;
            // Handshake (AUTH/SELECT) runs here, so credential failures
            // surface on open rather than on the first command.
            let conn = client
                .get_multiplexed_async_connection_with_timeouts(command_timeout, connect_timeout)
                .await?;
            Ok(conn)
        }
    }

    fn release(&self, conn: Self::Conn) -> Result<(), BrowseError> {
        // The socket closes once the last handle to the multiplexer drops.
        drop(conn);
        Ok(())
    }
}

/// Releases its connection when dropped, including when the owning future
/// is abandoned mid-flight.
struct Lease<'a, K: Connector> {
    connector: &'a K,
    conn: Option<K::Conn>,
}

impl<K: Connector> Drop for Lease<'_, K> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = self.connector.release(conn) {
                tracing::warn!(error = %e, "Ignoring error while releasing connection");
            }
        }
    }
}

/// Run `op` with a freshly opened connection to `endpoint`, then release it
/// whether `op` succeeds, fails or is cancelled.
pub async fn with_connection<K, F, Fut, T>(
    connector: &K,
    endpoint: &EndpointConfig,
    op: F,
) -> Result<T, BrowseError>
where
    K: Connector,
    F: FnOnce(K::Conn) -> Fut,
    Fut: Future<Output = Result<T, BrowseError>>,
{
    let conn = connector.open(endpoint).await?;
    tracing::debug!(endpoint = %endpoint, "Opened connection");

    let handle = conn.clone();
    let lease = Lease {
        connector,
        conn: Some(conn),
    };

    let result = op(handle).await;
    drop(lease);
    tracing::debug!(endpoint = %endpoint, ok = result.is_ok(), "Released connection");
    result
}
