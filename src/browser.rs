use redis::aio::ConnectionLike;

use crate::config::EndpointConfig;
use crate::error::BrowseError;
use crate::gateway::{with_connection, Connector, RedisConnector};
use crate::model::{
    CursorWindow, HashValue, KeyDescriptor, KeyKind, ListValue, RangeWindow, ScanPage,
    ScoreWindow, ServerSummary, SetValue, StreamValue, StreamWindow, StringValue, ValueView,
    ZSetValue,
};
use crate::{reader, reply, scanner};

pub const DEFAULT_PATTERN: &str = "*";
pub const DEFAULT_SCAN_COUNT: u32 = 100;
pub const DEFAULT_MAX_KEYS: usize = 1000;

/// Entry point for every browsing operation.
///
/// Holds no connections: each call opens one through its [`Connector`],
/// uses it for that call only, and releases it before returning.
#[derive(Debug, Clone)]
pub struct KeyBrowser<K = RedisConnector> {
    connector: K,
}

impl Default for KeyBrowser<RedisConnector> {
    fn default() -> Self {
        Self::new(RedisConnector::default())
    }
}

impl<K> KeyBrowser<K>
where
    K: Connector,
    K::Conn: ConnectionLike,
{
    pub fn new(connector: K) -> Self {
        Self { connector }
    }

    pub async fn test_connection(
        &self,
        endpoint: &EndpointConfig,
    ) -> Result<ServerSummary, BrowseError> {
        endpoint.validate()?;
        with_connection(&self.connector, endpoint, |mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            let info: String = redis::cmd("INFO")
                .arg("server")
                .query_async(&mut conn)
                .await?;
            Ok::<_, BrowseError>(reply::parse_server_info(&info))
        })
        .await
    }

    /// One SCAN round starting at `cursor`. `count` is a hint to the server,
    /// not a cap on the page size.
    pub async fn scan_keys(
        &self,
        endpoint: &EndpointConfig,
        pattern: &str,
        cursor: &str,
        count: u32,
    ) -> Result<ScanPage<KeyDescriptor>, BrowseError> {
        endpoint.validate()?;
        scanner::validate_pattern(pattern)?;
        scanner::validate_count(count)?;

        with_connection(&self.connector, endpoint, |conn| {
            scanner::scan_round(conn, pattern, cursor, count)
        })
        .await
    }

    /// Keep scanning from the start until the keyspace is exhausted or
    /// `max_keys` keys have been collected. Each round uses its own
    /// connection.
    pub async fn scan_all_keys(
        &self,
        endpoint: &EndpointConfig,
        pattern: &str,
        max_keys: usize,
    ) -> Result<ScanPage<KeyDescriptor>, BrowseError> {
        let page = scanner::collect_pages(max_keys, |cursor| async move {
            self.scan_keys(endpoint, pattern, &cursor, DEFAULT_SCAN_COUNT)
                .await
        })
        .await?;

        tracing::debug!(
            endpoint = %endpoint,
            pattern,
            keys = page.items.len(),
            has_more = page.has_more,
            "Collected keys"
        );
        Ok(page)
    }

    pub async fn read_string(
        &self,
        endpoint: &EndpointConfig,
        key: &str,
    ) -> Result<StringValue, BrowseError> {
        validate_key(endpoint, key)?;
        with_connection(&self.connector, endpoint, |conn| reader::read_string(conn, key)).await
    }

    pub async fn read_list(
        &self,
        endpoint: &EndpointConfig,
        key: &str,
        window: RangeWindow,
    ) -> Result<ListValue, BrowseError> {
        validate_key(endpoint, key)?;
        with_connection(&self.connector, endpoint, |conn| {
            reader::read_list(conn, key, window)
        })
        .await
    }

    pub async fn read_hash(
        &self,
        endpoint: &EndpointConfig,
        key: &str,
        window: &CursorWindow,
    ) -> Result<HashValue, BrowseError> {
        validate_key(endpoint, key)?;
        scanner::validate_count(window.count)?;
        with_connection(&self.connector, endpoint, |conn| {
            reader::read_hash(conn, key, window)
        })
        .await
    }

    pub async fn read_set(
        &self,
        endpoint: &EndpointConfig,
        key: &str,
        window: &CursorWindow,
    ) -> Result<SetValue, BrowseError> {
        validate_key(endpoint, key)?;
        scanner::validate_count(window.count)?;
        with_connection(&self.connector, endpoint, |conn| {
            reader::read_set(conn, key, window)
        })
        .await
    }

    pub async fn read_zset(
        &self,
        endpoint: &EndpointConfig,
        key: &str,
        window: ScoreWindow,
    ) -> Result<ZSetValue, BrowseError> {
        validate_key(endpoint, key)?;
        with_connection(&self.connector, endpoint, |conn| {
            reader::read_zset(conn, key, window)
        })
        .await
    }

    pub async fn read_stream(
        &self,
        endpoint: &EndpointConfig,
        key: &str,
        window: &StreamWindow,
    ) -> Result<StreamValue, BrowseError> {
        validate_key(endpoint, key)?;
        scanner::validate_count(window.count)?;
        with_connection(&self.connector, endpoint, |conn| {
            reader::read_stream(conn, key, window)
        })
        .await
    }

    /// Read the first page of `key` as the given kind.
    pub async fn read_value(
        &self,
        endpoint: &EndpointConfig,
        key: &str,
        kind: KeyKind,
    ) -> Result<ValueView, BrowseError> {
        validate_key(endpoint, key)?;
        if kind == KeyKind::Unknown {
            return Err(BrowseError::Validation(format!(
                "Cannot read key '{key}' of unknown type"
            )));
        }
        with_connection(&self.connector, endpoint, |conn| {
            reader::read_value(conn, key, kind)
        })
        .await
    }
}

fn validate_key(endpoint: &EndpointConfig, key: &str) -> Result<(), BrowseError> {
    endpoint.validate()?;
    if key.is_empty() {
        return Err(BrowseError::Validation(
            "Key is required".to_string(),
        ));
    }
    Ok(())
}
