use std::fmt;

use redis::{ConnectionAddr, IntoConnectionInfo};
use serde::Deserialize;
use url::Url;

use crate::error::BrowseError;

pub const DEFAULT_PORT: u16 = 6379;

/// Where and how to reach one Redis endpoint.
///
/// Supplied with every operation and never stored by the library. The
/// `Display` form omits the password, so endpoints are safe to log.
#[derive(Clone, PartialEq, Eq, Deserialize, schemars::JsonSchema)]
pub struct EndpointConfig {
    #[schemars(description = "Redis host name or IP address")]
    pub host: String,

    #[schemars(description = "Redis port (usually 6379)")]
    pub port: u16,

    #[schemars(description = "Password for AUTH (optional)")]
    #[serde(default)]
    pub password: Option<String>,

    #[schemars(description = "Logical database index (default: 0)")]
    #[serde(default)]
    pub database: Option<u32>,

    #[schemars(description = "Connect over TLS (default: false)")]
    #[serde(default)]
    pub tls: bool,
}

impl EndpointConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
            database: None,
            tls: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: u32) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn database_index(&self) -> u32 {
        self.database.unwrap_or(0)
    }

    /// Parse a `redis://` or `rediss://` URL into an endpoint.
    pub fn from_url(url_str: &str) -> Result<Self, BrowseError> {
        let info = url_str
            .into_connection_info()
            .map_err(|e| BrowseError::InvalidEndpoint(format!("Invalid Redis URL: {e}")))?;

        let (host, port, tls) = match info.addr {
            ConnectionAddr::Tcp(host, port) => (host, port, false),
            ConnectionAddr::TcpTls { host, port, .. } => (host, port, true),
            _ => {
                return Err(BrowseError::InvalidEndpoint(
                    "Only TCP endpoints are supported".to_string(),
                ))
            }
        };

        let database = u32::try_from(info.redis.db).map_err(|_| {
            BrowseError::InvalidEndpoint(format!("Invalid database index: {}", info.redis.db))
        })?;

        Ok(Self {
            host,
            port,
            password: info.redis.password,
            database: Some(database),
            tls,
        })
    }

    /// Build the connection URL handed to the Redis client. Contains the
    /// password, so it must never be logged.
    pub fn connection_url(&self) -> Result<Url, BrowseError> {
        let scheme = if self.tls { "rediss" } else { "redis" };
        let mut url = Url::parse(&format!(
            "{}://{}:{}/{}",
            scheme,
            self.bracketed_host(),
            self.port,
            self.database_index()
        ))
        .map_err(|e| BrowseError::InvalidEndpoint(format!("{self}: {e}")))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| BrowseError::InvalidEndpoint(format!("{self}: cannot carry a password")))?;
        }

        Ok(url)
    }

    /// Host and port must be present before anything touches the network.
    pub fn validate(&self) -> Result<(), BrowseError> {
        if self.host.trim().is_empty() || self.port == 0 {
            return Err(BrowseError::Validation(
                "Host and port are required".to_string(),
            ));
        }
        Ok(())
    }

    fn bracketed_host(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.tls { "rediss" } else { "redis" };
        write!(
            f,
            "{}://{}:{}/{}",
            scheme,
            self.bracketed_host(),
            self.port,
            self.database_index()
        )
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("tls", &self.tls)
            .finish()
    }
}
