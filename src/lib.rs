//! Browse a Redis keyspace and per-key contents without a native client.
//!
//! Every operation opens a short-lived connection, runs a bounded read
//! (cursor-based SCAN rounds, ranged list/zset/stream reads, HSCAN/SSCAN
//! rounds) and tears the connection down again. Results are normalised into
//! paginated views that an MCP tool server exposes to its callers.

pub mod browser;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod reader;
pub mod reply;
pub mod scanner;
pub mod server;

pub use browser::KeyBrowser;
pub use config::EndpointConfig;
pub use error::{BrowseError, Classified, ErrorKind};
pub use gateway::{with_connection, Connector, RedisConnector};
pub use model::{KeyDescriptor, KeyKind, ScanPage, ValueView};
