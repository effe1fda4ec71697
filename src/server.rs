use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_handler, tool_router, ServerHandler};
use serde::{Deserialize, Serialize};

use crate::browser::{KeyBrowser, DEFAULT_PATTERN, DEFAULT_SCAN_COUNT};
use crate::config::EndpointConfig;
use crate::error::BrowseError;
use crate::model::{
    CursorWindow, KeyKind, RangeWindow, ScoreOrder, ScoreWindow, StreamWindow, CURSOR_START,
};

#[derive(Clone)]
pub struct McpBrowserServer {
    browser: Arc<KeyBrowser>,
    default_endpoint: Option<EndpointConfig>,
    max_keys: usize,
    tool_router: ToolRouter<Self>,
}

// -- Tool parameter types --

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EndpointParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScanKeysParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,

    #[schemars(description = "Glob pattern to match (e.g. 'user:*'). Default: *")]
    #[serde(default)]
    pub pattern: Option<String>,

    #[schemars(description = "Cursor returned by the previous page. Default: 0 (start)")]
    #[serde(default)]
    pub cursor: Option<String>,

    #[schemars(description = "Keys the server should examine per round (hint). Default: 100")]
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScanAllKeysParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,

    #[schemars(description = "Glob pattern to match (e.g. 'user:*'). Default: *")]
    #[serde(default)]
    pub pattern: Option<String>,

    #[schemars(description = "Stop once this many keys have been collected (capped by --max-keys)")]
    #[serde(default)]
    pub max_keys: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct KeyParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,

    #[schemars(description = "Key name to read")]
    pub key: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,

    #[schemars(description = "List key name")]
    pub key: String,

    #[schemars(description = "Start index (default: 0)")]
    #[serde(default)]
    pub start: Option<i64>,

    #[schemars(description = "Stop index, inclusive (default: 49)")]
    #[serde(default)]
    pub stop: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CursorParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,

    #[schemars(description = "Hash or set key name")]
    pub key: String,

    #[schemars(description = "Cursor returned by the previous page. Default: 0 (start)")]
    #[serde(default)]
    pub cursor: Option<String>,

    #[schemars(description = "Elements the server should examine per round (hint). Default: 50")]
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ZSetParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,

    #[schemars(description = "Sorted set key name")]
    pub key: String,

    #[schemars(description = "Start rank (default: 0)")]
    #[serde(default)]
    pub start: Option<i64>,

    #[schemars(description = "Stop rank, inclusive (default: 49)")]
    #[serde(default)]
    pub stop: Option<i64>,

    #[schemars(description = "Score order: 'asc' or 'desc' (default: desc)")]
    #[serde(default)]
    pub order: Option<ScoreOrder>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StreamParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,

    #[schemars(description = "Stream key name")]
    pub key: String,

    #[schemars(description = "Lowest entry id to include (default: '-', the beginning)")]
    #[serde(default)]
    pub start: Option<String>,

    #[schemars(description = "Highest entry id to include (default: '+', the end)")]
    #[serde(default)]
    pub end: Option<String>,

    #[schemars(description = "Maximum number of entries to return (default: 50)")]
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ValueParams {
    #[schemars(description = "Redis endpoint (optional if the server was started with --url)")]
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,

    #[schemars(description = "Key name to read")]
    pub key: String,

    #[schemars(
        description = "Key type as reported by scan_keys: string, list, hash, set, zset or stream"
    )]
    #[serde(rename = "type")]
    pub kind: KeyKind,
}

impl McpBrowserServer {
    pub fn new(
        browser: KeyBrowser,
        default_endpoint: Option<EndpointConfig>,
        max_keys: usize,
    ) -> Self {
        Self {
            browser: Arc::new(browser),
            default_endpoint,
            max_keys,
            tool_router: Self::tool_router(),
        }
    }

    fn resolve(&self, endpoint: Option<EndpointConfig>) -> Result<EndpointConfig, BrowseError> {
        match endpoint {
            Some(endpoint) => Ok(endpoint),
            None => self.default_endpoint.clone().ok_or_else(|| {
                BrowseError::Validation(
                    "No endpoint given and no default --url configured".to_string(),
                )
            }),
        }
    }

    fn err(&self, e: BrowseError) -> ErrorData {
        let classified = e.classify();
        tracing::warn!(code = %classified.code, error = %e, "Tool call failed");
        e.to_mcp_error()
    }
}

fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    CallToolResult::success(vec![Content::text(text)])
}

// -- Public methods for testability --

impl McpBrowserServer {
    pub async fn do_test_connection(
        &self,
        params: EndpointParams,
    ) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let summary = self
            .browser
            .test_connection(&endpoint)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&summary))
    }

    pub async fn do_scan_keys(&self, params: ScanKeysParams) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let pattern = params.pattern.as_deref().unwrap_or(DEFAULT_PATTERN);
        let cursor = params.cursor.as_deref().unwrap_or(CURSOR_START);
        let count = params.count.unwrap_or(DEFAULT_SCAN_COUNT);

        let page = self
            .browser
            .scan_keys(&endpoint, pattern, cursor, count)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&page))
    }

    pub async fn do_scan_all_keys(
        &self,
        params: ScanAllKeysParams,
    ) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let pattern = params.pattern.as_deref().unwrap_or(DEFAULT_PATTERN);

        // Cap max_keys to the configured bound to prevent unbounded iteration
        let max_keys = std::cmp::min(params.max_keys.unwrap_or(self.max_keys), self.max_keys);

        let page = self
            .browser
            .scan_all_keys(&endpoint, pattern, max_keys)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&page))
    }

    pub async fn do_get_string(&self, params: KeyParams) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let value = self
            .browser
            .read_string(&endpoint, &params.key)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&value))
    }

    pub async fn do_get_list(&self, params: ListParams) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let defaults = RangeWindow::default();
        let window = RangeWindow {
            start: params.start.unwrap_or(defaults.start),
            stop: params.stop.unwrap_or(defaults.stop),
        };

        let value = self
            .browser
            .read_list(&endpoint, &params.key, window)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&value))
    }

    pub async fn do_get_hash(&self, params: CursorParams) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let window = cursor_window(params.cursor, params.count);
        let value = self
            .browser
            .read_hash(&endpoint, &params.key, &window)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&value))
    }

    pub async fn do_get_set(&self, params: CursorParams) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let window = cursor_window(params.cursor, params.count);
        let value = self
            .browser
            .read_set(&endpoint, &params.key, &window)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&value))
    }

    pub async fn do_get_zset(&self, params: ZSetParams) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let defaults = ScoreWindow::default();
        let window = ScoreWindow {
            start: params.start.unwrap_or(defaults.start),
            stop: params.stop.unwrap_or(defaults.stop),
            order: params.order.unwrap_or(defaults.order),
        };

        let value = self
            .browser
            .read_zset(&endpoint, &params.key, window)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&value))
    }

    pub async fn do_get_stream(&self, params: StreamParams) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let defaults = StreamWindow::default();
        let window = StreamWindow {
            start: params.start.unwrap_or(defaults.start),
            end: params.end.unwrap_or(defaults.end),
            count: params.count.unwrap_or(defaults.count),
        };

        let value = self
            .browser
            .read_stream(&endpoint, &params.key, &window)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&value))
    }

    pub async fn do_get_value(&self, params: ValueParams) -> Result<CallToolResult, ErrorData> {
        let endpoint = self.resolve(params.endpoint).map_err(|e| self.err(e))?;
        let view = self
            .browser
            .read_value(&endpoint, &params.key, params.kind)
            .await
            .map_err(|e| self.err(e))?;
        Ok(json_result(&view))
    }
}

fn cursor_window(cursor: Option<String>, count: Option<u32>) -> CursorWindow {
    let defaults = CursorWindow::default();
    CursorWindow {
        cursor: cursor.unwrap_or(defaults.cursor),
        count: count.unwrap_or(defaults.count),
    }
}

// -- MCP tool handlers (thin wrappers) --

#[tool_router]
impl McpBrowserServer {
    #[tool(
        name = "test_connection",
        description = "Check that a Redis endpoint is reachable and report its version, mode and uptime"
    )]
    async fn test_connection(
        &self,
        Parameters(params): Parameters<EndpointParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_test_connection(params).await
    }

    #[tool(
        name = "scan_keys",
        description = "Run one SCAN round from a cursor. Returns keys with type, TTL and size, plus the next cursor ('0' when done)."
    )]
    async fn scan_keys(
        &self,
        Parameters(params): Parameters<ScanKeysParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_scan_keys(params).await
    }

    #[tool(
        name = "scan_all_keys",
        description = "Follow SCAN cursors until the keyspace is exhausted or max_keys keys have been collected"
    )]
    async fn scan_all_keys(
        &self,
        Parameters(params): Parameters<ScanAllKeysParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_scan_all_keys(params).await
    }

    #[tool(
        name = "get_string",
        description = "Get the value and TTL of a string key"
    )]
    async fn get_string(
        &self,
        Parameters(params): Parameters<KeyParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_string(params).await
    }

    #[tool(
        name = "get_list",
        description = "Get an index range of a list key (LRANGE) with the list length"
    )]
    async fn get_list(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_list(params).await
    }

    #[tool(
        name = "get_hash",
        description = "Get one HSCAN page of field/value pairs from a hash key"
    )]
    async fn get_hash(
        &self,
        Parameters(params): Parameters<CursorParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_hash(params).await
    }

    #[tool(
        name = "get_set",
        description = "Get one SSCAN page of members from a set key"
    )]
    async fn get_set(
        &self,
        Parameters(params): Parameters<CursorParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_set(params).await
    }

    #[tool(
        name = "get_zset",
        description = "Get a rank range of a sorted set with scores, highest first by default"
    )]
    async fn get_zset(
        &self,
        Parameters(params): Parameters<ZSetParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_zset(params).await
    }

    #[tool(
        name = "get_stream",
        description = "Get stream entries between two ids (XRANGE) with the stream length"
    )]
    async fn get_stream(
        &self,
        Parameters(params): Parameters<StreamParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_stream(params).await
    }

    #[tool(
        name = "get_value",
        description = "Get the first page of a key's contents given its type (string, list, hash, set, zset, stream)"
    )]
    async fn get_value(
        &self,
        Parameters(params): Parameters<ValueParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_value(params).await
    }
}

#[tool_handler]
impl ServerHandler for McpBrowserServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "redis-key-browser".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Read-only Redis key browser. Tools: test_connection (reachability), \
                 scan_keys (one SCAN page with type/TTL/size), scan_all_keys (follow cursors \
                 up to a bound), get_string, get_list, get_hash, get_set, get_zset, \
                 get_stream (paginated reads per type), get_value (first page by type). \
                 Every call connects, reads and disconnects; pass 'endpoint' or rely on \
                 the server's default --url."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(default_endpoint: Option<EndpointConfig>) -> McpBrowserServer {
        McpBrowserServer::new(KeyBrowser::default(), default_endpoint, 1000)
    }

    #[test]
    fn explicit_endpoint_wins_over_default() {
        let server = server(Some(EndpointConfig::new("default-host", 6379)));
        let resolved = server
            .resolve(Some(EndpointConfig::new("explicit-host", 6380)))
            .unwrap();
        assert_eq!(resolved.host, "explicit-host");
    }

    #[test]
    fn missing_endpoint_without_default_is_validation_error() {
        let err = server(None).resolve(None).unwrap_err();
        assert_eq!(err.classify().code, crate::error::ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn empty_key_is_rejected_before_connecting() {
        let server = server(Some(EndpointConfig::new("localhost", 6379)));
        let params = KeyParams {
            endpoint: None,
            key: String::new(),
        };
        let err = server.do_get_string(params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn value_params_take_type_field() {
        let params: ValueParams = serde_json::from_value(serde_json::json!({
            "key": "orders",
            "type": "zset"
        }))
        .unwrap();
        assert_eq!(params.kind, KeyKind::Zset);
        assert!(params.endpoint.is_none());
    }
}
