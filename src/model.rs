use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cursor value that starts an enumeration and signals its end.
pub const CURSOR_START: &str = "0";

/// Data-structure type of a key as reported by `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    String,
    List,
    Hash,
    Set,
    Zset,
    Stream,
    /// Absent keys (`none`) and module types this browser cannot read.
    Unknown,
}

impl KeyKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "string" => KeyKind::String,
            "list" => KeyKind::List,
            "hash" => KeyKind::Hash,
            "set" => KeyKind::Set,
            "zset" => KeyKind::Zset,
            "stream" => KeyKind::Stream,
            _ => KeyKind::Unknown,
        }
    }

    /// Command that reports the size of a key of this kind, if any.
    pub fn size_command(self) -> Option<&'static str> {
        match self {
            KeyKind::String => Some("STRLEN"),
            KeyKind::List => Some("LLEN"),
            KeyKind::Hash => Some("HLEN"),
            KeyKind::Set => Some("SCARD"),
            KeyKind::Zset => Some("ZCARD"),
            KeyKind::Stream => Some("XLEN"),
            KeyKind::Unknown => None,
        }
    }
}

/// One key from a scan page, enriched with type, TTL and size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: KeyKind,
    /// Seconds to expiry; -1 means no expiry, -2 means the key was gone.
    pub ttl: i64,
    /// Byte length for strings, element/field/member/entry count otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPage<T> {
    pub cursor: String,
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> ScanPage<T> {
    pub fn new(cursor: String, items: Vec<T>) -> Self {
        let has_more = cursor != CURSOR_START;
        Self {
            cursor,
            items,
            has_more,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringValue {
    pub value: String,
    pub ttl: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub index: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListValue {
    pub length: u64,
    pub items: Vec<ListItem>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HashField {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashValue {
    pub cursor: String,
    pub fields: Vec<HashField>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetValue {
    pub cursor: String,
    pub members: Vec<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZSetValue {
    pub cardinality: u64,
    pub members: Vec<ScoredMember>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEntry {
    /// `<millis>-<sequence>`
    pub id: String,
    pub timestamp: i64,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamValue {
    pub length: u64,
    pub entries: Vec<StreamEntry>,
    /// True when the page came back full. A full page does not prove that
    /// more entries exist.
    pub has_more: bool,
}

/// Materialised slice of a key's value, one variant per readable kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValueView {
    String(StringValue),
    List(ListValue),
    Hash(HashValue),
    Set(SetValue),
    Zset(ZSetValue),
    Stream(StreamValue),
}

impl ValueView {
    pub fn kind(&self) -> KeyKind {
        match self {
            ValueView::String(_) => KeyKind::String,
            ValueView::List(_) => KeyKind::List,
            ValueView::Hash(_) => KeyKind::Hash,
            ValueView::Set(_) => KeyKind::Set,
            ValueView::Zset(_) => KeyKind::Zset,
            ValueView::Stream(_) => KeyKind::Stream,
        }
    }
}

// -- Read windows --

/// Inclusive index range for `LRANGE`; negative indices count from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    pub start: i64,
    pub stop: i64,
}

impl Default for RangeWindow {
    fn default() -> Self {
        Self { start: 0, stop: 49 }
    }
}

/// One `HSCAN`/`SSCAN` round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorWindow {
    pub cursor: String,
    pub count: u32,
}

impl Default for CursorWindow {
    fn default() -> Self {
        Self {
            cursor: CURSOR_START.to_string(),
            count: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWindow {
    pub start: i64,
    pub stop: i64,
    pub order: ScoreOrder,
}

impl Default for ScoreWindow {
    fn default() -> Self {
        Self {
            start: 0,
            stop: 49,
            order: ScoreOrder::Desc,
        }
    }
}

/// `XRANGE` bounds; `-` and `+` are the open-ended sentinels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamWindow {
    pub start: String,
    pub end: String,
    pub count: u32,
}

impl Default for StreamWindow {
    fn default() -> Self {
        Self {
            start: "-".to_string(),
            end: "+".to_string(),
            count: 50,
        }
    }
}

/// Result of a connection test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    pub connected: bool,
    pub redis_version: String,
    pub mode: String,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_more_follows_cursor() {
        let done: ScanPage<String> = ScanPage::new("0".to_string(), vec![]);
        assert!(!done.has_more);
        let more = ScanPage::new("1792".to_string(), vec!["a".to_string()]);
        assert!(more.has_more);
    }

    #[test]
    fn type_names_map_to_kinds() {
        assert_eq!(KeyKind::from_type_name("zset"), KeyKind::Zset);
        assert_eq!(KeyKind::from_type_name("none"), KeyKind::Unknown);
        assert_eq!(KeyKind::from_type_name("ReJSON-RL"), KeyKind::Unknown);
        assert_eq!(KeyKind::Unknown.size_command(), None);
        assert_eq!(KeyKind::Stream.size_command(), Some("XLEN"));
    }

    #[test]
    fn value_view_is_tagged_with_type() {
        let view = ValueView::String(StringValue {
            value: "v".to_string(),
            ttl: -1,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["value"], "v");
        assert_eq!(view.kind(), KeyKind::String);
    }

    #[test]
    fn descriptor_serializes_kind_as_type() {
        let key = KeyDescriptor {
            name: "k".to_string(),
            kind: KeyKind::Hash,
            ttl: -1,
            size: Some(3),
        };
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["type"], "hash");
        assert_eq!(json["size"], 3);
    }

    #[test]
    fn windows_default_to_first_page() {
        assert_eq!(RangeWindow::default(), RangeWindow { start: 0, stop: 49 });
        assert_eq!(ScoreWindow::default().order, ScoreOrder::Desc);
        assert_eq!(StreamWindow::default().count, 50);
        assert_eq!(CursorWindow::default().cursor, "0");
    }
}
