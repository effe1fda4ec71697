//! Type-specific value readers.
//!
//! Each reader issues its independent round-trips concurrently (value with
//! TTL, length with range) over clones of one connection and builds the view
//! only after all of them have answered. Payloads are fetched as raw bytes
//! and decoded lossily, so binary values read back with U+FFFD in place of
//! invalid sequences.

use redis::aio::ConnectionLike;
use redis::RedisResult;

use crate::error::BrowseError;
use crate::model::{
    CursorWindow, HashField, HashValue, KeyKind, ListItem, ListValue, RangeWindow, ScoreOrder,
    ScoreWindow, ScoredMember, SetValue, StreamEntry, StreamValue, StreamWindow, StringValue,
    ValueView, ZSetValue, CURSOR_START,
};
use crate::reply;

pub async fn read_string<C>(conn: C, key: &str) -> Result<StringValue, BrowseError>
where
    C: ConnectionLike + Clone + Send,
{
    let mut value_conn = conn.clone();
    let mut ttl_conn = conn;

    let value = async {
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut value_conn)
            .await?;
        RedisResult::Ok(value)
    };
    let ttl = async {
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut ttl_conn).await?;
        RedisResult::Ok(ttl)
    };

    let (value, ttl) = tokio::try_join!(value, ttl)?;
    Ok(StringValue {
        value: value.map(reply::lossy).unwrap_or_default(),
        ttl,
    })
}

pub async fn read_list<C>(conn: C, key: &str, window: RangeWindow) -> Result<ListValue, BrowseError>
where
    C: ConnectionLike + Clone + Send,
{
    let mut len_conn = conn.clone();
    let mut range_conn = conn;

    let length = async {
        let length: u64 = redis::cmd("LLEN").arg(key).query_async(&mut len_conn).await?;
        RedisResult::Ok(length)
    };
    let values = async {
        let values: Vec<Vec<u8>> = redis::cmd("LRANGE")
            .arg(key)
            .arg(window.start)
            .arg(window.stop)
            .query_async(&mut range_conn)
            .await?;
        RedisResult::Ok(values)
    };

    let (length, values) = tokio::try_join!(length, values)?;

    let first = reply::window_first_index(window.start, length);
    let items = values
        .into_iter()
        .zip(first..)
        .map(|(value, index)| ListItem {
            index,
            value: reply::lossy(value),
        })
        .collect();

    Ok(ListValue {
        length,
        items,
        has_more: reply::window_has_more(window.stop, length),
    })
}

pub async fn read_hash<C>(
    mut conn: C,
    key: &str,
    window: &CursorWindow,
) -> Result<HashValue, BrowseError>
where
    C: ConnectionLike + Send,
{
    let (cursor, flat): (String, Vec<Vec<u8>>) = redis::cmd("HSCAN")
        .arg(key)
        .arg(&window.cursor)
        .arg("COUNT")
        .arg(window.count)
        .query_async(&mut conn)
        .await?;

    let fields = reply::pair_alternating(reply::lossy_all(flat))
        .into_iter()
        .map(|(field, value)| HashField { field, value })
        .collect();

    let has_more = cursor != CURSOR_START;
    Ok(HashValue {
        cursor,
        fields,
        has_more,
    })
}

pub async fn read_set<C>(
    mut conn: C,
    key: &str,
    window: &CursorWindow,
) -> Result<SetValue, BrowseError>
where
    C: ConnectionLike + Send,
{
    let (cursor, members): (String, Vec<Vec<u8>>) = redis::cmd("SSCAN")
        .arg(key)
        .arg(&window.cursor)
        .arg("COUNT")
        .arg(window.count)
        .query_async(&mut conn)
        .await?;

    let has_more = cursor != CURSOR_START;
    Ok(SetValue {
        cursor,
        members: reply::lossy_all(members),
        has_more,
    })
}

pub async fn read_zset<C>(conn: C, key: &str, window: ScoreWindow) -> Result<ZSetValue, BrowseError>
where
    C: ConnectionLike + Clone + Send,
{
    let mut card_conn = conn.clone();
    let mut range_conn = conn;

    // Descending pages are asked of the server so ties keep its ordering.
    let range_command = match window.order {
        ScoreOrder::Desc => "ZREVRANGE",
        ScoreOrder::Asc => "ZRANGE",
    };

    let cardinality = async {
        let cardinality: u64 = redis::cmd("ZCARD").arg(key).query_async(&mut card_conn).await?;
        RedisResult::Ok(cardinality)
    };
    let flat = async {
        let flat: Vec<Vec<u8>> = redis::cmd(range_command)
            .arg(key)
            .arg(window.start)
            .arg(window.stop)
            .arg("WITHSCORES")
            .query_async(&mut range_conn)
            .await?;
        RedisResult::Ok(flat)
    };

    let (cardinality, flat) = tokio::try_join!(cardinality, flat)?;

    let members = reply::pair_alternating(reply::lossy_all(flat))
        .into_iter()
        .map(|(member, score)| ScoredMember {
            score: reply::parse_score(&score),
            member,
        })
        .collect();

    Ok(ZSetValue {
        cardinality,
        members,
        has_more: reply::window_has_more(window.stop, cardinality),
    })
}

pub async fn read_stream<C>(
    conn: C,
    key: &str,
    window: &StreamWindow,
) -> Result<StreamValue, BrowseError>
where
    C: ConnectionLike + Clone + Send,
{
    let mut len_conn = conn.clone();
    let mut range_conn = conn;

    let length = async {
        let length: u64 = redis::cmd("XLEN").arg(key).query_async(&mut len_conn).await?;
        RedisResult::Ok(length)
    };
    let raw = async {
        let raw: Vec<(String, Vec<Vec<u8>>)> = redis::cmd("XRANGE")
            .arg(key)
            .arg(&window.start)
            .arg(&window.end)
            .arg("COUNT")
            .arg(window.count)
            .query_async(&mut range_conn)
            .await?;
        RedisResult::Ok(raw)
    };

    let (length, raw) = tokio::try_join!(length, raw)?;

    let entries: Vec<StreamEntry> = raw
        .into_iter()
        .map(|(id, flat)| StreamEntry {
            timestamp: reply::entry_timestamp(&id),
            fields: reply::fields_to_map(reply::lossy_all(flat)),
            id,
        })
        .collect();

    // A full page is taken as a sign that more entries may follow.
    let has_more = entries.len() == window.count as usize;
    Ok(StreamValue {
        length,
        entries,
        has_more,
    })
}

/// Read `key` as `kind` using the default first-page window for that kind.
pub async fn read_value<C>(conn: C, key: &str, kind: KeyKind) -> Result<ValueView, BrowseError>
where
    C: ConnectionLike + Clone + Send,
{
    let view = match kind {
        KeyKind::String => ValueView::String(read_string(conn, key).await?),
        KeyKind::List => ValueView::List(read_list(conn, key, RangeWindow::default()).await?),
        KeyKind::Hash => ValueView::Hash(read_hash(conn, key, &CursorWindow::default()).await?),
        KeyKind::Set => ValueView::Set(read_set(conn, key, &CursorWindow::default()).await?),
        KeyKind::Zset => ValueView::Zset(read_zset(conn, key, ScoreWindow::default()).await?),
        KeyKind::Stream => {
            ValueView::Stream(read_stream(conn, key, &StreamWindow::default()).await?)
        }
        KeyKind::Unknown => {
            return Err(BrowseError::Validation(format!(
                "Key '{key}' has no readable type"
            )))
        }
    };
    Ok(view)
}
