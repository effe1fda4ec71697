use std::future::Future;

use redis::aio::ConnectionLike;
use tokio::task::JoinSet;

use crate::error::BrowseError;
use crate::model::{KeyDescriptor, KeyKind, ScanPage, CURSOR_START};
use crate::reply;

/// Validate that a pattern doesn't contain null bytes.
pub fn validate_pattern(pattern: &str) -> Result<(), BrowseError> {
    if pattern.contains('\0') {
        return Err(BrowseError::Validation(
            "Pattern must not contain null bytes".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_count(count: u32) -> Result<(), BrowseError> {
    if count == 0 {
        return Err(BrowseError::Validation(
            "Count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// One `SCAN` round plus TYPE/TTL/size lookups for every key it returned.
///
/// Keys are enriched in parallel; the page comes back sorted by name. Any
/// failed lookup fails the whole page. Names that are not valid UTF-8 are
/// reported with replacement characters; lookups use the raw bytes.
pub async fn scan_round<C>(
    conn: C,
    pattern: &str,
    cursor: &str,
    count: u32,
) -> Result<ScanPage<KeyDescriptor>, BrowseError>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    let mut scan_conn = conn.clone();
    let (next_cursor, names): (String, Vec<Vec<u8>>) = redis::cmd("SCAN")
        .arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(count)
        .query_async(&mut scan_conn)
        .await?;

    tracing::debug!(
        cursor,
        next_cursor = %next_cursor,
        returned = names.len(),
        "SCAN round"
    );

    let mut tasks = JoinSet::new();
    for name in names {
        tasks.spawn(describe_key(conn.clone(), name));
    }

    let mut keys = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        keys.push(joined??);
    }

    keys.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ScanPage::new(next_cursor, keys))
}

/// TYPE then the type-specific size probe, concurrently with TTL.
async fn describe_key<C>(conn: C, raw_name: Vec<u8>) -> Result<KeyDescriptor, BrowseError>
where
    C: ConnectionLike + Clone + Send,
{
    let mut type_conn = conn.clone();
    let mut ttl_conn = conn;

    let kind_and_size = async {
        let raw: String = redis::cmd("TYPE")
            .arg(&raw_name)
            .query_async(&mut type_conn)
            .await?;
        let kind = KeyKind::from_type_name(&raw);
        let size = match kind.size_command() {
            Some(command) => {
                let size: u64 = redis::cmd(command)
                    .arg(&raw_name)
                    .query_async(&mut type_conn)
                    .await?;
                Some(size)
            }
            None => None,
        };
        Ok::<_, redis::RedisError>((kind, size))
    };

    let ttl = async {
        let ttl: i64 = redis::cmd("TTL")
            .arg(&raw_name)
            .query_async(&mut ttl_conn)
            .await?;
        Ok::<_, redis::RedisError>(ttl)
    };

    let ((kind, size), ttl) = tokio::try_join!(kind_and_size, ttl)?;

    Ok(KeyDescriptor {
        name: reply::lossy(raw_name),
        kind,
        ttl,
        size,
    })
}

/// Drive `fetch` from the start cursor until the cursor wraps to `"0"` or at
/// least `max_items` items have been collected. The last page is kept whole so
/// the returned cursor still resumes where the final round stopped.
pub async fn collect_pages<T, F, Fut>(
    max_items: usize,
    mut fetch: F,
) -> Result<ScanPage<T>, BrowseError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<ScanPage<T>, BrowseError>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut cursor = CURSOR_START.to_string();
    let mut rounds = 0usize;

    loop {
        let page = fetch(cursor).await?;
        items.extend(page.items);
        cursor = page.cursor;
        rounds += 1;

        if cursor == CURSOR_START || items.len() >= max_items {
            break;
        }
    }

    tracing::debug!(rounds, collected = items.len(), "Scan aggregation finished");
    Ok(ScanPage::new(cursor, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn keyspace() -> HashMap<String, (String, Vec<u32>)> {
        // cursor -> (next cursor, items)
        HashMap::from([
            ("0".to_string(), ("17".to_string(), vec![1, 2])),
            ("17".to_string(), ("5".to_string(), vec![])),
            ("5".to_string(), ("9".to_string(), vec![3, 4, 5])),
            ("9".to_string(), ("0".to_string(), vec![6])),
        ])
    }

    async fn fetch_from(
        space: &HashMap<String, (String, Vec<u32>)>,
        cursor: String,
    ) -> Result<ScanPage<u32>, BrowseError> {
        let (next, items) = space
            .get(&cursor)
            .cloned()
            .ok_or_else(|| BrowseError::Other(format!("bad cursor {cursor}")))?;
        Ok(ScanPage::new(next, items))
    }

    #[tokio::test]
    async fn follows_cursor_until_exhausted() {
        let space = keyspace();
        let page = collect_pages(1000, |c| fetch_from(&space, c)).await.unwrap();
        assert_eq!(page.items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(page.cursor, "0");
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn stops_once_bound_reached_without_truncating() {
        let space = keyspace();
        let page = collect_pages(3, |c| fetch_from(&space, c)).await.unwrap();
        assert_eq!(page.items, vec![1, 2, 3, 4, 5]);
        assert_eq!(page.cursor, "9");
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn bound_is_checked_after_every_page() {
        let space = keyspace();
        let page = collect_pages(2, |c| fetch_from(&space, c)).await.unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.cursor, "17");
    }

    #[tokio::test]
    async fn sparse_keyspace_is_walked_to_the_end() {
        // 2000 empty rounds before the only match
        let mut space: HashMap<String, (String, Vec<u32>)> = (0..2000)
            .map(|i| (i.to_string(), ((i + 1).to_string(), vec![])))
            .collect();
        space.insert("2000".to_string(), ("0".to_string(), vec![42]));

        let page = collect_pages(10, |c| fetch_from(&space, c)).await.unwrap();
        assert_eq!(page.items, vec![42]);
        assert_eq!(page.cursor, "0");
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn failure_aborts_without_partial_result() {
        let mut calls = 0;
        let result: Result<ScanPage<u32>, _> = collect_pages(100, |cursor| {
            calls += 1;
            async move {
                if cursor == "0" {
                    Ok(ScanPage::new("42".to_string(), vec![1]))
                } else {
                    Err(BrowseError::Other("connection reset".to_string()))
                }
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn rejects_bad_pattern_and_count() {
        assert!(validate_pattern("user:\0").is_err());
        assert!(validate_pattern("user:*").is_ok());
        assert!(validate_count(0).is_err());
        assert!(validate_count(100).is_ok());
    }
}
