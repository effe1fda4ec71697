//! Normalisation of raw Redis replies into the shapes the browser returns.
//!
//! Everything here is pure: no I/O, no failure modes. Malformed input
//! degrades (dropped trailing element, zero timestamp, NaN score) instead of
//! failing the read it belongs to.

use std::collections::BTreeMap;

use crate::model::ServerSummary;

/// Decode a bulk reply as text. Invalid UTF-8 sequences become U+FFFD so a
/// binary payload still yields a view.
pub fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

pub fn lossy_all(items: Vec<Vec<u8>>) -> Vec<String> {
    items.into_iter().map(lossy).collect()
}

/// Pair a flat `[k0, v0, k1, v1, ...]` reply positionally. An unpaired
/// trailing element is dropped.
pub fn pair_alternating(flat: Vec<String>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(first), Some(second)) = (iter.next(), iter.next()) {
        pairs.push((first, second));
    }
    pairs
}

/// Fold alternating field/value pairs into a map. Later duplicates win.
pub fn fields_to_map(flat: Vec<String>) -> BTreeMap<String, String> {
    pair_alternating(flat).into_iter().collect()
}

/// Sorted-set scores arrive as strings (`"1.5"`, `"inf"`, `"-inf"`).
pub fn parse_score(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(f64::NAN)
}

/// Millisecond timestamp encoded in a stream entry id (`<millis>-<seq>`).
/// Ids without a numeric prefix yield 0.
pub fn entry_timestamp(id: &str) -> i64 {
    id.split('-')
        .next()
        .and_then(|prefix| prefix.parse().ok())
        .unwrap_or(0)
}

/// Resolve a possibly negative range index against the collection length.
fn resolve_index(index: i64, total: u64) -> i64 {
    if index < 0 {
        (total as i64).saturating_add(index)
    } else {
        index
    }
}

/// Whether an inclusive `[start, stop]` window left elements past `stop`.
pub fn window_has_more(stop: i64, total: u64) -> bool {
    resolve_index(stop, total) < (total as i64) - 1
}

/// Absolute index of the first element returned for a window start.
pub fn window_first_index(start: i64, total: u64) -> i64 {
    resolve_index(start, total).max(0)
}

/// Extract the summary fields from an `INFO server` reply.
pub fn parse_server_info(info: &str) -> ServerSummary {
    let mut summary = ServerSummary {
        connected: true,
        redis_version: "unknown".to_string(),
        mode: "standalone".to_string(),
        uptime_seconds: 0,
    };

    for line in info.lines() {
        let Some((name, value)) = line.trim_end().split_once(':') else {
            continue;
        };
        match name {
            "redis_version" if !value.is_empty() => summary.redis_version = value.to_string(),
            "redis_mode" if !value.is_empty() => summary.mode = value.to_string(),
            "uptime_in_seconds" => summary.uptime_seconds = value.parse().unwrap_or(0),
            _ => {}
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn binary_payloads_decode_with_replacement_characters() {
        assert_eq!(lossy(b"\xff\xfe".to_vec()), "\u{FFFD}\u{FFFD}");
        assert_eq!(lossy(b"user:\xff:1".to_vec()), "user:\u{FFFD}:1");
        assert_eq!(lossy("caf\u{e9}".as_bytes().to_vec()), "caf\u{e9}");
        assert_eq!(
            lossy_all(vec![b"a".to_vec(), b"\x80".to_vec()]),
            vec!["a".to_string(), "\u{FFFD}".to_string()]
        );
    }

    #[test]
    fn pairs_even_reply() {
        let pairs = pair_alternating(strings(&["a", "1", "b", "2", "c", "3"]));
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn drops_unpaired_trailing_element() {
        let pairs = pair_alternating(strings(&["a", "1", "b"]));
        assert_eq!(pairs, vec![("a".to_string(), "1".to_string())]);
        assert!(pair_alternating(strings(&["lonely"])).is_empty());
    }

    #[test]
    fn stream_fields_fold_into_map() {
        let fields = fields_to_map(strings(&["temp", "21", "unit", "C", "temp", "22"]));
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["temp"], "22");
        assert_eq!(fields["unit"], "C");
    }

    #[test]
    fn timestamp_comes_from_id_prefix() {
        assert_eq!(entry_timestamp("1700000000000-0"), 1_700_000_000_000);
        assert_eq!(entry_timestamp("1700000000000-15"), 1_700_000_000_000);
        assert_eq!(entry_timestamp("abc-1"), 0);
        assert_eq!(entry_timestamp(""), 0);
    }

    #[test]
    fn scores_parse_including_infinities() {
        assert_eq!(parse_score("3"), 3.0);
        assert_eq!(parse_score("-2.5"), -2.5);
        assert_eq!(parse_score("inf"), f64::INFINITY);
        assert_eq!(parse_score("-inf"), f64::NEG_INFINITY);
        assert!(parse_score("not-a-number").is_nan());
    }

    #[test]
    fn window_past_the_end_has_no_more() {
        // 49 < 30 - 1 is false
        assert!(!window_has_more(49, 30));
        assert!(window_has_more(9, 30));
        assert!(!window_has_more(29, 30));
        assert!(!window_has_more(49, 0));
    }

    #[test]
    fn negative_window_bounds_resolve_against_length() {
        assert!(!window_has_more(-1, 30));
        assert!(window_has_more(-2, 30));
        assert_eq!(window_first_index(-10, 30), 20);
        assert_eq!(window_first_index(-100, 30), 0);
        assert_eq!(window_first_index(5, 30), 5);
    }

    #[test]
    fn server_info_fields_are_extracted() {
        let info = "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\nuptime_in_seconds:3600\r\n";
        let summary = parse_server_info(info);
        assert!(summary.connected);
        assert_eq!(summary.redis_version, "7.2.4");
        assert_eq!(summary.mode, "standalone");
        assert_eq!(summary.uptime_seconds, 3600);
    }

    #[test]
    fn server_info_defaults_when_fields_missing() {
        let summary = parse_server_info("# Server\r\n");
        assert_eq!(summary.redis_version, "unknown");
        assert_eq!(summary.mode, "standalone");
        assert_eq!(summary.uptime_seconds, 0);
    }
}
