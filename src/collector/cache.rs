//! Per-host listing cache
//!
//! Holds the last known domain set of a bridge and the cursor used to ask
//! only for changes since the last successful listing.

use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::parser::BridgeResponse;

/// Domain keys and listing cursor of one host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingCache {
    domain_keys: Vec<String>,
    cursor: i64,
}

impl ListingCache {
    /// Empty cache with the cursor at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached domains, in listing order
    pub fn domain_keys(&self) -> &[String] {
        &self.domain_keys
    }

    /// Cursor for the next `ifModifiedSince` query
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Fold a listing response into the cache
    ///
    /// Only a 200 response with an object value replaces the domain keys; the
    /// cursor then moves to the response timestamp, or to the local clock when
    /// the bridge omits it. Anything else leaves the cache untouched.
    /// Returns whether the cache was updated.
    pub fn apply(&mut self, response: &BridgeResponse) -> bool {
        let Some(domains) = response.object() else {
            debug!(status = response.status, "Listing not applied; keeping cached domains");
            return false;
        };

        self.domain_keys = domains.keys().cloned().collect();
        self.cursor = response.timestamp.unwrap_or_else(unix_now);
        true
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, value: serde_json::Value, timestamp: Option<i64>) -> BridgeResponse {
        BridgeResponse {
            status,
            value: Some(value),
            timestamp,
            error: None,
        }
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = ListingCache::new();
        assert!(cache.domain_keys().is_empty());
        assert_eq!(cache.cursor(), 0);
    }

    #[test]
    fn test_success_replaces_domains_and_cursor() {
        let mut cache = ListingCache::new();
        assert!(cache.apply(&response(200, json!({"a": {}, "b": {}}), Some(100))));
        assert_eq!(cache.domain_keys(), ["a", "b"]);
        assert_eq!(cache.cursor(), 100);

        assert!(cache.apply(&response(200, json!({"c": {}}), Some(200))));
        assert_eq!(cache.domain_keys(), ["c"]);
        assert_eq!(cache.cursor(), 200);
    }

    #[test]
    fn test_missing_timestamp_uses_local_clock() {
        let mut cache = ListingCache::new();
        cache.apply(&response(200, json!({"a": {}}), None));
        assert!(cache.cursor() > 1_600_000_000);
    }

    #[test]
    fn test_non_200_keeps_cache() {
        let mut cache = ListingCache::new();
        cache.apply(&response(200, json!({"a": {}}), Some(100)));
        let before = cache.clone();

        assert!(!cache.apply(&response(304, json!({}), Some(300))));
        assert!(!cache.apply(&response(500, json!({"z": {}}), Some(400))));
        assert!(!cache.apply(&BridgeResponse::default()));
        assert_eq!(cache, before);
    }

    #[test]
    fn test_non_object_value_keeps_cache() {
        let mut cache = ListingCache::new();
        cache.apply(&response(200, json!({"a": {}}), Some(100)));
        assert!(!cache.apply(&response(200, json!([1, 2]), Some(500))));
        assert_eq!(cache.domain_keys(), ["a"]);
        assert_eq!(cache.cursor(), 100);
    }
}
