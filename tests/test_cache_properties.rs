//! Freshness, invalidation and failure behaviour of the data cache.

use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::advance;
use track_data_cache::{CacheEventKind, DataCache};

const TTL: Duration = Duration::from_millis(300_000);

fn cache() -> DataCache<String, Value> {
    DataCache::new(TTL)
}

fn key(s: &str) -> String {
    s.to_string()
}

#[test]
fn test_never_written_keys_are_invalid() {
    let cache = cache();
    for k in ["meets", "practices", "practices_coach_a1_p3", ""] {
        assert!(!cache.is_valid(&key(k)));
        assert_eq!(cache.get(&key(k)).data, None);
    }
}

#[test]
fn test_written_keys_are_valid_with_their_value() {
    let cache = cache();
    let values = [json!([]), json!([{"id": 1}]), json!({"nested": {"a": [1, 2]}}), Value::Null];

    for (i, value) in values.iter().enumerate() {
        let k = format!("key{}", i);
        cache.set_data(&k, value.clone());
        assert!(cache.is_valid(&k));
        assert_eq!(cache.get(&k).data.as_ref(), Some(value));
    }
}

#[tokio::test(start_paused = true)]
async fn test_practices_scenario() {
    let cache = cache();
    let practices = key("practices");

    cache.set_data(&practices, json!([{"id": 1}]));

    advance(Duration::from_millis(100_000)).await;
    assert!(cache.is_valid(&practices));
    assert_eq!(cache.get(&practices).data, Some(json!([{"id": 1}])));

    advance(Duration::from_millis(201_000)).await;
    assert!(!cache.is_valid(&practices));

    cache.invalidate(&practices);
    assert_eq!(cache.get(&practices).data, None);
    assert!(!cache.is_valid(&practices));
}

#[tokio::test(start_paused = true)]
async fn test_freshness_window_edges() {
    let cache = cache();
    let epsilon = Duration::from_millis(1);
    cache.set_data(&key("measurables"), json!([]));

    advance(TTL - epsilon).await;
    assert!(cache.is_valid(&key("measurables")));

    advance(epsilon * 2).await;
    assert!(!cache.is_valid(&key("measurables")));
}

#[test]
fn test_invalidate_multiple_scenario() {
    let cache = cache();
    cache.set_data(&key("measurables"), json!([{"id": 5}]));
    let mut rx = cache.subscribe();

    cache.invalidate_multiple(&[key("measurables"), key("programs")]);

    assert!(!cache.is_valid(&key("measurables")));
    assert!(!cache.is_valid(&key("programs")));
    assert!(cache.refresh_flag(&key("measurables")));
    assert!(cache.refresh_flag(&key("programs")));

    let mut invalidated: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|event| event.kind == CacheEventKind::Invalidated { refresh_flag: true })
        .map(|event| event.key)
        .collect();
    invalidated.sort();
    assert_eq!(invalidated, vec![key("measurables"), key("programs")]);
}

#[test]
fn test_refresh_flag_toggles_once_per_invalidation() {
    let cache = cache();
    let k = key("programs");
    cache.set_data(&k, json!([]));

    let mut flags = vec![cache.refresh_flag(&k)];
    for _ in 0..3 {
        cache.invalidate(&k);
        flags.push(cache.refresh_flag(&k));
    }

    assert_eq!(flags, vec![false, true, false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_data_survives_failed_refresh() {
    let cache = cache();
    let k = key("event_assignments");
    cache.set_data(&k, json!(["relay"]));

    advance(TTL + Duration::from_millis(1)).await;

    let result = cache
        .get_or_fetch(&k, || async { Err::<Value, _>("503 from API") })
        .await;

    assert_eq!(result, Err("503 from API"));
    let entry = cache.get(&k);
    assert_eq!(entry.data, Some(json!(["relay"])));
    assert!(!entry.loading);
}

#[tokio::test(start_paused = true)]
async fn test_expired_refresh_replaces_data() {
    let cache = cache();
    let k = key("programs");
    cache.set_data(&k, json!(["v1"]));

    advance(TTL).await;
    let value = cache
        .get_or_fetch(&k, || async { Ok::<_, String>(json!(["v2"])) })
        .await
        .unwrap();

    assert_eq!(value, json!(["v2"]));
    assert!(cache.is_valid(&k));
    assert_eq!(cache.get(&k).data, Some(json!(["v2"])));
}

#[test]
fn test_loading_keeps_stale_data_visible() {
    let cache = cache();
    cache.set_data(&key("meets"), json!([1]));

    cache.set_loading(&key("meets"), true);
    assert_eq!(cache.get(&key("meets")).data, Some(json!([1])));
    assert!(cache.get(&key("meets")).loading);

    cache.set_loading(&key("meets"), false);
    assert!(!cache.get(&key("meets")).loading);
    assert!(cache.is_valid(&key("meets")));
}

#[tokio::test(start_paused = true)]
async fn test_stats_for_debug_panel() {
    let cache = cache();
    cache.set_data(&key("practices"), json!([]));
    cache.invalidate(&key("programs"));
    advance(Duration::from_millis(250_000)).await;

    let json = serde_json::to_value(cache.stats()).unwrap();
    assert_eq!(json["default_ttl_ms"], 300_000);

    let entries = json["entries"].as_array().unwrap();
    let practices = entries.iter().find(|e| e["key"] == "practices").unwrap();
    assert_eq!(practices["age_ms"], 250_000);
    assert_eq!(practices["remaining_ms"], 50_000);
    assert_eq!(practices["is_expired"], false);

    let programs = entries.iter().find(|e| e["key"] == "programs").unwrap();
    assert!(programs["age_ms"].is_null());
    assert_eq!(programs["remaining_ms"], 0);
    assert_eq!(programs["is_expired"], true);

    assert_eq!(cache.clear_all(), 2);
    assert!(cache.stats().entries.iter().all(|e| e.is_expired && !e.has_data));
}
