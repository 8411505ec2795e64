mod helpers;

use std::sync::Arc;
use std::time::Duration;

use dashcache_core::{AreaQuery, CallArgs, Codec, GenericKey, KeyStrategy, ObjectCodec};
use dashcache_server::{CacheAside, CacheAsideError, Layout, Ttl};
use dashcache_store::{MemoryStore, StoreClient};
use helpers::{AREA_TTL, FetchCounter, area_cache, area_rows};
use tokio_test::assert_ok;

const OVERVIEW_KEY: &str = "AREA::2021-01-04-UK";

async fn wait_for_key(store: &MemoryStore, key: &str) -> Option<Vec<u8>> {
    for _ in 0..100 {
        if let Some(value) = store.get(key).await.unwrap() {
            return Some(value);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

#[tokio::test]
async fn test_miss_then_hit_fetches_once() {
    let store = MemoryStore::default();
    let cache = area_cache(&store);
    let counter = FetchCounter::default();

    let first = {
        let counter = counter.clone();
        cache
            .get_or_fetch(AreaQuery::overview("2021-01-04"), move |query| async move {
                counter.hit();
                Ok::<_, String>(area_rows(&query))
            })
            .await
            .unwrap()
    };

    assert_eq!(counter.count(), 1);
    assert_eq!(store.ttl_of(OVERVIEW_KEY).await, Some(Some(AREA_TTL)));

    let second = {
        let counter = counter.clone();
        cache
            .get_or_fetch(AreaQuery::overview("2021-01-04T16:00:00.000Z"), move |query| async move {
                counter.hit();
                Ok::<_, String>(area_rows(&query))
            })
            .await
            .unwrap()
    };

    assert_eq!(counter.count(), 1);
    assert_eq!(first, second);
    assert_eq!(second.columns(), ["date", "areaCode", "areaName", "newCases"]);
    assert_eq!(cache.metrics().hits(), 1);
    assert_eq!(cache.metrics().misses(), 1);
}

#[tokio::test]
async fn test_store_down_still_returns_rows() {
    let store = MemoryStore::default();
    store.set_available(false);
    let cache = area_cache(&store);

    let result = cache
        .get_or_fetch(AreaQuery::overview("2021-01-04"), |query| async move {
            Ok::<_, String>(area_rows(&query))
        })
        .await;

    let rows = assert_ok!(result);
    assert_eq!(rows.len(), 1);
    assert_eq!(cache.metrics().probe_errors(), 1);
    assert_eq!(cache.metrics().writeback_errors(), 1);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_undecodable_payload_is_refetched_and_overwritten() {
    let store = MemoryStore::default();
    store.set(OVERVIEW_KEY, b"not json", None).await.unwrap();
    let cache = area_cache(&store);
    let counter = FetchCounter::default();

    for _ in 0..2 {
        let counter = counter.clone();
        cache
            .get_or_fetch(AreaQuery::overview("2021-01-04"), move |query| async move {
                counter.hit();
                Ok::<_, String>(area_rows(&query))
            })
            .await
            .unwrap();
    }

    assert_eq!(counter.count(), 1);
    assert_eq!(store.ttl_of(OVERVIEW_KEY).await, Some(Some(AREA_TTL)));
}

#[tokio::test]
async fn test_stale_column_mapping_is_treated_as_miss() {
    let store = MemoryStore::default();
    let stale = br#"{"version":1,"columns":["date"],"rows":[["2021-01-04"]]}"#;
    store.set(OVERVIEW_KEY, stale, None).await.unwrap();
    let cache = area_cache(&store);
    let counter = FetchCounter::default();

    let rows = {
        let counter = counter.clone();
        cache
            .get_or_fetch(AreaQuery::overview("2021-01-04"), move |query| async move {
                counter.hit();
                Ok::<_, String>(area_rows(&query))
            })
            .await
            .unwrap()
    };

    assert_eq!(counter.count(), 1);
    assert_eq!(rows.columns().len(), 4);
    assert_ne!(store.get(OVERVIEW_KEY).await.unwrap().unwrap(), stale.to_vec());
}

#[tokio::test]
async fn test_fan_out_fetches_only_missing_elements() {
    let store = MemoryStore::default();
    let cache = area_cache(&store);
    let counter = FetchCounter::default();

    for code in ["E09000033", "E06000001"] {
        cache
            .get_or_fetch(AreaQuery::area("2021-01-04", code), |query| async move {
                Ok::<_, String>(area_rows(&query))
            })
            .await
            .unwrap();
    }

    let items = vec![
        AreaQuery::area("2021-01-04", "E08000003"),
        AreaQuery::area("2021-01-04", "E09000033"),
        AreaQuery::area("2021-01-04", "W06000015"),
        AreaQuery::area("2021-01-04", "E06000001"),
    ];

    let fetch_counter = counter.clone();
    let tables = cache
        .get_or_fetch_many(items, move |query| {
            let counter = fetch_counter.clone();
            async move {
                counter.hit();
                Ok::<_, String>(area_rows(&query))
            }
        })
        .await
        .unwrap();

    assert_eq!(tables.len(), 4);
    assert_eq!(counter.count(), 2);
    assert!(
        store
            .get("AREA::2021-01-04-W06000015")
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .get("AREA::2021-01-04-E08000003")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_fan_out_preserves_positions() {
    let store = MemoryStore::default();
    let cache: CacheAside<CallArgs, GenericKey, ObjectCodec<String>> = CacheAside::new(
        Arc::new(store.clone()),
        "METRIC",
        GenericKey::new("METRIC::"),
        ObjectCodec::new(),
    )
    .with_ttl(Ttl::fixed_secs(900));

    cache
        .get_or_fetch(CallArgs::new().arg("newCasesByPublishDate"), |_| async {
            Ok::<_, String>("cached:newCasesByPublishDate".to_string())
        })
        .await
        .unwrap();

    let metrics = ["newDeaths28DaysByPublishDate", "newCasesByPublishDate", "newAdmissions"];
    let items = metrics.iter().map(|m| CallArgs::new().arg(*m)).collect();

    let values = cache
        .get_or_fetch_many(items, |args: CallArgs| async move {
            Ok::<_, String>(format!("fetched:{}", args.positional()[0]))
        })
        .await
        .unwrap();

    assert_eq!(
        values,
        vec![
            "fetched:newDeaths28DaysByPublishDate".to_string(),
            "cached:newCasesByPublishDate".to_string(),
            "fetched:newAdmissions".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_fan_out_with_hash_layout() {
    let store = MemoryStore::default();
    let cache = area_cache(&store).with_layout(Layout::hash("AREA::2021-01-04"));
    let counter = FetchCounter::default();

    let items = || {
        vec![
            AreaQuery::area("2021-01-04", "E09000033"),
            AreaQuery::overview("2021-01-04"),
        ]
    };

    for _ in 0..2 {
        let fetch_counter = counter.clone();
        cache
            .get_or_fetch_many(items(), move |query| {
                let counter = fetch_counter.clone();
                async move {
                    counter.hit();
                    Ok::<_, String>(area_rows(&query))
                }
            })
            .await
            .unwrap();
    }

    assert_eq!(counter.count(), 2);
    assert!(store.has_field("AREA::2021-01-04", OVERVIEW_KEY));
    assert_eq!(store.ttl_of(OVERVIEW_KEY).await, None);
}

#[tokio::test]
async fn test_fan_out_propagates_fetch_error() {
    let store = MemoryStore::default();
    let cache = area_cache(&store);

    let result = cache
        .get_or_fetch_many(
            vec![
                AreaQuery::area("2021-01-04", "E09000033"),
                AreaQuery::area("2021-01-04", "E06000001"),
            ],
            |query| async move {
                if query.date == "2021-01-04" {
                    Err("statement timeout".to_string())
                } else {
                    Ok(area_rows(&query))
                }
            },
        )
        .await;

    match result {
        Err(CacheAsideError::Fetch(message)) => assert_eq!(message, "statement timeout"),
        other => panic!("unexpected result: {:?}", other.map(|t| t.len())),
    }
}

#[tokio::test]
async fn test_fan_out_rejects_malformed_element_before_io() {
    let store = MemoryStore::default();
    let cache = area_cache(&store);
    let counter = FetchCounter::default();

    let fetch_counter = counter.clone();
    let result = cache
        .get_or_fetch_many(
            vec![
                AreaQuery::area("2021-01-04", "E09000033"),
                AreaQuery::area("04/01/2021", "E06000001"),
            ],
            move |query| {
                let counter = fetch_counter.clone();
                async move {
                    counter.hit();
                    Ok::<_, String>(area_rows(&query))
                }
            },
        )
        .await;

    assert!(matches!(result, Err(CacheAsideError::Key(_))));
    assert_eq!(counter.count(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_race_fill_cold_cache_returns_backend_value_and_fills() {
    let store = MemoryStore::default();
    let cache = area_cache(&store);

    let rows = cache
        .race_fill(AreaQuery::overview("2021-01-04"), |query| async move {
            Ok::<_, String>(area_rows(&query))
        })
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert!(wait_for_key(&store, OVERVIEW_KEY).await.is_some());

    let counter = FetchCounter::default();
    let fetch_counter = counter.clone();
    let cached = cache
        .get_or_fetch(AreaQuery::overview("2021-01-04"), move |query| async move {
            fetch_counter.hit();
            Ok::<_, String>(area_rows(&query))
        })
        .await
        .unwrap();

    assert_eq!(cached, rows);
    assert_eq!(counter.count(), 0);
}

#[tokio::test]
async fn test_race_fill_warm_cache_answers_first_and_backend_refreshes() {
    let store = MemoryStore::default();
    let cache: CacheAside<CallArgs, GenericKey, ObjectCodec<String>> = CacheAside::new(
        Arc::new(store.clone()),
        "BANNER",
        GenericKey::new("BANNER::"),
        ObjectCodec::new(),
    );
    let args = || CallArgs::new().arg("2021-01-04");
    let key = GenericKey::new("BANNER::").derive(&args()).unwrap();
    let codec = ObjectCodec::<String>::new();

    cache
        .get_or_fetch(args(), |_| async { Ok::<_, String>("old".to_string()) })
        .await
        .unwrap();

    let value = cache
        .race_fill(args(), |_| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, String>("fresh".to_string())
        })
        .await
        .unwrap();

    assert_eq!(value, "old");

    let mut refreshed = None;
    for _ in 0..100 {
        let current = store.get(key.as_str()).await.unwrap();
        let decoded = current.as_deref().and_then(|bytes| codec.decode(bytes).ok());
        if decoded.as_deref() == Some("fresh") {
            refreshed = decoded;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(refreshed.is_some(), "backend task never wrote back");
}

#[tokio::test]
async fn test_race_fill_cold_cache_fetch_error_is_returned() {
    let store = MemoryStore::default();
    let cache = area_cache(&store);

    let result = cache
        .race_fill(AreaQuery::overview("2021-01-04"), |_| async {
            Err::<dashcache_core::Table, _>("backend unavailable".to_string())
        })
        .await;

    match result {
        Err(CacheAsideError::Fetch(message)) => assert_eq!(message, "backend unavailable"),
        other => panic!("unexpected result: {:?}", other.map(|t| t.len())),
    }
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_race_fill_warm_cache_hides_fetch_error() {
    let store = MemoryStore::default();
    let cache = area_cache(&store);

    cache
        .get_or_fetch(AreaQuery::overview("2021-01-04"), |query| async move {
            Ok::<_, String>(area_rows(&query))
        })
        .await
        .unwrap();

    let rows = cache
        .race_fill(AreaQuery::overview("2021-01-04"), |_| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<dashcache_core::Table, _>("backend unavailable".to_string())
        })
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}

fn banner_cache(store: &MemoryStore) -> CacheAside<CallArgs, GenericKey, ObjectCodec<String>> {
    CacheAside::new(
        Arc::new(store.clone()),
        "BANNER",
        GenericKey::new("BANNER::"),
        ObjectCodec::new(),
    )
}

#[tokio::test]
async fn test_non_finite_values_are_served_from_cache() {
    let store = MemoryStore::default();
    let cache: CacheAside<CallArgs, GenericKey, ObjectCodec<Vec<f64>>> = CacheAside::new(
        Arc::new(store.clone()),
        "RATE",
        GenericKey::new("RATE::"),
        ObjectCodec::new(),
    );
    let counter = FetchCounter::default();

    for _ in 0..3 {
        let fetch_counter = counter.clone();
        let rates = cache
            .get_or_fetch(CallArgs::new().arg("E09000033"), move |_| async move {
                fetch_counter.hit();
                Ok::<_, String>(vec![f64::NAN, 412.5, f64::INFINITY])
            })
            .await
            .unwrap();

        assert!(rates[0].is_nan());
        assert_eq!(rates[2], f64::INFINITY);
    }

    assert_eq!(counter.count(), 1);
    assert_eq!(store.writes(), 1);
    assert_eq!(cache.metrics().hits(), 2);
}

#[tokio::test]
async fn test_empty_fan_out_returns_no_results_without_io() {
    let store = MemoryStore::default();
    store.set_available(false);
    let cache = area_cache(&store);
    let counter = FetchCounter::default();

    let fetch_counter = counter.clone();
    let tables = cache
        .get_or_fetch_many(Vec::new(), move |query| {
            let counter = fetch_counter.clone();
            async move {
                counter.hit();
                Ok::<_, String>(area_rows(&query))
            }
        })
        .await
        .unwrap();

    assert!(tables.is_empty());
    assert_eq!(counter.count(), 0);
    assert_eq!(cache.metrics().probe_errors(), 0);
    assert_eq!(cache.metrics().misses(), 0);
}

#[tokio::test]
async fn test_fan_out_with_store_down_fetches_every_element_in_order() {
    let store = MemoryStore::default();
    let cache = banner_cache(&store);
    cache
        .get_or_fetch(CallArgs::new().arg("newCasesByPublishDate"), |_| async {
            Ok::<_, String>("cached:newCasesByPublishDate".to_string())
        })
        .await
        .unwrap();
    store.set_available(false);

    let metrics = ["newDeaths28DaysByPublishDate", "newCasesByPublishDate", "newAdmissions"];
    let items = metrics.iter().map(|m| CallArgs::new().arg(*m)).collect();
    let counter = FetchCounter::default();

    let fetch_counter = counter.clone();
    let values = cache
        .get_or_fetch_many(items, move |args: CallArgs| {
            let counter = fetch_counter.clone();
            async move {
                counter.hit();
                Ok::<_, String>(format!("fetched:{}", args.positional()[0]))
            }
        })
        .await
        .unwrap();

    assert_eq!(
        values,
        vec![
            "fetched:newDeaths28DaysByPublishDate".to_string(),
            "fetched:newCasesByPublishDate".to_string(),
            "fetched:newAdmissions".to_string(),
        ]
    );
    assert_eq!(counter.count(), 3);
    assert_eq!(cache.metrics().probe_errors(), 1);
    assert_eq!(cache.metrics().writeback_errors(), 3);
}

#[tokio::test]
async fn test_race_fill_with_store_down_returns_backend_value() {
    let store = MemoryStore::default();
    store.set_available(false);
    let cache = area_cache(&store);

    let rows = cache
        .race_fill(AreaQuery::overview("2021-01-04"), |query| async move {
            Ok::<_, String>(area_rows(&query))
        })
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);

    for _ in 0..100 {
        if cache.metrics().writeback_errors() == 1 && cache.metrics().probe_errors() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cache.metrics().writeback_errors(), 1);
    assert_eq!(cache.metrics().probe_errors(), 1);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_race_fill_backend_beats_slow_store() {
    let store = MemoryStore::default();
    let cache = banner_cache(&store);
    cache
        .get_or_fetch(CallArgs::new().arg("2021-01-04"), |_| async {
            Ok::<_, String>("old".to_string())
        })
        .await
        .unwrap();
    store.set_latency(Duration::from_millis(300));

    let value = cache
        .race_fill(CallArgs::new().arg("2021-01-04"), |_| async {
            Ok::<_, String>("fresh".to_string())
        })
        .await
        .unwrap();

    assert_eq!(value, "fresh");
}
