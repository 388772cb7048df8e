mod common;

use common::{synthetic_events, synthetic_table};
use quake_query::compute::spatial::haversine_km;
use quake_query::prelude::*;
use quake_query::{ProximityDetector, ProximityPair};

fn detect(table: &RecordTable, config: ProximityConfig) -> Vec<ProximityPair> {
    ProximityDetector::new(config)
        .expect("valid config")
        .detect(table)
        .expect("detection runs")
}

fn id_pairs(pairs: &[ProximityPair]) -> Vec<(String, String)> {
    let mut ids: Vec<_> = pairs
        .iter()
        .map(|p| (p.first.clone(), p.second.clone()))
        .collect();
    ids.sort();
    ids
}

/// Test 1: The worked example, one close pair and one far event
#[test]
fn test_close_pair_found_far_event_ignored() {
    let table = RecordTable::from_events(vec![
        EventRecord::new("a").at("2023-05-01 10:00:00").location(35.0, 139.0),
        EventRecord::new("b").at("2023-05-01 10:10:00").location(35.045, 139.0),
        EventRecord::new("c").at("2023-05-01 10:20:00").location(39.5, 139.0),
    ])
    .expect("valid events");

    let pairs = detect(&table, ProximityConfig::default());
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].first.as_str(), pairs[0].second.as_str()), ("a", "b"));
    assert!((pairs[0].distance_km - 5.0).abs() < 0.1);
    assert_eq!(pairs[0].gap(), chrono::TimeDelta::minutes(10));
}

/// Test 2: Both strategies agree, pair for pair and in order
#[test]
fn test_strategies_agree() {
    for seed in [1, 2, 3, 42] {
        let table = synthetic_table(600, seed);
        for distance in [5.0, 50.0, 120.0] {
            let config = ProximityConfig::default().with_max_distance_km(distance);
            let linear = detect(&table, config.with_index(ProximityIndex::LinearWindow));
            let spatial = detect(&table, config.with_index(ProximityIndex::SpatialWindow));
            assert_eq!(linear, spatial, "seed {} distance {}", seed, distance);
        }
    }
}

/// Test 3: Matches an exhaustive scan over every pair of valid events
#[test]
fn test_matches_exhaustive_scan() {
    let events = synthetic_events(250, 9);
    let table = RecordTable::from_events(events.clone()).expect("valid events");
    let config = ProximityConfig::default();
    let max_gap = chrono::TimeDelta::minutes(60);

    let valid: Vec<_> = events
        .iter()
        .filter_map(|e| {
            let (time, lat, lon) = (e.time?, e.latitude?, e.longitude?);
            let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
            in_range.then(|| (e.id.clone(), time, lat, lon))
        })
        .collect();

    let mut expected = Vec::new();
    for a in &valid {
        for b in &valid {
            let (id1, t1, lat1, lon1) = a;
            let (id2, t2, lat2, lon2) = b;
            if t1 < t2
                && *t2 - *t1 <= max_gap
                && haversine_km(*lat1, *lon1, *lat2, *lon2) <= config.max_distance_km
            {
                expected.push((id1.clone(), id2.clone()));
            }
        }
    }
    expected.sort();

    assert!(!expected.is_empty());
    assert_eq!(id_pairs(&detect(&table, config)), expected);
}

/// Test 4: Every reported pair honors both thresholds and strict time order
#[test]
fn test_pairs_respect_bounds() {
    let table = synthetic_table(800, 17);
    let config = ProximityConfig::default()
        .with_max_distance_km(30.0)
        .with_max_gap_minutes(45.0);
    let pairs = detect(&table, config);

    for pair in &pairs {
        assert!(pair.first_time < pair.second_time);
        assert!(pair.gap() <= chrono::TimeDelta::minutes(45));
        assert!(pair.distance_km <= 30.0);
    }
    for window in pairs.windows(2) {
        assert!(window[0].first_time <= window[1].first_time);
    }
}

/// Test 5: Loosening either threshold never loses a pair
#[test]
fn test_looser_thresholds_are_supersets() {
    let table = synthetic_table(500, 23);
    let tight = id_pairs(&detect(
        &table,
        ProximityConfig::default()
            .with_max_distance_km(20.0)
            .with_max_gap_minutes(30.0),
    ));
    let wider = id_pairs(&detect(
        &table,
        ProximityConfig::default()
            .with_max_distance_km(80.0)
            .with_max_gap_minutes(30.0),
    ));
    let longer = id_pairs(&detect(
        &table,
        ProximityConfig::default()
            .with_max_distance_km(20.0)
            .with_max_gap_minutes(120.0),
    ));

    assert!(tight.len() <= wider.len());
    assert!(tight.iter().all(|p| wider.binary_search(p).is_ok()));
    assert!(tight.iter().all(|p| longer.binary_search(p).is_ok()));
}

/// Test 6: Events with equal timestamps are never paired with each other
#[test]
fn test_simultaneous_events_not_paired() {
    let table = RecordTable::from_events(vec![
        EventRecord::new("x").at("2023-01-01 00:00:00").location(10.0, 10.0),
        EventRecord::new("y").at("2023-01-01 00:00:00").location(10.0, 10.0),
        EventRecord::new("z").at("2023-01-01 00:05:00").location(10.0, 10.0),
    ])
    .expect("valid events");

    for index in [ProximityIndex::LinearWindow, ProximityIndex::SpatialWindow] {
        let pairs = detect(&table, ProximityConfig::default().with_index(index));
        assert_eq!(
            id_pairs(&pairs),
            vec![
                ("x".to_string(), "z".to_string()),
                ("y".to_string(), "z".to_string())
            ]
        );
    }
}
