pub mod test_utils;

use assert_float_eq::assert_float_absolute_eq;
use triplog_core::{
    coordinate::Coordinate,
    kv_store::{KeyValueStore, MemoryStore},
    waypoint_store::{PlaceAndTime, TripInfo, WaypointStore},
};

fn new_store() -> WaypointStore<MemoryStore> {
    WaypointStore::new(MemoryStore::new())
}

#[test]
fn storage_is_empty() {
    let store = new_store();
    assert!(store.is_empty());
    assert_eq!(store.count(), 0);
    assert!(store.get_all_waypoints().is_empty());
}

#[test]
fn store_two_waypoints() {
    let mut store = new_store();
    store.append(Some(Coordinate::new(59.0, 10.0)));
    store.append(Some(Coordinate::new(59.1, 10.1)));
    assert!(!store.is_empty());
    assert_eq!(store.count(), 2);

    let waypoints = store.get_all_waypoints();
    assert_eq!(waypoints.len(), 2);
    assert_float_absolute_eq!(waypoints[0].lat(), 59.0, 0.0);
    assert_float_absolute_eq!(waypoints[0].lng(), 10.0, 0.0);
    assert_eq!(waypoints[1], Coordinate::new(59.1, 10.1));

    store.remove_all_waypoints();
    assert!(store.is_empty());
}

#[test]
fn append_keeps_order_and_exact_values() {
    let mut store = new_store();
    let input: Vec<Coordinate> = (0..50)
        .map(|i| {
            Coordinate::new(
                59.95909859999999 + i as f64 * 0.0001,
                10.6257567 - i as f64 / 3.0,
            )
        })
        .collect();
    for (i, coordinate) in input.iter().enumerate() {
        store.append(Some(*coordinate));
        assert_eq!(store.count(), i + 1);
    }
    assert_eq!(store.get_all_waypoints(), input);
}

#[test]
fn append_none_is_noop() {
    let mut store = new_store();
    store.append(None);
    assert!(store.is_empty());
    assert!(store.backend().unwrap().is_empty());
}

#[test]
fn key_layout() {
    let mut store = new_store();
    store.append(Some(Coordinate::new(59.0, 10.0)));
    store.set_trip_info("Ola", "Kundebesøk", true);
    let backend = store.backend().unwrap();
    assert_eq!(
        backend.get_item("triplog.waypoint.length").unwrap(),
        Some("1".to_string())
    );
    assert_eq!(
        backend.get_item("triplog.waypoint.0.lat").unwrap(),
        Some("59".to_string())
    );
    assert_eq!(
        backend.get_item("triplog.waypoint.0.lng").unwrap(),
        Some("10".to_string())
    );
    let trip_info: serde_json::Value =
        serde_json::from_str(&backend.get_item("triplog.tripInfo").unwrap().unwrap()).unwrap();
    assert_eq!(
        trip_info,
        serde_json::json!({"name": "Ola", "purpose": "Kundebesøk", "travelAbroad": true})
    );
}

#[test]
fn store_and_get_departure_info() {
    let mut store = new_store();
    assert_eq!(store.get_departure(), None);
    store.set_departure("Storgata 1, 0001 Oslo, Norway", "01-01-2015", "09:00:00");
    let departure = store.get_departure().unwrap();
    assert_eq!(departure.address, "Storgata 1, 0001 Oslo, Norway");
    assert_eq!(departure.date, "01-01-2015");
    assert_eq!(departure.time, "09:00:00");
}

#[test]
fn trip_info_and_arrival_are_overwritten_wholesale() {
    let mut store = new_store();
    store.set_trip_info("Navn", "Reiseplan", false);
    store.set_trip_info("Kari", "Møte", true);
    assert_eq!(
        store.get_trip_info(),
        Some(TripInfo {
            name: "Kari".to_string(),
            purpose: "Møte".to_string(),
            travel_abroad: true,
        })
    );

    store.set_arrival("Bergen", "02-01-2015", "17:00:00");
    assert_eq!(
        store.get_arrival(),
        Some(PlaceAndTime {
            address: "Bergen".to_string(),
            date: "02-01-2015".to_string(),
            time: "17:00:00".to_string(),
        })
    );
}

#[test]
fn clear_all_removes_everything() {
    let mut store = new_store();
    for i in 0..7 {
        store.append(Some(Coordinate::new(i as f64, -(i as f64))));
    }
    store.set_trip_info("Kari", "Møte", true);
    store.set_departure("Oslo", "01-01-2015", "09:00:00");
    store.set_arrival("Bergen", "01-01-2015", "17:00:00");

    store.clear_all();
    assert!(store.is_empty());
    assert_eq!(store.count(), 0);
    assert_eq!(store.get_trip_info(), None);
    assert_eq!(store.get_departure(), None);
    assert_eq!(store.get_arrival(), None);
    assert!(store.backend().unwrap().is_empty());

    // clearing an empty store is fine as well
    store.clear_all();
    assert!(store.is_empty());
}

#[test]
fn unavailable_storage_returns_defaults() {
    let mut store: WaypointStore<MemoryStore> = WaypointStore::unavailable();
    store.append(Some(Coordinate::new(59.0, 10.0)));
    store.set_trip_info("Kari", "Møte", true);
    store.set_departure("Oslo", "01-01-2015", "09:00:00");
    assert!(!store.is_available());
    assert!(store.is_empty());
    assert_eq!(store.count(), 0);
    assert!(store.get_all_waypoints().is_empty());
    assert_eq!(store.get_trip_info(), None);
    assert_eq!(store.get_departure(), None);
    assert_eq!(store.repair(), 0);
    store.clear_all();
}

#[test]
fn corrupted_records_read_as_absent() {
    let mut backend = MemoryStore::new();
    backend.set_item("triplog.waypoint.length", "abc").unwrap();
    backend.set_item("triplog.depInfo", "{not json").unwrap();
    let store = WaypointStore::new(backend);
    assert!(!store.is_empty());
    assert_eq!(store.count(), 0);
    assert_eq!(store.get_departure(), None);
}

#[test]
fn repair_removes_torn_append() {
    let mut store = new_store();
    store.append(Some(Coordinate::new(59.0, 10.0)));
    store.append(Some(Coordinate::new(59.1, 10.1)));
    // an append that died before bumping the length
    let backend = store.backend_mut().unwrap();
    backend.set_item("triplog.waypoint.2.lat", "59.2").unwrap();

    assert_eq!(store.repair(), 1);
    assert_eq!(store.count(), 2);
    assert_eq!(
        store.backend().unwrap().get_item("triplog.waypoint.2.lat").unwrap(),
        None
    );

    // the next append reuses the index cleanly
    store.append(Some(Coordinate::new(59.3, 10.3)));
    assert_eq!(store.get_all_waypoints()[2], Coordinate::new(59.3, 10.3));
    assert_eq!(store.repair(), 0);
}

#[test]
fn repair_trims_to_contiguous_prefix() {
    let mut store = new_store();
    for i in 0..5 {
        store.append(Some(Coordinate::new(59.0 + i as f64, 10.0)));
    }
    store
        .backend_mut()
        .unwrap()
        .remove_item("triplog.waypoint.2.lng")
        .unwrap();
    assert_eq!(store.get_all_waypoints().len(), 4);

    assert_eq!(store.repair(), 3);
    assert_eq!(store.count(), 2);
    assert_eq!(
        store.get_all_waypoints(),
        vec![Coordinate::new(59.0, 10.0), Coordinate::new(60.0, 10.0)]
    );
}

#[test]
fn repair_of_fully_broken_sequence_empties_it() {
    let mut backend = MemoryStore::new();
    backend.set_item("triplog.waypoint.length", "1").unwrap();
    backend.set_item("triplog.waypoint.0.lat", "x").unwrap();
    let mut store = WaypointStore::new(backend);
    assert_eq!(store.repair(), 1);
    assert!(store.is_empty());
}
