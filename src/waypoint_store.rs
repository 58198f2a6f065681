use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::kv_store::KeyValueStore;

/* Persistence for one trip session on top of a flat key-value store:

`triplog.waypoint.length` is the number of stored waypoints, and each waypoint
`i` is two scalar keys `triplog.waypoint.{i}.lat` / `.lng`. Indices are always
contiguous from 0. Trip, departure and arrival info are JSON blobs.

A store without a backend means storage is not available. Every operation is
then a no-op that returns a safe default. Backend errors are logged and
treated the same way.
*/

const LENGTH_KEY: &str = "triplog.waypoint.length";
const TRIP_INFO_KEY: &str = "triplog.tripInfo";
const DEPARTURE_KEY: &str = "triplog.depInfo";
const ARRIVAL_KEY: &str = "triplog.arrInfo";

fn lat_key(index: usize) -> String {
    format!("triplog.waypoint.{}.lat", index)
}

fn lng_key(index: usize) -> String {
    format!("triplog.waypoint.{}.lng", index)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripInfo {
    pub name: String,
    pub purpose: String,
    pub travel_abroad: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceAndTime {
    pub address: String,
    pub date: String,
    pub time: String,
}

pub struct WaypointStore<S: KeyValueStore> {
    backend: Option<S>,
}

impl<S: KeyValueStore> WaypointStore<S> {
    pub fn new(backend: S) -> Self {
        WaypointStore {
            backend: Some(backend),
        }
    }

    pub fn unavailable() -> Self {
        WaypointStore { backend: None }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&S> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut S> {
        self.backend.as_mut()
    }

    fn get(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get_item(key) {
            Ok(value) => value,
            Err(error) => {
                warn!("[waypoint_store] failed to read {}: {}", key, error);
                None
            }
        }
    }

    fn write<F>(&mut self, what: &str, f: F)
    where
        F: FnOnce(&mut S) -> Result<()>,
    {
        if let Some(backend) = self.backend.as_mut() {
            if let Err(error) = f(backend) {
                warn!("[waypoint_store] failed to {}: {}", what, error);
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_str(&value) {
            Ok(v) => Some(v),
            Err(error) => {
                warn!("[waypoint_store] invalid json in {}: {}", key, error);
                None
            }
        }
    }

    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.write(key, |backend| backend.set_item(key, &json)),
            Err(error) => warn!("[waypoint_store] failed to serialize {}: {}", key, error),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.get(LENGTH_KEY).is_none()
    }

    pub fn count(&self) -> usize {
        match self.get(LENGTH_KEY) {
            None => 0,
            Some(s) => s.trim().parse().unwrap_or_else(|_| {
                warn!("[waypoint_store] invalid waypoint length: {:?}", s);
                0
            }),
        }
    }

    pub fn append(&mut self, coordinate: Option<Coordinate>) {
        let coordinate = match coordinate {
            Some(coordinate) if self.is_available() => coordinate,
            _ => return,
        };
        let index = self.count();
        // fields before length, so a torn write leaves an uncounted orphan
        // that `repair` removes, never a counted hole
        let items = [
            (lat_key(index), coordinate.latitude.to_string()),
            (lng_key(index), coordinate.longitude.to_string()),
            (LENGTH_KEY.to_string(), (index + 1).to_string()),
        ];
        self.write("append waypoint", |backend| backend.set_items(&items));
    }

    fn read_waypoint(&self, index: usize) -> Option<Coordinate> {
        let lat = self.get(&lat_key(index))?.parse().ok()?;
        let lng = self.get(&lng_key(index))?.parse().ok()?;
        Some(Coordinate::new(lat, lng))
    }

    pub fn get_all_waypoints(&self) -> Vec<Coordinate> {
        if !self.is_available() || self.is_empty() {
            return Vec::new();
        }
        let count = self.count();
        let mut waypoints = Vec::with_capacity(count);
        for i in 0..count {
            match self.read_waypoint(i) {
                Some(coordinate) => waypoints.push(coordinate),
                None => warn!("[waypoint_store] waypoint {} is missing or invalid", i),
            }
        }
        waypoints
    }

    pub fn remove_all_waypoints(&mut self) {
        let count = self.count();
        self.write("remove waypoints", |backend| {
            for i in 0..count {
                backend.remove_item(&lat_key(i))?;
                backend.remove_item(&lng_key(i))?;
            }
            backend.remove_item(LENGTH_KEY)
        });
    }

    pub fn clear_all(&mut self) {
        self.remove_all_waypoints();
        self.write("remove trip data", |backend| {
            backend.remove_item(TRIP_INFO_KEY)?;
            backend.remove_item(DEPARTURE_KEY)?;
            backend.remove_item(ARRIVAL_KEY)
        });
    }

    /// Trims the waypoint sequence to its longest readable contiguous prefix
    /// and removes anything written past it. Returns the number of dropped
    /// indices.
    pub fn repair(&mut self) -> usize {
        if !self.is_available() || self.is_empty() {
            return 0;
        }
        let count = self.count();
        let valid = (0..count)
            .take_while(|i| self.read_waypoint(*i).is_some())
            .count();
        // an append torn before the length write leaves fields at `count`
        let mut last = count;
        while self.get(&lat_key(last)).is_some() || self.get(&lng_key(last)).is_some() {
            last += 1;
        }
        let dropped = last - valid;
        if dropped == 0 {
            return 0;
        }
        warn!(
            "[waypoint_store] repairing waypoints: length={}, valid={}, dropped={}",
            count, valid, dropped
        );
        self.write("repair waypoints", |backend| {
            for i in valid..last {
                backend.remove_item(&lat_key(i))?;
                backend.remove_item(&lng_key(i))?;
            }
            if valid == 0 {
                backend.remove_item(LENGTH_KEY)
            } else {
                backend.set_item(LENGTH_KEY, &valid.to_string())
            }
        });
        dropped
    }

    pub fn set_trip_info(&mut self, name: &str, purpose: &str, travel_abroad: bool) {
        let trip_info = TripInfo {
            name: name.to_string(),
            purpose: purpose.to_string(),
            travel_abroad,
        };
        self.set_json(TRIP_INFO_KEY, &trip_info);
    }

    pub fn get_trip_info(&self) -> Option<TripInfo> {
        self.get_json(TRIP_INFO_KEY)
    }

    pub fn set_departure(&mut self, address: &str, date: &str, time: &str) {
        let info = PlaceAndTime {
            address: address.to_string(),
            date: date.to_string(),
            time: time.to_string(),
        };
        self.set_json(DEPARTURE_KEY, &info);
    }

    pub fn get_departure(&self) -> Option<PlaceAndTime> {
        self.get_json(DEPARTURE_KEY)
    }

    pub fn set_arrival(&mut self, address: &str, date: &str, time: &str) {
        let info = PlaceAndTime {
            address: address.to_string(),
            date: date.to_string(),
            time: time.to_string(),
        };
        self.set_json(ARRIVAL_KEY, &info);
    }

    pub fn get_arrival(&self) -> Option<PlaceAndTime> {
        self.get_json(ARRIVAL_KEY)
    }
}
