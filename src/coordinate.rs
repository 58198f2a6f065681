use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    // No range check, callers are trusted.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    pub fn lat(&self) -> f64 {
        self.latitude
    }

    pub fn lng(&self) -> f64 {
        self.longitude
    }
}

/// A single reading from the position sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    pub timestamp_ms: Option<i64>,
    pub accuracy: Option<f32>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Position {
            coordinate: Coordinate::new(latitude, longitude),
            timestamp_ms: None,
            accuracy: None,
        }
    }
}

impl From<&Position> for Coordinate {
    fn from(position: &Position) -> Self {
        position.coordinate
    }
}
