use std::str::FromStr;

use crate::coordinate::Coordinate;

/* Everything the trip controller needs from the mapping provider and the
position sensor. Rendering calls are synchronous and return handles. Position
and geocoding requests are fire-and-forget: the host completes them later by
calling back into the controller with the same `Ticket`.
*/

/// The two halves of a trip. Each one has its own map surface, address and
/// date/time fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Phase {
    #[strum(to_string = "departure")]
    Departure,
    #[strum(to_string = "arrival")]
    Arrival,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MapHandle(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Request {
    ShowMap,
    PositionUpdate,
    ReverseGeocode(Phase),
    ForwardGeocode(Phase),
}

/// Identifies an in-flight request. `generation` is the controller's lifecycle
/// generation when the request was issued.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub generation: u64,
    pub request: Request,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum SensorError {
    #[strum(to_string = "User denied the request for Geolocation.")]
    PermissionDenied,
    #[strum(to_string = "Location information is unavailable.")]
    PositionUnavailable,
    #[strum(to_string = "The request to get user location timed out.")]
    Timeout,
    #[strum(to_string = "An unknown error occurred.")]
    Unknown,
}

impl std::error::Error for SensorError {}

// W3C geolocation error codes
impl From<i32> for SensorError {
    fn from(code: i32) -> Self {
        match code {
            1 => SensorError::PermissionDenied,
            2 => SensorError::PositionUnavailable,
            3 => SensorError::Timeout,
            _ => SensorError::Unknown,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
pub enum GeocodeStatus {
    #[strum(serialize = "OK")]
    Ok,
    #[strum(serialize = "ZERO_RESULTS")]
    ZeroResults,
    #[strum(serialize = "OVER_QUERY_LIMIT")]
    OverQueryLimit,
    #[strum(serialize = "REQUEST_DENIED")]
    RequestDenied,
    #[strum(serialize = "INVALID_REQUEST")]
    InvalidRequest,
    #[strum(serialize = "UNKNOWN_ERROR")]
    UnknownError,
}

impl GeocodeStatus {
    /// Unrecognized provider statuses are treated as `UnknownError`.
    pub fn parse(status: &str) -> Self {
        GeocodeStatus::from_str(status).unwrap_or(GeocodeStatus::UnknownError)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeocodeError {
    Status(GeocodeStatus),
    NoResult,
}

impl std::fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeocodeError::Status(status) => write!(f, "geocoder failed with status {}", status),
            GeocodeError::NoResult => write!(f, "No address found"),
        }
    }
}

impl std::error::Error for GeocodeError {}

#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub location: Coordinate,
}

pub fn first_formatted_address(
    status: GeocodeStatus,
    results: &[GeocodeResult],
) -> Result<String, GeocodeError> {
    first_result(status, results).map(|x| x.formatted_address.clone())
}

pub fn first_location(
    status: GeocodeStatus,
    results: &[GeocodeResult],
) -> Result<Coordinate, GeocodeError> {
    first_result(status, results).map(|x| x.location)
}

fn first_result(
    status: GeocodeStatus,
    results: &[GeocodeResult],
) -> Result<&GeocodeResult, GeocodeError> {
    match status {
        GeocodeStatus::Ok => results.first().ok_or(GeocodeError::NoResult),
        GeocodeStatus::ZeroResults => Err(GeocodeError::NoResult),
        other => Err(GeocodeError::Status(other)),
    }
}

pub trait MapFacade {
    fn request_position(&mut self, ticket: Ticket);

    /// Always creates a new map view centered on `center`.
    fn render_map(&mut self, center: Coordinate, surface: Phase, zoom: u8) -> MapHandle;

    fn render_marker(&mut self, at: Coordinate, map: MapHandle) -> MarkerHandle;

    fn pan_to(&mut self, map: MapHandle, at: Coordinate);

    fn move_marker(&mut self, marker: MarkerHandle, at: Coordinate);

    /// Identical endpoints draw a zero-length segment.
    fn draw_segment(&mut self, map: MapHandle, from: Coordinate, to: Coordinate);

    fn reverse_geocode(&mut self, ticket: Ticket, at: Coordinate);

    fn forward_geocode(&mut self, ticket: Ticket, address: &str);
}
