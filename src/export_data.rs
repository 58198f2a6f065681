use std::io::Write;

use anyhow::Result;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::coordinate::Coordinate;
use crate::trip_controller::TripSummary;

fn waypoint_of_coordinate(coordinate: &Coordinate) -> Waypoint {
    // geo points are (x, y) = (lng, lat)
    Waypoint::new(Point::new(coordinate.longitude, coordinate.latitude))
}

/// The route becomes a single track segment. The first and last waypoints are
/// also emitted as named GPX waypoints carrying the departure and arrival
/// addresses.
pub fn trip_summary_to_gpx(summary: &TripSummary) -> Gpx {
    let points = summary.waypoints.iter().map(waypoint_of_coordinate).collect();

    let mut waypoints = Vec::new();
    if let Some(first) = summary.waypoints.first() {
        let mut waypoint = waypoint_of_coordinate(first);
        waypoint.name = Some(summary.departure.address.clone());
        waypoints.push(waypoint);
    }
    if let Some(last) = summary.waypoints.last() {
        let mut waypoint = waypoint_of_coordinate(last);
        waypoint.name = Some(summary.arrival.address.clone());
        waypoints.push(waypoint);
    }

    let track = Track {
        name: Some(summary.trip_info.name.clone()),
        comment: None,
        description: Some(summary.trip_info.purpose.clone()),
        source: None,
        links: vec![],
        type_: None,
        number: None,
        segments: vec![TrackSegment { points }],
    };
    Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("triplog".to_string()),
        metadata: None,
        waypoints,
        tracks: vec![track],
        routes: vec![],
    }
}

pub fn write_gpx<W: Write>(summary: &TripSummary, writer: W) -> Result<()> {
    let gpx = trip_summary_to_gpx(summary);
    gpx::write(&gpx, writer).map_err(|e| anyhow!("failed to write gpx: {}", e))?;
    Ok(())
}
