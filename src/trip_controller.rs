use std::fmt::Write;
use std::time::Duration;

use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::Serialize;

use crate::config::TripConfig;
use crate::coordinate::{Coordinate, Position};
use crate::kv_store::KeyValueStore;
use crate::map_facade::{
    GeocodeError, MapFacade, MapHandle, MarkerHandle, Phase, Request, SensorError, Ticket,
};
use crate::waypoint_store::{PlaceAndTime, TripInfo, WaypointStore};

/* The trip lifecycle:

  Init ──start()──> Started ──stop()──> Stopped
    │                  ^
    └──initialize() with a non-empty store (resume)

`Init` tracks the departure phase and `Started` the arrival phase. Each phase
has one latch for the address and one for date/time; once the user edits a
field by hand the latch trips and timers never overwrite that field again.

Requests to the facade carry a `Ticket` with the current generation. Every
lifecycle transition bumps the generation, so a completion that arrives after
e.g. `stop()` is recognized as stale and dropped.
*/

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum TripState {
    Init,
    Started,
    Stopped,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Clock,
    Position,
}

pub trait Timers {
    /// Starts (or replaces) a repeating timer.
    fn start(&mut self, timer: TimerKind, period: Duration);

    fn cancel(&mut self, timer: TimerKind);
}

/// Everything the UI shows. The controller owns it and pushes a fresh
/// snapshot to the `ViewListener` after each change.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripView {
    pub start_button: String,
    pub stop_button: String,
    pub name: String,
    pub purpose: String,
    pub travel_abroad: bool,
    pub departure: PlaceAndTime,
    pub arrival: PlaceAndTime,
    pub is_start_button_visible: bool,
    pub is_stop_button_visible: bool,
    pub is_departure_visible: bool,
    pub is_arrival_visible: bool,
    pub notice: Option<String>,
}

impl TripView {
    fn new(config: &TripConfig) -> Self {
        let labels = &config.labels;
        TripView {
            start_button: labels.start_button.clone(),
            stop_button: labels.stop_button.clone(),
            name: labels.name.clone(),
            purpose: labels.purpose.clone(),
            travel_abroad: false,
            departure: PlaceAndTime {
                address: labels.departure_address.clone(),
                date: labels.departure_date.clone(),
                time: labels.departure_time.clone(),
            },
            arrival: PlaceAndTime {
                address: labels.arrival_address.clone(),
                date: labels.arrival_date.clone(),
                time: labels.arrival_time.clone(),
            },
            is_start_button_visible: false,
            is_stop_button_visible: false,
            is_departure_visible: true,
            is_arrival_visible: false,
            notice: None,
        }
    }

    pub fn fields(&self, phase: Phase) -> &PlaceAndTime {
        match phase {
            Phase::Departure => &self.departure,
            Phase::Arrival => &self.arrival,
        }
    }

    fn fields_mut(&mut self, phase: Phase) -> &mut PlaceAndTime {
        match phase {
            Phase::Departure => &mut self.departure,
            Phase::Arrival => &mut self.arrival,
        }
    }
}

pub trait ViewListener {
    fn render(&mut self, view: &TripView);
}

impl<F: FnMut(&TripView)> ViewListener for F {
    fn render(&mut self, view: &TripView) {
        self(view)
    }
}

/// What is left of a trip once it is stopped.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub trip_info: TripInfo,
    pub departure: PlaceAndTime,
    pub arrival: PlaceAndTime,
    pub waypoints: Vec<Coordinate>,
}

#[derive(Copy, Clone, Debug)]
struct AutoUpdate {
    address: bool,
    date_time: bool,
}

impl AutoUpdate {
    fn new() -> Self {
        AutoUpdate {
            address: true,
            date_time: true,
        }
    }
}

pub struct TripController<F: MapFacade, S: KeyValueStore, T: Timers> {
    facade: F,
    store: WaypointStore<S>,
    timers: T,
    config: TripConfig,
    state: TripState,
    generation: u64,
    view: TripView,
    departure_auto: AutoUpdate,
    arrival_auto: AutoUpdate,
    map: Option<MapHandle>,
    marker: Option<MarkerHandle>,
    last_coordinate: Option<Coordinate>,
    summary: Option<TripSummary>,
    listener: Option<Box<dyn ViewListener>>,
}

impl<F: MapFacade, S: KeyValueStore, T: Timers> TripController<F, S, T> {
    pub fn new(facade: F, store: WaypointStore<S>, timers: T, config: TripConfig) -> Self {
        let view = TripView::new(&config);
        TripController {
            facade,
            store,
            timers,
            config,
            state: TripState::Init,
            generation: 0,
            view,
            departure_auto: AutoUpdate::new(),
            arrival_auto: AutoUpdate::new(),
            map: None,
            marker: None,
            last_coordinate: None,
            summary: None,
            listener: None,
        }
    }

    pub fn set_listener<L: ViewListener + 'static>(&mut self, listener: L) {
        self.listener = Some(Box::new(listener));
    }

    pub fn state(&self) -> TripState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> &TripView {
        &self.view
    }

    pub fn facade(&self) -> &F {
        &self.facade
    }

    pub fn store(&self) -> &WaypointStore<S> {
        &self.store
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    pub fn config(&self) -> &TripConfig {
        &self.config
    }

    pub fn last_coordinate(&self) -> Option<Coordinate> {
        self.last_coordinate
    }

    /// Set by `stop()`.
    pub fn summary(&self) -> Option<&TripSummary> {
        self.summary.as_ref()
    }

    /// `None` once the trip is stopped.
    pub fn active_phase(&self) -> Option<Phase> {
        match self.state {
            TripState::Init => Some(Phase::Departure),
            TripState::Started => Some(Phase::Arrival),
            TripState::Stopped => None,
        }
    }

    fn auto(&self, phase: Phase) -> &AutoUpdate {
        match phase {
            Phase::Departure => &self.departure_auto,
            Phase::Arrival => &self.arrival_auto,
        }
    }

    fn auto_mut(&mut self, phase: Phase) -> &mut AutoUpdate {
        match phase {
            Phase::Departure => &mut self.departure_auto,
            Phase::Arrival => &mut self.arrival_auto,
        }
    }

    fn ticket(&self, request: Request) -> Ticket {
        Ticket {
            generation: self.generation,
            request,
        }
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        if ticket.generation != self.generation {
            debug!(
                "[trip] dropping stale completion: {:?}, current generation = {}",
                ticket, self.generation
            );
            return false;
        }
        true
    }

    fn notify(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener.render(&self.view);
        }
    }

    fn restart_timers(&mut self) {
        self.stop_timers();
        self.timers
            .start(TimerKind::Clock, self.config.clock_interval);
        self.timers
            .start(TimerKind::Position, self.config.position_interval);
    }

    fn stop_timers(&mut self) {
        self.timers.cancel(TimerKind::Clock);
        self.timers.cancel(TimerKind::Position);
    }

    fn persist_progress(&mut self) {
        self.store
            .set_trip_info(&self.view.name, &self.view.purpose, self.view.travel_abroad);
        let departure = &self.view.departure;
        self.store
            .set_departure(&departure.address, &departure.date, &departure.time);
    }

    pub fn initialize(&mut self) {
        info!("[trip] initialize");
        self.state = TripState::Init;
        self.generation += 1;

        self.store.repair();
        if !self.store.is_empty() {
            self.resume();
        } else {
            let ticket = self.ticket(Request::ShowMap);
            self.facade.request_position(ticket);
        }
        self.notify();
    }

    fn resume(&mut self) {
        self.state = TripState::Started;

        match self.store.get_trip_info() {
            Some(trip_info) => {
                self.view.name = trip_info.name;
                self.view.purpose = trip_info.purpose;
                self.view.travel_abroad = trip_info.travel_abroad;
            }
            None => warn!("[trip] resuming without stored trip info"),
        }
        match self.store.get_departure() {
            Some(departure) => self.view.departure = departure,
            None => warn!("[trip] resuming without stored departure info"),
        }
        if let Some(arrival) = self.store.get_arrival() {
            self.view.arrival = arrival;
        }
        let waypoints = self.store.get_all_waypoints();
        self.last_coordinate = waypoints.last().copied();
        info!("[trip] resuming trip with {} waypoints", waypoints.len());

        self.view.is_departure_visible = false;
        self.view.is_arrival_visible = true;
        self.view.is_start_button_visible = false;

        let ticket = self.ticket(Request::ShowMap);
        self.facade.request_position(ticket);
    }

    pub fn start(&mut self) {
        if self.state != TripState::Init {
            warn!("[trip] `start` ignored, state = {}", self.state);
            return;
        }
        info!("[trip] start");
        self.state = TripState::Started;
        self.generation += 1;
        self.stop_timers();

        self.view.is_departure_visible = false;
        self.view.is_arrival_visible = true;
        self.view.is_start_button_visible = false;
        self.view.notice = None;

        self.store.clear_all();
        self.persist_progress();
        self.store.append(self.last_coordinate);

        let ticket = self.ticket(Request::ShowMap);
        self.facade.request_position(ticket);
        self.notify();
    }

    pub fn stop(&mut self) {
        if self.state == TripState::Stopped {
            debug!("[trip] already stopped");
            return;
        }
        self.stop_timers();
        self.state = TripState::Stopped;
        self.generation += 1;

        let summary = TripSummary {
            trip_info: TripInfo {
                name: self.view.name.clone(),
                purpose: self.view.purpose.clone(),
                travel_abroad: self.view.travel_abroad,
            },
            departure: self.view.departure.clone(),
            arrival: self.view.arrival.clone(),
            waypoints: self.store.get_all_waypoints(),
        };
        info!(
            "[trip] stop: name={}, purpose={}, travel_abroad={}, departure={:?}, arrival={:?}, waypoints={}",
            summary.trip_info.name,
            summary.trip_info.purpose,
            summary.trip_info.travel_abroad,
            summary.departure,
            summary.arrival,
            summary.waypoints.len()
        );
        self.summary = Some(summary);

        self.store.clear_all();
        self.view.stop_button = self.config.labels.stop_accepted.clone();
        self.notify();
    }

    fn render_surface(&mut self, phase: Phase, center: Coordinate) -> MapHandle {
        let map = self.facade.render_map(center, phase, self.config.map_zoom);
        self.marker = Some(self.facade.render_marker(center, map));
        self.map = Some(map);

        if self.state == TripState::Started {
            let waypoints = self.store.get_all_waypoints();
            if waypoints.len() > 1 {
                debug!("[trip] draw stored waypoints: {}", waypoints.len());
                for (from, to) in waypoints.iter().tuple_windows() {
                    self.facade.draw_segment(map, *from, *to);
                }
            }
        }
        map
    }

    fn show_map(&mut self, coordinate: Coordinate) {
        let phase = match self.active_phase() {
            Some(phase) => phase,
            None => return,
        };
        self.render_surface(phase, coordinate);
        if self.state == TripState::Init {
            self.last_coordinate = Some(coordinate);
        }
        self.restart_timers();
    }

    fn show_default_map(&mut self, error: SensorError) {
        let phase = match self.active_phase() {
            Some(phase) => phase,
            None => return,
        };
        warn!("[trip] no position for the {} map: {}", phase, error);
        self.render_surface(phase, self.config.default_coordinate);

        self.stop_timers();
        self.timers
            .start(TimerKind::Clock, self.config.clock_interval);

        let labels = &self.config.labels;
        self.view.notice = Some(match phase {
            Phase::Departure => labels.departure_address_manual.clone(),
            Phase::Arrival => labels.arrival_address_manual.clone(),
        });
    }

    fn update_position(&mut self, coordinate: Coordinate) {
        let phase = match self.active_phase() {
            Some(phase) => phase,
            None => return,
        };
        debug!("[trip] update position: {:?}", coordinate);

        if self.auto(phase).address {
            if let Some(map) = self.map {
                self.facade.pan_to(map, coordinate);
            }
            if let Some(marker) = self.marker {
                self.facade.move_marker(marker, coordinate);
            }
            let ticket = self.ticket(Request::ReverseGeocode(phase));
            self.facade.reverse_geocode(ticket, coordinate);
        }

        if self.state == TripState::Started {
            self.persist_progress();
            let arrival = &self.view.arrival;
            self.store
                .set_arrival(&arrival.address, &arrival.date, &arrival.time);
            self.store.append(Some(coordinate));
            if let (Some(last), Some(map)) = (self.last_coordinate, self.map) {
                self.facade.draw_segment(map, last, coordinate);
            }
        }

        self.last_coordinate = Some(coordinate);
    }

    fn set_address(&mut self, phase: Phase, address: String) {
        if self.active_phase() != Some(phase) || !self.auto(phase).address {
            debug!("[trip] ignoring geocoded {} address", phase);
            return;
        }
        self.view.fields_mut(phase).address = address;
        match phase {
            Phase::Departure => self.view.is_start_button_visible = true,
            Phase::Arrival => self.view.is_stop_button_visible = true,
        }
    }

    pub fn on_position_tick(&mut self) {
        if self.state == TripState::Stopped {
            return;
        }
        let ticket = self.ticket(Request::PositionUpdate);
        self.facade.request_position(ticket);
    }

    pub fn on_clock_tick(&mut self, now: NaiveDateTime) {
        let phase = match self.active_phase() {
            Some(phase) => phase,
            None => return,
        };
        if !self.auto(phase).date_time {
            return;
        }
        let mut date = String::new();
        let mut time = String::new();
        if write!(date, "{}", now.format(&self.config.date_format)).is_err()
            || write!(time, "{}", now.format(&self.config.time_format)).is_err()
        {
            warn!(
                "[trip] invalid date/time format: {:?} / {:?}",
                self.config.date_format, self.config.time_format
            );
            return;
        }
        let fields = self.view.fields_mut(phase);
        fields.date = date;
        fields.time = time;
        self.notify();
    }

    pub fn on_position_ready(&mut self, ticket: Ticket, result: Result<Position, SensorError>) {
        if !self.is_current(&ticket) {
            return;
        }
        match (ticket.request, result) {
            (Request::ShowMap, Ok(position)) => self.show_map(Coordinate::from(&position)),
            (Request::ShowMap, Err(error)) => self.show_default_map(error),
            (Request::PositionUpdate, Ok(position)) => {
                self.update_position(Coordinate::from(&position))
            }
            (Request::PositionUpdate, Err(error)) => {
                warn!("[trip] position update failed: {}", error)
            }
            (request, _) => {
                warn!("[trip] unexpected position completion for {:?}", request);
                return;
            }
        }
        self.notify();
    }

    pub fn on_address_ready(&mut self, ticket: Ticket, result: Result<String, GeocodeError>) {
        if !self.is_current(&ticket) {
            return;
        }
        let phase = match ticket.request {
            Request::ReverseGeocode(phase) => phase,
            request => {
                warn!("[trip] unexpected address completion for {:?}", request);
                return;
            }
        };
        match result {
            Ok(address) => {
                self.set_address(phase, address);
                self.notify();
            }
            // the field keeps its last value, the next position tick asks again
            Err(error) => warn!("[trip] reverse geocoding for {} failed: {}", phase, error),
        }
    }

    pub fn on_coordinate_ready(
        &mut self,
        ticket: Ticket,
        result: Result<Coordinate, GeocodeError>,
    ) {
        if !self.is_current(&ticket) {
            return;
        }
        let phase = match ticket.request {
            Request::ForwardGeocode(phase) => phase,
            request => {
                warn!("[trip] unexpected coordinate completion for {:?}", request);
                return;
            }
        };
        let coordinate = match result {
            Ok(coordinate) => coordinate,
            Err(error) => {
                warn!("[trip] geocoding {} address failed: {}", phase, error);
                return;
            }
        };
        if self.active_phase() != Some(phase) {
            debug!("[trip] ignoring resolved {} address", phase);
            return;
        }
        info!("[trip] {} address resolved to {:?}", phase, coordinate);
        if let Some(map) = self.map {
            self.facade.pan_to(map, coordinate);
            if self.state == TripState::Started {
                if let Some(last) = self.last_coordinate {
                    self.facade.draw_segment(map, last, coordinate);
                }
            }
        }
        if let Some(marker) = self.marker {
            self.facade.move_marker(marker, coordinate);
        }
        if self.state == TripState::Started {
            self.persist_progress();
            self.store.append(Some(coordinate));
        }
        self.last_coordinate = Some(coordinate);
        self.view.notice = None;
        match phase {
            Phase::Departure => self.view.is_start_button_visible = true,
            Phase::Arrival => self.view.is_stop_button_visible = true,
        }
        self.notify();
    }

    pub fn address_changed(&mut self, phase: Phase) {
        debug!("[trip] {} address edited manually", phase);
        self.auto_mut(phase).address = false;
    }

    pub fn date_time_changed(&mut self, phase: Phase) {
        debug!("[trip] {} date/time edited manually", phase);
        self.auto_mut(phase).date_time = false;
    }

    pub fn edit_address(&mut self, phase: Phase, address: String) {
        self.address_changed(phase);
        self.view.fields_mut(phase).address = address;
        self.notify();
    }

    pub fn edit_date_time(&mut self, phase: Phase, date: String, time: String) {
        self.date_time_changed(phase);
        let fields = self.view.fields_mut(phase);
        fields.date = date;
        fields.time = time;
        self.notify();
    }

    pub fn address_committed(&mut self, phase: Phase) {
        if self.active_phase() != Some(phase) {
            debug!("[trip] {} is not the active phase, not geocoding", phase);
            return;
        }
        let address = self.view.fields(phase).address.clone();
        if address.trim().is_empty() {
            debug!("[trip] empty {} address, nothing to geocode", phase);
            return;
        }
        let ticket = self.ticket(Request::ForwardGeocode(phase));
        self.facade.forward_geocode(ticket, &address);
    }

    pub fn set_name(&mut self, name: String) {
        self.view.name = name;
        self.notify();
    }

    pub fn set_purpose(&mut self, purpose: String) {
        self.view.purpose = purpose;
        self.notify();
    }

    pub fn set_travel_abroad(&mut self, travel_abroad: bool) {
        self.view.travel_abroad = travel_abroad;
        self.notify();
    }
}
