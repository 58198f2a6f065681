use std::collections::HashMap;
use std::time::Duration;

use triplog_core::{
    config::TripConfig,
    coordinate::{Coordinate, Position},
    kv_store::{KeyValueStore, MemoryStore},
    map_facade::{MapFacade, MapHandle, MarkerHandle, Phase, Request, Ticket},
    trip_controller::{TimerKind, Timers, TripController},
    waypoint_store::WaypointStore,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RequestPosition(Ticket),
    RenderMap(Coordinate, Phase, u8),
    RenderMarker(Coordinate, MapHandle),
    PanTo(MapHandle, Coordinate),
    MoveMarker(MarkerHandle, Coordinate),
    DrawSegment(MapHandle, Coordinate, Coordinate),
    ReverseGeocode(Ticket, Coordinate),
    ForwardGeocode(Ticket, String),
}

/// Records every call. Requests are completed by the test itself.
#[derive(Default)]
pub struct FakeFacade {
    pub calls: Vec<Call>,
    next_handle: u64,
}

impl FakeFacade {
    pub fn position_requests(&self) -> Vec<Ticket> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::RequestPosition(ticket) => Some(*ticket),
                _ => None,
            })
            .collect()
    }

    pub fn last_position_request(&self) -> Ticket {
        *self.position_requests().last().expect("no position request")
    }

    pub fn last_reverse_geocode(&self) -> Option<Ticket> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::ReverseGeocode(ticket, _) => Some(*ticket),
            _ => None,
        })
    }

    pub fn last_forward_geocode(&self) -> Option<(Ticket, String)> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::ForwardGeocode(ticket, address) => Some((*ticket, address.clone())),
            _ => None,
        })
    }

    pub fn rendered_maps(&self) -> Vec<(Coordinate, Phase)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::RenderMap(center, surface, _) => Some((*center, *surface)),
                _ => None,
            })
            .collect()
    }

    pub fn segments(&self) -> Vec<(Coordinate, Coordinate)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::DrawSegment(_, from, to) => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn count<P: Fn(&Call) -> bool>(&self, predicate: P) -> usize {
        self.calls.iter().filter(|&call| predicate(call)).count()
    }
}

impl MapFacade for FakeFacade {
    fn request_position(&mut self, ticket: Ticket) {
        self.calls.push(Call::RequestPosition(ticket));
    }

    fn render_map(&mut self, center: Coordinate, surface: Phase, zoom: u8) -> MapHandle {
        self.calls.push(Call::RenderMap(center, surface, zoom));
        self.next_handle += 1;
        MapHandle(self.next_handle)
    }

    fn render_marker(&mut self, at: Coordinate, map: MapHandle) -> MarkerHandle {
        self.calls.push(Call::RenderMarker(at, map));
        self.next_handle += 1;
        MarkerHandle(self.next_handle)
    }

    fn pan_to(&mut self, map: MapHandle, at: Coordinate) {
        self.calls.push(Call::PanTo(map, at));
    }

    fn move_marker(&mut self, marker: MarkerHandle, at: Coordinate) {
        self.calls.push(Call::MoveMarker(marker, at));
    }

    fn draw_segment(&mut self, map: MapHandle, from: Coordinate, to: Coordinate) {
        self.calls.push(Call::DrawSegment(map, from, to));
    }

    fn reverse_geocode(&mut self, ticket: Ticket, at: Coordinate) {
        self.calls.push(Call::ReverseGeocode(ticket, at));
    }

    fn forward_geocode(&mut self, ticket: Ticket, address: &str) {
        self.calls.push(Call::ForwardGeocode(ticket, address.to_string()));
    }
}

#[derive(Default)]
pub struct FakeTimers {
    pub running: HashMap<TimerKind, Duration>,
    pub starts: usize,
}

impl FakeTimers {
    pub fn is_running(&self, timer: TimerKind) -> bool {
        self.running.contains_key(&timer)
    }
}

impl Timers for FakeTimers {
    fn start(&mut self, timer: TimerKind, period: Duration) {
        self.starts += 1;
        self.running.insert(timer, period);
    }

    fn cancel(&mut self, timer: TimerKind) {
        self.running.remove(&timer);
    }
}

/// `MemoryStore` that counts writes and removals.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub writes: usize,
    pub removes: usize,
}

impl KeyValueStore for CountingStore {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.writes += 1;
        self.inner.set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        self.removes += 1;
        self.inner.remove_item(key)
    }
}

pub type TestController = TripController<FakeFacade, CountingStore, FakeTimers>;

pub fn controller_with_store(store: CountingStore) -> TestController {
    TripController::new(
        FakeFacade::default(),
        WaypointStore::new(store),
        FakeTimers::default(),
        TripConfig::default(),
    )
}

pub fn new_controller() -> TestController {
    controller_with_store(CountingStore::default())
}

/// Answers the most recent position request with `(lat, lng)`.
pub fn answer_position(controller: &mut TestController, lat: f64, lng: f64) -> Ticket {
    let ticket = controller.facade().last_position_request();
    controller.on_position_ready(ticket, Ok(Position::new(lat, lng)));
    ticket
}

/// One full position timer cycle: tick, then answer the request.
pub fn tick_position(controller: &mut TestController, lat: f64, lng: f64) {
    controller.on_position_tick();
    let ticket = answer_position(controller, lat, lng);
    assert_eq!(ticket.request, Request::PositionUpdate);
}
