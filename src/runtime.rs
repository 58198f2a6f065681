use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::coordinate::{Coordinate, Position};
use crate::kv_store::KeyValueStore;
use crate::map_facade::{GeocodeError, MapFacade, Phase, SensorError, Ticket};
use crate::trip_controller::{TimerKind, Timers, TripController};

/* A single-task event loop around `TripController`. UI commands, provider
completions and both interval timers all go through one `select!`, so the
controller only ever handles one thing at a time.
*/

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Start,
    Stop,
    SetName(String),
    SetPurpose(String),
    SetTravelAbroad(bool),
    AddressChanged(Phase),
    DateTimeChanged(Phase),
    EditAddress(Phase, String),
    EditDateTime(Phase, String, String),
    CommitAddress(Phase),
    Shutdown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Command(Command),
    PositionReady(Ticket, Result<Position, SensorError>),
    AddressReady(Ticket, Result<String, GeocodeError>),
    CoordinateReady(Ticket, Result<Coordinate, GeocodeError>),
}

pub type EventSender = UnboundedSender<Event>;

pub fn channel() -> (EventSender, UnboundedReceiver<Event>) {
    mpsc::unbounded_channel()
}

/// `Timers` backed by tokio intervals. Must be used from inside a tokio
/// runtime.
#[derive(Default)]
pub struct TokioTimers {
    clock: Option<Interval>,
    position: Option<Interval>,
}

impl TokioTimers {
    pub fn new() -> Self {
        TokioTimers {
            clock: None,
            position: None,
        }
    }

    pub fn is_running(&self, timer: TimerKind) -> bool {
        match timer {
            TimerKind::Clock => self.clock.is_some(),
            TimerKind::Position => self.position.is_some(),
        }
    }

    fn slot(&mut self, timer: TimerKind) -> &mut Option<Interval> {
        match timer {
            TimerKind::Clock => &mut self.clock,
            TimerKind::Position => &mut self.position,
        }
    }
}

impl Timers for TokioTimers {
    fn start(&mut self, timer: TimerKind, period: Duration) {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        *self.slot(timer) = Some(interval);
    }

    fn cancel(&mut self, timer: TimerKind) {
        *self.slot(timer) = None;
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

enum Fired {
    Event(Option<Event>),
    Clock,
    Position,
}

pub struct TripRuntime<F: MapFacade, S: KeyValueStore> {
    controller: TripController<F, S, TokioTimers>,
    events: UnboundedReceiver<Event>,
}

impl<F: MapFacade, S: KeyValueStore> TripRuntime<F, S> {
    pub fn new(
        controller: TripController<F, S, TokioTimers>,
        events: UnboundedReceiver<Event>,
    ) -> Self {
        TripRuntime { controller, events }
    }

    /// Initializes the controller and processes events until
    /// `Command::Shutdown` or until every sender is dropped. Gives the
    /// controller back so the caller can inspect the final state.
    pub async fn run(mut self) -> TripController<F, S, TokioTimers> {
        self.controller.initialize();
        loop {
            let fired = {
                let timers = self.controller.timers_mut();
                tokio::select! {
                    event = self.events.recv() => Fired::Event(event),
                    _ = tick(&mut timers.clock) => Fired::Clock,
                    _ = tick(&mut timers.position) => Fired::Position,
                }
            };
            match fired {
                Fired::Event(None) => {
                    info!("[runtime] all senders dropped, exiting");
                    break;
                }
                Fired::Event(Some(Event::Command(Command::Shutdown))) => {
                    info!("[runtime] shutdown");
                    break;
                }
                Fired::Event(Some(event)) => self.handle(event),
                Fired::Clock => self.controller.on_clock_tick(Local::now().naive_local()),
                Fired::Position => self.controller.on_position_tick(),
            }
        }
        self.controller
    }

    fn handle(&mut self, event: Event) {
        let controller = &mut self.controller;
        match event {
            Event::Command(command) => match command {
                Command::Start => controller.start(),
                Command::Stop => controller.stop(),
                Command::SetName(name) => controller.set_name(name),
                Command::SetPurpose(purpose) => controller.set_purpose(purpose),
                Command::SetTravelAbroad(travel_abroad) => {
                    controller.set_travel_abroad(travel_abroad)
                }
                Command::AddressChanged(phase) => controller.address_changed(phase),
                Command::DateTimeChanged(phase) => controller.date_time_changed(phase),
                Command::EditAddress(phase, address) => controller.edit_address(phase, address),
                Command::EditDateTime(phase, date, time) => {
                    controller.edit_date_time(phase, date, time)
                }
                Command::CommitAddress(phase) => controller.address_committed(phase),
                Command::Shutdown => (),
            },
            Event::PositionReady(ticket, result) => controller.on_position_ready(ticket, result),
            Event::AddressReady(ticket, result) => controller.on_address_ready(ticket, result),
            Event::CoordinateReady(ticket, result) => {
                controller.on_coordinate_ready(ticket, result)
            }
        }
    }
}
