use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use crate::coordinate::Coordinate;
use crate::kv_store::KeyValueStore;

#[derive(Clone, Debug, PartialEq)]
pub struct Labels {
    pub start_button: String,
    pub stop_button: String,
    pub stop_accepted: String,
    pub name: String,
    pub purpose: String,
    pub departure_address: String,
    pub departure_date: String,
    pub departure_time: String,
    pub arrival_address: String,
    pub arrival_date: String,
    pub arrival_time: String,
    pub departure_address_manual: String,
    pub arrival_address_manual: String,
}

impl Default for Labels {
    fn default() -> Self {
        Labels {
            start_button: "Start turen".to_string(),
            stop_button: "Stopp turen!".to_string(),
            stop_accepted: "Godtatt".to_string(),
            name: "Navn".to_string(),
            purpose: "Reiseplan".to_string(),
            departure_address: "Avreise addresse".to_string(),
            departure_date: "Avreise dato".to_string(),
            departure_time: "Avreise klokkeslett".to_string(),
            arrival_address: "Ankomst addresse".to_string(),
            arrival_date: "Ankomst dato".to_string(),
            arrival_time: "Ankomst klokkeslett".to_string(),
            departure_address_manual: "Fant ikke posisjonen, skriv inn avreise addresse"
                .to_string(),
            arrival_address_manual: "Fant ikke posisjonen, skriv inn ankomst addresse"
                .to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TripConfig {
    pub position_interval: Duration,
    pub clock_interval: Duration,
    pub map_zoom: u8,
    /// Where the map is shown when the position sensor fails.
    pub default_coordinate: Coordinate,
    pub date_format: String,
    pub time_format: String,
    pub labels: Labels,
}

impl Default for TripConfig {
    fn default() -> Self {
        TripConfig {
            position_interval: Duration::from_millis(3000),
            clock_interval: Duration::from_millis(1000),
            map_zoom: 14,
            // Oslo
            default_coordinate: Coordinate::new(59.9138688, 10.7522454),
            date_format: "%d-%m-%Y".to_string(),
            time_format: "%H:%M:%S".to_string(),
            labels: Labels::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, strum_macros::EnumIter)]
pub enum Setting {
    PositionIntervalMs,
    ClockIntervalMs,
    MapZoom,
    DefaultLatitude,
    DefaultLongitude,
    DateFormat,
    TimeFormat,
}

impl Setting {
    pub fn to_db_key(self) -> &'static str {
        match self {
            Self::PositionIntervalMs => "triplog.setting.POSITION_INTERVAL_MS",
            Self::ClockIntervalMs => "triplog.setting.CLOCK_INTERVAL_MS",
            Self::MapZoom => "triplog.setting.MAP_ZOOM",
            Self::DefaultLatitude => "triplog.setting.DEFAULT_LATITUDE",
            Self::DefaultLongitude => "triplog.setting.DEFAULT_LONGITUDE",
            Self::DateFormat => "triplog.setting.DATE_FORMAT",
            Self::TimeFormat => "triplog.setting.TIME_FORMAT",
        }
    }
}

fn get_setting<S, T>(store: &S, setting: Setting) -> anyhow::Result<Option<T>>
where
    S: KeyValueStore,
    T: FromStr,
    <T as FromStr>::Err: Error + Send + Sync + 'static,
{
    match store.get_item(setting.to_db_key())? {
        None => Ok(None),
        Some(s) => Ok(Some(FromStr::from_str(s.trim())?)),
    }
}

pub fn get_setting_with_default<S, T>(store: &S, setting: Setting, default: T) -> T
where
    S: KeyValueStore,
    T: FromStr,
    <T as FromStr>::Err: Error + Send + Sync + 'static,
{
    match get_setting(store, setting) {
        Ok(v) => v,
        Err(error) => {
            warn!(
                "[config.get_setting_with_default] setting:{:?}, error:{}",
                setting, error
            );
            None
        }
    }
    .unwrap_or(default)
}

pub fn set_setting<S: KeyValueStore, T: ToString>(
    store: &mut S,
    setting: Setting,
    value: T,
) -> anyhow::Result<()> {
    store.set_item(setting.to_db_key(), &value.to_string())
}

fn non_zero_interval(ms: u64, default: Duration) -> Duration {
    if ms == 0 {
        warn!("[config] ignoring zero timer interval");
        default
    } else {
        Duration::from_millis(ms)
    }
}

impl TripConfig {
    /// Defaults overridden by whatever settings are present in `store`.
    pub fn load<S: KeyValueStore>(store: &S) -> TripConfig {
        let default = TripConfig::default();
        let position_interval_ms = get_setting_with_default(
            store,
            Setting::PositionIntervalMs,
            default.position_interval.as_millis() as u64,
        );
        let clock_interval_ms = get_setting_with_default(
            store,
            Setting::ClockIntervalMs,
            default.clock_interval.as_millis() as u64,
        );
        let config = TripConfig {
            position_interval: non_zero_interval(position_interval_ms, default.position_interval),
            clock_interval: non_zero_interval(clock_interval_ms, default.clock_interval),
            map_zoom: get_setting_with_default(store, Setting::MapZoom, default.map_zoom),
            default_coordinate: Coordinate::new(
                get_setting_with_default(
                    store,
                    Setting::DefaultLatitude,
                    default.default_coordinate.latitude,
                ),
                get_setting_with_default(
                    store,
                    Setting::DefaultLongitude,
                    default.default_coordinate.longitude,
                ),
            ),
            date_format: get_setting_with_default(store, Setting::DateFormat, default.date_format),
            time_format: get_setting_with_default(store, Setting::TimeFormat, default.time_format),
            labels: default.labels,
        };
        debug!("[config] loaded: {:?}", config);
        config
    }
}
