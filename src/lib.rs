#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub mod config;
pub mod coordinate;
pub mod export_data;
pub mod kv_store;
pub mod logs;
pub mod map_facade;
pub mod runtime;
pub mod trip_controller;
pub mod waypoint_store;
