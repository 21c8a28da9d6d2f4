//! DMI MetObs integration for the bridge
//!
//! Polls the latest observations for configured stations and exposes them
//! as temperature and humidity sensors.

pub mod cache;
pub mod client;
pub mod controller;
pub mod error;
pub mod platform;
pub mod types;

pub use cache::{Reading, SensorController, WeatherState};
pub use client::MetObsClient;
pub use controller::{update_parameter, AccessoryController, DEFAULT_REFRESH_INTERVAL};
pub use error::{CacheMiss, MetObsError};
pub use platform::DmiPlatform;
pub use types::{Observation, ObservationParameter, Station, UnknownParameter};
