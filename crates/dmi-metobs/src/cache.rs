//! Per-station cache of the last successful observation values.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::CacheMiss;
use crate::types::{Observation, ObservationParameter};

/// Host-neutral read interface over cached readings.
pub trait SensorController {
    /// Latest cached value. Never performs I/O.
    fn get_value(&self, parameter: ObservationParameter) -> Result<f64, CacheMiss>;
}

/// A cached value with the time it was observed upstream and stored here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub observed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Last known value per parameter for one station.
///
/// Entries are only written from a fetched [`Observation`], replaced whole,
/// and never removed.
#[derive(Debug, Default)]
pub struct WeatherState {
    readings: RwLock<HashMap<ObservationParameter, Reading>>,
}

impl WeatherState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the observation's value under `parameter`, returning the replaced reading.
    pub fn record(&self, parameter: ObservationParameter, observation: &Observation) -> Option<Reading> {
        let reading = Reading {
            value: observation.value,
            observed_at: observation.observed_at(),
            updated_at: Utc::now(),
        };
        self.readings.write().insert(parameter, reading)
    }

    pub fn get(&self, parameter: ObservationParameter) -> Result<f64, CacheMiss> {
        self.readings
            .read()
            .get(&parameter)
            .map(|r| r.value)
            .ok_or(CacheMiss { parameter })
    }

    pub fn reading(&self, parameter: ObservationParameter) -> Option<Reading> {
        self.readings.read().get(&parameter).copied()
    }

    pub fn contains(&self, parameter: ObservationParameter) -> bool {
        self.readings.read().contains_key(&parameter)
    }

    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.read().is_empty()
    }
}

impl SensorController for WeatherState {
    fn get_value(&self, parameter: ObservationParameter) -> Result<f64, CacheMiss> {
        self.get(parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(parameter: ObservationParameter, value: f64) -> Observation {
        Observation {
            id: "x".into(),
            parameter_id: parameter,
            station_id: "06074".into(),
            time_created: Some(0),
            time_observed: Some(0),
            value,
        }
    }

    #[test]
    fn test_never_fetched_is_cache_miss() {
        let state = WeatherState::new();
        for parameter in ObservationParameter::ALL {
            assert_eq!(
                state.get_value(*parameter),
                Err(CacheMiss {
                    parameter: *parameter
                })
            );
        }
        assert!(state.is_empty());
    }

    #[test]
    fn test_record_sets_value() {
        let state = WeatherState::new();
        let previous = state.record(
            ObservationParameter::TempDry,
            &observation(ObservationParameter::TempDry, 7.2),
        );

        assert!(previous.is_none());
        assert_eq!(state.get(ObservationParameter::TempDry), Ok(7.2));
        assert!(!state.contains(ObservationParameter::Humidity));
    }

    #[test]
    fn test_last_write_wins() {
        let state = WeatherState::new();
        state.record(
            ObservationParameter::Humidity,
            &observation(ObservationParameter::Humidity, 80.0),
        );
        let previous = state.record(
            ObservationParameter::Humidity,
            &observation(ObservationParameter::Humidity, 88.0),
        );

        assert_eq!(previous.map(|r| r.value), Some(80.0));
        assert_eq!(state.get(ObservationParameter::Humidity), Ok(88.0));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_reading_keeps_observation_time() {
        let state = WeatherState::new();
        let mut obs = observation(ObservationParameter::TempDry, -3.5);
        obs.time_observed = Some(1_700_000_000_000_000);
        state.record(ObservationParameter::TempDry, &obs);

        let reading = state.reading(ObservationParameter::TempDry).unwrap();
        assert_eq!(reading.value, -3.5);
        assert_eq!(reading.observed_at.map(|t| t.timestamp()), Some(1_700_000_000));
        assert!(reading.updated_at <= Utc::now());
    }
}
