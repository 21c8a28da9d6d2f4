//! Accessory controller: one temperature and one humidity sensor per station,
//! backed by a [`WeatherState`] that is refreshed on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use dmi_core::{AccessoryError, AppError, CharacteristicProps, PlatformAccessory, Service, ServiceKind};

use crate::cache::{SensorController, WeatherState};
use crate::client::MetObsClient;
use crate::error::CacheMiss;
use crate::types::{Observation, ObservationParameter, Station};

/// Upstream publishes every 10 minutes; polling faster only hammers the API.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

pub const TEMPERATURE_PROPS: CharacteristicProps = CharacteristicProps {
    min_value: -100.0,
    max_value: 100.0,
};

/// Parameters refetched on every refresh tick, in order.
const REFRESHED_PARAMETERS: [ObservationParameter; 2] =
    [ObservationParameter::Humidity, ObservationParameter::TempDry];

pub struct AccessoryController {
    station: Station,
    accessory: Arc<PlatformAccessory>,
    state: Arc<WeatherState>,
    cancel: CancellationToken,
    initial: Vec<JoinHandle<()>>,
    refresh: JoinHandle<()>,
}

impl AccessoryController {
    /// Attach sensors to `accessory` and start polling.
    ///
    /// Each sensor's get handler is registered once its initial fetch succeeds.
    /// Must be called from within a tokio runtime.
    pub fn new(
        client: Arc<MetObsClient>,
        mut accessory: PlatformAccessory,
        station: Station,
        refresh_interval: Duration,
    ) -> Self {
        let temperature = accessory.get_or_add_service(ServiceKind::TemperatureSensor);
        temperature.set_name(format!("Temperatur - {}", accessory.display_name()));
        temperature.characteristic().set_props(TEMPERATURE_PROPS);

        let humidity = accessory.get_or_add_service(ServiceKind::HumiditySensor);
        humidity.set_name(format!("Fugtighed - {}", accessory.display_name()));

        let accessory = Arc::new(accessory);
        let state = Arc::new(WeatherState::new());
        let cancel = CancellationToken::new();

        let initial = vec![
            tokio::spawn(initial_fetch(
                client.clone(),
                station.clone(),
                state.clone(),
                temperature,
                ObservationParameter::TempDry,
                cancel.clone(),
            )),
            tokio::spawn(initial_fetch(
                client.clone(),
                station.clone(),
                state.clone(),
                humidity,
                ObservationParameter::Humidity,
                cancel.clone(),
            )),
        ];

        let refresh = tokio::spawn(refresh_loop(
            client,
            station.clone(),
            state.clone(),
            refresh_interval,
            cancel.clone(),
        ));

        tracing::info!("Created accessory controller for station {}", station);

        Self {
            station,
            accessory,
            state,
            cancel,
            initial,
            refresh,
        }
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn accessory(&self) -> &Arc<PlatformAccessory> {
        &self.accessory
    }

    pub fn state(&self) -> &WeatherState {
        &self.state
    }

    /// Read a cached value; never performs I/O.
    pub fn handle_current_parameter(&self, parameter: ObservationParameter) -> Result<f64, CacheMiss> {
        self.state.get(parameter)
    }

    /// Callback form of [`Self::handle_current_parameter`]: `callback(error, value)`.
    pub fn handle_get<F>(&self, parameter: ObservationParameter, callback: F)
    where
        F: FnOnce(Option<CacheMiss>, Option<f64>),
    {
        match self.handle_current_parameter(parameter) {
            Ok(value) => callback(None, Some(value)),
            Err(miss) => callback(Some(miss), None),
        }
    }

    /// Wait for both initial fetches to finish, successful or not.
    pub async fn wait_initialized(&mut self) {
        for handle in self.initial.drain(..) {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!("Initial fetch task for station {} failed: {}", self.station, e);
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.refresh.is_finished()
    }

    /// Stop polling. Cached values stay readable.
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        tracing::info!("Stopping accessory controller for station {}", self.station);
        self.cancel.cancel();
        self.refresh.abort();
        for handle in &self.initial {
            handle.abort();
        }
    }
}

impl SensorController for AccessoryController {
    fn get_value(&self, parameter: ObservationParameter) -> Result<f64, CacheMiss> {
        self.handle_current_parameter(parameter)
    }
}

impl Drop for AccessoryController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fetch `parameter` once and store it. Errors are logged and swallowed.
pub async fn update_parameter(
    client: &MetObsClient,
    station: &Station,
    state: &WeatherState,
    parameter: ObservationParameter,
) -> Option<Observation> {
    match client.fetch_latest(parameter, station).await {
        Ok(observation) => {
            state.record(parameter, &observation);
            tracing::info!(
                "Successfully updated '{}' using station id: {}",
                parameter,
                station.api_id()
            );
            Some(observation)
        }
        Err(e) => {
            let transient = e.is_transient();
            let message = e.to_string();
            let hint = AppError::from(e).user_message();
            tracing::error!(
                station = %station.api_id(),
                %parameter,
                transient,
                "Error fetching from DMI MetObs API: {} ({})",
                message,
                hint
            );
            None
        }
    }
}

async fn initial_fetch(
    client: Arc<MetObsClient>,
    station: Station,
    state: Arc<WeatherState>,
    service: Arc<Service>,
    parameter: ObservationParameter,
    cancel: CancellationToken,
) {
    let fetched = tokio::select! {
        _ = cancel.cancelled() => return,
        fetched = update_parameter(&client, &station, &state, parameter) => fetched,
    };

    if fetched.is_none() {
        tracing::warn!(
            "Initial '{}' fetch failed for station {}; sensor stays without a reading",
            parameter,
            station
        );
        return;
    }

    tracing::info!("Fetched initial {} value, registering get handler", parameter);
    let reader = state.clone();
    service
        .characteristic()
        .on_get(move || reader.get_value(parameter).map_err(AccessoryError::from));
}

async fn refresh_loop(
    client: Arc<MetObsClient>,
    station: Station,
    state: Arc<WeatherState>,
    period: Duration,
    cancel: CancellationToken,
) {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Refresh loop for station {} cancelled", station);
                break;
            }
            _ = ticker.tick() => {
                for parameter in REFRESHED_PARAMETERS {
                    update_parameter(&client, &station, &state, parameter).await;
                }
            }
        }
    }
}
