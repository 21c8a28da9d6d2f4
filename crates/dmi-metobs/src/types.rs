use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dmi_core::StationConfig;

macro_rules! observation_parameters {
    ($($variant:ident => $tag:literal,)+) => {
        /// DMI MetObs parameter ids.
        /// See: https://confluence.govcloud.dk/pages/viewpage.action?pageId=26476616
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ObservationParameter {
            $(
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl ObservationParameter {
            /// Every parameter the API documents
            pub const ALL: &'static [ObservationParameter] = &[$(Self::$variant,)+];

            /// Wire tag used in `parameterId`
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }
        }

        impl std::str::FromStr for ObservationParameter {
            type Err = UnknownParameter;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(Self::$variant),)+
                    _ => Err(UnknownParameter(s.to_string())),
                }
            }
        }
    };
}

observation_parameters! {
    TempDry => "temp_dry",
    TempDew => "temp_dew",
    TempMeanPast1h => "temp_mean_past1h",
    TempMaxPast1h => "temp_max_past1h",
    TempMinPast1h => "temp_min_past1h",
    TempMaxPast12h => "temp_max_past12h",
    TempMinPast12h => "temp_min_past12h",
    TempGrass => "temp_grass",
    TempGrassMaxPast1h => "temp_grass_max_past1h",
    TempGrassMeanPast1h => "temp_grass_mean_past1h",
    TempGrassMinPast1h => "temp_grass_min_past1h",
    TempSoil => "temp_soil",
    TempSoilMaxPast1h => "temp_soil_max_past1h",
    TempSoilMeanPast1h => "temp_soil_mean_past1h",
    TempSoilMinPast1h => "temp_soil_min_past1h",
    Humidity => "humidity",
    HumidityPast1h => "humidity_past1h",
    Pressure => "pressure",
    PressureAtSea => "pressure_at_sea",
    WindDir => "wind_dir",
    WindDirPast1h => "wind_dir_past1h",
    WindSpeed => "wind_speed",
    WindSpeedPast1h => "wind_speed_past1h",
    WindGustAlwaysPast1h => "wind_gust_always_past1h",
    WindMax => "wind_max",
    WindMinPast1h => "wind_min_past1h",
    WindMin => "wind_min",
    WindMaxPer10minPast1h => "wind_max_per10min_past1h",
    PrecipPast1h => "precip_past1h",
    PrecipPast10min => "precip_past10min",
    PrecipPast1min => "precip_past1min",
    PrecipPast24h => "precip_past24h",
    PrecipDurPast10min => "precip_dur_past10min",
    PrecipDurPast1h => "precip_dur_past1h",
    SnowDepthMan => "snow_depth_man",
    SnowCoverMan => "snow_cover_man",
    Visibility => "visibility",
    VisibMeanLast10min => "visib_mean_last10min",
    CloudCover => "cloud_cover",
    CloudHeight => "cloud_height",
    Weather => "weather",
    RadiaGlob => "radia_glob",
    RadiaGlobPast1h => "radia_glob_past1h",
    SunLast10minGlob => "sun_last10min_glob",
    SunLast1hGlob => "sun_last1h_glob",
    LeavHumDurPast10min => "leav_hum_dur_past10min",
    LeavHumDurPast1h => "leav_hum_dur_past1h",
}

impl std::fmt::Display for ObservationParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag outside the MetObs vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown observation parameter: {0}")]
pub struct UnknownParameter(pub String);

/// A physical weather station
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Station {
    pub id: u32,
    pub name: String,
}

impl Station {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Station id as the API writes it: five digits, zero padded.
    pub fn api_id(&self) -> String {
        format!("{:05}", self.id)
    }
}

impl From<&StationConfig> for Station {
    fn from(config: &StationConfig) -> Self {
        Self::new(config.id, config.name.clone())
    }
}

impl std::fmt::Display for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.api_id())
    }
}

/// One reading as returned by the observation endpoint.
///
/// Timestamps are microseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(rename = "_id")]
    pub id: String,
    pub parameter_id: ObservationParameter,
    pub station_id: String,
    pub time_created: Option<i64>,
    pub time_observed: Option<i64>,
    pub value: f64,
}

impl Observation {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.time_observed.and_then(DateTime::<Utc>::from_timestamp_micros)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.time_created.and_then(DateTime::<Utc>::from_timestamp_micros)
    }
}
