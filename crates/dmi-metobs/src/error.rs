//! MetObs-specific error types.

use thiserror::Error;

use dmi_core::error::ReqwestErrorExt;
use dmi_core::{AccessoryError, AppError, NetworkError, WeatherError};

use crate::types::ObservationParameter;

#[derive(Error, Debug)]
pub enum MetObsError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Value does not exist in response. Check station id and API key.")]
    MissingValue,
}

impl MetObsError {
    /// Whether the next scheduled refresh might succeed without a config change.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Parse(_) | Self::MissingValue => false,
        }
    }
}

impl From<MetObsError> for AppError {
    fn from(err: MetObsError) -> Self {
        match err {
            MetObsError::Network(e) => AppError::Network(e.into_network_error()),
            MetObsError::Api { status: 401 | 403, .. } => {
                AppError::Weather(WeatherError::InvalidApiKey)
            }
            MetObsError::Api { status, message } if status >= 500 => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            MetObsError::Api { status, message } => {
                AppError::Weather(WeatherError::ApiError(format!("{}: {}", status, message)))
            }
            MetObsError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
            e @ MetObsError::MissingValue => {
                AppError::Weather(WeatherError::NoObservation(e.to_string()))
            }
        }
    }
}

/// A synchronous read for a parameter that was never fetched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cannot fetch parameter: {parameter}")]
pub struct CacheMiss {
    pub parameter: ObservationParameter,
}

impl From<CacheMiss> for AccessoryError {
    fn from(miss: CacheMiss) -> Self {
        AccessoryError::NoReading(miss.parameter.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_value_message() {
        assert_eq!(
            MetObsError::MissingValue.to_string(),
            "Value does not exist in response. Check station id and API key."
        );
    }

    #[test]
    fn test_is_transient() {
        let outage = MetObsError::Api {
            status: 503,
            message: String::new(),
        };
        let forbidden = MetObsError::Api {
            status: 403,
            message: String::new(),
        };
        assert!(outage.is_transient());
        assert!(!forbidden.is_transient());
        assert!(!MetObsError::MissingValue.is_transient());
    }

    #[test]
    fn test_app_error_mapping() {
        let forbidden = MetObsError::Api {
            status: 403,
            message: "invalid key".into(),
        };
        assert!(matches!(
            AppError::from(forbidden),
            AppError::Weather(WeatherError::InvalidApiKey)
        ));

        let outage = MetObsError::Api {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(matches!(
            AppError::from(outage),
            AppError::Network(NetworkError::ServerError { status: 502, .. })
        ));

        assert!(matches!(
            AppError::from(MetObsError::MissingValue),
            AppError::Weather(WeatherError::NoObservation(_))
        ));
    }

    #[test]
    fn test_cache_miss_into_accessory_error() {
        let miss = CacheMiss {
            parameter: ObservationParameter::TempDry,
        };
        assert_eq!(miss.to_string(), "Cannot fetch parameter: temp_dry");
        assert_eq!(
            AccessoryError::from(miss),
            AccessoryError::NoReading("temp_dry".into())
        );
    }
}
