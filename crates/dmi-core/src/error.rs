//! Centralized error types for the DMI bridge.
//!
//! This module provides a typed error hierarchy that:
//! - Separates I/O-layer failures (logged at the fetch site) from host-facing read errors
//! - Provides short messages suitable for host log output
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message fit for the host's log.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Accessory error: {0}")]
    Accessory(#[from] AccessoryError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a short, actionable message for the host log.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Accessory(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to reach the DMI API. Check your internet connection."
            }
            NetworkError::Timeout => "The DMI API did not answer in time.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The DMI API is experiencing issues. Readings will refresh later."
            }
            NetworkError::ServerError { .. } => "The DMI API rejected the request.",
            NetworkError::InvalidResponse(_) => "Received an unexpected response from the DMI API.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Errors reported through a characteristic's get callback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessoryError {
    /// The sensor has no reading yet.
    #[error("Cannot fetch parameter: {0}")]
    NoReading(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),
}

impl AccessoryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AccessoryError::NoReading(_) => "The sensor has not received a reading yet.",
            AccessoryError::ServiceNotFound(_) => "The accessory does not expose that sensor.",
        }
    }
}

/// Weather service errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("No observation available: {0}")]
    NoObservation(String),

    #[error("Weather API error: {0}")]
    ApiError(String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::NoObservation(_) => {
                "Value does not exist in response. Check station id and API key."
            }
            WeatherError::ApiError(_) => "Weather service error. Readings will refresh later.",
            WeatherError::InvalidApiKey => "DMI API key is invalid. Check settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
