pub mod accessory;
pub mod app;
pub mod config;
pub mod error;
pub mod platform;

pub use accessory::{
    AccessoryInformation, Characteristic, CharacteristicKind, CharacteristicProps,
    PlatformAccessory, Service, ServiceKind,
};
pub use app::App;
pub use config::{Config, MetObsConfig, PlatformConfig, StationConfig};
pub use error::{AccessoryError, AppError, ConfigError, NetworkError, WeatherError};
pub use platform::{PlatformContext, PlatformProvider};

use anyhow::Result;

/// Initialize logging for the bridge
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("DMI bridge core initialized");
    Ok(())
}
