use anyhow::Result;

use dmi_core::{App, AppError, ConfigError};
use dmi_metobs::DmiPlatform;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dmi_core::init()?;

    let mut app = match App::new() {
        Ok(app) => app,
        Err(e) => {
            if let Some(config_err) = e.downcast_ref::<ConfigError>() {
                tracing::error!("{}", config_err.user_message());
            }
            return Err(e);
        }
    };

    app.register_platform(Box::new(DmiPlatform::new()));
    app.initialize()?;

    tracing::info!("DMI bridge started");
    for accessory in app.accessories() {
        for service in accessory.services() {
            tracing::info!(
                accessory = %accessory.uuid(),
                "Exposing {} '{}'",
                service.kind(),
                service.name()
            );
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        let e = AppError::from(e);
        tracing::error!("Failed to listen for shutdown signal: {} ({})", e, e.user_message());
    }

    app.shutdown()?;
    tracing::info!("DMI bridge stopped");

    Ok(())
}
