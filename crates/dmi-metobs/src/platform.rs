//! The DMI platform: one accessory controller per configured station.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use dmi_core::{AccessoryInformation, PlatformAccessory, PlatformContext, PlatformProvider};

use crate::client::MetObsClient;
use crate::controller::AccessoryController;
use crate::types::Station;

pub const MANUFACTURER: &str = "DMI Bridge";
pub const MODEL: &str = "MetObs Weather Station";

pub struct DmiPlatform {
    name: String,
    controllers: Vec<AccessoryController>,
}

impl DmiPlatform {
    pub fn new() -> Self {
        Self {
            name: dmi_core::config::PLATFORM_NAME.to_string(),
            controllers: Vec::new(),
        }
    }

    pub fn controllers(&self) -> &[AccessoryController] {
        &self.controllers
    }

    pub fn controller(&self, station_id: u32) -> Option<&AccessoryController> {
        self.controllers.iter().find(|c| c.station().id == station_id)
    }

    /// Wait until every station's initial fetches have finished.
    pub async fn wait_initialized(&mut self) {
        for controller in &mut self.controllers {
            controller.wait_initialized().await;
        }
    }

    fn build_accessory(&self, station: &Station) -> PlatformAccessory {
        PlatformAccessory::new(
            PlatformAccessory::generate_uuid(&self.name, &station.api_id()),
            station.name.clone(),
            AccessoryInformation {
                manufacturer: MANUFACTURER.to_string(),
                model: MODEL.to_string(),
                serial_number: station.api_id(),
                name: station.name.clone(),
            },
        )
    }
}

impl Default for DmiPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformProvider for DmiPlatform {
    fn id(&self) -> &str {
        "dmi-metobs"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn discover_accessories(&mut self, ctx: &PlatformContext) -> Result<()> {
        let config = &ctx.config;
        self.name = config.platform.name.clone();

        // Rediscovery replaces the previous controllers and their timers.
        if !self.controllers.is_empty() {
            tracing::info!("Replacing {} existing accessories", self.controllers.len());
            self.shutdown()?;
            self.controllers.clear();
        }

        let client = MetObsClient::from_config(&config.metobs)
            .context("Failed to create MetObs client")?;
        let client = Arc::new(client);
        let refresh = Duration::from_secs(u64::from(config.metobs.refresh_minutes) * 60);

        for station_config in &config.stations {
            let station = Station::from(station_config);
            tracing::info!("Adding accessory for station {}", station);

            let accessory = self.build_accessory(&station);
            self.controllers.push(AccessoryController::new(
                client.clone(),
                accessory,
                station,
                refresh,
            ));
        }

        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        for controller in &self.controllers {
            controller.shutdown();
        }
        Ok(())
    }

    fn accessories(&self) -> Vec<Arc<PlatformAccessory>> {
        self.controllers
            .iter()
            .map(|c| c.accessory().clone())
            .collect()
    }
}
