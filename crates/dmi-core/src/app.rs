use anyhow::Result;
use std::sync::Arc;

use crate::accessory::PlatformAccessory;
use crate::{Config, PlatformContext, PlatformProvider};

/// Application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    platforms: Vec<Box<dyn PlatformProvider>>,
    context: PlatformContext,
}

impl App {
    /// Create an application from the validated on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, _) = Config::load_validated()?;
        Ok(Self::with_config(config))
    }

    /// Create an application around an already loaded configuration
    pub fn with_config(config: Config) -> Self {
        let config = Arc::new(config);
        let context = PlatformContext::new(config.clone());

        Self {
            config,
            platforms: Vec::new(),
            context,
        }
    }

    /// Register a platform with the application
    pub fn register_platform(&mut self, platform: Box<dyn PlatformProvider>) {
        tracing::info!("Registering platform: {}", platform.name());
        self.platforms.push(platform);
    }

    /// Let every registered platform discover its accessories
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Initializing application with {} platforms",
            self.platforms.len()
        );

        for platform in &mut self.platforms {
            tracing::debug!("Discovering accessories for platform: {}", platform.name());
            platform.discover_accessories(&self.context)?;
        }

        tracing::info!(
            "Application initialized with {} accessories",
            self.accessories().len()
        );
        Ok(())
    }

    /// Shutdown the application and all platforms
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");

        for platform in &mut self.platforms {
            tracing::debug!("Shutting down platform: {}", platform.name());
            if let Err(e) = platform.shutdown() {
                tracing::error!("Error shutting down platform {}: {}", platform.name(), e);
            }
        }

        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get list of all registered platforms
    pub fn platforms(&self) -> &[Box<dyn PlatformProvider>] {
        &self.platforms
    }

    /// All accessories published by registered platforms
    pub fn accessories(&self) -> Vec<Arc<PlatformAccessory>> {
        self.platforms
            .iter()
            .flat_map(|p| p.accessories())
            .collect()
    }
}
