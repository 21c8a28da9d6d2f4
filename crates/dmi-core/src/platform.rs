use anyhow::Result;
use std::sync::Arc;

use crate::accessory::PlatformAccessory;
use crate::Config;

/// Platform provider trait: a source of accessories registered with the host
pub trait PlatformProvider: Send + Sync {
    /// Unique identifier for this platform
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Discover configured devices and create their accessories
    fn discover_accessories(&mut self, ctx: &PlatformContext) -> Result<()>;

    /// Stop background work owned by the platform
    fn shutdown(&mut self) -> Result<()>;

    /// Accessories published by this platform
    fn accessories(&self) -> Vec<Arc<PlatformAccessory>>;
}

/// Context provided to platforms during discovery
pub struct PlatformContext {
    pub config: Arc<Config>,
}

impl PlatformContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}
