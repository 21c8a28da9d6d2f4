//! Host-neutral accessory model.
//!
//! An accessory exposes one or more capability services (a temperature sensor,
//! a humidity sensor). Each service carries a `Name` and one primary characteristic
//! whose value is produced by a get handler registered at runtime.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::AccessoryError;

/// Capability service types an accessory can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    TemperatureSensor,
    HumiditySensor,
}

impl ServiceKind {
    /// The characteristic carrying the service's reading.
    pub fn primary_characteristic(&self) -> CharacteristicKind {
        match self {
            Self::TemperatureSensor => CharacteristicKind::CurrentTemperature,
            Self::HumiditySensor => CharacteristicKind::CurrentRelativeHumidity,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TemperatureSensor => "TemperatureSensor",
            Self::HumiditySensor => "HumiditySensor",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readable characteristic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicKind {
    /// Degrees Celsius
    CurrentTemperature,
    /// Percent
    CurrentRelativeHumidity,
}

impl CharacteristicKind {
    /// Host defaults before any `set_props` call.
    pub fn default_props(&self) -> CharacteristicProps {
        match self {
            Self::CurrentTemperature => CharacteristicProps::new(-270.0, 100.0),
            Self::CurrentRelativeHumidity => CharacteristicProps::new(0.0, 100.0),
        }
    }
}

/// Value range accepted by a characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacteristicProps {
    pub min_value: f64,
    pub max_value: f64,
}

impl CharacteristicProps {
    pub fn new(min_value: f64, max_value: f64) -> Self {
        Self {
            min_value,
            max_value,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min_value..=self.max_value).contains(&value)
    }
}

/// Synchronous get handler. Must not block on I/O.
pub type GetHandler = Box<dyn Fn() -> Result<f64, AccessoryError> + Send + Sync>;

/// A readable characteristic with an optional get handler.
pub struct Characteristic {
    kind: CharacteristicKind,
    props: RwLock<CharacteristicProps>,
    handler: RwLock<Option<GetHandler>>,
}

impl std::fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Characteristic")
            .field("kind", &self.kind)
            .field("props", &*self.props.read())
            .field("has_get_handler", &self.has_get_handler())
            .finish()
    }
}

impl Characteristic {
    pub fn new(kind: CharacteristicKind) -> Self {
        Self {
            kind,
            props: RwLock::new(kind.default_props()),
            handler: RwLock::new(None),
        }
    }

    pub fn kind(&self) -> CharacteristicKind {
        self.kind
    }

    pub fn props(&self) -> CharacteristicProps {
        *self.props.read()
    }

    pub fn set_props(&self, props: CharacteristicProps) -> &Self {
        *self.props.write() = props;
        self
    }

    /// Register the get handler, replacing any previous one.
    pub fn on_get<F>(&self, handler: F) -> &Self
    where
        F: Fn() -> Result<f64, AccessoryError> + Send + Sync + 'static,
    {
        *self.handler.write() = Some(Box::new(handler));
        self
    }

    pub fn has_get_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Read through the get handler.
    ///
    /// Returns `Ok(None)` when no handler is registered; the host then keeps
    /// showing its own default without an error.
    pub fn read(&self) -> Result<Option<f64>, AccessoryError> {
        let guard = self.handler.read();
        let Some(handler) = guard.as_ref() else {
            return Ok(None);
        };

        let value = handler()?;
        let props = self.props();
        if !props.contains(value) {
            tracing::warn!(
                "{:?} value {} is outside [{}, {}]",
                self.kind,
                value,
                props.min_value,
                props.max_value
            );
        }
        Ok(Some(value))
    }

    /// Host callback form of [`Characteristic::read`]: `callback(error, value)`.
    pub fn get<F>(&self, callback: F)
    where
        F: FnOnce(Option<AccessoryError>, Option<f64>),
    {
        match self.read() {
            Ok(value) => callback(None, value),
            Err(e) => callback(Some(e), None),
        }
    }
}

/// A capability service with a display name and its primary characteristic.
#[derive(Debug)]
pub struct Service {
    kind: ServiceKind,
    name: RwLock<String>,
    characteristic: Characteristic,
}

impl Service {
    pub fn new(kind: ServiceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: RwLock::new(name.into()),
            characteristic: Characteristic::new(kind.primary_characteristic()),
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) -> &Self {
        *self.name.write() = name.into();
        self
    }

    pub fn characteristic(&self) -> &Characteristic {
        &self.characteristic
    }
}

/// Accessory information service values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub name: String,
}

/// An accessory published to the host.
#[derive(Debug)]
pub struct PlatformAccessory {
    uuid: Uuid,
    display_name: String,
    information: AccessoryInformation,
    services: Vec<Arc<Service>>,
}

impl PlatformAccessory {
    pub fn new(uuid: Uuid, display_name: impl Into<String>, information: AccessoryInformation) -> Self {
        Self {
            uuid,
            display_name: display_name.into(),
            information,
            services: Vec::new(),
        }
    }

    /// Deterministic accessory id, stable across restarts for the same key.
    pub fn generate_uuid(platform: &str, key: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}:{}", platform, key).as_bytes())
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn information(&self) -> &AccessoryInformation {
        &self.information
    }

    pub fn services(&self) -> &[Arc<Service>] {
        &self.services
    }

    pub fn service(&self, kind: ServiceKind) -> Option<Arc<Service>> {
        self.services.iter().find(|s| s.kind() == kind).cloned()
    }

    /// Look up a service of this kind, adding it when missing.
    pub fn get_or_add_service(&mut self, kind: ServiceKind) -> Arc<Service> {
        if let Some(existing) = self.service(kind) {
            return existing;
        }
        let service = Arc::new(Service::new(kind, self.display_name.clone()));
        self.services.push(service.clone());
        service
    }

    /// Read a service's primary characteristic.
    pub fn read(&self, kind: ServiceKind) -> Result<Option<f64>, AccessoryError> {
        self.service(kind)
            .ok_or_else(|| AccessoryError::ServiceNotFound(kind.to_string()))?
            .characteristic()
            .read()
    }
}
