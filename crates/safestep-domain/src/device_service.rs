use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::error::{DomainError, DomainResult};
use crate::store::DeviceStore;
use crate::types::{
    Coordinate, Device, LocationHistoryPoint, RecordLocationInput, RegisterDeviceInput,
};

/// How far back the location trail view reaches.
pub const HISTORY_WINDOW_HOURS: i64 = 12;

/// Device management and ingestion business logic over the store trait.
pub struct DeviceService {
    store: Arc<dyn DeviceStore>,
}

impl DeviceService {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// Registers a tracker under an owner. The document is keyed by the
    /// hardware id, so re-registering the same id overwrites the record.
    pub async fn register_device(&self, input: RegisterDeviceInput) -> DomainResult<Device> {
        let device_id = input.device_id.trim().to_string();
        let name = input.name.trim().to_string();
        if device_id.is_empty() {
            return Err(DomainError::InvalidDeviceId(
                "Hardware ID cannot be empty".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(DomainError::InvalidDeviceName(
                "Device name cannot be empty".to_string(),
            ));
        }
        if input.owner_id.is_empty() {
            return Err(DomainError::InvalidOwnerId(
                "Owner ID cannot be empty".to_string(),
            ));
        }

        debug!(device_id = %device_id, owner_id = %input.owner_id, "Registering device");
        let device = self
            .store
            .register_device(RegisterDeviceInput {
                device_id,
                owner_id: input.owner_id,
                name,
            })
            .await?;
        info!(device_id = %device.device_id, "Device registered successfully");
        Ok(device)
    }

    pub async fn delete_device(&self, device_id: &str) -> DomainResult<()> {
        if device_id.is_empty() {
            return Err(DomainError::InvalidDeviceId(
                "Device ID cannot be empty".to_string(),
            ));
        }
        self.store.delete_device(device_id).await?;
        info!(device_id = %device_id, "Device deleted");
        Ok(())
    }

    /// Normalized devices for one owner.
    pub async fn list_devices(&self, owner_id: &str) -> DomainResult<Vec<Device>> {
        if owner_id.is_empty() {
            return Err(DomainError::InvalidOwnerId(
                "Owner ID cannot be empty".to_string(),
            ));
        }
        let docs = self.store.list_devices(owner_id).await?;
        let devices: Vec<Device> = docs.into_iter().map(Device::from_doc).collect();
        debug!(count = devices.len(), owner_id = %owner_id, "Listed devices");
        Ok(devices)
    }

    /// Ingestion path: validates the coordinate and pushes the update into
    /// the store, which stamps the server time. The device must already
    /// exist.
    pub async fn record_location(
        &self,
        device_id: &str,
        lat: f64,
        lng: f64,
        battery_level: Option<f64>,
    ) -> DomainResult<()> {
        if device_id.is_empty() {
            return Err(DomainError::InvalidDeviceId(
                "Device ID cannot be empty".to_string(),
            ));
        }
        let coordinate = Coordinate::new(lat, lng)?;
        self.store
            .record_location(RecordLocationInput {
                device_id: device_id.to_string(),
                coordinate,
                battery_level,
            })
            .await?;
        debug!(device_id = %device_id, coordinate = %coordinate, "Location recorded");
        Ok(())
    }

    /// Trail points from the last 12 hours, most recent first.
    pub async fn location_history(
        &self,
        device_id: &str,
    ) -> DomainResult<Vec<LocationHistoryPoint>> {
        if device_id.is_empty() {
            return Err(DomainError::InvalidDeviceId(
                "Device ID cannot be empty".to_string(),
            ));
        }
        let since = Utc::now() - Duration::hours(HISTORY_WINDOW_HOURS);
        self.store.location_history(device_id, since).await
    }
}
