use async_trait::async_trait;

use crate::error::DomainResult;
use crate::subscription::Subscription;
use crate::types::{
    CreateGeofenceInput, Device, DeviceDoc, Geofence, GeofenceDoc, LocationHistoryPoint,
    RecordLocationInput, RegisterDeviceInput,
};

/// Storage operations for geofence documents. The store assigns document
/// ids and the `created_at` server timestamp.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeofenceStore: Send + Sync {
    /// Persists a new geofence with `is_enabled: true`.
    async fn create_geofence(&self, input: CreateGeofenceInput) -> DomainResult<Geofence>;

    async fn set_geofence_enabled(&self, geofence_id: &str, enabled: bool) -> DomainResult<()>;

    async fn delete_geofence(&self, geofence_id: &str) -> DomainResult<()>;

    /// Raw documents for one owner, created-at descending.
    async fn list_geofences(&self, owner_id: &str) -> DomainResult<Vec<GeofenceDoc>>;

    /// Standing subscription to one owner's geofences. Delivers the current
    /// result set immediately, then a fresh snapshot on every change.
    async fn subscribe_geofences(&self, owner_id: &str) -> DomainResult<Subscription<GeofenceDoc>>;
}

/// Storage operations for device documents, keyed by hardware id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Creates or overwrites the document keyed by the hardware id.
    async fn register_device(&self, input: RegisterDeviceInput) -> DomainResult<Device>;

    async fn get_device(&self, device_id: &str) -> DomainResult<Option<DeviceDoc>>;

    async fn delete_device(&self, device_id: &str) -> DomainResult<()>;

    async fn list_devices(&self, owner_id: &str) -> DomainResult<Vec<DeviceDoc>>;

    /// Updates `latest_location`, `last_seen` (server-assigned) and
    /// optionally `battery_level`, and appends a history point. Fails with
    /// `DeviceNotFound` when the document does not exist; ingestion never
    /// creates devices.
    async fn record_location(&self, input: RecordLocationInput) -> DomainResult<()>;

    /// History points since the given instant, most recent first.
    async fn location_history(
        &self,
        device_id: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<Vec<LocationHistoryPoint>>;

    /// Standing subscription to one owner's devices.
    async fn subscribe_devices(&self, owner_id: &str) -> DomainResult<Subscription<DeviceDoc>>;
}
