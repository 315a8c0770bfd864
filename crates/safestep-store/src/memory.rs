use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;

use safestep_domain::error::{DomainError, DomainResult};
use safestep_domain::store::{DeviceStore, GeofenceStore};
use safestep_domain::subscription::{SnapshotEvent, SnapshotSender, Subscription};
use safestep_domain::types::{
    CreateGeofenceInput, Device, DeviceDoc, Geofence, GeofenceDoc, LocationHistoryPoint,
    RecordLocationInput, RegisterDeviceInput,
};

struct OwnerSub<T> {
    owner_id: String,
    sender: SnapshotSender<T>,
}

#[derive(Default)]
struct StoreInner {
    devices: HashMap<String, DeviceDoc>,
    geofences: HashMap<String, GeofenceDoc>,
    history: Vec<LocationHistoryPoint>,
    device_subs: HashMap<u64, OwnerSub<DeviceDoc>>,
    geofence_subs: HashMap<u64, OwnerSub<GeofenceDoc>>,
    next_sub_id: u64,
}

impl StoreInner {
    fn device_snapshot(&self, owner_id: &str) -> Vec<DeviceDoc> {
        let mut docs: Vec<DeviceDoc> = self
            .devices
            .values()
            .filter(|doc| doc.owner_id == owner_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }

    fn geofence_snapshot(&self, owner_id: &str) -> Vec<GeofenceDoc> {
        let mut docs: Vec<GeofenceDoc> = self
            .geofences
            .values()
            .filter(|doc| doc.owner_id == owner_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }

    /// Fans a fresh snapshot out to every subscriber watching this owner.
    /// Computed under the store lock, so each snapshot is internally
    /// consistent.
    fn notify_device_subs(&self, owner_id: &str) {
        for sub in self.device_subs.values() {
            if sub.owner_id == owner_id {
                let _ = sub
                    .sender
                    .send(SnapshotEvent::Snapshot(self.device_snapshot(owner_id)));
            }
        }
    }

    fn notify_geofence_subs(&self, owner_id: &str) {
        for sub in self.geofence_subs.values() {
            if sub.owner_id == owner_id {
                let _ = sub
                    .sender
                    .send(SnapshotEvent::Snapshot(self.geofence_snapshot(owner_id)));
            }
        }
    }
}

/// In-memory document store with owner-filtered snapshot subscriptions.
/// Not durable; exists for local deployments and tests. Every mutation
/// recomputes and fans out the affected owner's full result set, mirroring
/// the behavior of a remote document store's standing queries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("memory store poisoned")
    }

    fn subscribe_devices_inner(&self, owner_id: &str) -> Subscription<DeviceDoc> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let sub_id = inner.next_sub_id;
        inner.next_sub_id += 1;
        // Initial snapshot before the subscription is handed out.
        let _ = tx.send(SnapshotEvent::Snapshot(inner.device_snapshot(owner_id)));
        inner.device_subs.insert(
            sub_id,
            OwnerSub {
                owner_id: owner_id.to_string(),
                sender: tx,
            },
        );
        drop(inner);
        debug!(sub_id, owner_id = %owner_id, "device subscription opened");

        let store = Arc::clone(&self.inner);
        Subscription::new(rx, move || {
            store
                .lock()
                .expect("memory store poisoned")
                .device_subs
                .remove(&sub_id);
        })
    }

    fn subscribe_geofences_inner(&self, owner_id: &str) -> Subscription<GeofenceDoc> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let sub_id = inner.next_sub_id;
        inner.next_sub_id += 1;
        let _ = tx.send(SnapshotEvent::Snapshot(inner.geofence_snapshot(owner_id)));
        inner.geofence_subs.insert(
            sub_id,
            OwnerSub {
                owner_id: owner_id.to_string(),
                sender: tx,
            },
        );
        drop(inner);
        debug!(sub_id, owner_id = %owner_id, "geofence subscription opened");

        let store = Arc::clone(&self.inner);
        Subscription::new(rx, move || {
            store
                .lock()
                .expect("memory store poisoned")
                .geofence_subs
                .remove(&sub_id);
        })
    }

    /// Pushes a subscription failure to every subscriber. Simulates the
    /// store becoming unreachable; used by tests and operational drills.
    pub fn fail_subscriptions(&self, reason: &str) {
        let inner = self.lock();
        for sub in inner.device_subs.values() {
            let _ = sub.sender.send(SnapshotEvent::Error(reason.to_string()));
        }
        for sub in inner.geofence_subs.values() {
            let _ = sub.sender.send(SnapshotEvent::Error(reason.to_string()));
        }
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn register_device(&self, input: RegisterDeviceInput) -> DomainResult<Device> {
        let now = Utc::now();
        let doc = DeviceDoc {
            device_id: input.device_id.clone(),
            owner_id: input.owner_id.clone(),
            name: input.name,
            created_at: Some(now),
            latest_location: None,
            last_seen: None,
            battery_level: None,
        };
        let mut inner = self.lock();
        inner.devices.insert(input.device_id, doc.clone());
        inner.notify_device_subs(&input.owner_id);
        Ok(Device::from_doc(doc))
    }

    async fn get_device(&self, device_id: &str) -> DomainResult<Option<DeviceDoc>> {
        Ok(self.lock().devices.get(device_id).cloned())
    }

    async fn delete_device(&self, device_id: &str) -> DomainResult<()> {
        let mut inner = self.lock();
        let doc = inner
            .devices
            .remove(device_id)
            .ok_or_else(|| DomainError::DeviceNotFound(device_id.to_string()))?;
        inner.history.retain(|point| point.device_id != device_id);
        inner.notify_device_subs(&doc.owner_id);
        Ok(())
    }

    async fn list_devices(&self, owner_id: &str) -> DomainResult<Vec<DeviceDoc>> {
        Ok(self.lock().device_snapshot(owner_id))
    }

    async fn record_location(&self, input: RecordLocationInput) -> DomainResult<()> {
        let now = Utc::now();
        let mut inner = self.lock();
        let doc = inner
            .devices
            .get_mut(&input.device_id)
            .ok_or_else(|| DomainError::DeviceNotFound(input.device_id.clone()))?;
        doc.latest_location = Some((input.coordinate.lat, input.coordinate.lng));
        doc.last_seen = Some(now);
        if input.battery_level.is_some() {
            doc.battery_level = input.battery_level;
        }
        let owner_id = doc.owner_id.clone();
        inner.history.push(LocationHistoryPoint {
            device_id: input.device_id,
            recorded_at: now,
            coordinate: input.coordinate,
        });
        inner.notify_device_subs(&owner_id);
        Ok(())
    }

    async fn location_history(
        &self,
        device_id: &str,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<LocationHistoryPoint>> {
        let inner = self.lock();
        let mut points: Vec<LocationHistoryPoint> = inner
            .history
            .iter()
            .filter(|point| point.device_id == device_id && point.recorded_at >= since)
            .cloned()
            .collect();
        points.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(points)
    }

    async fn subscribe_devices(&self, owner_id: &str) -> DomainResult<Subscription<DeviceDoc>> {
        Ok(self.subscribe_devices_inner(owner_id))
    }
}

#[async_trait]
impl GeofenceStore for MemoryStore {
    async fn create_geofence(&self, input: CreateGeofenceInput) -> DomainResult<Geofence> {
        let doc = GeofenceDoc {
            geofence_id: xid::new().to_string(),
            owner_id: input.owner_id.clone(),
            name: input.name,
            center: Some((input.center.lat, input.center.lng)),
            radius_m: Some(input.radius_m),
            is_enabled: Some(true),
            created_at: Some(Utc::now()),
        };
        let mut inner = self.lock();
        inner.geofences.insert(doc.geofence_id.clone(), doc.clone());
        inner.notify_geofence_subs(&input.owner_id);
        // The doc was built from validated input, so normalization holds.
        Geofence::from_doc(doc)
            .ok_or_else(|| DomainError::RepositoryError(anyhow::anyhow!("created geofence failed normalization")))
    }

    async fn set_geofence_enabled(&self, geofence_id: &str, enabled: bool) -> DomainResult<()> {
        let mut inner = self.lock();
        let doc = inner
            .geofences
            .get_mut(geofence_id)
            .ok_or_else(|| DomainError::GeofenceNotFound(geofence_id.to_string()))?;
        doc.is_enabled = Some(enabled);
        let owner_id = doc.owner_id.clone();
        inner.notify_geofence_subs(&owner_id);
        Ok(())
    }

    async fn delete_geofence(&self, geofence_id: &str) -> DomainResult<()> {
        let mut inner = self.lock();
        let doc = inner
            .geofences
            .remove(geofence_id)
            .ok_or_else(|| DomainError::GeofenceNotFound(geofence_id.to_string()))?;
        inner.notify_geofence_subs(&doc.owner_id);
        Ok(())
    }

    async fn list_geofences(&self, owner_id: &str) -> DomainResult<Vec<GeofenceDoc>> {
        Ok(self.lock().geofence_snapshot(owner_id))
    }

    async fn subscribe_geofences(&self, owner_id: &str) -> DomainResult<Subscription<GeofenceDoc>> {
        Ok(self.subscribe_geofences_inner(owner_id))
    }
}
