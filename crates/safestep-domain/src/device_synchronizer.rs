use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::subscription::{SnapshotEvent, Subscription};
use crate::types::{Device, DeviceDoc};

#[derive(Debug, Default)]
struct DeviceCache {
    devices: Vec<Device>,
    error: Option<String>,
}

/// Cheap read-side handle onto the synchronized device list.
#[derive(Clone, Default)]
pub struct DeviceSyncHandle {
    cache: Arc<RwLock<DeviceCache>>,
}

impl DeviceSyncHandle {
    /// The current normalized list. Devices without a known location are
    /// included; marker rendering skips them.
    pub fn current(&self) -> Vec<Device> {
        self.cache.read().expect("device cache poisoned").devices.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.cache.read().expect("device cache poisoned").error.clone()
    }
}

/// Consumes one owner's device subscription; same replace-the-cache
/// contract as the geofence synchronizer.
pub struct DeviceSynchronizer {
    handle: DeviceSyncHandle,
}

impl Default for DeviceSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSynchronizer {
    pub fn new() -> Self {
        Self {
            handle: DeviceSyncHandle::default(),
        }
    }

    pub fn handle(&self) -> DeviceSyncHandle {
        self.handle.clone()
    }

    pub async fn run(&self, mut subscription: Subscription<DeviceDoc>, ctx: CancellationToken) {
        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("device synchronizer cancelled");
                    break;
                }
                event = subscription.recv() => match event {
                    Some(SnapshotEvent::Snapshot(docs)) => self.apply_snapshot(docs),
                    Some(SnapshotEvent::Error(reason)) => {
                        warn!(reason = %reason, "device subscription failed, freezing cache");
                        self.handle.cache.write().expect("device cache poisoned").error =
                            Some(reason);
                        break;
                    }
                    None => {
                        debug!("device subscription stream closed");
                        break;
                    }
                }
            }
        }
        subscription.cancel();
    }

    fn apply_snapshot(&self, docs: Vec<DeviceDoc>) {
        let devices: Vec<Device> = docs.into_iter().map(Device::from_doc).collect();
        debug!(count = devices.len(), "applying device snapshot");
        self.handle.cache.write().expect("device cache poisoned").devices = devices;
    }
}
