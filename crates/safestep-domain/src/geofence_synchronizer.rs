use std::sync::{Arc, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::subscription::{SnapshotEvent, Subscription};
use crate::types::{Geofence, GeofenceDoc};

#[derive(Debug, Default)]
struct GeofenceCache {
    fences: Vec<Geofence>,
    error: Option<String>,
}

/// Cheap read-side handle onto the synchronized geofence list.
#[derive(Clone, Default)]
pub struct GeofenceSyncHandle {
    cache: Arc<RwLock<GeofenceCache>>,
}

impl GeofenceSyncHandle {
    /// The current normalized list, store order (created-at descending).
    pub fn current(&self) -> Vec<Geofence> {
        self.cache.read().expect("geofence cache poisoned").fences.clone()
    }

    /// Sticky subscription error, if the stream has failed. The list stays
    /// at last-known-good.
    pub fn error(&self) -> Option<String> {
        self.cache.read().expect("geofence cache poisoned").error.clone()
    }
}

/// Consumes one owner's geofence subscription and keeps a local cache
/// current. The cache is replaced wholesale on every snapshot, never
/// patched.
pub struct GeofenceSynchronizer {
    handle: GeofenceSyncHandle,
}

impl Default for GeofenceSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl GeofenceSynchronizer {
    pub fn new() -> Self {
        Self {
            handle: GeofenceSyncHandle::default(),
        }
    }

    pub fn handle(&self) -> GeofenceSyncHandle {
        self.handle.clone()
    }

    /// Single-consumer loop. Runs until the subscription errors, the stream
    /// closes, or the token is cancelled. The subscription is released on
    /// every exit path; no snapshot mutates the cache afterwards.
    pub async fn run(&self, mut subscription: Subscription<GeofenceDoc>, ctx: CancellationToken) {
        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("geofence synchronizer cancelled");
                    break;
                }
                event = subscription.recv() => match event {
                    Some(SnapshotEvent::Snapshot(docs)) => self.apply_snapshot(docs),
                    Some(SnapshotEvent::Error(reason)) => {
                        warn!(reason = %reason, "geofence subscription failed, freezing cache");
                        self.handle.cache.write().expect("geofence cache poisoned").error =
                            Some(reason);
                        break;
                    }
                    None => {
                        debug!("geofence subscription stream closed");
                        break;
                    }
                }
            }
        }
        subscription.cancel();
    }

    fn apply_snapshot(&self, docs: Vec<GeofenceDoc>) {
        let total = docs.len();
        let fences: Vec<Geofence> = docs.into_iter().filter_map(Geofence::from_doc).collect();
        debug!(total, kept = fences.len(), "applying geofence snapshot");
        self.handle.cache.write().expect("geofence cache poisoned").fences = fences;
    }
}
