use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{DomainError, DomainResult};
use crate::store::GeofenceStore;
use crate::types::Geofence;

/// Geofence management logic. Creation is not here on purpose: new fences
/// go through the editor workflow, which owns validation.
pub struct GeofenceService {
    store: Arc<dyn GeofenceStore>,
}

impl GeofenceService {
    pub fn new(store: Arc<dyn GeofenceStore>) -> Self {
        Self { store }
    }

    /// Normalized geofences for one owner, created-at descending. Corrupt
    /// documents are dropped during normalization.
    pub async fn list_geofences(&self, owner_id: &str) -> DomainResult<Vec<Geofence>> {
        if owner_id.is_empty() {
            return Err(DomainError::InvalidOwnerId(
                "Owner ID cannot be empty".to_string(),
            ));
        }
        let docs = self.store.list_geofences(owner_id).await?;
        let fences: Vec<Geofence> = docs.into_iter().filter_map(Geofence::from_doc).collect();
        debug!(count = fences.len(), owner_id = %owner_id, "Listed geofences");
        Ok(fences)
    }

    /// Flips the enabled flag. Disabled fences still render, dimmed.
    pub async fn toggle_geofence(&self, geofence_id: &str, currently_enabled: bool) -> DomainResult<()> {
        if geofence_id.is_empty() {
            return Err(DomainError::GeofenceNotFound(geofence_id.to_string()));
        }
        self.store
            .set_geofence_enabled(geofence_id, !currently_enabled)
            .await?;
        info!(geofence_id = %geofence_id, enabled = !currently_enabled, "Geofence toggled");
        Ok(())
    }

    pub async fn delete_geofence(&self, geofence_id: &str) -> DomainResult<()> {
        if geofence_id.is_empty() {
            return Err(DomainError::GeofenceNotFound(geofence_id.to_string()));
        }
        self.store.delete_geofence(geofence_id).await?;
        info!(geofence_id = %geofence_id, "Geofence deleted");
        Ok(())
    }
}
