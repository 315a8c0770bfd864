pub mod device_service;
pub mod device_synchronizer;
pub mod error;
pub mod geocoder;
pub mod geofence_editor;
pub mod geofence_service;
pub mod geofence_synchronizer;
pub mod map_view;
pub mod store;
pub mod subscription;
pub mod types;

pub use device_service::{DeviceService, HISTORY_WINDOW_HOURS};
pub use device_synchronizer::{DeviceSyncHandle, DeviceSynchronizer};
pub use error::{DomainError, DomainResult};
pub use geocoder::{GeocodeError, Geocoder};
pub use geofence_editor::{EditorState, GeofenceDraft, GeofenceEditor};
pub use geofence_service::GeofenceService;
pub use geofence_synchronizer::{GeofenceSyncHandle, GeofenceSynchronizer};
pub use map_view::{
    CircleOverlay, MapView, MarkerOverlay, OverlaySet, DISABLED_FENCE_OPACITY,
    ENABLED_FENCE_OPACITY,
};
pub use store::{DeviceStore, GeofenceStore};
pub use subscription::{SnapshotEvent, SnapshotSender, Subscription};
pub use types::{
    Coordinate, CreateGeofenceInput, Device, DeviceDoc, Geofence, GeofenceDoc,
    LocationHistoryPoint, RecordLocationInput, RegisterDeviceInput, DEFAULT_GEOFENCE_RADIUS_M,
};
