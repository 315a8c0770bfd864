use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{DomainError, DomainResult};

/// Radius applied to geofence documents written before the radius field
/// existed.
pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 100.0;

/// A validated WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Rejects non-finite components and values outside the valid
    /// latitude/longitude ranges.
    pub fn new(lat: f64, lng: f64) -> DomainResult<Self> {
        if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(DomainError::InvalidCoordinate(format!("({lat}, {lng})")));
        }
        Ok(Self { lat, lng })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// Device document as stored. Optional fields reflect records the ingestion
/// endpoint has not touched yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDoc {
    /// Document key; equals the physical tracker's hardware id.
    pub device_id: String,
    pub owner_id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub latest_location: Option<(f64, f64)>,
    pub last_seen: Option<DateTime<Utc>>,
    pub battery_level: Option<f64>,
}

/// Normalized device for rendering and list display.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub device_id: String,
    pub owner_id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub latest_location: Option<Coordinate>,
    pub last_seen: Option<DateTime<Utc>>,
    pub battery_level: Option<f64>,
}

impl Device {
    /// Normalizes a raw document. A missing or malformed location downgrades
    /// to `None` (the device stays listed, it just has no marker).
    pub fn from_doc(doc: DeviceDoc) -> Self {
        let latest_location = match doc.latest_location {
            Some((lat, lng)) => match Coordinate::new(lat, lng) {
                Ok(coordinate) => Some(coordinate),
                Err(_) => {
                    warn!(
                        device_id = %doc.device_id,
                        lat, lng,
                        "dropping malformed device location"
                    );
                    None
                }
            },
            None => None,
        };
        Self {
            device_id: doc.device_id,
            owner_id: doc.owner_id,
            name: doc.name,
            created_at: doc.created_at,
            latest_location,
            last_seen: doc.last_seen,
            battery_level: doc.battery_level,
        }
    }
}

/// Geofence document as stored. Older records may lack the enabled flag and
/// the radius.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceDoc {
    pub geofence_id: String,
    pub owner_id: String,
    pub name: String,
    pub center: Option<(f64, f64)>,
    pub radius_m: Option<f64>,
    pub is_enabled: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Normalized geofence, guaranteed renderable.
#[derive(Debug, Clone, PartialEq)]
pub struct Geofence {
    pub geofence_id: String,
    pub owner_id: String,
    pub name: String,
    pub center: Coordinate,
    pub radius_m: f64,
    pub is_enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Geofence {
    /// Normalizes a raw document, or returns `None` when the center is
    /// missing or malformed. Corrupt documents must never break rendering,
    /// so callers drop the `None`s and keep going.
    pub fn from_doc(doc: GeofenceDoc) -> Option<Self> {
        let center = match doc.center {
            Some((lat, lng)) => match Coordinate::new(lat, lng) {
                Ok(coordinate) => coordinate,
                Err(_) => {
                    warn!(
                        geofence_id = %doc.geofence_id,
                        lat, lng,
                        "dropping geofence with malformed center"
                    );
                    return None;
                }
            },
            None => {
                warn!(geofence_id = %doc.geofence_id, "dropping geofence without a center");
                return None;
            }
        };
        Some(Self {
            geofence_id: doc.geofence_id,
            owner_id: doc.owner_id,
            name: doc.name,
            center,
            radius_m: doc.radius_m.unwrap_or(DEFAULT_GEOFENCE_RADIUS_M),
            is_enabled: doc.is_enabled.unwrap_or(true),
            created_at: doc.created_at,
        })
    }
}

/// A single point of a device's location trail. Append-only, written only by
/// the ingestion path.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationHistoryPoint {
    pub device_id: String,
    pub recorded_at: DateTime<Utc>,
    pub coordinate: Coordinate,
}

/// Input for registering a tracker under an owner.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterDeviceInput {
    /// Hardware id programmed into the physical device; becomes the
    /// document key.
    pub device_id: String,
    pub owner_id: String,
    pub name: String,
}

/// Input for persisting a new geofence. Produced only by the editor after
/// validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateGeofenceInput {
    pub owner_id: String,
    pub name: String,
    pub center: Coordinate,
    pub radius_m: f64,
}

/// Input for a device location update. The store stamps the server time.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLocationInput {
    pub device_id: String,
    pub coordinate: Coordinate,
    pub battery_level: Option<f64>,
}
