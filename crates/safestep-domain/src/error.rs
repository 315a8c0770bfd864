use thiserror::Error;

use crate::geocoder::GeocodeError;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Geofence not found: {0}")]
    GeofenceNotFound(String),

    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid device name: {0}")]
    InvalidDeviceName(String),

    #[error("Invalid owner ID: {0}")]
    InvalidOwnerId(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Geofence name must not be empty")]
    InvalidGeofenceName,

    #[error("Radius must be a number greater than 0, got {0:?}")]
    InvalidRadius(String),

    #[error("Pick a center on the map or look up an address first")]
    MissingCenter,

    #[error("An address lookup is already in progress")]
    GeocodeInFlight,

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error("Operation not valid in the current editor state: {0}")]
    EditorState(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
