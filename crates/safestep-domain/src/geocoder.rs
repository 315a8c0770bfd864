use async_trait::async_trait;
use thiserror::Error;

use crate::types::Coordinate;

/// Failure reasons from the map provider's forward-geocoding call. The
/// display text is shown to the user as-is, so it distinguishes not-found
/// from provider trouble.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("Address not found")]
    NotFound,

    #[error("Geocoding failed: {0}")]
    Provider(String),
}

/// Forward geocoding: free-text address to coordinate. Implemented by the
/// map-provider integration; mocked in editor tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError>;
}
