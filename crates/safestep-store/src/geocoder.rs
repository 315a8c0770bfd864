use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use safestep_domain::geocoder::{GeocodeError, Geocoder};
use safestep_domain::types::Coordinate;

/// Table-backed forward geocoder for local deployments and tests. Lookup
/// is case-insensitive on the trimmed address; misses resolve to
/// `NotFound`, matching the provider status the editor distinguishes.
#[derive(Default)]
pub struct TableGeocoder {
    entries: HashMap<String, Coordinate>,
}

impl TableGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, address: &str, coordinate: Coordinate) -> Self {
        self.insert(address, coordinate);
        self
    }

    pub fn insert(&mut self, address: &str, coordinate: Coordinate) {
        self.entries
            .insert(address.trim().to_lowercase(), coordinate);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Geocoder for TableGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let key = address.trim().to_lowercase();
        match self.entries.get(&key) {
            Some(coordinate) => {
                debug!(address = %address, coordinate = %coordinate, "address resolved");
                Ok(*coordinate)
            }
            None => Err(GeocodeError::NotFound),
        }
    }
}
