pub mod geocoder;
pub mod memory;

pub use geocoder::TableGeocoder;
pub use memory::MemoryStore;
