pub mod ingest_api;

pub use ingest_api::{build_router, IngestApi};
