use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bind host for the ingestion endpoint
    #[serde(default = "default_ingest_host")]
    pub ingest_host: String,

    /// Bind port for the ingestion endpoint
    #[serde(default = "default_ingest_port")]
    pub ingest_port: u16,

    /// Owner whose geofences and devices the dashboard synchronizers follow
    #[serde(default = "default_owner_id")]
    pub owner_id: String,

    /// Interval between synchronizer status log lines, in seconds
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SAFESTEP"))
            .build()?
            .try_deserialize()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ingest_host() -> String {
    "0.0.0.0".to_string()
}

fn default_ingest_port() -> u16 {
    8080
}

fn default_owner_id() -> String {
    "local-owner".to_string()
}

fn default_status_interval_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        let config: ServiceConfig = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.ingest_port, 8080);
        assert_eq!(config.owner_id, "local-owner");
        assert_eq!(config.status_interval_secs, 30);
    }
}
