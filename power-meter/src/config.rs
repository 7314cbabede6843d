//! Service configuration.
//!
//! Stored as pretty-printed JSON. Every field has a default, so a partial
//! file (or none at all) is valid.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Service name published with the schema.
pub const SERVICE_NAME: &str = "RFPowerMeter";

/// Measurement version published with the schema.
pub const SERVICE_VERSION: &str = "1.0.1.0";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Hosting configuration for the measurement service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name shown to clients
    pub display_name: String,
    /// Measurement version
    pub version: String,
    /// Short human-readable description
    pub description: String,
    /// Address the HTTP host listens on
    pub bind_address: SocketAddr,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            display_name: SERVICE_NAME.to_string(),
            version: SERVICE_VERSION.to_string(),
            description: "Single-shot average power measurement with an R&S NRP sensor"
                .to_string(),
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
        }
    }
}

impl ServiceConfig {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
