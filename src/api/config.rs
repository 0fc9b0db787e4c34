use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Network inspector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    /// Application id of the connected client; scopes the cached mock routes
    pub app_id: String,
    /// Directory holding the local preference database
    pub storage_path: PathBuf,
    /// Imported (offline) sessions cannot receive mock routes
    pub device_archived: bool,
    /// Drop multi-part responses that stay incomplete for this long.
    /// `None` keeps them until the session ends.
    pub partial_response_ttl_ms: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            storage_path: default_storage_path(),
            device_archived: false,
            partial_response_ttl_ms: None,
        }
    }
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("network_inspector"))
        .unwrap_or_else(|| PathBuf::from("./network_inspector_data"))
}

pub fn create_default_config() -> NetworkConfig {
    NetworkConfig::default()
}
