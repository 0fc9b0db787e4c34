//! Network Inspector API
//!
//! Entry points for hosts embedding the inspector: configuration, logging,
//! the outbound client channel and the plugin facade.

mod client;
mod config;
mod logging;
mod plugin;

pub use client::{MessageEnvelope, NoopClient, PluginClient};
pub use config::{create_default_config, NetworkConfig};
pub use logging::init_logging;
pub use plugin::NetworkPlugin;
