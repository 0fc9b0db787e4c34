use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound side of the message channel to the instrumented client
#[async_trait]
pub trait PluginClient: Send + Sync {
    /// Whether the client implements `method`
    async fn supports_method(&self, method: &str) -> bool;

    async fn send(&self, method: &str, params: Value) -> anyhow::Result<()>;
}

/// Client that accepts every call and only logs it. Used when replaying
/// recorded traffic with no device attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClient;

#[async_trait]
impl PluginClient for NoopClient {
    async fn supports_method(&self, _method: &str) -> bool {
        false
    }

    async fn send(&self, method: &str, _params: Value) -> anyhow::Result<()> {
        tracing::debug!("dropping outbound call {}", method);
        Ok(())
    }
}

/// One inbound message: method name plus JSON params
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl MessageEnvelope {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}
