//! Session files

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::{CustomColumn, PartialResponse, Request};

/// Saved plugin session, used for export and replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Request rows with decoded bodies, in table order
    #[serde(default)]
    pub requests2: Vec<Request>,
    /// Multi-part responses still being reassembled
    #[serde(default)]
    pub partial_responses: BTreeMap<String, PartialResponse>,
    #[serde(default)]
    pub selected_id: Option<String>,
    #[serde(default)]
    pub custom_columns: Vec<CustomColumn>,
    #[serde(default)]
    pub is_mock_response_supported: bool,
}

impl PersistedState {
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        serde_json::from_str(contents).context("parsing saved network session")
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serializing network session")
    }

    pub async fn save_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = self.to_json()?;
        tokio::fs::write(path.as_ref(), json)
            .await
            .with_context(|| format!("writing session to {:?}", path.as_ref()))
    }

    pub async fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("reading session from {:?}", path.as_ref()))?;
        Self::from_json(&contents)
    }
}
