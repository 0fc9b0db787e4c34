use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Schema information for one protobuf-encoded endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtobufDefinition {
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub request_message_full_name: Option<String>,
    #[serde(default)]
    pub request_definitions: Option<Value>,
    #[serde(default)]
    pub response_message_full_name: Option<String>,
    #[serde(default)]
    pub response_definitions: Option<Value>,
}

/// Payload of `addProtobufDefinitions`: definitions grouped by base URL
pub type AddProtobufEvent = BTreeMap<String, Vec<ProtobufDefinition>>;
