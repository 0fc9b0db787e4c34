//! Protobuf schema registry
//!
//! Clients announce which endpoints carry protobuf payloads. The registry is
//! owned by one plugin instance and only used for display decoding; it never
//! affects the request table.

use serde_json::Value;
use std::collections::HashMap;

use crate::models::ProtobufDefinition;

/// Message name and raw schema for one side of an endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct MessageType<'a> {
    pub full_name: &'a str,
    pub definitions: Option<&'a Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ProtobufDefinitionsRegistry {
    definitions: HashMap<String, ProtobufDefinition>,
}

impl ProtobufDefinitionsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register definitions whose paths are relative to `base_url`
    pub fn add_definitions(&mut self, base_url: &str, definitions: Vec<ProtobufDefinition>) {
        for definition in definitions {
            let url = if !base_url.ends_with('/') && !definition.path.starts_with('/') {
                format!("{}/{}", base_url, definition.path)
            } else {
                format!("{}{}", base_url, definition.path)
            };
            let key = Self::key(&definition.method, &url);
            tracing::debug!("registered protobuf definition {}", key);
            self.definitions.insert(key, definition);
        }
    }

    pub fn request_type(&self, method: &str, url: &str) -> Option<MessageType<'_>> {
        let definition = self.definitions.get(&Self::key(method, url))?;
        Some(MessageType {
            full_name: definition.request_message_full_name.as_deref()?,
            definitions: definition.request_definitions.as_ref(),
        })
    }

    pub fn response_type(&self, method: &str, url: &str) -> Option<MessageType<'_>> {
        let definition = self.definitions.get(&Self::key(method, url))?;
        Some(MessageType {
            full_name: definition.response_message_full_name.as_deref()?,
            definitions: definition.response_definitions.as_ref(),
        })
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn key(method: &str, url: &str) -> String {
        let path = url.split('?').next().unwrap_or_default();
        format!("{}::{}", method, path)
    }
}
