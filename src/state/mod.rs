//! Plugin state and the reducer applying client events to it
//!
//! State is a plain value; `NetworkState::reduce` consumes it together with
//! one event and returns the next state.

use anyhow::Context;
use serde_json::Value;

use crate::models::{
    AddProtobufEvent, CustomColumn, PartialResponseMessage, Request, RequestInfo, ResponseInfo,
};
use crate::protobuf::ProtobufDefinitionsRegistry;
use crate::storage::{PartialResponses, PersistedState, RequestTable};

/// Everything that can change the request state
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    NewRequest(RequestInfo),
    NewResponse(ResponseInfo),
    PartialResponse(PartialResponseMessage),
    AddProtobufDefinitions(AddProtobufEvent),
    AddCustomColumn(CustomColumn),
    RemoveCustomColumn(CustomColumn),
    /// Drop stale partial responses (current time in ms, ttl in ms)
    PrunePartials { now_ms: i64, ttl_ms: u64 },
    Clear,
}

impl NetworkEvent {
    /// Parse a client message. Unknown methods yield `Ok(None)`.
    pub fn from_message(method: &str, params: Value) -> anyhow::Result<Option<Self>> {
        let event = match method {
            "newRequest" => NetworkEvent::NewRequest(
                serde_json::from_value(params).context("invalid newRequest payload")?,
            ),
            "newResponse" => NetworkEvent::NewResponse(
                serde_json::from_value(params).context("invalid newResponse payload")?,
            ),
            "partialResponse" => NetworkEvent::PartialResponse(
                serde_json::from_value(params).context("invalid partialResponse payload")?,
            ),
            "addProtobufDefinitions" => NetworkEvent::AddProtobufDefinitions(
                serde_json::from_value(params).context("invalid addProtobufDefinitions payload")?,
            ),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkState {
    pub requests: RequestTable,
    pub partial_responses: PartialResponses,
    pub protobuf_definitions: ProtobufDefinitionsRegistry,
    pub custom_columns: Vec<CustomColumn>,
}

impl NetworkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from a saved session
    pub fn from_persisted(persisted: PersistedState) -> Self {
        Self {
            requests: RequestTable::from_records(persisted.requests2),
            partial_responses: PartialResponses::from_snapshot(persisted.partial_responses),
            protobuf_definitions: ProtobufDefinitionsRegistry::new(),
            custom_columns: persisted.custom_columns,
        }
    }

    pub fn reduce(mut self, event: NetworkEvent) -> Self {
        match event {
            NetworkEvent::NewRequest(info) => {
                // Clients may send the same request more than once.
                let request = Request::from_request_info(&info, &self.custom_columns);
                self.requests.upsert(request);
            }
            NetworkEvent::NewResponse(response) => {
                self.store_response(&response);
            }
            NetworkEvent::PartialResponse(message) => {
                if let Some(response) = self.partial_responses.accept(message) {
                    self.store_response(&response);
                }
            }
            NetworkEvent::AddProtobufDefinitions(definitions) => {
                for (base_url, defs) in definitions {
                    self.protobuf_definitions.add_definitions(&base_url, defs);
                }
            }
            NetworkEvent::AddCustomColumn(column) => {
                if !self.custom_columns.contains(&column) {
                    for request in self.requests.iter_mut() {
                        request.apply_custom_column(&column);
                    }
                    self.custom_columns.push(column);
                }
            }
            NetworkEvent::RemoveCustomColumn(column) => {
                self.custom_columns.retain(|c| c != &column);
                let field = column.field_name();
                for request in self.requests.iter_mut() {
                    request.custom_columns.remove(&field);
                }
            }
            NetworkEvent::PrunePartials { now_ms, ttl_ms } => {
                self.partial_responses.prune_stale(now_ms, ttl_ms);
            }
            NetworkEvent::Clear => {
                self.requests.clear();
            }
        }
        self
    }

    fn store_response(&mut self, response: &ResponseInfo) {
        // The table may have been cleared since the request arrived.
        let Some(request) = self.requests.get_by_id(&response.id) else {
            return;
        };
        let updated = request.with_response(response, &self.custom_columns);
        self.requests.upsert(updated);
    }

    /// Session snapshot of the request-related state
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            requests2: self.requests.to_vec(),
            partial_responses: self.partial_responses.snapshot(),
            custom_columns: self.custom_columns.clone(),
            ..Default::default()
        }
    }
}
