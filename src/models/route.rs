//! Models related to mock routes.

use crate::models::Header;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn default_method() -> String {
    "GET".to_string()
}

fn default_enabled() -> bool {
    true
}

/// A user-defined rule substituting a canned response for a URL/method pair.
///
/// Route ids are not part of the route itself; the route manager keys them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub request_url: String,
    #[serde(default = "default_method")]
    pub request_method: String,
    #[serde(default)]
    pub response_data: String,
    /// Response headers keyed by header name
    #[serde(default)]
    pub response_headers: IndexMap<String, Header>,
    #[serde(default)]
    pub response_status: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            request_url: String::new(),
            request_method: default_method(),
            response_data: String::new(),
            response_headers: IndexMap::new(),
            response_status: "200".to_string(),
            enabled: true,
        }
    }
}

impl Route {
    /// Apply a partial edit in place
    pub fn apply(&mut self, change: RouteChange) {
        if let Some(url) = change.request_url {
            self.request_url = url;
        }
        if let Some(method) = change.request_method {
            self.request_method = method;
        }
        if let Some(data) = change.response_data {
            self.response_data = data;
        }
        if let Some(headers) = change.response_headers {
            self.response_headers = headers;
        }
        if let Some(status) = change.response_status {
            self.response_status = status;
        }
        if let Some(enabled) = change.enabled {
            self.enabled = enabled;
        }
    }

    /// Convert to the shape the client expects in `mockResponses`
    pub fn to_mock_route(&self) -> MockRoute {
        MockRoute {
            request_url: self.request_url.clone(),
            method: self.request_method.clone(),
            data: self.response_data.clone(),
            headers: self.response_headers.values().cloned().collect(),
            status: self.response_status.clone(),
            enabled: self.enabled,
        }
    }
}

/// Partial route edit; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteChange {
    pub request_url: Option<String>,
    pub request_method: Option<String>,
    pub response_data: Option<String>,
    pub response_headers: Option<IndexMap<String, Header>>,
    pub response_status: Option<String>,
    pub enabled: Option<bool>,
}

/// Route as pushed to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRoute {
    pub request_url: String,
    pub method: String,
    pub data: String,
    pub headers: Vec<Header>,
    pub status: String,
    pub enabled: bool,
}
