//! Request/response models
//!
//! Wire types as sent by the instrumented client, and the merged `Request`
//! row kept in the request table.

use base64::{engine::general_purpose, Engine as _};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::decode::{decode_body, get_header_value, response_length};
use crate::models::{CustomColumn, CustomColumnKind};

/// Header used to override the display domain of a request
pub const FRIENDLY_NAME_HEADER: &str = "X-FB-Friendly-Name";

/// Domain shown when neither a friendly name nor a parseable URL exists
pub const UNKNOWN_DOMAIN: &str = "<unknown>";

/// A single HTTP header. Keys are matched case-insensitively; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Request event as received from the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    pub id: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
    pub method: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Raw body, base64 encoded (possibly compressed)
    #[serde(default)]
    pub data: Option<String>,
}

/// Retry statistics reported by some clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryInsights {
    pub count: u32,
    pub limit: u32,
    pub time_between_retries: f64,
    pub reason: String,
}

/// Client-side timing breakdown attached to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Insights {
    pub dns_lookup_time: Option<f64>,
    pub connect_time: Option<f64>,
    pub ssl_handshake_time: Option<f64>,
    pub pre_transfer_time: Option<f64>,
    pub redirects_time: Option<f64>,
    pub time_to_first_byte: Option<f64>,
    pub transfer_time: Option<f64>,
    pub post_processing_time: Option<f64>,
    pub bytes_transfered: Option<f64>,
    pub transfer_speed: Option<f64>,
    pub retries: Option<RetryInsights>,
}

/// Response event as received from the client.
///
/// When `total_chunks` is greater than one, this is the initial chunk
/// (`index == 0`) of a multi-part response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    pub id: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
    pub status: u16,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub is_mock: bool,
    #[serde(default)]
    pub insights: Option<Insights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// A follow-up piece of a multi-part response (`index >= 1`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFollowupChunk {
    pub id: String,
    pub total_chunks: u32,
    pub index: u32,
    pub data: String,
}

/// Payload of a `partialResponse` event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PartialResponseMessage {
    Initial(ResponseInfo),
    Followup(ResponseFollowupChunk),
}

impl PartialResponseMessage {
    pub fn id(&self) -> &str {
        match self {
            PartialResponseMessage::Initial(resp) => &resp.id,
            PartialResponseMessage::Followup(chunk) => &chunk.id,
        }
    }
}

impl<'de> Deserialize<'de> for PartialResponseMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The index decides the shape; both shapes share id/index/data.
        let value = Value::deserialize(deserializer)?;
        let index = value.get("index").and_then(Value::as_u64).unwrap_or(0);
        if index > 0 {
            serde_json::from_value(value)
                .map(PartialResponseMessage::Followup)
                .map_err(D::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(PartialResponseMessage::Initial)
                .map_err(D::Error::custom)
        }
    }
}

/// Pending state of a multi-part response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_response: Option<ResponseInfo>,
    /// Follow-up chunk payloads keyed by chunk index
    #[serde(default)]
    pub followup_chunks: BTreeMap<u32, String>,
}

/// A decoded request or response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedBody {
    Text(String),
    Binary(Vec<u8>),
}

impl DecodedBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DecodedBody::Text(text) => Some(text),
            DecodedBody::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DecodedBody::Text(text) => text.len(),
            DecodedBody::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Session format: text bodies are plain strings, binary bodies are a
// one-element array wrapping the base64 payload.
impl Serialize for DecodedBody {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DecodedBody::Text(text) => serializer.serialize_str(text),
            DecodedBody::Binary(bytes) => {
                [general_purpose::STANDARD.encode(bytes)].serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for DecodedBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Wrapped(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Ok(DecodedBody::Text(text)),
            Raw::Wrapped(parts) => {
                let encoded = parts.concat();
                general_purpose::STANDARD
                    .decode(encoded)
                    .map(DecodedBody::Binary)
                    .map_err(D::Error::custom)
            }
        }
    }
}

/// One row of the request table: a request merged with its response once known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,

    // Request data
    /// Milliseconds since epoch
    pub request_time: i64,
    pub method: String,
    /// Raw URL as sent by the client (empty when absent)
    pub url: String,
    /// Display grouping label
    pub domain: String,
    pub request_headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_data: Option<DecodedBody>,

    // Response data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<Vec<Header>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<DecodedBody>,
    /// Size in bytes of the response as transferred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_is_mock: Option<bool>,
    /// Response time minus request time, in ms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,

    /// Values extracted for user-defined header columns
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_columns: BTreeMap<String, String>,
}

impl Request {
    /// Build a table row from a `newRequest` event.
    ///
    /// A malformed URL is logged and only affects the derived domain.
    pub fn from_request_info(info: &RequestInfo, columns: &[CustomColumn]) -> Self {
        let parsed = info
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .and_then(|url| match Url::parse(url) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    tracing::warn!("Failed to parse url: '{}': {}", url, err);
                    None
                }
            });

        let domain = get_header_value(&info.headers, FRIENDLY_NAME_HEADER)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| parsed.as_ref().map(domain_of))
            .unwrap_or_else(|| UNKNOWN_DOMAIN.to_string());

        let mut request = Self {
            id: info.id.clone(),
            request_time: info.timestamp,
            method: info.method.clone(),
            url: info.url.clone().unwrap_or_default(),
            domain,
            request_headers: info.headers.clone(),
            request_data: decode_body(Some(&info.headers), info.data.as_deref()),
            response_time: None,
            status: None,
            reason: None,
            response_headers: None,
            response_data: None,
            response_length: None,
            response_is_mock: None,
            duration: None,
            insights: None,
            custom_columns: BTreeMap::new(),
        };
        for column in columns {
            request.apply_custom_column(column);
        }
        request
    }

    /// Merge a (fully assembled) response into this row, returning the new row
    pub fn with_response(&self, response: &ResponseInfo, columns: &[CustomColumn]) -> Self {
        let mut updated = Self {
            response_time: Some(response.timestamp),
            status: Some(response.status),
            reason: Some(response.reason.clone()),
            response_headers: Some(response.headers.clone()),
            response_data: decode_body(Some(&response.headers), response.data.as_deref()),
            response_length: Some(response_length(response)),
            response_is_mock: Some(response.is_mock),
            duration: Some(response.timestamp - self.request_time),
            insights: response.insights.clone(),
            ..self.clone()
        };
        for column in columns {
            updated.apply_custom_column(column);
        }
        updated
    }

    /// Store the value of a custom header column on this row.
    ///
    /// Response columns are only filled once response headers exist.
    pub fn apply_custom_column(&mut self, column: &CustomColumn) {
        let headers = match column.kind {
            CustomColumnKind::Request => Some(&self.request_headers),
            CustomColumnKind::Response => self.response_headers.as_ref(),
        };
        if let Some(headers) = headers {
            let value = get_header_value(headers, &column.header)
                .unwrap_or_default()
                .to_string();
            self.custom_columns.insert(column.field_name(), value);
        }
    }

    pub fn custom_column(&self, column: &CustomColumn) -> Option<&str> {
        self.custom_columns
            .get(&column.field_name())
            .map(String::as_str)
    }

    /// Whether the response was served by a mock route
    pub fn is_mock(&self) -> bool {
        self.response_is_mock.unwrap_or(false)
    }

    /// Whether the response carries a 4xx/5xx status
    pub fn is_error(&self) -> bool {
        matches!(self.status, Some(status) if (400..600).contains(&status))
    }
}

fn domain_of(url: &Url) -> String {
    let mut host = url.host_str().unwrap_or_default().to_string();
    if let Some(port) = url.port() {
        host.push_str(&format!(":{}", port));
    }
    format!("{}{}", host, url.path())
}
