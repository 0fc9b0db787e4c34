//! Display-related settings: custom header columns and body view format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the exchange a custom column reads headers from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomColumnKind {
    Request,
    Response,
}

/// A user-defined column showing the value of one header
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomColumn {
    pub header: String,
    #[serde(rename = "type")]
    pub kind: CustomColumnKind,
}

impl CustomColumn {
    pub fn request(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            kind: CustomColumnKind::Request,
        }
    }

    pub fn response(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            kind: CustomColumnKind::Response,
        }
    }

    /// Field name under which the value is stored on each row
    pub fn field_name(&self) -> String {
        match self.kind {
            CustomColumnKind::Request => format!("request_header_{}", self.header),
            CustomColumnKind::Response => format!("response_header_{}", self.header),
        }
    }
}

/// How bodies are shown in the detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    Formatted,
    #[default]
    Parsed,
}

impl BodyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyFormat::Formatted => "formatted",
            BodyFormat::Parsed => "parsed",
        }
    }
}

impl fmt::Display for BodyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BodyFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "formatted" => Ok(BodyFormat::Formatted),
            "parsed" => Ok(BodyFormat::Parsed),
            other => Err(format!("unknown body format: {}", other)),
        }
    }
}
