//! Protocol types for the gateway handler endpoints.
//!
//! # Request format
//!
//! ```json
//! {
//!   "method": "Lead",
//!   "initial": {"LastName": "Jane", "Company": "Acme"},
//!   "no_init": false
//! }
//! ```
//!
//! The widget may submit the envelope either as a JSON object or as a
//! string-encoded JSON object; both forms are accepted and normalized in
//! [`CrmRequest::from_bytes`], once, before any other logic runs.
//!
//! # Response format
//!
//! ```json
//! {
//!   "status_code": 201,
//!   "success": true,
//!   "id": "00Q123"
//! }
//! ```
//!
//! `status_code` carries the operation result even when the transport
//! response is 200. On failure a human-readable `message` is included.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Sentinel status returned when initialization is deliberately skipped.
pub const STATUS_NO_CONTENT: u16 = 204;

pub const SKIPPED_MESSAGE: &str = "No initialization has been run. Token not generated";
pub const NO_TOKEN_MESSAGE: &str = "Token not generated";

/// Request envelope submitted by the browser widget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrmRequest {
    /// Operation selector forwarded to the backend adapter. The Salesforce
    /// adapters read it as the target sobject name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Arbitrary payload forwarded to the adapter unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<JsonValue>,

    /// When true, skip initialization and return immediately.
    #[serde(default)]
    pub no_init: bool,

    /// Other fields, passed through for forward compatibility.
    #[serde(flatten)]
    pub extra_fields: HashMap<String, JsonValue>,
}

impl CrmRequest {
    /// Decode a request envelope from raw bytes, accepting both the
    /// structured and the string-encoded form.
    pub fn from_bytes(bytes: &Bytes) -> Result<Self, serde_json::Error> {
        let value: JsonValue = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: JsonValue) -> Result<Self, serde_json::Error> {
        let value = match value {
            JsonValue::String(encoded) => serde_json::from_str(&encoded)?,
            other => other,
        };
        serde_json::from_value(value)
    }
}

/// Response envelope returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrmResponse {
    pub status_code: u16,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Adapter result fields (record ids, CRM error details).
    #[serde(flatten)]
    pub data: HashMap<String, JsonValue>,
}

impl CrmResponse {
    /// Envelope for the deliberate no-op path: authoring context or an
    /// explicit `no_init` flag. Not a failure, but `success` is false so
    /// the widget does not treat it as a submission.
    pub fn skipped() -> Self {
        CrmResponse {
            status_code: STATUS_NO_CONTENT,
            success: false,
            message: Some(SKIPPED_MESSAGE.to_string()),
            data: HashMap::new(),
        }
    }

    /// Envelope for a failed token exchange, carrying the token endpoint's
    /// own status code.
    pub fn token_failure(status_code: u16) -> Self {
        CrmResponse {
            status_code,
            success: false,
            message: Some(NO_TOKEN_MESSAGE.to_string()),
            data: HashMap::new(),
        }
    }

    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        CrmResponse {
            status_code,
            success: false,
            message: Some(message.into()),
            data: HashMap::new(),
        }
    }

    pub fn success(status_code: u16, data: HashMap<String, JsonValue>) -> Self {
        CrmResponse {
            status_code,
            success: true,
            message: None,
            data,
        }
    }
}

/// Trusted caller context, supplied by the hosting platform rather than
/// the browser payload.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The current session's anonymous user id.
    pub anonymous_id: String,
    /// The course the unit is embedded in.
    pub course_id: String,
    /// Set when the call originates from an authoring/preview environment.
    pub authoring_preview: bool,
}
