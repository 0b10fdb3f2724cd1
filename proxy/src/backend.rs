use crate::backends::{SalesforceBackend, SalesforceVarkeyBackend};
use crate::errors::ProxyError;
use crate::protocol::CrmResponse;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use url::Url;

/// Values a backend adapter is constructed with, assembled by the proxy
/// flow after a successful token exchange.
#[derive(Debug, Clone)]
pub struct BackendContext {
    /// Bearer token from the token exchange
    pub access_token: String,
    /// CRM instance base URL from the token exchange
    pub instance_url: Url,
    /// Resolved anonymous user id
    pub anonymous_id: String,
    /// Operation selector from the request envelope
    pub method: Option<String>,
    /// Initial payload from the request envelope
    pub initial: Option<JsonValue>,
}

/// A CRM-specific adapter.
///
/// Adapters own the field mapping and the actual CRM calls. They never
/// fail with an error: every outcome, including transport failures, is
/// reported as a response envelope, so nothing can raise past the proxy
/// boundary.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Validate and submit the payload to the CRM.
    async fn submit(&self) -> CrmResponse;

    /// Delete previously submitted data from the CRM.
    async fn delete(&self) -> CrmResponse;
}

/// Supported backend adapters
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Generic,
    Varkey,
}

impl BackendKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Generic => "generic",
            BackendKind::Varkey => "varkey",
        }
    }

    /// Construct the adapter for this kind.
    pub fn build(&self, http: reqwest::Client, context: BackendContext) -> Box<dyn Backend> {
        match self {
            BackendKind::Generic => Box::new(SalesforceBackend::new(http, context)),
            BackendKind::Varkey => Box::new(SalesforceVarkeyBackend::new(http, context)),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(BackendKind::Generic),
            "varkey" => Ok(BackendKind::Varkey),
            other => Err(ProxyError::UnknownBackend(other.to_string())),
        }
    }
}
