use crate::backend::{Backend, BackendContext};
use crate::protocol::CrmResponse;
use async_trait::async_trait;
use http::StatusCode;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use url::Url;

/// Salesforce REST API version the adapters target.
pub(crate) const API_VERSION: &str = "v39.0";

/// Custom field carrying the resolved anonymous user id on every record.
pub(crate) const ANONYMOUS_ID_FIELD: &str = "AnonymousId__c";

/// Envelope fields win over CRM body fields of the same name.
const RESERVED_FIELDS: &[&str] = &["status_code", "success", "message"];

/// Generic Salesforce adapter.
///
/// Creates and deletes records on the sobject named by the request method.
/// The resolved anonymous id is stamped onto every submitted record so CRM
/// rows can be traced back to a course user without exposing their
/// platform account.
pub struct SalesforceBackend {
    pub(crate) http: reqwest::Client,
    pub(crate) context: BackendContext,
}

impl SalesforceBackend {
    pub fn new(http: reqwest::Client, context: BackendContext) -> Self {
        Self { http, context }
    }

    pub(crate) fn sobject_url(&self, sobject: &str) -> Url {
        let mut url = self.context.instance_url.clone();
        url.set_path(&format!("/services/data/{API_VERSION}/sobjects/{sobject}"));
        url
    }

    /// Record payload: the initial payload plus the anonymous id field.
    pub(crate) fn record_payload(&self) -> Map<String, JsonValue> {
        let mut payload = match &self.context.initial {
            Some(JsonValue::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        payload.insert(
            ANONYMOUS_ID_FIELD.to_string(),
            JsonValue::String(self.context.anonymous_id.clone()),
        );
        payload
    }

    fn record_id(&self) -> Option<&str> {
        self.context.initial.as_ref()?.get("id")?.as_str()
    }

    /// Send the request with the bearer token and convert the CRM's answer
    /// into a response envelope.
    pub(crate) async fn execute(
        &self,
        name: &'static str,
        request: reqwest::RequestBuilder,
    ) -> CrmResponse {
        let response = match request
            .bearer_auth(&self.context.access_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(backend = name, error = ?e, "CRM request failed");
                return CrmResponse::failure(
                    StatusCode::BAD_GATEWAY.as_u16(),
                    format!("CRM request failed: {e}"),
                );
            }
        };

        let status = response.status();
        let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
        envelope_from(status, body)
    }
}

fn envelope_from(status: StatusCode, body: JsonValue) -> CrmResponse {
    let mut data = HashMap::new();
    match body {
        JsonValue::Object(map) => {
            data.extend(
                map.into_iter()
                    .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str())),
            );
        }
        JsonValue::Null => {}
        // Salesforce reports errors as a bare array of records
        other => {
            data.insert("result".to_string(), other);
        }
    }

    if status.is_success() {
        CrmResponse::success(status.as_u16(), data)
    } else {
        let mut response =
            CrmResponse::failure(status.as_u16(), "CRM rejected the request");
        response.data = data;
        response
    }
}

#[async_trait]
impl Backend for SalesforceBackend {
    fn name(&self) -> &'static str {
        "generic"
    }

    async fn submit(&self) -> CrmResponse {
        let Some(sobject) = self.context.method.as_deref() else {
            return CrmResponse::failure(StatusCode::BAD_REQUEST.as_u16(), "No method given");
        };

        let request = self
            .http
            .post(self.sobject_url(sobject))
            .json(&self.record_payload());
        self.execute(self.name(), request).await
    }

    async fn delete(&self) -> CrmResponse {
        let Some(sobject) = self.context.method.as_deref() else {
            return CrmResponse::failure(StatusCode::BAD_REQUEST.as_u16(), "No method given");
        };
        let Some(record_id) = self.record_id() else {
            return CrmResponse::failure(StatusCode::BAD_REQUEST.as_u16(), "No record id given");
        };

        let mut url = self.context.instance_url.clone();
        url.set_path(&format!(
            "/services/data/{API_VERSION}/sobjects/{sobject}/{record_id}"
        ));

        let request = self.http.delete(url);
        self.execute(self.name(), request).await
    }
}
