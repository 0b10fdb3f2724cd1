use crate::backend::{Backend, BackendContext};
use crate::backends::generic::{ANONYMOUS_ID_FIELD, API_VERSION, SalesforceBackend};
use crate::protocol::CrmResponse;
use async_trait::async_trait;
use http::StatusCode;
use url::Url;

/// Lead fields the Varkey programme requires on every submission.
const REQUIRED_LEAD_FIELDS: &[&str] = &["FirstName", "LastName", "Email"];

/// Specialized Salesforce adapter for the Varkey lead-capture programme.
///
/// Differs from the generic adapter in two ways: submissions are validated
/// against the required lead fields before any call is made, and records
/// are upserted through the anonymous-id external-id path so a returning
/// user updates their existing lead instead of creating a duplicate.
pub struct SalesforceVarkeyBackend {
    inner: SalesforceBackend,
}

impl SalesforceVarkeyBackend {
    pub fn new(http: reqwest::Client, context: BackendContext) -> Self {
        Self {
            inner: SalesforceBackend::new(http, context),
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let initial = self.inner.context.initial.as_ref();
        REQUIRED_LEAD_FIELDS
            .iter()
            .copied()
            .filter(|field| {
                initial
                    .and_then(|payload| payload.get(field))
                    .and_then(|value| value.as_str())
                    .is_none_or(str::is_empty)
            })
            .collect()
    }

    fn lead_url(&self) -> Url {
        let mut url = self.inner.context.instance_url.clone();
        url.set_path(&format!(
            "/services/data/{API_VERSION}/sobjects/Lead/{ANONYMOUS_ID_FIELD}/{}",
            self.inner.context.anonymous_id
        ));
        url
    }
}

#[async_trait]
impl Backend for SalesforceVarkeyBackend {
    fn name(&self) -> &'static str {
        "varkey"
    }

    async fn submit(&self) -> CrmResponse {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return CrmResponse::failure(
                StatusCode::BAD_REQUEST.as_u16(),
                format!("Missing required fields: {}", missing.join(", ")),
            );
        }

        let mut payload = self.inner.record_payload();
        // The external-id field rides in the URL, not the body
        payload.remove(ANONYMOUS_ID_FIELD);

        let request = self.inner.http.patch(self.lead_url()).json(&payload);
        self.inner.execute(self.name(), request).await
    }

    async fn delete(&self) -> CrmResponse {
        let request = self.inner.http.delete(self.lead_url());
        self.inner.execute(self.name(), request).await
    }
}
