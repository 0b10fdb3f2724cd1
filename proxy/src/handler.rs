//! The authenticated proxy flow.
//!
//! One inbound operation runs one synchronous call chain: skip check →
//! token exchange → identity resolution → adapter construction → dispatch.
//! Expected failures never escape as errors; each one is converted into a
//! response envelope at this boundary, so the hosting framework only ever
//! sees envelopes.

use crate::backend::{Backend, BackendContext};
use crate::config::CrmConfig;
use crate::metrics_defs::{
    INITIALIZATION_NO_TOKEN, INITIALIZATION_SKIPPED, INITIALIZATION_SUCCESS,
};
use crate::protocol::{CrmRequest, CrmResponse, RequestContext};
use crate::token::{self, TokenGrant};
use http::StatusCode;
use identity::IdentityStore;
use shared::metrics_defs::{emit, emit_tagged};
use std::sync::Arc;

/// The authenticated CRM proxy.
///
/// Holds the per-instance configuration and collaborators, all read-only
/// during request handling. Nothing is cached or shared across
/// invocations: every request performs a fresh token exchange and a fresh
/// identity lookup.
pub struct CrmProxy {
    config: CrmConfig,
    http: reqwest::Client,
    identity_store: Arc<dyn IdentityStore>,
}

impl CrmProxy {
    pub fn new(config: CrmConfig, identity_store: Arc<dyn IdentityStore>) -> Self {
        CrmProxy {
            config,
            http: reqwest::Client::new(),
            identity_store,
        }
    }

    /// Create/submit operation: initialize, then dispatch submit.
    pub async fn send_crm_data(
        &self,
        context: &RequestContext,
        request: &CrmRequest,
    ) -> CrmResponse {
        match self.initialize(context, request).await {
            Ok(backend) => backend.submit().await,
            Err(envelope) => envelope,
        }
    }

    /// Delete operation: initialize, then dispatch delete.
    pub async fn delete_crm_data(
        &self,
        context: &RequestContext,
        request: &CrmRequest,
    ) -> CrmResponse {
        match self.initialize(context, request).await {
            Ok(backend) => backend.delete().await,
            Err(envelope) => envelope,
        }
    }

    /// Run the initialization steps and return the constructed backend
    /// adapter, or the envelope that ends the request early.
    ///
    /// No CRM call can happen unless the token exchange returned 200: the
    /// adapter is only constructed on the success path, with the values
    /// from the grant.
    async fn initialize(
        &self,
        context: &RequestContext,
        request: &CrmRequest,
    ) -> Result<Box<dyn Backend>, CrmResponse> {
        let backend_name = self.config.backend.as_str();

        if context.authoring_preview || request.no_init {
            emit(&INITIALIZATION_SKIPPED);
            return Err(CrmResponse::skipped());
        }

        let outcome = match token::exchange(&self.http, &self.config).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(backend = backend_name, error = ?e, "token endpoint unreachable");
                return Err(CrmResponse::failure(
                    StatusCode::BAD_GATEWAY.as_u16(),
                    "Token endpoint unreachable",
                ));
            }
        };

        if outcome.status != StatusCode::OK {
            emit_tagged(&INITIALIZATION_NO_TOKEN, "backend", backend_name.to_string());
            return Err(CrmResponse::token_failure(outcome.status.as_u16()));
        }

        let grant = match TokenGrant::from_body(&outcome.body) {
            Ok(grant) => grant,
            Err(e) => {
                tracing::error!(backend = backend_name, error = ?e, "malformed token response");
                return Err(CrmResponse::failure(
                    StatusCode::BAD_GATEWAY.as_u16(),
                    "Malformed token response",
                ));
            }
        };

        let anonymous_id = match identity::resolve_anonymous_id(
            self.identity_store.as_ref(),
            &context.anonymous_id,
            &context.course_id,
        )
        .await
        {
            Ok(anonymous_id) => anonymous_id,
            Err(e) => {
                tracing::error!(backend = backend_name, error = ?e, "identity lookup failed");
                return Err(CrmResponse::failure(
                    StatusCode::BAD_GATEWAY.as_u16(),
                    "Identity lookup failed",
                ));
            }
        };

        let backend = self.config.backend.build(
            self.http.clone(),
            BackendContext {
                access_token: grant.access_token,
                instance_url: grant.instance_url,
                anonymous_id,
                method: request.method.clone(),
                initial: request.initial.clone(),
            },
        );

        emit_tagged(&INITIALIZATION_SUCCESS, "backend", backend_name.to_string());
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use async_trait::async_trait;
    use identity::{IdentityError, StaticIdentityStore};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn crm_config(token_url: &str, backend: BackendKind) -> CrmConfig {
        CrmConfig {
            backend,
            display_name: "Crm Integration".to_string(),
            token_url: Url::parse(token_url).unwrap(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            username: "author@example.com".to_string(),
            password: "hunter2".to_string(),
            security_token: "XYZ".to_string(),
        }
    }

    fn context() -> RequestContext {
        RequestContext {
            anonymous_id: "anon-1".to_string(),
            course_id: "course-v1:Org+CS101+2019".to_string(),
            authoring_preview: false,
        }
    }

    fn proxy_with(config: CrmConfig, store: StaticIdentityStore) -> CrmProxy {
        CrmProxy::new(config, Arc::new(store))
    }

    /// Mounts a 200 grant on `token_server` pointing at `instance_url`.
    async fn mount_token_grant(token_server: &MockServer, instance_url: &str) {
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "00D-token",
                "instance_url": instance_url
            })))
            .expect(1)
            .mount(token_server)
            .await;
    }

    fn token_url(server: &MockServer) -> String {
        format!("{}/services/oauth2/token", server.uri())
    }

    #[tokio::test]
    async fn test_no_init_short_circuits_without_network() {
        let token_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&token_server)
            .await;

        let proxy = proxy_with(
            crm_config(&token_url(&token_server), BackendKind::Generic),
            StaticIdentityStore::new(),
        );
        let request = CrmRequest {
            no_init: true,
            ..Default::default()
        };

        let response = proxy.send_crm_data(&context(), &request).await;

        assert_eq!(response.status_code, 204);
        assert!(!response.success);
        assert_eq!(
            response.message.as_deref(),
            Some("No initialization has been run. Token not generated")
        );
    }

    #[tokio::test]
    async fn test_authoring_preview_short_circuits() {
        let token_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&token_server)
            .await;

        let proxy = proxy_with(
            crm_config(&token_url(&token_server), BackendKind::Generic),
            StaticIdentityStore::new(),
        );
        let mut ctx = context();
        ctx.authoring_preview = true;

        let response = proxy.send_crm_data(&ctx, &CrmRequest::default()).await;

        assert_eq!(response.status_code, 204);
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_token_failure_status_passes_through() {
        let crm_server = MockServer::start().await;
        // The adapter must never be constructed, even though the rejection
        // body happens to contain a usable grant
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&crm_server)
            .await;

        let token_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "access_token": "00D-token",
                "instance_url": crm_server.uri()
            })))
            .expect(1)
            .mount(&token_server)
            .await;

        let proxy = proxy_with(
            crm_config(&token_url(&token_server), BackendKind::Generic),
            StaticIdentityStore::new(),
        );
        let request = CrmRequest::from_value(json!({"method": "Lead"})).unwrap();

        let response = proxy.send_crm_data(&context(), &request).await;

        assert_eq!(response.status_code, 400);
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Token not generated"));
    }

    #[tokio::test]
    async fn test_create_dispatches_with_granted_credentials() {
        let crm_server = MockServer::start().await;
        let token_server = MockServer::start().await;
        mount_token_grant(&token_server, &crm_server.uri()).await;

        Mock::given(method("POST"))
            .and(path("/services/data/v39.0/sobjects/Lead"))
            .and(header("authorization", "Bearer 00D-token"))
            .and(body_string_contains(r#""AnonymousId__c":"anon-1""#))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "00Q123", "success": true})),
            )
            .expect(1)
            .mount(&crm_server)
            .await;

        let proxy = proxy_with(
            crm_config(&token_url(&token_server), BackendKind::Generic),
            StaticIdentityStore::new(),
        );
        let request = CrmRequest::from_value(json!({
            "method": "Lead",
            "initial": {"LastName": "Jane"},
            "no_init": false
        }))
        .unwrap();

        let response = proxy.send_crm_data(&context(), &request).await;

        assert_eq!(response.status_code, 201);
        assert!(response.success);
        assert_eq!(response.data.get("id"), Some(&json!("00Q123")));
    }

    #[tokio::test]
    async fn test_compat_identity_preferred() {
        let crm_server = MockServer::start().await;
        let token_server = MockServer::start().await;
        mount_token_grant(&token_server, &crm_server.uri()).await;

        Mock::given(method("POST"))
            .and(body_string_contains(r#""AnonymousId__c":"legacy-anon-9""#))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "00Q123"})))
            .expect(1)
            .mount(&crm_server)
            .await;

        let mut store = StaticIdentityStore::new();
        store.insert("anon-1", "course-v1:Org+CS101+2019_CRM_XBLOCK", "legacy-anon-9");

        let proxy = proxy_with(
            crm_config(&token_url(&token_server), BackendKind::Generic),
            store,
        );
        let request =
            CrmRequest::from_value(json!({"method": "Lead", "initial": {"LastName": "Jane"}}))
                .unwrap();

        let response = proxy.send_crm_data(&context(), &request).await;

        assert!(response.success);
    }

    #[tokio::test]
    async fn test_delete_dispatches_delete_operation() {
        let crm_server = MockServer::start().await;
        let token_server = MockServer::start().await;
        mount_token_grant(&token_server, &crm_server.uri()).await;

        Mock::given(method("DELETE"))
            .and(path("/services/data/v39.0/sobjects/Lead/00Q123"))
            .and(header("authorization", "Bearer 00D-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&crm_server)
            .await;

        let proxy = proxy_with(
            crm_config(&token_url(&token_server), BackendKind::Generic),
            StaticIdentityStore::new(),
        );
        let request =
            CrmRequest::from_value(json!({"method": "Lead", "initial": {"id": "00Q123"}}))
                .unwrap();

        let response = proxy.delete_crm_data(&context(), &request).await;

        assert_eq!(response.status_code, 204);
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_varkey_backend_is_selected_from_config() {
        let crm_server = MockServer::start().await;
        let token_server = MockServer::start().await;
        mount_token_grant(&token_server, &crm_server.uri()).await;

        Mock::given(method("PATCH"))
            .and(path("/services/data/v39.0/sobjects/Lead/AnonymousId__c/anon-1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "00Q9"})))
            .expect(1)
            .mount(&crm_server)
            .await;

        let proxy = proxy_with(
            crm_config(&token_url(&token_server), BackendKind::Varkey),
            StaticIdentityStore::new(),
        );
        let request = CrmRequest::from_value(json!({
            "method": "create",
            "initial": {
                "FirstName": "Jane",
                "LastName": "Doe",
                "Email": "jane@example.com"
            }
        }))
        .unwrap();

        let response = proxy.send_crm_data(&context(), &request).await;

        assert_eq!(response.status_code, 201);
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_becomes_envelope() {
        let proxy = proxy_with(
            crm_config("http://127.0.0.1:1/services/oauth2/token", BackendKind::Generic),
            StaticIdentityStore::new(),
        );
        let request = CrmRequest::from_value(json!({"method": "Lead"})).unwrap();

        let response = proxy.send_crm_data(&context(), &request).await;

        assert_eq!(response.status_code, 502);
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Token endpoint unreachable"));
    }

    #[tokio::test]
    async fn test_malformed_token_body_becomes_envelope() {
        let token_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&token_server)
            .await;

        let proxy = proxy_with(
            crm_config(&format!("{}/services/oauth2/token", token_server.uri()), BackendKind::Generic),
            StaticIdentityStore::new(),
        );
        let request = CrmRequest::from_value(json!({"method": "Lead"})).unwrap();

        let response = proxy.send_crm_data(&context(), &request).await;

        assert_eq!(response.status_code, 502);
        assert_eq!(response.message.as_deref(), Some("Malformed token response"));
    }

    struct FailingStore;

    #[async_trait]
    impl IdentityStore for FailingStore {
        async fn recorded_anonymous_id(
            &self,
            _current_anonymous_id: &str,
            _course_key: &str,
        ) -> Result<Option<String>, IdentityError> {
            Err(IdentityError::UnexpectedStatus(
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }

    #[tokio::test]
    async fn test_identity_store_failure_becomes_envelope() {
        let token_server = MockServer::start().await;
        mount_token_grant(&token_server, "https://na1.salesforce.com").await;

        let proxy = CrmProxy::new(
            crm_config(&token_url(&token_server), BackendKind::Generic),
            Arc::new(FailingStore),
        );
        let request = CrmRequest::from_value(json!({"method": "Lead"})).unwrap();

        let response = proxy.send_crm_data(&context(), &request).await;

        assert_eq!(response.status_code, 502);
        assert_eq!(response.message.as_deref(), Some("Identity lookup failed"));
    }
}
