//! Authenticated CRM proxy.
//!
//! Accepts form submissions from a browser-side course widget, exchanges
//! server-held credentials for a short-lived CRM token, and forwards the
//! submission to a CRM backend adapter, without ever exposing the
//! credentials to the client.

pub mod backend;
pub mod backends;
pub mod config;
pub mod errors;
pub mod handler;
pub mod metrics_defs;
pub mod protocol;
pub mod service;
pub mod token;

use crate::handler::CrmProxy;
use crate::service::GatewayService;
use identity::HttpIdentityStore;
use shared::http::run_http_service;
use std::sync::Arc;

pub use errors::ProxyError;

/// Run the gateway HTTP service until the listener fails.
pub async fn run(config: config::Config) -> Result<(), ProxyError> {
    let identity_store = Arc::new(HttpIdentityStore::new(config.identity_url.to_string()));
    let proxy = Arc::new(CrmProxy::new(config.crm, identity_store));
    let service = GatewayService::new(proxy);

    run_http_service(&config.listener.host, config.listener.port, service).await
}
