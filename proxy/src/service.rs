//! HTTP surface for the gateway.
//!
//! The trusted caller context (anonymous id, course id, authoring flag)
//! arrives as headers set by the hosting platform, never from the browser
//! payload. The two handler routes always answer 200 once a well-formed
//! request reached the flow; the envelope's own `status_code` carries the
//! operation result.

use crate::errors::ProxyError;
use crate::handler::CrmProxy;
use crate::metrics_defs::REQUEST_DURATION;
use crate::protocol::{CrmRequest, RequestContext};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming;
use hyper::service::Service as HyperService;
use hyper::{Request, Response};
use shared::http::{error_response, json_response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Header carrying the current session's anonymous user id.
pub const ANONYMOUS_ID_HEADER: &str = "x-anonymous-id";
/// Header carrying the course id the unit is embedded in.
pub const COURSE_ID_HEADER: &str = "x-course-id";
/// Set by the platform when the call originates from an authoring/preview
/// environment.
pub const AUTHORING_PREVIEW_HEADER: &str = "x-authoring-preview";

#[derive(Clone)]
pub struct GatewayService {
    proxy: Arc<CrmProxy>,
}

impl GatewayService {
    pub fn new(proxy: Arc<CrmProxy>) -> Self {
        GatewayService { proxy }
    }
}

impl HyperService<Request<Incoming>> for GatewayService {
    type Response = Response<BoxBody<Bytes, ProxyError>>;
    type Error = ProxyError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let proxy = self.proxy.clone();
        Box::pin(async move { Ok(handle_request(proxy, req).await) })
    }
}

#[derive(Clone, Copy)]
enum Operation {
    Send,
    Delete,
}

impl Operation {
    fn handler_name(self) -> &'static str {
        match self {
            Operation::Send => "send_crm_data",
            Operation::Delete => "delete_crm_data",
        }
    }
}

/// Route a request. Generic over the body type so tests can drive it with
/// `Full<Bytes>`.
pub(crate) async fn handle_request<B>(
    proxy: Arc<CrmProxy>,
    req: Request<B>,
) -> Response<BoxBody<Bytes, ProxyError>>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => {
            json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
        }
        (&Method::POST, "/handler/send_crm_data") => dispatch(proxy, req, Operation::Send).await,
        (&Method::POST, "/handler/delete_crm_data") => {
            dispatch(proxy, req, Operation::Delete).await
        }
        _ => error_response(StatusCode::NOT_FOUND, "no route matched"),
    }
}

async fn dispatch<B>(
    proxy: Arc<CrmProxy>,
    req: Request<B>,
    operation: Operation,
) -> Response<BoxBody<Bytes, ProxyError>>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    let started = Instant::now();

    let context = match context_from_headers(req.headers()) {
        Ok(context) => context,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("failed to read request body: {e}"),
            );
        }
    };

    let request = match CrmRequest::from_bytes(&bytes) {
        Ok(request) => request,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("invalid request envelope: {e}"),
            );
        }
    };

    let envelope = match operation {
        Operation::Send => proxy.send_crm_data(&context, &request).await,
        Operation::Delete => proxy.delete_crm_data(&context, &request).await,
    };

    metrics::histogram!(
        REQUEST_DURATION.name,
        "handler" => operation.handler_name(),
        "status" => envelope.status_code.to_string()
    )
    .record(started.elapsed().as_secs_f64());

    json_response(StatusCode::OK, &envelope)
}

fn context_from_headers(headers: &HeaderMap) -> Result<RequestContext, ProxyError> {
    let anonymous_id = required_header(headers, ANONYMOUS_ID_HEADER)?;
    let course_id = required_header(headers, COURSE_ID_HEADER)?;
    let authoring_preview = headers
        .get(AUTHORING_PREVIEW_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true"));

    Ok(RequestContext {
        anonymous_id,
        course_id,
        authoring_preview,
    })
}

fn required_header(headers: &HeaderMap, name: &'static str) -> Result<String, ProxyError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ProxyError::MissingHeader(name))
}
