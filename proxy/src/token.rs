//! OAuth password-grant token exchange against the CRM.

use crate::config::CrmConfig;
use crate::errors::ProxyError;
use crate::metrics_defs::{TOKEN_EXCHANGE_ERROR, TOKEN_EXCHANGE_SUCCESS};
use http::StatusCode;
use serde::Deserialize;
use shared::metrics_defs::emit;
use url::Url;

/// Raw outcome of one token-exchange attempt: the endpoint's status and
/// unparsed body. The proxy flow decides what a non-200 status means.
#[derive(Debug)]
pub struct TokenOutcome {
    pub status: StatusCode,
    pub body: String,
}

/// Short-lived credential pair extracted from a successful exchange.
///
/// Held in memory for the life of one request; never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub instance_url: Url,
}

impl TokenGrant {
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// The password value sent to the token endpoint: the stored password with
/// the security token appended directly, no separator.
fn grant_password(config: &CrmConfig) -> String {
    format!("{}{}", config.password, config.security_token)
}

/// Exchange the stored instance credentials for an access token.
///
/// Sends a single password-grant POST to the configured token endpoint and
/// returns the raw outcome. One exchange happens per request; tokens are
/// never cached. Transport failures surface as errors for the caller to
/// wrap; an emitted event records every attempt either way.
pub async fn exchange(
    http: &reqwest::Client,
    config: &CrmConfig,
) -> Result<TokenOutcome, ProxyError> {
    let password = grant_password(config);
    let form = [
        ("grant_type", "password"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("username", config.username.as_str()),
        ("password", password.as_str()),
    ];

    let response = match http.post(config.token_url.clone()).form(&form).send().await {
        Ok(response) => response,
        Err(e) => {
            emit(&TOKEN_EXCHANGE_ERROR);
            return Err(ProxyError::ReqwestError(e));
        }
    };

    let status = response.status();
    if status == StatusCode::OK {
        emit(&TOKEN_EXCHANGE_SUCCESS);
    } else {
        emit(&TOKEN_EXCHANGE_ERROR);
    }

    let body = response.text().await?;
    Ok(TokenOutcome { status, body })
}
