use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashMap;

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("identity store returned unexpected status: {0}")]
    UnexpectedStatus(StatusCode),
}

/// Point-read access to the platform's anonymous-id records.
///
/// A lookup asks whether the user behind `current_anonymous_id` already
/// has an anonymous id recorded under `course_key`. Lookups are performed
/// fresh on every request and never cached.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn recorded_anonymous_id(
        &self,
        current_anonymous_id: &str,
        course_key: &str,
    ) -> Result<Option<String>, IdentityError>;
}

#[derive(serde::Deserialize)]
struct IdentityApiResponse {
    anonymous_user_id: String,
}

/// Identity store client backed by the platform's HTTP API.
#[derive(Clone)]
pub struct HttpIdentityStore {
    client: reqwest::Client,
    url: String,
}

impl HttpIdentityStore {
    pub fn new(url: String) -> Self {
        HttpIdentityStore {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl IdentityStore for HttpIdentityStore {
    async fn recorded_anonymous_id(
        &self,
        current_anonymous_id: &str,
        course_key: &str,
    ) -> Result<Option<String>, IdentityError> {
        let mut query_params = HashMap::new();
        query_params.insert("anonymous_id", current_anonymous_id);
        query_params.insert("course_id", course_key);

        let response = self
            .client
            .get(&self.url)
            .query(&query_params)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(
                response
                    .json::<IdentityApiResponse>()
                    .await?
                    .anonymous_user_id,
            )),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(IdentityError::UnexpectedStatus(status)),
        }
    }
}

/// In-memory identity store for tests and local workbenches.
#[derive(Clone, Default)]
pub struct StaticIdentityStore {
    records: HashMap<(String, String), String>,
}

impl StaticIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an anonymous id for the (user, course key) pair.
    pub fn insert(&mut self, anonymous_id: &str, course_key: &str, recorded: &str) {
        self.records.insert(
            (anonymous_id.to_string(), course_key.to_string()),
            recorded.to_string(),
        );
    }
}

#[async_trait]
impl IdentityStore for StaticIdentityStore {
    async fn recorded_anonymous_id(
        &self,
        current_anonymous_id: &str,
        course_key: &str,
    ) -> Result<Option<String>, IdentityError> {
        Ok(self
            .records
            .get(&(current_anonymous_id.to_string(), course_key.to_string()))
            .cloned())
    }
}
