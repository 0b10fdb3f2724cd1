use crate::backend::BackendKind;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("CRM setting cannot be empty: {0}")]
    EmptyCrmSetting(&'static str),
}

fn default_display_name() -> String {
    "Crm Integration".to_string()
}

/// Gateway configuration.
///
/// Deliberately `Deserialize`-only: the CRM credentials must never become
/// serializable into a response path.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for inbound handler requests
    pub listener: Listener,
    /// Endpoint of the platform identity store used for compatibility
    /// anonymous-id lookups
    ///
    /// Note: Uses the `url::Url` type for compile-time URL validation.
    /// Invalid URLs will be rejected during config deserialization.
    pub identity_url: Url,
    /// Per-instance CRM connection settings
    pub crm: CrmConfig,
}

impl Config {
    /// Validates the gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.crm.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// CRM connection settings for one course-unit instance.
///
/// Set once by course authors; read-only during student interaction.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CrmConfig {
    /// Which backend adapter handles submissions
    pub backend: BackendKind,
    /// Name shown for this unit in the course
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// OAuth token endpoint, e.g.
    /// https://login.salesforce.com/services/oauth2/token (production) or
    /// https://test.salesforce.com/services/oauth2/token (sandbox)
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    /// May be empty when the CRM instance allow-lists the gateway's IP
    pub security_token: String,
}

impl CrmConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("username", &self.username),
            ("password", &self.password),
        ] {
            if value.is_empty() {
                return Err(ValidationError::EmptyCrmSetting(name));
            }
        }
        Ok(())
    }
}
