//! Configuration structures for CloudAPI clients.
//!
//! This module holds the endpoint and identity settings a client needs before it can
//! talk to CloudAPI. Private key material is intentionally absent: it is handed to the
//! client builder separately so it never ends up in a serialized configuration.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use reqwest::header::HeaderValue;
use url::Url;
use validator::{Validate, ValidationError};

/// Environment variable holding the CloudAPI URL
pub const ENV_URL: &str = "SDC_URL";
/// Environment variable holding the account login
pub const ENV_ACCOUNT: &str = "SDC_ACCOUNT";
/// Environment variable holding the SSH key name or fingerprint
pub const ENV_KEY_ID: &str = "SDC_KEY_ID";
/// Environment variable overriding the `Accept-Version` header
pub const ENV_API_VERSION: &str = "SDC_API_VERSION";
/// Environment variable disabling TLS verification when set to `1` or `true`
pub const ENV_TLS_INSECURE: &str = "SDC_TLS_INSECURE";

/// Default value of the `Accept-Version` header
pub const DEFAULT_API_VERSION: &str = "~9";

/// Configuration for a CloudAPI client instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CloudApiConfig {
    /// CloudAPI base URL
    #[validate(url)]
    pub url: String,

    /// Account login every request is scoped to
    #[validate(length(min = 1), custom(function = "header_safe"))]
    pub account: String,

    /// Name or fingerprint of the SSH key registered with the account
    #[validate(length(min = 1), custom(function = "header_safe"))]
    pub key_id: String,

    /// Requested API version range
    #[validate(length(min = 1), custom(function = "header_safe"))]
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to custom CA certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Optional `User-Agent` override
    #[validate(custom(function = "header_safe"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

// These values end up in the Accept-Version and Authorization headers.
fn header_safe(value: &str) -> Result<(), ValidationError> {
    HeaderValue::from_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("header_value"))
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_tls_verify() -> bool {
    true
}

impl CloudApiConfig {
    /// Create a new client configuration with required parameters.
    ///
    /// # Arguments
    ///
    /// * `url` - The CloudAPI base URL (e.g., "https://us-central-1.api.example.com")
    /// * `account` - The account login
    /// * `key_id` - The SSH key name or fingerprint used for request signing
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(
        url: impl Into<String>,
        account: impl Into<String>,
        key_id: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            url: url.into(),
            account: account.into(),
            key_id: key_id.into(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            user_agent: None,
        };

        config.check()?;
        Ok(config)
    }

    /// Build a configuration from the conventional `SDC_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the result is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::Config(format!("{name} is not set")))
        };

        let mut config = Self::new(
            required(ENV_URL)?,
            required(ENV_ACCOUNT)?,
            required(ENV_KEY_ID)?,
        )?;

        if let Some(version) = lookup(ENV_API_VERSION).filter(|v| !v.is_empty()) {
            config = config.with_api_version(version);
        }

        if let Some(insecure) = lookup(ENV_TLS_INSECURE) {
            let insecure = matches!(insecure.trim(), "1" | "true" | "TRUE" | "yes");
            config = config.with_tls_verify(!insecure);
        }

        config.check()?;
        Ok(config)
    }

    /// Set the requested API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Run validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] describing every invalid field.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()?;
        Ok(())
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The `keyId` value of the HTTP signature: `/{account}/keys/{key_id}`.
    #[must_use]
    pub fn key_id_path(&self) -> String {
        format!("/{}/keys/{}", self.account, self.key_id)
    }

    /// Parse and validate the CloudAPI URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or is not http(s).
    pub fn parse_url(&self) -> Result<Url, Error> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("Invalid CloudAPI URL: {e}")))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(Error::Config(format!(
                "Unsupported CloudAPI URL scheme `{scheme}`"
            ))),
        }
    }
}
