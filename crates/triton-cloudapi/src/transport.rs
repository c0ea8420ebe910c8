//! Request descriptor, the [`Transport`] seam and its HTTP implementation.

use crate::response::Response;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, DATE};
use reqwest::{Client, ClientBuilder, Method};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use triton_core::auth::RequestSigner;
use triton_core::client::ClientConfig;
use triton_core::{CloudApiConfig, Error, QueryParams};
use url::Url;

const USER_AGENT: &str = concat!("triton-cloudapi/", env!("CARGO_PKG_VERSION"));
const ACCEPT_VERSION: &str = "Accept-Version";
const JSON: &str = "application/json";

/// One call to CloudAPI, before it is signed and sent.
///
/// `path` is relative to the account prefix: `packages/small` is sent as
/// `/{account}/packages/small`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    query: QueryParams,
    body: Option<Value>,
    timeout: Option<Duration>,
}

impl Request {
    /// Create a request with an explicit method.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            timeout: None,
        }
    }

    /// `GET path`
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT path`
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE path`
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Merge query parameters into the request.
    #[must_use]
    pub fn with_query(mut self, query: &QueryParams) -> Self {
        self.query.extend(query);
        self
    }

    /// Add a single query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.query.push(key, value);
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Bound this call by a deadline shorter or longer than the client default.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the account prefix.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters.
    #[must_use]
    pub const fn query(&self) -> &QueryParams {
        &self.query
    }

    /// JSON body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Per-call timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Sends a [`Request`] and returns the [`Response`] envelope.
///
/// Implementations return `Ok` for every HTTP status; `Err` is reserved for failures
/// that prevent a response from being produced (signing, network, decoding).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch one request.
    async fn dispatch(&self, request: Request) -> Result<Response>;
}

/// [`Transport`] that signs requests and sends them over HTTP(S).
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    account: String,
    api_version: String,
    signer: RequestSigner,
}

impl HttpTransport {
    /// Build a transport for the configured endpoint and account.
    ///
    /// The client-wide deadline is `http_config.timeout`; individual requests may
    /// override it with [`Request::with_timeout`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate, the URL is invalid,
    /// the CA certificate cannot be loaded or the HTTP client cannot be created.
    pub fn new(
        config: &CloudApiConfig,
        http_config: ClientConfig,
        signer: RequestSigner,
    ) -> Result<Self> {
        config.check()?;
        let base_url = config.parse_url()?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint(format!(
                "CloudAPI URL `{base_url}` cannot be used as a base"
            )));
        }

        let user_agent = config.user_agent.as_deref().unwrap_or(USER_AGENT);

        let mut builder = ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(http_config.timeout)
            .connect_timeout(http_config.connect_timeout)
            .pool_idle_timeout(http_config.pool_idle_timeout)
            .pool_max_idle_per_host(http_config.pool_max_idle_per_host)
            .gzip(http_config.enable_compression);

        if !config.tls_verify {
            warn!("TLS verification disabled for CloudAPI client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &config.tls_ca_cert {
            debug!("loading CloudAPI CA certificate from {}", ca_cert.display());
            let bytes = std::fs::read(ca_cert).map_err(|err| {
                Error::Config(format!(
                    "Failed to read CloudAPI CA certificate {}: {err}",
                    ca_cert.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&bytes)
                .map_err(|err| Error::Config(format!("Invalid CloudAPI CA certificate: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build().map_err(|err| {
            Error::Config(format!("Failed to build CloudAPI HTTP client: {err}"))
        })?;

        Ok(Self {
            http,
            base_url,
            account: config.account.clone(),
            api_version: config.api_version.clone(),
            signer,
        })
    }

    /// Return the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Account every path is prefixed with.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Full URL for a request: base, account prefix, path, query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the base URL cannot carry a path.
    pub fn build_url(&self, request: &Request) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidEndpoint(format!(
                    "CloudAPI URL `{}` cannot be used as a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(&self.account)
            .extend(request.path().split('/').filter(|s| !s.is_empty()));

        if !request.query().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query().iter());
        }

        Ok(url)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("account", &self.account)
            .field("api_version", &self.api_version)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, request: Request) -> Result<Response> {
        let url = self.build_url(&request)?;

        // The date is part of the signature, so it is produced per call.
        let signed = self.signer.signed_headers(Utc::now())?;

        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT_VERSION, &self.api_version)
            .header(DATE, &signed.date)
            .header(AUTHORIZATION, &signed.authorization);

        if let Some(body) = request.body() {
            let payload = serde_json::to_vec(body)
                .map_err(|err| Error::InvalidRequest(format!("Unserializable body: {err}")))?;
            builder = builder.body(payload);
        }

        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }

        debug!(method = %request.method(), path = %request.path(), query = ?request.query(), "Sending CloudAPI request");
        let started = Instant::now();

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(method = %request.method(), path = %request.path(), error = %err, "CloudAPI request failed");
                return Err(Error::from(err));
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        info!(
            method = %request.method(),
            path = %request.path(),
            status = status.as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "CloudAPI response"
        );

        Response::from_parts(status, headers, &bytes)
    }
}
