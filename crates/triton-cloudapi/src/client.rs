//! CloudAPI client facade.

use crate::collection::ResourceCollection;
use crate::resources::{
    Datacenters, FirewallRules, Images, Keys, Machines, Networks, Packages, ResourceKind, Users,
};
use crate::response::Response;
use crate::transport::{HttpTransport, Request, Transport};
use crate::Result;
use secrecy::SecretString;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;
use triton_core::auth::{load_private_key, PrivateKey, RequestSigner, SigningAlgorithm};
use triton_core::client::ClientConfig;
use triton_core::{CloudApiConfig, Error};

/// Builder for [`CloudApiClient`].
///
/// A builder is the unconfigured state; [`CloudApiClientBuilder::build`] moves to the
/// configured state, which cannot be changed afterwards.
pub struct CloudApiClientBuilder {
    config: CloudApiConfig,
    http_config: ClientConfig,
    private_key: Option<SecretString>,
    algorithm: SigningAlgorithm,
    transport: Option<Arc<dyn Transport>>,
}

impl CloudApiClientBuilder {
    /// Create a builder from a [`CloudApiConfig`].
    #[must_use]
    pub fn new(config: CloudApiConfig) -> Self {
        let http_config = ClientConfig::new().with_timeout(config.timeout());

        Self {
            config,
            http_config,
            private_key: None,
            algorithm: SigningAlgorithm::default(),
            transport: None,
        }
    }

    /// PEM encoded private key matching the configured `key_id`.
    #[must_use]
    pub fn with_private_key(mut self, pem: SecretString) -> Self {
        self.private_key = Some(pem);
        self
    }

    /// Read the private key from a PEM file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the file cannot be read.
    pub fn with_private_key_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let pem = load_private_key(path.as_ref())?;
        Ok(self.with_private_key(pem))
    }

    /// Override the signature algorithm (defaults to `rsa-sha256`).
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub const fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Use a custom transport instead of signed HTTP. No key is needed in that case.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for invalid configuration, [`Error::Config`]
    /// for a missing key, and
    /// [`Error::Auth`] for unreadable key material.
    pub fn build(self) -> Result<CloudApiClient> {
        self.config.check()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let pem = self.private_key.ok_or_else(|| {
                    Error::Config("A private key is required to sign CloudAPI requests".into())
                })?;
                let key = PrivateKey::from_pem(&pem)?;
                let signer = RequestSigner::new(self.config.key_id_path(), key)
                    .with_algorithm(self.algorithm);
                debug!(account = %self.config.account, key_id = signer.key_id(), "building CloudAPI transport");
                Arc::new(HttpTransport::new(&self.config, self.http_config, signer)?)
            }
        };

        Ok(CloudApiClient::from_parts(self.config, transport))
    }
}

impl std::fmt::Debug for CloudApiClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudApiClientBuilder")
            .field("config", &self.config)
            .field("http_config", &self.http_config)
            .field("has_private_key", &self.private_key.is_some())
            .field("algorithm", &self.algorithm)
            .field("has_transport", &self.transport.is_some())
            .finish()
    }
}

/// Configured CloudAPI client.
///
/// Resource handles are created on first access and share one transport.
pub struct CloudApiClient {
    config: CloudApiConfig,
    transport: Arc<dyn Transport>,
    packages: OnceLock<Packages>,
    machines: OnceLock<Machines>,
    keys: OnceLock<Keys>,
    images: OnceLock<Images>,
    datacenters: OnceLock<Datacenters>,
    networks: OnceLock<Networks>,
    firewall_rules: OnceLock<FirewallRules>,
    users: OnceLock<Users>,
}

impl CloudApiClient {
    /// Start a builder pre-populated with the provided configuration.
    #[must_use]
    pub fn builder(config: CloudApiConfig) -> CloudApiClientBuilder {
        CloudApiClientBuilder::new(config)
    }

    /// Construct a signing client from configuration and PEM key material.
    ///
    /// # Errors
    ///
    /// See [`CloudApiClientBuilder::build`].
    pub fn new(config: CloudApiConfig, private_key: SecretString) -> Result<Self> {
        CloudApiClientBuilder::new(config)
            .with_private_key(private_key)
            .build()
    }

    fn from_parts(config: CloudApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            packages: OnceLock::new(),
            machines: OnceLock::new(),
            keys: OnceLock::new(),
            images: OnceLock::new(),
            datacenters: OnceLock::new(),
            networks: OnceLock::new(),
            firewall_rules: OnceLock::new(),
            users: OnceLock::new(),
        }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &CloudApiConfig {
        &self.config
    }

    /// The shared transport.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Packages.
    pub fn packages(&self) -> &Packages {
        self.packages.get_or_init(|| Packages::new(self.transport()))
    }

    /// Machines.
    pub fn machines(&self) -> &Machines {
        self.machines.get_or_init(|| Machines::new(self.transport()))
    }

    /// SSH keys.
    pub fn keys(&self) -> &Keys {
        self.keys.get_or_init(|| Keys::new(self.transport()))
    }

    /// Images.
    pub fn images(&self) -> &Images {
        self.images.get_or_init(|| Images::new(self.transport()))
    }

    /// Datacenters.
    pub fn datacenters(&self) -> &Datacenters {
        self.datacenters
            .get_or_init(|| Datacenters::new(self.transport()))
    }

    /// Networks.
    pub fn networks(&self) -> &Networks {
        self.networks.get_or_init(|| Networks::new(self.transport()))
    }

    /// Firewall rules.
    pub fn firewall_rules(&self) -> &FirewallRules {
        self.firewall_rules
            .get_or_init(|| FirewallRules::new(self.transport()))
    }

    /// Account sub-users.
    pub fn users(&self) -> &Users {
        self.users.get_or_init(|| Users::new(self.transport()))
    }

    /// Generic collection for any [`ResourceKind`].
    #[must_use]
    pub fn collection(&self, kind: ResourceKind) -> ResourceCollection {
        kind.collection(self.transport())
    }

    /// `GET /{account}`: details of the authenticated account.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn account(&self) -> Result<Response> {
        self.transport.dispatch(Request::get("")).await
    }
}

impl std::fmt::Debug for CloudApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudApiClient")
            .field("url", &self.config.url)
            .field("account", &self.config.account)
            .finish_non_exhaustive()
    }
}
