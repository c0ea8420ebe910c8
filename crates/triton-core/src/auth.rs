//! HTTP signature authentication.
//!
//! CloudAPI authenticates every request with an RSA signature over the value of the
//! request's `Date` header. The signature travels in the `Authorization` header:
//!
//! ```text
//! Authorization: Signature keyId="/jill/keys/laptop",algorithm="rsa-sha256",signature="..."
//! ```
//!
//! Signing is PKCS#1 v1.5, which is deterministic: a given key and date string always
//! produce the same token.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::sha2::{Sha256, Sha512};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Format of the `Date` header (RFC 1123, always GMT).
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Render a timestamp as an RFC 1123 HTTP date.
#[must_use]
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Signature algorithms accepted by CloudAPI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigningAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256
    #[default]
    RsaSha256,
    /// RSA PKCS#1 v1.5 with SHA-512
    RsaSha512,
}

impl SigningAlgorithm {
    /// Name used in the `algorithm` parameter of the `Authorization` header.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RsaSha256 => "rsa-sha256",
            Self::RsaSha512 => "rsa-sha512",
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rsa-sha256" => Ok(Self::RsaSha256),
            "rsa-sha512" => Ok(Self::RsaSha512),
            _ => Err(Error::Auth(format!("Unsupported signing algorithm: {s}"))),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parsed RSA private key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    /// Parse PEM encoded key material.
    ///
    /// Both PKCS#1 (`BEGIN RSA PRIVATE KEY`) and unencrypted PKCS#8
    /// (`BEGIN PRIVATE KEY`) are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the material is not a readable RSA key.
    pub fn from_pem(pem: &SecretString) -> Result<Self> {
        let pem = pem.expose_secret().trim();

        let inner = if pem.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(pem)
                .map_err(|e| Error::Auth(format!("Invalid PKCS#1 private key: {e}")))?
        } else if pem.contains("BEGIN PRIVATE KEY") {
            RsaPrivateKey::from_pkcs8_pem(pem)
                .map_err(|e| Error::Auth(format!("Invalid PKCS#8 private key: {e}")))?
        } else if pem.contains("BEGIN ENCRYPTED PRIVATE KEY") {
            return Err(Error::Auth(
                "Encrypted private keys are not supported".to_string(),
            ));
        } else if pem.contains("BEGIN OPENSSH PRIVATE KEY") {
            return Err(Error::Auth(
                "OpenSSH private key format is not supported, convert it to PEM".to_string(),
            ));
        } else {
            return Err(Error::Auth("Unrecognized private key material".to_string()));
        };

        Ok(Self { inner })
    }

    /// Read and parse a PEM file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_pem(&load_private_key(path)?)
    }

    /// Sign `data` and return the base64 encoded signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the signature cannot be computed.
    pub fn sign(&self, algorithm: SigningAlgorithm, data: &str) -> Result<String> {
        let signature = match algorithm {
            SigningAlgorithm::RsaSha256 => {
                SigningKey::<Sha256>::new(self.inner.clone()).try_sign(data.as_bytes())
            }
            SigningAlgorithm::RsaSha512 => {
                SigningKey::<Sha512>::new(self.inner.clone()).try_sign(data.as_bytes())
            }
        }
        .map_err(|e| Error::Auth(format!("Failed to sign request: {e}")))?;

        Ok(STANDARD.encode(signature.to_bytes()))
    }

    /// Access the underlying RSA key.
    #[must_use]
    pub const fn as_rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// Read PEM key material from disk without parsing it.
///
/// # Errors
///
/// Returns [`Error::Auth`] if the file cannot be read.
pub fn load_private_key(path: &Path) -> Result<SecretString> {
    debug!("loading private key from {}", path.display());
    std::fs::read_to_string(path)
        .map(SecretString::from)
        .map_err(|e| {
            Error::Auth(format!(
                "Failed to read private key {}: {e}",
                path.display()
            ))
        })
}

/// Headers produced by signing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value for the `Date` header; this exact string was signed
    pub date: String,
    /// Value for the `Authorization` header
    pub authorization: String,
}

/// Signs requests on behalf of one key.
pub struct RequestSigner {
    key_id: String,
    key: PrivateKey,
    algorithm: SigningAlgorithm,
}

impl RequestSigner {
    /// Create a signer for `key_id` (usually `/{account}/keys/{name}`).
    #[must_use]
    pub fn new(key_id: impl Into<String>, key: PrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            key,
            algorithm: SigningAlgorithm::default(),
        }
    }

    /// Use a different signature algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The key identifier placed in the `Authorization` header.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The configured signature algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Sign a canonical string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if signing fails.
    pub fn sign(&self, canonical: &str) -> Result<String> {
        self.key.sign(self.algorithm, canonical)
    }

    /// Render the `Authorization` header value for a `Date` header value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if signing fails.
    pub fn authorization(&self, date: &str) -> Result<String> {
        let signature = self.sign(date)?;
        Ok(format!(
            "Signature keyId=\"{}\",algorithm=\"{}\",signature=\"{}\"",
            self.key_id,
            self.algorithm.name(),
            signature
        ))
    }

    /// Produce the `Date` and `Authorization` headers for a request sent at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if signing fails.
    pub fn signed_headers(&self, at: DateTime<Utc>) -> Result<SignedHeaders> {
        let date = http_date(at);
        let authorization = self.authorization(&date)?;
        Ok(SignedHeaders {
            date,
            authorization,
        })
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
