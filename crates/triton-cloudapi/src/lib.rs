//! Triton CloudAPI client.
//!
//! Every call flows through the same pipeline: a resource handle shapes a
//! [`Request`], the [`Transport`] signs and sends it, and the result comes back as a
//! [`Response`] envelope whatever the HTTP status.
//!
//! ```no_run
//! use secrecy::SecretString;
//! use triton_cloudapi::{CloudApiClient, ListQuery};
//! use triton_core::CloudApiConfig;
//!
//! # async fn run() -> triton_cloudapi::Result<()> {
//! let config = CloudApiConfig::from_env()?;
//! let pem = std::fs::read_to_string("/home/jill/.ssh/id_rsa").unwrap();
//! let client = CloudApiClient::new(config, SecretString::from(pem))?;
//!
//! let packages = client.packages().all(&ListQuery::new()).await?;
//! for package in packages.records()? {
//!     println!("{}", package["name"]);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod collection;
pub mod memory;
pub mod resources;
pub mod response;
pub mod transport;

pub use client::{CloudApiClient, CloudApiClientBuilder};
pub use collection::{ListQuery, ResourceCollection, ResourceId};
pub use memory::MemoryTransport;
pub use resources::{
    Datacenters, FirewallRules, Images, Keys, Machines, Networks, Packages, ResourceKind, Users,
};
pub use response::{ApiError, Response};
pub use transport::{HttpTransport, Request, Transport};

/// Convenient result alias that reuses the shared Triton error type.
pub type Result<T> = triton_core::Result<T>;
