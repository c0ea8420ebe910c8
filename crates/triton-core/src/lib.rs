//! # triton-core
//!
//! Core types and utilities for talking to Triton CloudAPI.
//!
//! This crate provides error handling, configuration, HTTP client settings and the
//! HTTP-signature request signer shared by CloudAPI clients.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy (auth, network, decode, API)
//! - [`config`] - Endpoint and identity configuration
//! - [`client`] - HTTP client timeouts and pooling
//! - [`auth`] - Private keys and `Authorization` header signing
//! - [`query`] - Query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod query;

// Re-export commonly used types
pub use auth::{PrivateKey, RequestSigner, SigningAlgorithm};
pub use config::CloudApiConfig;
pub use error::{Error, Result};
pub use query::QueryParams;
