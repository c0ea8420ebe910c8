//! Integration tests for the packages collection.
//!
//! These tests drive the public client against an in-memory transport loaded with
//! recorded CloudAPI package data.

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use triton_cloudapi::{CloudApiClient, ListQuery, MemoryTransport};
use triton_core::CloudApiConfig;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load the package list fixture from disk.
fn load_packages_fixture() -> Vec<Value> {
    let fixture_path = fixtures_dir().join("packages.json");
    let data = fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read packages fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });
    serde_json::from_str(&data).expect("packages fixture is a JSON list")
}

fn client_with(transport: Arc<MemoryTransport>) -> CloudApiClient {
    let config = CloudApiConfig::new("https://cloudapi.example.com", "my", "laptop").unwrap();
    CloudApiClient::builder(config)
        .with_transport(transport)
        .build()
        .unwrap()
}

fn packages_transport() -> Arc<MemoryTransport> {
    Arc::new(MemoryTransport::new().with_collection("packages", "name", load_packages_fixture()))
}

#[tokio::test]
async fn test_all_returns_every_package() {
    let transport = packages_transport();
    let client = client_with(transport.clone());

    let response = client.packages().all(&ListQuery::new()).await.unwrap();
    assert_eq!(response.records().unwrap().len(), 2);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1, "all() must issue exactly one request");
    assert_eq!(requests[0].method(), Method::GET);
    assert_eq!(requests[0].path(), "packages");
    assert!(requests[0].query().is_empty());
}

#[tokio::test]
async fn test_read_returns_named_package() {
    let transport = packages_transport();
    let client = client_with(transport.clone());

    let response = client.packages().read("small").await.unwrap();
    assert_eq!(response.content()["name"], "small");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path(), "packages/small");
}

#[tokio::test]
async fn test_listed_records_read_back_equal() {
    let client = client_with(packages_transport());

    let listed = client.packages().all(&ListQuery::new()).await.unwrap();
    for record in listed.records().unwrap() {
        let name = record["name"].as_str().unwrap();
        let read = client.packages().read(name).await.unwrap();
        assert_eq!(read.body(), record);
    }
}

#[tokio::test]
async fn test_empty_collection_is_empty_list() {
    let transport = Arc::new(MemoryTransport::new().with_collection("packages", "name", vec![]));
    let client = client_with(transport);

    let response = client.packages().all(&ListQuery::new()).await.unwrap();
    assert!(response.is_success());
    assert!(response.records().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_package_is_404_response() {
    let client = client_with(packages_transport());

    let response = client.packages().read("missing").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let error = response.api_error().expect("404 carries an error body");
    assert_eq!(error.code, "ResourceNotFound");
}

#[tokio::test]
async fn test_typed_package_decode() {
    #[derive(Debug, Deserialize)]
    struct Package {
        name: String,
        memory: u64,
        vcpus: u32,
        default: bool,
    }

    let client = client_with(packages_transport());
    let packages: Vec<Package> = client
        .packages()
        .all(&ListQuery::new())
        .await
        .unwrap()
        .json()
        .unwrap();

    let large = packages.iter().find(|p| p.name == "large").unwrap();
    assert_eq!(large.memory, 8192);
    assert_eq!(large.vcpus, 4);
    assert!(packages.iter().any(|p| p.default));
}
