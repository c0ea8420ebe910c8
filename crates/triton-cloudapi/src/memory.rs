//! In-memory [`Transport`] for tests and offline development.

use crate::response::Response;
use crate::transport::{Request, Transport};
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Answers requests from a fixed routing table and records what it was asked.
///
/// Routes are keyed by method and path; query parameters are ignored for matching
/// but kept in the recorded requests. Unknown routes answer `404` with a
/// `ResourceNotFound` body, like CloudAPI does.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: HashMap<(Method, String), (StatusCode, Value)>,
    requests: Mutex<Vec<Request>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canned response.
    #[must_use]
    pub fn with_route(
        mut self,
        method: Method,
        path: impl Into<String>,
        status: StatusCode,
        body: Value,
    ) -> Self {
        self.routes.insert((method, path.into()), (status, body));
        self
    }

    /// Register a `200 OK` response.
    #[must_use]
    pub fn with_json(self, method: Method, path: impl Into<String>, body: Value) -> Self {
        self.with_route(method, path, StatusCode::OK, body)
    }

    /// Serve `records` as a collection at `path`.
    ///
    /// `GET path` returns all records; `GET path/{id}` returns the record whose
    /// `id_field` equals `id`. Records without that field are only listed.
    #[must_use]
    pub fn with_collection<I>(mut self, path: &str, id_field: &str, records: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let records: Vec<Value> = records.into_iter().collect();

        for record in &records {
            let id = match record.get(id_field) {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => continue,
            };
            self = self.with_json(Method::GET, format!("{path}/{id}"), record.clone());
        }

        self.with_json(Method::GET, path, Value::Array(records))
    }

    /// Every request dispatched so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn answer(&self, request: &Request) -> (StatusCode, Value) {
        let key = (request.method().clone(), request.path().to_string());
        self.routes.get(&key).cloned().unwrap_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                json!({
                    "code": "ResourceNotFound",
                    "message": format!("{} does not exist", request.path()),
                }),
            )
        })
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn dispatch(&self, request: Request) -> Result<Response> {
        let (status, body) = self.answer(&request);

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let mut headers = HeaderMap::new();
        if !body.is_null() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(Response::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_registered_routes() {
        let transport = MemoryTransport::new().with_route(
            Method::DELETE,
            "keys/laptop",
            StatusCode::NO_CONTENT,
            Value::Null,
        );

        let response = transport
            .dispatch(Request::delete("keys/laptop"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let transport = MemoryTransport::new();
        let response = transport
            .dispatch(Request::get("packages/missing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.api_error().unwrap().code, "ResourceNotFound");
    }

    #[tokio::test]
    async fn collection_routes_by_id() {
        let transport = MemoryTransport::new().with_collection(
            "keys",
            "name",
            vec![json!({"name": "laptop"}), json!({"name": "desktop"})],
        );

        let list = transport.dispatch(Request::get("keys")).await.unwrap();
        assert_eq!(list.records().unwrap().len(), 2);

        let one = transport.dispatch(Request::get("keys/desktop")).await.unwrap();
        assert_eq!(one.record().unwrap()["name"], "desktop");
    }

    #[tokio::test]
    async fn records_requests_in_order() {
        let transport = MemoryTransport::new();
        transport
            .dispatch(Request::get("machines").with_param("state", "running"))
            .await
            .unwrap();
        transport.dispatch(Request::get("images")).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].query().get("state"), Some("running"));
        assert_eq!(requests[1].path(), "images");
    }
}
