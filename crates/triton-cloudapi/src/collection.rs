//! Generic CRUD contract over one CloudAPI path.
//!
//! Every resource family is a [`ResourceCollection`] bound to a path segment. The
//! collection only shapes requests; it never interprets statuses. A `404` from
//! [`ResourceCollection::read`] comes back as a [`Response`] with status 404.

use crate::response::Response;
use crate::transport::{Request, Transport};
use crate::Result;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use triton_core::{Error, QueryParams};

/// Filters for list calls.
pub type ListQuery = QueryParams;

/// Identifier of a single resource.
///
/// Guaranteed non-empty and safe to use as one URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    /// Validate an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if `id` is empty, is `.` or `..`, or
    /// contains `/`, `?`, `#`, `%`, whitespace or control characters.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidIdentifier(
                "identifier must not be empty".to_string(),
            ));
        }

        if id == "." || id == ".." {
            return Err(Error::InvalidIdentifier(format!(
                "`{id}` is not a valid identifier"
            )));
        }

        if let Some(c) = id
            .chars()
            .find(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
        {
            return Err(Error::InvalidIdentifier(format!(
                "`{}` contains forbidden character {c:?}",
                id.escape_debug()
            )));
        }

        Ok(Self(id))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// CRUD handle for one path, sharing a [`Transport`].
///
/// Handles are cheap to clone and hold no per-call state.
#[derive(Clone)]
pub struct ResourceCollection {
    path: String,
    update_method: Method,
    transport: Arc<dyn Transport>,
}

impl ResourceCollection {
    /// Bind a collection to `path` (relative to the account prefix).
    #[must_use]
    pub fn new(path: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            path: path.into(),
            update_method: Method::POST,
            transport,
        }
    }

    /// Use `PUT` (or another verb) instead of `POST` for updates.
    #[must_use]
    pub fn with_update_method(mut self, method: Method) -> Self {
        self.update_method = method;
        self
    }

    /// The bound path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Verb used by [`ResourceCollection::update`].
    #[must_use]
    pub const fn update_method(&self) -> &Method {
        &self.update_method
    }

    /// `GET {path}`, optionally filtered.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn all(&self, query: &ListQuery) -> Result<Response> {
        self.dispatch(Request::get(self.path.as_str()).with_query(query))
            .await
    }

    /// `GET {path}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a bad `id`; propagates transport failures.
    pub async fn read(&self, id: impl AsRef<str>) -> Result<Response> {
        let path = self.item_path(id.as_ref())?;
        self.dispatch(Request::get(path)).await
    }

    /// `POST {path}` with `attrs` as the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `attrs` cannot be serialized; propagates
    /// transport failures.
    pub async fn create<B>(&self, attrs: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let body = to_body(attrs)?;
        self.dispatch(Request::post(self.path.as_str()).with_body(body))
            .await
    }

    /// `POST {path}/{id}` (or the configured update verb) with `attrs` as the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] or [`Error::InvalidRequest`] for bad input;
    /// propagates transport failures.
    pub async fn update<B>(&self, id: impl AsRef<str>, attrs: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let path = self.item_path(id.as_ref())?;
        let body = to_body(attrs)?;
        self.dispatch(Request::new(self.update_method.clone(), path).with_body(body))
            .await
    }

    /// `DELETE {path}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a bad `id`; propagates transport failures.
    pub async fn delete(&self, id: impl AsRef<str>) -> Result<Response> {
        let path = self.item_path(id.as_ref())?;
        self.dispatch(Request::delete(path)).await
    }

    /// `POST {path}/{id}?action={action}&...`, the CloudAPI convention for verbs
    /// such as `start` or `resize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a bad `id`; propagates transport failures.
    pub async fn action(
        &self,
        id: impl AsRef<str>,
        action: &str,
        params: &QueryParams,
    ) -> Result<Response> {
        let path = self.item_path(id.as_ref())?;
        let request = Request::post(path)
            .with_query(params)
            .with_param("action", action);
        self.dispatch(request).await
    }

    /// `POST {path}/{id}/{segment}` without a body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a bad `id` or `segment`; propagates
    /// transport failures.
    pub async fn invoke(&self, id: impl AsRef<str>, segment: &str) -> Result<Response> {
        let path = self.item_path(id.as_ref())?;
        let segment = ResourceId::parse(segment)?;
        self.dispatch(Request::post(format!("{path}/{segment}")))
            .await
    }

    /// Collection nested under one item, e.g. `machines/{id}/tags`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for a bad `id` or `segment`.
    pub fn nested(&self, id: impl AsRef<str>, segment: &str) -> Result<Self> {
        let path = self.item_path(id.as_ref())?;
        let segment = ResourceId::parse(segment)?;
        Ok(Self::new(format!("{path}/{segment}"), Arc::clone(&self.transport)))
    }

    fn item_path(&self, id: &str) -> Result<String> {
        let id = ResourceId::parse(id)?;
        Ok(format!("{}/{id}", self.path))
    }

    async fn dispatch(&self, request: Request) -> Result<Response> {
        self.transport.dispatch(request).await
    }
}

impl fmt::Debug for ResourceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCollection")
            .field("path", &self.path)
            .field("update_method", &self.update_method)
            .finish_non_exhaustive()
    }
}

fn to_body<B>(attrs: &B) -> Result<Value>
where
    B: Serialize + ?Sized,
{
    serde_json::to_value(attrs)
        .map_err(|err| Error::InvalidRequest(format!("Unserializable attributes: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use crate::transport::MockTransport;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use serde_json::json;

    fn ok(body: Value) -> Result<Response> {
        Ok(Response::new(StatusCode::OK, HeaderMap::new(), body))
    }

    #[test]
    fn resource_id_validation() {
        assert_eq!(ResourceId::parse("small").unwrap().as_str(), "small");
        assert!(ResourceId::parse("3f1a2b4c-0000-4000-8000-000000000001").is_ok());
        assert!(ResourceId::parse("aa:bb:cc").is_ok());

        for bad in ["", ".", "..", "a/b", "a b", "a?b", "a#b", "50%", "tab\t"] {
            assert!(
                matches!(ResourceId::parse(bad), Err(Error::InvalidIdentifier(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn all_issues_one_get() {
        let mut mock = MockTransport::new();
        mock.expect_dispatch()
            .withf(|r| r.method() == Method::GET && r.path() == "packages" && r.body().is_none())
            .times(1)
            .returning(|_| ok(json!([])));

        let packages = ResourceCollection::new("packages", Arc::new(mock));
        let response = packages.all(&ListQuery::new()).await.unwrap();
        assert!(response.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_passes_filters() {
        let mut mock = MockTransport::new();
        mock.expect_dispatch()
            .withf(|r| r.query().get("memory") == Some("1024"))
            .times(1)
            .returning(|_| ok(json!([])));

        let packages = ResourceCollection::new("packages", Arc::new(mock));
        packages
            .all(&ListQuery::new().with("memory", 1024))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn item_operations_shape_requests() {
        let transport = Arc::new(MemoryTransport::new());
        let machines = ResourceCollection::new("machines", transport.clone());

        machines.read("m-1").await.unwrap();
        machines.create(&json!({"name": "web"})).await.unwrap();
        machines.update("m-1", &json!({"name": "db"})).await.unwrap();
        machines.delete("m-1").await.unwrap();

        let shapes: Vec<(Method, String, Option<Value>)> = transport
            .requests()
            .into_iter()
            .map(|r| (r.method().clone(), r.path().to_string(), r.body().cloned()))
            .collect();

        assert_eq!(
            shapes,
            vec![
                (Method::GET, "machines/m-1".to_string(), None),
                (Method::POST, "machines".to_string(), Some(json!({"name": "web"}))),
                (Method::POST, "machines/m-1".to_string(), Some(json!({"name": "db"}))),
                (Method::DELETE, "machines/m-1".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn update_method_can_be_put() {
        let transport = Arc::new(MemoryTransport::new());
        let tags = ResourceCollection::new("machines/m-1/tags", transport.clone())
            .with_update_method(Method::PUT);

        tags.update("role", &json!({"role": "db"})).await.unwrap();
        assert_eq!(transport.requests()[0].method(), &Method::PUT);
    }

    #[tokio::test]
    async fn read_not_found_is_a_response() {
        let transport = Arc::new(MemoryTransport::new());
        let packages = ResourceCollection::new("packages", transport);

        let response = packages.read("missing").await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.api_error().is_some());
    }

    #[tokio::test]
    async fn invalid_id_never_reaches_transport() {
        let mut mock = MockTransport::new();
        mock.expect_dispatch().times(0);

        let keys = ResourceCollection::new("keys", Arc::new(mock));
        let err = keys.delete("../machines").await.unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }

    #[tokio::test]
    async fn action_and_invoke_paths() {
        let transport = Arc::new(MemoryTransport::new());
        let machines = ResourceCollection::new("machines", transport.clone());

        machines
            .action("m-1", "resize", &QueryParams::new().with("package", "large"))
            .await
            .unwrap();
        machines.invoke("m-1", "enable").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].path(), "machines/m-1");
        assert_eq!(requests[0].query().get("action"), Some("resize"));
        assert_eq!(requests[0].query().get("package"), Some("large"));
        assert_eq!(requests[1].path(), "machines/m-1/enable");
        assert!(requests[1].body().is_none());
    }

    #[test]
    fn nested_collection_path() {
        let machines = ResourceCollection::new("machines", Arc::new(MemoryTransport::new()));
        let snapshots = machines.nested("m-1", "snapshots").unwrap();
        assert_eq!(snapshots.path(), "machines/m-1/snapshots");
        assert_eq!(snapshots.update_method(), &Method::POST);
        assert!(machines.nested("m-1", "a/b").is_err());
    }
}
