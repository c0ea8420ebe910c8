//! Normalized response envelope.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use triton_core::{Error, Result};

/// Header CloudAPI uses to correlate a request with its server-side logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Status, headers and decoded body of one CloudAPI call.
///
/// A response is produced for every status code, including errors. Use
/// [`Response::is_success`] or [`Response::error_for_status`] to branch on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

/// Error payload returned by CloudAPI on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Provider error code, e.g. `ResourceNotFound`
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Self::Api {
            status: err.status.as_u16(),
            code: err.code,
            message: err.message,
        }
    }
}

impl Response {
    /// Build a response from an already decoded body.
    #[must_use]
    pub const fn new(status: StatusCode, headers: HeaderMap, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Decode a raw body according to its declared content type.
    ///
    /// An empty body decodes to `null`. JSON (or an undeclared type) is parsed; any
    /// other content type is kept as a string. Unparseable JSON is a decode error on
    /// success statuses and is kept verbatim as a string on error statuses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when a 2xx body is not valid JSON.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, bytes: &[u8]) -> Result<Self> {
        let body = decode_body(status, &headers, bytes)?;
        Ok(Self::new(status, headers, body))
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Look up a header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request id assigned by CloudAPI, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header(REQUEST_ID_HEADER)
    }

    /// Decoded body.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Alias of [`Response::body`].
    #[must_use]
    pub const fn content(&self) -> &Value {
        &self.body
    }

    /// Take ownership of the decoded body.
    #[must_use]
    pub fn into_body(self) -> Value {
        self.body
    }

    /// The body of a list call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body is not an array.
    pub fn records(&self) -> Result<&[Value]> {
        self.body.as_array().map(Vec::as_slice).ok_or_else(|| {
            Error::Decode(format!(
                "expected a list body, got {}",
                shape(&self.body)
            ))
        })
    }

    /// The body of a single-item call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body is not an object.
    pub fn record(&self) -> Result<&Map<String, Value>> {
        self.body.as_object().ok_or_else(|| {
            Error::Decode(format!(
                "expected a single record, got {}",
                shape(&self.body)
            ))
        })
    }

    /// Deserialize the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.body).map_err(Error::from)
    }

    /// The provider's error payload, for non-2xx responses.
    #[must_use]
    pub fn api_error(&self) -> Option<ApiError> {
        if self.is_success() {
            return None;
        }

        let field = |name: &str| {
            self.body
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let code = field("code").unwrap_or_else(|| {
            self.status
                .canonical_reason()
                .unwrap_or("UnknownError")
                .replace(' ', "")
        });
        let message = field("message")
            .or_else(|| self.body.as_str().map(str::to_string))
            .unwrap_or_default();

        Some(ApiError {
            status: self.status,
            code,
            message,
        })
    }

    /// Turn a non-2xx response into [`Error::Api`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the status is not a success.
    pub fn error_for_status(self) -> Result<Self> {
        match self.api_error() {
            Some(err) => Err(err.into()),
            None => Ok(self),
        }
    }
}

fn decode_body(status: StatusCode, headers: &HeaderMap, bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(true, |content_type| content_type.contains("json"));

    if !is_json {
        return Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()));
    }

    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(err) if status.is_success() => Err(Error::Decode(format!(
            "invalid JSON in {status} response: {err}"
        ))),
        Err(_) => Ok(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

const fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde::Deserialize;
    use serde_json::json;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn decodes_list_body() {
        let response =
            Response::from_parts(StatusCode::OK, json_headers(), br#"[{"name":"small"}]"#)
                .unwrap();
        assert_eq!(response.records().unwrap().len(), 1);
        assert!(response.record().is_err());
    }

    #[test]
    fn empty_body_is_null() {
        let response = Response::from_parts(StatusCode::NO_CONTENT, json_headers(), b"").unwrap();
        assert_eq!(response.body(), &Value::Null);
        assert!(matches!(response.records(), Err(Error::Decode(_))));
    }

    #[test]
    fn invalid_json_on_success_is_decode_error() {
        let err = Response::from_parts(StatusCode::OK, json_headers(), b"{not json").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn invalid_json_on_error_keeps_text() {
        let response =
            Response::from_parts(StatusCode::BAD_GATEWAY, json_headers(), b"<html>bad gateway")
                .unwrap();
        assert_eq!(response.body(), &json!("<html>bad gateway"));

        let api = response.api_error().unwrap();
        assert_eq!(api.code, "BadGateway");
        assert_eq!(api.message, "<html>bad gateway");
    }

    #[test]
    fn text_content_type_is_kept_as_string() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let response = Response::from_parts(StatusCode::OK, headers, b"pong").unwrap();
        assert_eq!(response.content(), &json!("pong"));
    }

    #[test]
    fn api_error_uses_provider_payload() {
        let mut headers = json_headers();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-1"));
        let body = br#"{"code":"ResourceNotFound","message":"missing does not exist"}"#;
        let response = Response::from_parts(StatusCode::NOT_FOUND, headers, body).unwrap();

        assert_eq!(response.request_id(), Some("req-1"));
        let api = response.api_error().unwrap();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.code, "ResourceNotFound");

        let err = response.error_for_status().unwrap_err();
        assert_eq!(
            err,
            Error::Api {
                status: 404,
                code: "ResourceNotFound".to_string(),
                message: "missing does not exist".to_string(),
            }
        );
    }

    #[test]
    fn success_has_no_api_error() {
        let response = Response::new(StatusCode::OK, HeaderMap::new(), json!({"id": "a"}));
        assert!(response.api_error().is_none());
        assert!(response.clone().error_for_status().is_ok());
        assert_eq!(response.record().unwrap()["id"], "a");
    }

    #[test]
    fn typed_decode() {
        #[derive(Deserialize)]
        struct Package {
            name: String,
            memory: u64,
        }

        let response = Response::new(
            StatusCode::OK,
            HeaderMap::new(),
            json!([{"name": "small", "memory": 512}]),
        );
        let packages: Vec<Package> = response.json().unwrap();
        assert_eq!(packages[0].name, "small");
        assert_eq!(packages[0].memory, 512);

        assert!(matches!(
            response.json::<Vec<String>>(),
            Err(Error::Decode(_))
        ));
    }
}
