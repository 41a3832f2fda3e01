//! Protocol boundary: wire request/response types and the client contract.
//!
//! A protocol turns an operation input value into a [`WireRequest`] and a
//! [`WireResponse`] back into an output value. Two implementations live
//! here: [`http::HttpBindingProtocol`] (per-member placement driven by
//! binding traits) and [`rpc::RpcProtocol`] (whole-body document encode).
//! Both are stateless across calls and share one error path: any status of
//! 300 or above is decoded as a generic document and handed to the
//! injected [`ErrorHandler`], which is contractually required to raise.
//!
//! Transport is out of scope. Protocols build and consume the wire types;
//! sending them is the caller's business.

pub mod http;
pub mod rpc;

use crate::codec::{Codec, Value};
use crate::error::{CodecError, Result};
use crate::schema::NormalizedSchema;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A pull-based stream of body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// A request or response body.
///
/// Streams are handed through untouched until something needs the whole
/// body, at which point [`Body::collect`] buffers them.
pub enum Body {
    /// No body.
    Empty,
    /// Fully buffered bytes.
    Bytes(Bytes),
    /// A live stream of chunks.
    Stream(ByteStream),
}

impl Body {
    /// Whether this body is the empty body.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(bytes) => bytes.is_empty(),
            Body::Stream(_) => false,
        }
    }

    /// Buffer the whole body into one byte chunk.
    ///
    /// Bounded only by memory; callers that must not buffer keep the
    /// stream variant and never call this.
    pub async fn collect(self) -> Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
            Body::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

/// An assembled HTTP-shaped request, transport-agnostic.
///
/// Header names are lower-cased. Query entries keep insertion order and
/// may repeat a key (multi-valued parameters).
#[derive(Debug)]
pub struct WireRequest {
    /// HTTP verb.
    pub method: ::http::Method,
    /// Resolved request path, percent-encoded.
    pub path: String,
    /// Query parameters in placement order.
    pub query: Vec<(String, String)>,
    /// Lower-cased header map.
    pub headers: BTreeMap<String, String>,
    /// Prefix to prepend to the resolved hostname, if the operation
    /// declares an endpoint pattern.
    pub host_prefix: Option<String>,
    /// Request body.
    pub body: Body,
}

impl WireRequest {
    /// An empty request with the given verb.
    #[must_use]
    pub fn new(method: ::http::Method) -> Self {
        WireRequest {
            method,
            path: String::from("/"),
            query: Vec::new(),
            headers: BTreeMap::new(),
            host_prefix: None,
            body: Body::Empty,
        }
    }

    /// Set a header, lower-casing its name.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.insert(name.to_ascii_lowercase(), value);
    }
}

/// A received HTTP-shaped response.
#[derive(Debug)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Header map, lower-cased on construction.
    pub headers: BTreeMap<String, String>,
    /// Response body.
    pub body: Body,
}

impl WireResponse {
    /// Build a response, lower-casing all header names.
    #[must_use]
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: Body) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        WireResponse {
            status,
            headers,
            body,
        }
    }

    /// Look up a header by lower-cased name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Identification headers pulled off an error response.
///
/// Always carries the status code; the id fields are present only when the
/// corresponding lower-cased headers are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetadata {
    /// HTTP status code.
    pub http_status_code: u16,
    /// `x-request-id` header, if present.
    pub request_id: Option<String>,
    /// `x-extended-request-id` header, if present.
    pub extended_request_id: Option<String>,
    /// `x-cf-id` header, if present.
    pub cf_id: Option<String>,
}

impl ResponseMetadata {
    /// Extract metadata from a response.
    #[must_use]
    pub fn of(response: &WireResponse) -> Self {
        ResponseMetadata {
            http_status_code: response.status,
            request_id: response.header("x-request-id").map(str::to_string),
            extended_request_id: response
                .header("x-extended-request-id")
                .map(str::to_string),
            cf_id: response.header("x-cf-id").map(str::to_string),
        }
    }
}

/// Per-call context handed through serialization and error handling.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Operation name, for logs and error handlers.
    pub operation_name: String,
}

impl RequestContext {
    /// Context for a named operation.
    #[must_use]
    pub fn new(operation_name: impl Into<String>) -> Self {
        RequestContext {
            operation_name: operation_name.into(),
        }
    }
}

/// Maps an error response to a typed raise.
///
/// Invoked for every response with status 300 or above, after the body has
/// been decoded as a generic document. The handler must return `Err`; a
/// normal return is itself a defect and the protocol raises in its place.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    /// Raise the service error described by an error response.
    async fn handle(
        &self,
        operation: &NormalizedSchema,
        context: &RequestContext,
        response: &WireResponse,
        document: &Value,
        metadata: &ResponseMetadata,
    ) -> Result<()>;
}

/// The client-side protocol contract.
#[async_trait]
pub trait ClientProtocol: Send + Sync {
    /// The content type of request bodies this protocol produces.
    fn content_type(&self) -> &str;

    /// Build a wire request from an operation input value.
    async fn serialize_request(
        &self,
        operation: &NormalizedSchema,
        input: &Value,
        context: &RequestContext,
    ) -> Result<WireRequest>;

    /// Decode a wire response into an operation output value.
    async fn deserialize_response(
        &self,
        operation: &NormalizedSchema,
        response: WireResponse,
        context: &RequestContext,
    ) -> Result<Value>;
}

/// Whether a status code routes through the error path.
#[must_use]
pub fn is_error_status(status: u16) -> bool {
    status >= 300
}

// Shared error path: collect the body, decode it as a generic document,
// hand control to the handler. Returns the error to propagate; the
// handler failing to raise is answered with a synthesized one.
pub(crate) async fn dispatch_error(
    handler: &dyn ErrorHandler,
    codec: &dyn Codec,
    operation: &NormalizedSchema,
    context: &RequestContext,
    response: WireResponse,
) -> CodecError {
    let status = response.status;
    debug!(
        operation = %context.operation_name,
        status,
        "dispatching error response"
    );
    let metadata = ResponseMetadata::of(&response);
    let mut response = response;
    let body = match std::mem::replace(&mut response.body, Body::Empty)
        .collect()
        .await
    {
        Ok(bytes) => bytes,
        Err(err) => return err,
    };
    let document = if body.is_empty() {
        Value::Null
    } else {
        let schema = NormalizedSchema::of(crate::schema::Schema::document());
        match codec.deserializer().read(&schema, &body) {
            Ok(value) => value,
            Err(err) => return err,
        }
    };
    match handler
        .handle(operation, context, &response, &document, &metadata)
        .await
    {
        Err(err) => err,
        Ok(()) => {
            warn!(
                operation = %context.operation_name,
                status,
                "error handler returned without raising"
            );
            CodecError::UnraisedServiceError { status }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_response_lower_cases_header_names() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Request-Id".to_string(), "abc".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let response = WireResponse::new(200, headers, Body::Empty);
        assert_eq!(response.header("x-request-id"), Some("abc"));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("X-Request-Id"), None);
    }

    #[test]
    fn test_metadata_extraction() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Request-Id".to_string(), "req-1".to_string());
        headers.insert("x-cf-id".to_string(), "cf-1".to_string());
        let response = WireResponse::new(503, headers, Body::Empty);
        let metadata = ResponseMetadata::of(&response);
        assert_eq!(metadata.http_status_code, 503);
        assert_eq!(metadata.request_id.as_deref(), Some("req-1"));
        assert_eq!(metadata.cf_id.as_deref(), Some("cf-1"));
        assert_eq!(metadata.extended_request_id, None);
    }

    #[test]
    fn test_error_status_threshold() {
        assert!(!is_error_status(200));
        assert!(!is_error_status(299));
        assert!(is_error_status(300));
        assert!(is_error_status(404));
        assert!(is_error_status(500));
    }

    #[tokio::test]
    async fn test_body_collect_buffers_stream() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let body = Body::Stream(stream::iter(chunks).boxed());
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"hello world"));
        assert_eq!(Body::Empty.collect().await.unwrap(), Bytes::new());
    }

    #[test]
    fn test_request_header_names_lowered() {
        let mut request = WireRequest::new(::http::Method::GET);
        request.set_header("X-Api-Key", "secret".to_string());
        assert_eq!(request.headers.get("x-api-key").map(String::as_str), Some("secret"));
    }
}
