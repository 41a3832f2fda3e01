//! HTTP binding protocol: per-member wire placement.
//!
//! Each member of the operation input lands where its merged traits say:
//! URI label, header, prefix-header map, query parameter, explicit payload
//! or response code. Members matching no binding are deferred and
//! document-encoded together as the request body. The response path
//! mirrors the walk and additionally copies only the non-bound member
//! names out of the decoded body, so stray body fields never leak into
//! the result.
//!
//! Every member write and read goes through the binding router
//! ([`BindingSerializer`] / [`BindingDeserializer`]): the protocol decides
//! placement, the router decides string codec versus document codec.
//!
//! URI templates use `{name}` for a single percent-encoded segment and
//! `{name+}` for a greedy, slash-preserving substitution.

use crate::codec::binding::{BindingDeserializer, BindingSerializer};
use crate::codec::string::{StringDeserializer, StringSerializer};
use crate::codec::{Codec, CodecSettings, ShapeDeserializer, ShapeSerializer, Value};
use crate::error::{CodecError, Result};
use crate::protocol::{
    dispatch_error, is_error_status, Body, ClientProtocol, ErrorHandler, RequestContext,
    WireRequest, WireResponse,
};
use crate::schema::{Binding, HttpBinding, NormalizedSchema};
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

// RFC 3986 unreserved characters stay literal; everything else is encoded.
const LABEL_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, LABEL_ENCODE).to_string()
}

// Route one member write through the router and take the result as text.
// Only called for string-bound members, whose encodings are UTF-8.
fn write_text(
    router: &mut BindingSerializer,
    schema: &NormalizedSchema,
    value: &Value,
) -> Result<String> {
    router.write(schema, value)?;
    let bytes = router.flush()?;
    Ok(std::str::from_utf8(&bytes)?.to_string())
}

/// Protocol placing members by their HTTP binding traits.
pub struct HttpBindingProtocol {
    codec: Arc<dyn Codec>,
    error_handler: Arc<dyn ErrorHandler>,
    settings: CodecSettings,
}

impl HttpBindingProtocol {
    /// Create a protocol over a document codec and an error handler.
    ///
    /// Binding-driven timestamp format inference is on; trait sentinels
    /// are honored.
    #[must_use]
    pub fn new(codec: Arc<dyn Codec>, error_handler: Arc<dyn ErrorHandler>) -> Self {
        HttpBindingProtocol {
            codec,
            error_handler,
            settings: CodecSettings::new().with_http_bindings(true),
        }
    }

    /// Override the codec settings.
    #[must_use]
    pub fn with_settings(mut self, settings: CodecSettings) -> Self {
        self.settings = settings;
        self
    }

    fn http_binding(operation: &NormalizedSchema) -> Result<HttpBinding> {
        operation.merged_traits().http.clone().ok_or_else(|| {
            CodecError::SchemaMisuse(
                "operation schema declares no http method/uri binding".to_string(),
            )
        })
    }

    fn serialize_payload(
        &self,
        router: &mut BindingSerializer,
        request: &mut WireRequest,
        member: &NormalizedSchema,
        value: &Value,
    ) -> Result<()> {
        if member.is_streaming() && member.is_union() {
            // Event stream: the framer builds the body; the request leaves
            // it empty for the caller to attach.
            return Ok(());
        }
        if member.is_streaming() {
            if let Value::Blob(bytes) = value {
                request.body = Body::Bytes(bytes.clone());
            }
            let content_type = member
                .merged_traits()
                .media_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string());
            request.set_header("content-type", content_type);
            return Ok(());
        }
        let content_type = match member.merged_traits().media_type.clone() {
            Some(media_type) => media_type,
            None if member.is_blob() => "application/octet-stream".to_string(),
            None if member.is_string() => "text/plain".to_string(),
            None => self.codec.media_type().to_string(),
        };
        let body = match value {
            Value::Blob(bytes) if member.is_blob() => bytes.clone(),
            Value::String(text) if member.is_string() => Bytes::from(text.clone()),
            other => {
                router.write(member, other)?;
                router.flush()?
            }
        };
        request.body = Body::Bytes(body);
        request.set_header("content-type", content_type);
        Ok(())
    }

    fn push_query(
        &self,
        router: &mut BindingSerializer,
        member: &NormalizedSchema,
        name: &str,
        value: &Value,
        query: &mut Vec<(String, String)>,
    ) -> Result<()> {
        match value {
            Value::List(items) => {
                // One query entry per element; nulls are dropped unless the
                // list is sparse. Formatting against the member keeps the
                // query-binding timestamp convention for elements.
                let sparse = member.merged_traits().sparse;
                for item in items {
                    if item.is_null() && !sparse {
                        continue;
                    }
                    query.push((name.to_string(), write_text(router, member, item)?));
                }
                Ok(())
            }
            other => {
                query.push((name.to_string(), write_text(router, member, other)?));
                Ok(())
            }
        }
    }

    // Params map entries are collected aside and merged after the member
    // walk, so explicit query bindings win whatever the declaration order.
    fn collect_query_params(
        &self,
        strings: &StringSerializer,
        member: &NormalizedSchema,
        value: &Value,
        params: &mut Vec<(String, String)>,
    ) -> Result<()> {
        let entries = value.as_map().ok_or_else(|| {
            CodecError::SchemaMisuse("httpQueryParams member must be a map".to_string())
        })?;
        let value_schema = member.value_schema().ok_or_else(|| {
            CodecError::SchemaMisuse("httpQueryParams member has no value schema".to_string())
        })?;
        for (key, entry) in entries {
            match entry {
                Value::List(items) => {
                    for item in items {
                        if item.is_null() {
                            continue;
                        }
                        params.push((key.clone(), strings.format(&value_schema, item)?));
                    }
                }
                Value::Null => {}
                other => params.push((key.clone(), strings.format(&value_schema, other)?)),
            }
        }
        Ok(())
    }

    fn read_payload(
        &self,
        router: &BindingDeserializer,
        member: &NormalizedSchema,
        body: Bytes,
    ) -> Result<Value> {
        if member.is_blob() {
            return Ok(Value::Blob(body));
        }
        if member.is_string() {
            return Ok(Value::String(std::str::from_utf8(&body)?.to_string()));
        }
        router.read(member, &body)
    }
}

#[async_trait]
impl ClientProtocol for HttpBindingProtocol {
    fn content_type(&self) -> &str {
        self.codec.media_type()
    }

    async fn serialize_request(
        &self,
        operation: &NormalizedSchema,
        input: &Value,
        context: &RequestContext,
    ) -> Result<WireRequest> {
        let http = Self::http_binding(operation)?;
        let input_schema = operation.input().ok_or_else(|| {
            CodecError::SchemaMisuse("operation schema has no input struct".to_string())
        })?;
        let members = input.as_map().ok_or_else(|| {
            CodecError::SchemaMisuse("operation input value must be a struct".to_string())
        })?;

        let mut router =
            BindingSerializer::new(self.codec.serializer(), self.settings.clone());
        // Prefix-header map entries are value schemas, not members, and are
        // always string-located; they skip the router.
        let strings = StringSerializer::new(self.settings.clone());
        let null = Value::Null;
        let mut request = WireRequest::new(http.method.clone());
        let mut labels: BTreeMap<String, String> = BTreeMap::new();
        let mut deferred: BTreeMap<String, Value> = BTreeMap::new();
        let mut params: Vec<(String, String)> = Vec::new();
        let mut has_payload = false;

        for member in input_schema.struct_members() {
            let name = member.member_name().unwrap_or_default().to_string();
            let binding = Binding::of(member.merged_traits());
            let supplied = members.get(&name);
            // Absent idempotency-token members still reach the string
            // codec, which fills them with a fresh UUID.
            let value = match supplied {
                Some(value) => value,
                None if binding.is_string_bound() && member.merged_traits().idempotency_token => {
                    &null
                }
                None => continue,
            };
            match binding {
                Binding::Label => {
                    labels.insert(name, write_text(&mut router, &member, value)?);
                }
                Binding::Header(header) => {
                    request.set_header(&header, write_text(&mut router, &member, value)?);
                }
                Binding::PrefixHeaders(prefix) => {
                    let entries = value.as_map().ok_or_else(|| {
                        CodecError::SchemaMisuse(
                            "httpPrefixHeaders member must be a map".to_string(),
                        )
                    })?;
                    let value_schema = member.value_schema().ok_or_else(|| {
                        CodecError::SchemaMisuse(
                            "httpPrefixHeaders member has no value schema".to_string(),
                        )
                    })?;
                    for (key, entry) in entries {
                        request.set_header(
                            &format!("{prefix}{key}"),
                            strings.format(&value_schema, entry)?,
                        );
                    }
                }
                Binding::Query(query_name) => {
                    self.push_query(&mut router, &member, &query_name, value, &mut request.query)?;
                }
                Binding::QueryParams => {
                    self.collect_query_params(&strings, &member, value, &mut params)?;
                }
                Binding::Payload => {
                    has_payload = true;
                    self.serialize_payload(&mut router, &mut request, &member, value)?;
                }
                Binding::ResponseCode => {}
                Binding::Body => {
                    deferred.insert(name, value.clone());
                }
            }
        }

        // An explicit payload never coexists with implicit body members;
        // the generator guarantees it, so no re-check here.
        if !deferred.is_empty() && !has_payload {
            router.write(&input_schema, &Value::Map(deferred))?;
            request.body = Body::Bytes(router.flush()?);
            request.set_header("content-type", self.codec.media_type().to_string());
        }

        for (key, text) in params {
            if !request.query.iter().any(|(existing, _)| existing == &key) {
                request.query.push((key, text));
            }
        }

        request.path = resolve_uri_template(&http.uri, &labels)?;
        if let Some(pattern) = &operation.merged_traits().host_prefix {
            request.host_prefix = Some(resolve_host_prefix(pattern, members)?);
        }
        debug!(
            operation = %context.operation_name,
            method = %request.method,
            path = %request.path,
            "serialized http binding request"
        );
        Ok(request)
    }

    async fn deserialize_response(
        &self,
        operation: &NormalizedSchema,
        response: WireResponse,
        context: &RequestContext,
    ) -> Result<Value> {
        if is_error_status(response.status) {
            return Err(dispatch_error(
                self.error_handler.as_ref(),
                self.codec.as_ref(),
                operation,
                context,
                response,
            )
            .await);
        }
        let output_schema = operation.output().ok_or_else(|| {
            CodecError::SchemaMisuse("operation schema has no output struct".to_string())
        })?;
        let router =
            BindingDeserializer::new(self.codec.deserializer(), self.settings.clone());
        let strings = StringDeserializer::new(self.settings.clone());
        let mut response = response;
        let mut result: BTreeMap<String, Value> = BTreeMap::new();
        let mut non_bound: Vec<String> = Vec::new();

        for member in output_schema.struct_members() {
            let name = member.member_name().unwrap_or_default().to_string();
            match Binding::of(member.merged_traits()) {
                Binding::ResponseCode => {
                    result.insert(name, Value::Integer(i64::from(response.status)));
                }
                Binding::Header(header) => {
                    // The wire map is lower-cased; the trait name may not be.
                    if let Some(text) = response.header(&header.to_ascii_lowercase()) {
                        let text = text.to_string();
                        result.insert(name, router.read(&member, text.as_bytes())?);
                    }
                }
                Binding::PrefixHeaders(prefix) => {
                    let value_schema = member.value_schema().ok_or_else(|| {
                        CodecError::SchemaMisuse(
                            "httpPrefixHeaders member has no value schema".to_string(),
                        )
                    })?;
                    let prefix = prefix.to_ascii_lowercase();
                    let mut entries = BTreeMap::new();
                    for (header, text) in &response.headers {
                        if let Some(key) = header.strip_prefix(&prefix) {
                            entries.insert(key.to_string(), strings.read(&value_schema, text)?);
                        }
                    }
                    if !entries.is_empty() {
                        result.insert(name, Value::Map(entries));
                    }
                }
                Binding::Payload => {
                    if member.is_streaming() {
                        // Streaming payloads stay on the wire response for
                        // the caller (or the event framer) to consume.
                        continue;
                    }
                    let body = std::mem::replace(&mut response.body, Body::Empty)
                        .collect()
                        .await?;
                    if !body.is_empty() {
                        result.insert(name, self.read_payload(&router, &member, body)?);
                    }
                }
                // Request-only locations never appear in responses.
                Binding::Label | Binding::Query(_) | Binding::QueryParams => {}
                Binding::Body => non_bound.push(name),
            }
        }

        if !non_bound.is_empty() {
            let body = std::mem::replace(&mut response.body, Body::Empty)
                .collect()
                .await?;
            if !body.is_empty() {
                let decoded = router.read(&output_schema, &body)?;
                if let Some(fields) = decoded.as_map() {
                    // Only declared non-bound members are copied; anything
                    // else in the body is ignored.
                    for name in &non_bound {
                        if let Some(value) = fields.get(name) {
                            result.insert(name.clone(), value.clone());
                        }
                    }
                }
            }
        }
        debug!(
            operation = %context.operation_name,
            status = response.status,
            "deserialized http binding response"
        );
        Ok(Value::Map(result))
    }
}

/// Substitute `{name}` / `{name+}` labels into a URI template.
///
/// Single labels are percent-encoded whole; greedy labels are split on
/// `/`, each segment encoded, and rejoined so path structure survives.
pub fn resolve_uri_template(
    template: &str,
    labels: &BTreeMap<String, String>,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let close = rest[open..].find('}').ok_or_else(|| {
            CodecError::SchemaMisuse(format!("unclosed label in uri template {template:?}"))
        })? + open;
        let token = &rest[open + 1..close];
        let (name, greedy) = match token.strip_suffix('+') {
            Some(name) => (name, true),
            None => (token, false),
        };
        let value = labels.get(name).ok_or_else(|| {
            CodecError::SchemaMisuse(format!("no input member bound to uri label {name:?}"))
        })?;
        if greedy {
            let encoded: Vec<String> = value.split('/').map(encode_segment).collect();
            out.push_str(&encoded.join("/"));
        } else {
            out.push_str(&encode_segment(value));
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Substitute `{name}` tokens of an endpoint host-prefix pattern from
/// same-named, string-typed input members.
pub fn resolve_host_prefix(
    pattern: &str,
    input: &BTreeMap<String, Value>,
) -> Result<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let close = rest[open..].find('}').ok_or_else(|| {
            CodecError::SchemaMisuse(format!("unclosed label in host prefix {pattern:?}"))
        })? + open;
        let name = &rest[open + 1..close];
        match input.get(name) {
            Some(Value::String(text)) => out.push_str(text),
            Some(_) => {
                return Err(CodecError::SchemaMisuse(format!(
                    "host label {name:?} must be a string-typed member"
                )))
            }
            None => {
                return Err(CodecError::SchemaMisuse(format!(
                    "host label {name:?} has no input member"
                )))
            }
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
