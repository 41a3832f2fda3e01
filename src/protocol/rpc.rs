//! RPC protocol: whole-body document encode, fixed verb.
//!
//! No per-member placement: the entire input is document-encoded as the
//! request body and the entire body decodes against the output schema.
//! Error responses short-circuit through the shared handler path exactly
//! like the binding protocol.

use crate::codec::binding::{BindingDeserializer, BindingSerializer};
use crate::codec::{Codec, CodecSettings, ShapeDeserializer, ShapeSerializer, Value};
use crate::error::{CodecError, Result};
use crate::protocol::{
    dispatch_error, is_error_status, Body, ClientProtocol, ErrorHandler, RequestContext,
    WireRequest, WireResponse,
};
use crate::schema::NormalizedSchema;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Protocol sending every operation as one POSTed document body.
pub struct RpcProtocol {
    codec: Arc<dyn Codec>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl RpcProtocol {
    /// Create a protocol over a document codec and an error handler.
    #[must_use]
    pub fn new(codec: Arc<dyn Codec>, error_handler: Arc<dyn ErrorHandler>) -> Self {
        RpcProtocol {
            codec,
            error_handler,
        }
    }
}

#[async_trait]
impl ClientProtocol for RpcProtocol {
    fn content_type(&self) -> &str {
        self.codec.media_type()
    }

    async fn serialize_request(
        &self,
        operation: &NormalizedSchema,
        input: &Value,
        context: &RequestContext,
    ) -> Result<WireRequest> {
        let input_schema = operation.input().ok_or_else(|| {
            CodecError::SchemaMisuse("operation schema has no input struct".to_string())
        })?;
        // The whole input is a non-member write, so the router delegates
        // straight to the document codec. Going through it anyway keeps
        // every protocol on the same codec path.
        let mut router = BindingSerializer::new(self.codec.serializer(), CodecSettings::new());
        router.write(&input_schema, input)?;
        let mut request = WireRequest::new(::http::Method::POST);
        request.body = Body::Bytes(router.flush()?);
        request.set_header("content-type", self.codec.media_type().to_string());
        debug!(
            operation = %context.operation_name,
            "serialized rpc request"
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
        let body = response.body.collect().await?;
        let value = if body.is_empty() {
            Value::Map(Default::default())
        } else {
            let router = BindingDeserializer::new(self.codec.deserializer(), CodecSettings::new());
            router.read(&output_schema, &body)?
        };
        debug!(
            operation = %context.operation_name,
            "deserialized rpc response"
        );
        Ok(value)
    }
}
