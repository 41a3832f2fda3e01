//! Schema-driven wire codec for generated service clients
//!
//! A runtime layer that turns schema-described operation inputs into wire
//! requests and wire responses back into outputs, without knowing any
//! concrete document format.
//!
//! # Overview
//!
//! Generated clients hand this crate three things: immutable operation
//! schemas, schemaless runtime values and a pluggable document codec. The
//! crate owns everything in between:
//!
//! - **Binding placement**: each input member lands in its trait-declared
//!   location (path label, header, query, payload, body)
//! - **String shape codec**: quoting, comma splitting, base64 blobs and
//!   idempotency-token auto-fill for non-body locations
//! - **Timestamp formats**: epoch-seconds, RFC 3339 and RFC 7231 with
//!   two-tier format resolution
//! - **Event streams**: frame-level mapping of tagged union values,
//!   including synthetic initial-request/initial-response frames
//!
//! # Modules
//!
//! - [`schema`] - immutable shape model, normalized views, bindings
//! - [`timestamp`] - the three wire timestamp formats
//! - [`codec`] - runtime values, settings, string codec, binding router
//! - [`protocol`] - HTTP binding and RPC client protocols
//! - [`event`] - event-stream framer and marshaller boundary
//!
//! # Quick Start
//!
//! ```ignore
//! use shapewire::protocol::{ClientProtocol, HttpBindingProtocol, RequestContext};
//! use shapewire::schema::NormalizedSchema;
//!
//! let protocol = HttpBindingProtocol::new(codec, error_handler);
//! let request = protocol
//!     .serialize_request(&operation, &input, &RequestContext::new("GetItem"))
//!     .await?;
//! ```

pub mod codec;
pub mod error;
pub mod event;
pub mod protocol;
pub mod schema;
pub mod timestamp;

// Re-export commonly used types at crate root
pub use codec::{Codec, CodecSettings, ShapeDeserializer, ShapeSerializer, Value};
pub use error::{CodecError, Result};
pub use event::{DecodedEvent, Event, EventHeaderValue, EventMarshaller, EventMessage, EventStreamFramer};
pub use protocol::{
    Body, ClientProtocol, ErrorHandler, RequestContext, ResponseMetadata, WireRequest,
    WireResponse,
};
pub use protocol::http::HttpBindingProtocol;
pub use protocol::rpc::RpcProtocol;
pub use schema::{Binding, Member, NormalizedSchema, Schema, SchemaRef, SchemaTraits, SimpleType};
pub use timestamp::{Timestamp, TimestampFormat};
