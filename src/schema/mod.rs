//! Static schema model for generated operation shapes.
//!
//! A [`Schema`] is an immutable description of a shape's wire type and
//! traits, constructed once at generation time and shared for the process
//! lifetime. Nothing in the codec mutates a schema; everything above this
//! module only reads them, usually through the [`NormalizedSchema`] view.
//!
//! # Shape Kinds
//!
//! | Variant | Wire meaning |
//! |---------|--------------|
//! | [`Schema::Unit`] | no value |
//! | [`Schema::Simple`] | scalar/blob/document leaf |
//! | [`Schema::List`] / [`Schema::Map`] | collections with element schemas |
//! | [`Schema::Struct`] / [`Schema::Union`] | ordered named members |
//! | [`Schema::Operation`] | input/output pair plus HTTP traits |
//!
//! Members layer their own traits over the target shape's traits;
//! [`SchemaTraits::merged_over`] gives member traits precedence on conflict.
//!
//! # Recursive Shapes
//!
//! Self-referential shapes are expressed with [`SchemaRef::lazy`]: a
//! zero-argument thunk resolved on first use and memoized, so resolution is
//! idempotent and side-effect-free.
//!
//! # Examples
//!
//! ```
//! use shapewire::schema::{Schema, Member, SchemaTraits};
//!
//! let input = Schema::structure(vec![
//!     Member::new("id", Schema::string())
//!         .with_traits(SchemaTraits::new().http_label()),
//! ]);
//! ```

mod binding;
mod normalized;

pub use binding::Binding;
pub use normalized::NormalizedSchema;

use crate::timestamp::TimestampFormat;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Leaf shape kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleType {
    /// Boolean value.
    Boolean,
    /// UTF-8 text.
    String,
    /// Integral number (byte/short/integer/long on the wire).
    Integer,
    /// Floating-point number.
    Float,
    /// Arbitrary-precision integer.
    BigInteger,
    /// Arbitrary-precision decimal, carried as text in memory.
    BigDecimal,
    /// Opaque bytes, base64 text in string locations.
    Blob,
    /// Opaque bytes delivered as a live stream, never buffered by the codec.
    StreamingBlob,
    /// Schemaless document value.
    Document,
    /// Point in time; the wire format comes from traits or binding.
    Timestamp,
}

/// Whether an error shape is the caller's fault or the service's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFault {
    /// 4xx-class error.
    Client,
    /// 5xx-class error.
    Server,
}

/// The HTTP binding declared on an operation: method, URI template and
/// success status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBinding {
    /// Request method.
    pub method: http::Method,
    /// URI template with `{name}` / `{name+}` label placeholders.
    pub uri: String,
    /// Status code of a successful response.
    pub code: u16,
}

/// Named directives attached to a shape or a member position.
///
/// Member traits and target-shape traits are merged when a member is
/// normalized, member traits taking precedence on conflict. Unset fields
/// mean "not declared".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaTraits {
    /// Bind the member into a URI template label.
    pub http_label: bool,
    /// Bind the member to the named header.
    pub http_header: Option<String>,
    /// Bind the member to the named query parameter.
    pub http_query: Option<String>,
    /// Bind a map member to one query entry per key.
    pub http_query_params: bool,
    /// Bind a map member to all headers sharing the prefix.
    pub http_prefix_headers: Option<String>,
    /// The member is the sole explicit body payload.
    pub http_payload: bool,
    /// The member carries the literal HTTP status code.
    pub http_response_code: bool,
    /// Auto-fill the member with a random UUID when absent.
    pub idempotency_token: bool,
    /// The collection keeps explicit null entries on the wire.
    pub sparse: bool,
    /// The shape is delivered as a stream rather than a buffered value.
    pub streaming: bool,
    /// Declared media type of a string shape.
    pub media_type: Option<String>,
    /// Host-prefix pattern with `{name}` tokens, declared on operations.
    pub host_prefix: Option<String>,
    /// Marks an error shape and its fault class.
    pub error_fault: Option<ErrorFault>,
    /// Explicit timestamp wire format; absence means binding-driven.
    pub timestamp_format: Option<TimestampFormat>,
    /// The member is an event's sole explicit frame payload.
    pub event_payload: bool,
    /// The member travels as a typed frame header rather than in the body.
    pub event_header: bool,
    /// HTTP method/URI/code, declared on operations.
    pub http: Option<HttpBinding>,
}

impl SchemaTraits {
    /// Empty trait set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `httpLabel`.
    #[must_use]
    pub fn http_label(mut self) -> Self {
        self.http_label = true;
        self
    }

    /// Declare `httpHeader: <name>`.
    #[must_use]
    pub fn http_header(mut self, name: impl Into<String>) -> Self {
        self.http_header = Some(name.into());
        self
    }

    /// Declare `httpQuery: <name>`.
    #[must_use]
    pub fn http_query(mut self, name: impl Into<String>) -> Self {
        self.http_query = Some(name.into());
        self
    }

    /// Declare `httpQueryParams`.
    #[must_use]
    pub fn http_query_params(mut self) -> Self {
        self.http_query_params = true;
        self
    }

    /// Declare `httpPrefixHeaders: <prefix>`.
    #[must_use]
    pub fn http_prefix_headers(mut self, prefix: impl Into<String>) -> Self {
        self.http_prefix_headers = Some(prefix.into());
        self
    }

    /// Declare `httpPayload`.
    #[must_use]
    pub fn http_payload(mut self) -> Self {
        self.http_payload = true;
        self
    }

    /// Declare `httpResponseCode`.
    #[must_use]
    pub fn http_response_code(mut self) -> Self {
        self.http_response_code = true;
        self
    }

    /// Declare `idempotencyToken`.
    #[must_use]
    pub fn idempotency_token(mut self) -> Self {
        self.idempotency_token = true;
        self
    }

    /// Declare `sparse`.
    #[must_use]
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// Declare the shape streaming.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Declare `mediaType`.
    #[must_use]
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Declare an `endpoint` host-prefix pattern.
    #[must_use]
    pub fn host_prefix(mut self, pattern: impl Into<String>) -> Self {
        self.host_prefix = Some(pattern.into());
        self
    }

    /// Declare the error fault class.
    #[must_use]
    pub fn error(mut self, fault: ErrorFault) -> Self {
        self.error_fault = Some(fault);
        self
    }

    /// Declare an explicit timestamp format sentinel.
    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = Some(format);
        self
    }

    /// Declare `eventPayload`.
    #[must_use]
    pub fn event_payload(mut self) -> Self {
        self.event_payload = true;
        self
    }

    /// Declare `eventHeader`.
    #[must_use]
    pub fn event_header(mut self) -> Self {
        self.event_header = true;
        self
    }

    /// Declare the operation's HTTP method, URI template and success code.
    #[must_use]
    pub fn http(mut self, method: http::Method, uri: impl Into<String>, code: u16) -> Self {
        self.http = Some(HttpBinding {
            method,
            uri: uri.into(),
            code,
        });
        self
    }

    /// Merge member traits over target traits, member values winning on
    /// conflict. Boolean directives are honored from either position.
    #[must_use]
    pub fn merged_over(&self, target: &SchemaTraits) -> SchemaTraits {
        SchemaTraits {
            http_label: self.http_label || target.http_label,
            http_header: self.http_header.clone().or_else(|| target.http_header.clone()),
            http_query: self.http_query.clone().or_else(|| target.http_query.clone()),
            http_query_params: self.http_query_params || target.http_query_params,
            http_prefix_headers: self
                .http_prefix_headers
                .clone()
                .or_else(|| target.http_prefix_headers.clone()),
            http_payload: self.http_payload || target.http_payload,
            http_response_code: self.http_response_code || target.http_response_code,
            idempotency_token: self.idempotency_token || target.idempotency_token,
            sparse: self.sparse || target.sparse,
            streaming: self.streaming || target.streaming,
            media_type: self.media_type.clone().or_else(|| target.media_type.clone()),
            host_prefix: self.host_prefix.clone().or_else(|| target.host_prefix.clone()),
            error_fault: self.error_fault.or(target.error_fault),
            timestamp_format: self.timestamp_format.or(target.timestamp_format),
            event_payload: self.event_payload || target.event_payload,
            event_header: self.event_header || target.event_header,
            http: self.http.clone().or_else(|| target.http.clone()),
        }
    }
}

/// A named member of a struct or union: a target schema plus
/// member-position traits layered over it.
#[derive(Debug, Clone)]
pub struct Member {
    /// Member name, the wire field name for document bodies.
    pub name: String,
    /// Target shape reference (possibly lazy for recursive shapes).
    pub target: SchemaRef,
    /// Traits attached at the member position.
    pub traits: SchemaTraits,
}

impl Member {
    /// Create a member with empty member-position traits.
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<SchemaRef>) -> Self {
        Member {
            name: name.into(),
            target: target.into(),
            traits: SchemaTraits::default(),
        }
    }

    /// Attach member-position traits.
    #[must_use]
    pub fn with_traits(mut self, traits: SchemaTraits) -> Self {
        self.traits = traits;
        self
    }
}

/// Static description of a shape's wire type and traits.
#[derive(Debug, Clone)]
pub enum Schema {
    /// The unit shape: no value.
    Unit,
    /// A leaf shape.
    Simple {
        /// Leaf kind.
        ty: SimpleType,
        /// Shape-level traits.
        traits: SchemaTraits,
    },
    /// An ordered collection of one element schema.
    List {
        /// Element schema.
        member: SchemaRef,
        /// Shape-level traits.
        traits: SchemaTraits,
    },
    /// A string-keyed collection.
    Map {
        /// Key schema (always string-like).
        key: SchemaRef,
        /// Value schema.
        value: SchemaRef,
        /// Shape-level traits.
        traits: SchemaTraits,
    },
    /// A product shape with ordered named members.
    Struct {
        /// Members, in declaration order.
        members: Vec<Member>,
        /// Shape-level traits.
        traits: SchemaTraits,
        /// Number of required members, used for struct validation.
        required: usize,
    },
    /// A sum shape: exactly one member is set at a time.
    Union {
        /// Variants, in declaration order.
        members: Vec<Member>,
        /// Shape-level traits.
        traits: SchemaTraits,
    },
    /// An operation: input and output shape references plus traits.
    Operation {
        /// Input struct reference.
        input: SchemaRef,
        /// Output struct reference.
        output: SchemaRef,
        /// Operation traits (`http`, `endpoint`, ...).
        traits: SchemaTraits,
    },
}

impl Schema {
    fn simple(ty: SimpleType) -> Schema {
        Schema::Simple {
            ty,
            traits: SchemaTraits::default(),
        }
    }

    /// String leaf.
    #[must_use]
    pub fn string() -> Schema {
        Schema::simple(SimpleType::String)
    }

    /// Boolean leaf.
    #[must_use]
    pub fn boolean() -> Schema {
        Schema::simple(SimpleType::Boolean)
    }

    /// Integer leaf.
    #[must_use]
    pub fn integer() -> Schema {
        Schema::simple(SimpleType::Integer)
    }

    /// Float leaf.
    #[must_use]
    pub fn float() -> Schema {
        Schema::simple(SimpleType::Float)
    }

    /// Big-integer leaf.
    #[must_use]
    pub fn big_integer() -> Schema {
        Schema::simple(SimpleType::BigInteger)
    }

    /// Big-decimal leaf.
    #[must_use]
    pub fn big_decimal() -> Schema {
        Schema::simple(SimpleType::BigDecimal)
    }

    /// Blob leaf.
    #[must_use]
    pub fn blob() -> Schema {
        Schema::simple(SimpleType::Blob)
    }

    /// Streaming blob leaf.
    #[must_use]
    pub fn streaming_blob() -> Schema {
        Schema::Simple {
            ty: SimpleType::StreamingBlob,
            traits: SchemaTraits::new().streaming(),
        }
    }

    /// Schemaless document leaf.
    #[must_use]
    pub fn document() -> Schema {
        Schema::simple(SimpleType::Document)
    }

    /// Timestamp leaf with no declared format.
    #[must_use]
    pub fn timestamp() -> Schema {
        Schema::simple(SimpleType::Timestamp)
    }

    /// Timestamp leaf with an explicit format sentinel.
    #[must_use]
    pub fn timestamp_format(format: TimestampFormat) -> Schema {
        Schema::Simple {
            ty: SimpleType::Timestamp,
            traits: SchemaTraits::new().timestamp_format(format),
        }
    }

    /// List of one element schema.
    #[must_use]
    pub fn list(member: impl Into<SchemaRef>) -> Schema {
        Schema::List {
            member: member.into(),
            traits: SchemaTraits::default(),
        }
    }

    /// String-keyed map.
    #[must_use]
    pub fn map(key: impl Into<SchemaRef>, value: impl Into<SchemaRef>) -> Schema {
        Schema::Map {
            key: key.into(),
            value: value.into(),
            traits: SchemaTraits::default(),
        }
    }

    /// Struct with members in declaration order and no required members.
    #[must_use]
    pub fn structure(members: Vec<Member>) -> Schema {
        Schema::Struct {
            members,
            traits: SchemaTraits::default(),
            required: 0,
        }
    }

    /// Union with variants in declaration order.
    #[must_use]
    pub fn union(members: Vec<Member>) -> Schema {
        Schema::Union {
            members,
            traits: SchemaTraits::default(),
        }
    }

    /// Operation over input and output shapes.
    #[must_use]
    pub fn operation(
        input: impl Into<SchemaRef>,
        output: impl Into<SchemaRef>,
        traits: SchemaTraits,
    ) -> Schema {
        Schema::Operation {
            input: input.into(),
            output: output.into(),
            traits,
        }
    }

    /// Replace the shape-level traits.
    #[must_use]
    pub fn with_traits(mut self, new: SchemaTraits) -> Schema {
        match &mut self {
            Schema::Unit => {}
            Schema::Simple { traits, .. }
            | Schema::List { traits, .. }
            | Schema::Map { traits, .. }
            | Schema::Struct { traits, .. }
            | Schema::Union { traits, .. }
            | Schema::Operation { traits, .. } => *traits = new,
        }
        self
    }

    /// Set the required-member count of a struct. No-op for other shapes.
    #[must_use]
    pub fn with_required(mut self, count: usize) -> Schema {
        if let Schema::Struct { required, .. } = &mut self {
            *required = count;
        }
        self
    }

    /// Shape-level traits.
    #[must_use]
    pub fn traits(&self) -> &SchemaTraits {
        static EMPTY: SchemaTraits = SchemaTraits {
            http_label: false,
            http_header: None,
            http_query: None,
            http_query_params: false,
            http_prefix_headers: None,
            http_payload: false,
            http_response_code: false,
            idempotency_token: false,
            sparse: false,
            streaming: false,
            media_type: None,
            host_prefix: None,
            error_fault: None,
            timestamp_format: None,
            event_payload: false,
            event_header: false,
            http: None,
        };
        match self {
            Schema::Unit => &EMPTY,
            Schema::Simple { traits, .. }
            | Schema::List { traits, .. }
            | Schema::Map { traits, .. }
            | Schema::Struct { traits, .. }
            | Schema::Union { traits, .. }
            | Schema::Operation { traits, .. } => traits,
        }
    }
}

/// A reference to a schema, either resolved or lazy.
///
/// Lazy references exist for recursive shapes: the thunk is invoked at most
/// once and the result memoized, so `resolve` is idempotent and
/// side-effect-free no matter how often a traversal revisits the reference.
#[derive(Clone)]
pub enum SchemaRef {
    /// An already-constructed schema.
    Ready(Arc<Schema>),
    /// A memoized zero-argument accessor.
    Lazy(Arc<LazySchema>),
}

/// Memoizing thunk behind [`SchemaRef::Lazy`].
pub struct LazySchema {
    thunk: Box<dyn Fn() -> Arc<Schema> + Send + Sync>,
    cell: OnceLock<Arc<Schema>>,
}

impl SchemaRef {
    /// Create a lazy reference from a zero-argument accessor.
    #[must_use]
    pub fn lazy<F>(thunk: F) -> SchemaRef
    where
        F: Fn() -> Arc<Schema> + Send + Sync + 'static,
    {
        SchemaRef::Lazy(Arc::new(LazySchema {
            thunk: Box::new(thunk),
            cell: OnceLock::new(),
        }))
    }

    /// Resolve to the underlying schema, memoizing lazy thunks.
    #[must_use]
    pub fn resolve(&self) -> Arc<Schema> {
        match self {
            SchemaRef::Ready(schema) => Arc::clone(schema),
            SchemaRef::Lazy(lazy) => {
                Arc::clone(lazy.cell.get_or_init(|| (lazy.thunk)()))
            }
        }
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRef::Ready(schema) => schema.fmt(f),
            SchemaRef::Lazy(lazy) => match lazy.cell.get() {
                Some(schema) => schema.fmt(f),
                None => f.write_str("<lazy schema>"),
            },
        }
    }
}

impl From<Schema> for SchemaRef {
    fn from(schema: Schema) -> Self {
        SchemaRef::Ready(Arc::new(schema))
    }
}

impl From<Arc<Schema>> for SchemaRef {
    fn from(schema: Arc<Schema>) -> Self {
        SchemaRef::Ready(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_traits_take_precedence() {
        let member = SchemaTraits::new().http_header("x-member");
        let target = SchemaTraits::new()
            .http_header("x-target")
            .media_type("application/json");
        let merged = member.merged_over(&target);
        assert_eq!(merged.http_header.as_deref(), Some("x-member"));
        assert_eq!(merged.media_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_lazy_resolution_is_memoized() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let lazy = SchemaRef::lazy(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Arc::new(Schema::string())
        });
        let first = lazy.resolve();
        let second = lazy.resolve();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recursive_schema_does_not_expand_eagerly() {
        // A list whose element is the list itself.
        static NODE: OnceLock<Arc<Schema>> = OnceLock::new();
        let node = NODE.get_or_init(|| {
            Arc::new(Schema::structure(vec![Member::new(
                "children",
                SchemaRef::lazy(|| {
                    Arc::new(Schema::list(SchemaRef::lazy(|| {
                        Arc::clone(NODE.get().expect("initialized"))
                    })))
                }),
            )]))
        });
        assert!(matches!(**node, Schema::Struct { .. }));
    }

    #[test]
    fn test_streaming_blob_carries_streaming_trait() {
        assert!(Schema::streaming_blob().traits().streaming);
    }
}
