//! Event-stream framing over a pluggable wire marshaller.
//!
//! An application event stream is a sequence of tagged union values. The
//! framer maps each value to an [`EventMessage`] (typed frame headers plus
//! a body) and back; the [`EventMarshaller`] collaborator owns the
//! physical length-prefixed encoding and delivery.
//!
//! Frame headers carried on every event: `:event-type` (the active variant
//! name), `:message-type` = `"event"` and `:content-type`. Variant members
//! tagged `eventHeader` travel as their own typed frame headers; a member
//! tagged `eventPayload` becomes the whole body with a content type
//! inferred from its shape; everything else is document-encoded together.
//!
//! A synthetic `initial-request` frame may precede the sequence on the way
//! out. On the way in, an `initial-response` first frame is captured into
//! a caller-supplied container at most once and never reaches the
//! application-visible sequence.

use crate::codec::{Codec, Value};
use crate::error::{CodecError, Result};
use crate::protocol::ByteStream;
use crate::schema::NormalizedSchema;
use crate::timestamp::Timestamp;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Frame header name carrying the variant tag.
pub const EVENT_TYPE: &str = ":event-type";
/// Frame header name carrying the message kind.
pub const MESSAGE_TYPE: &str = ":message-type";
/// Frame header name carrying the body content type.
pub const CONTENT_TYPE: &str = ":content-type";

/// Variant tag of the synthetic request-side frame.
pub const INITIAL_REQUEST: &str = "initial-request";
/// Variant tag of the synthetic response-side frame.
pub const INITIAL_RESPONSE: &str = "initial-response";

/// A typed event frame header value.
#[derive(Debug, Clone, PartialEq)]
pub enum EventHeaderValue {
    /// Boolean header.
    Bool(bool),
    /// 32-bit integer header. Decoded when a marshaller delivers one; the
    /// framer itself emits [`EventHeaderValue::Long`] for integral members.
    Integer(i32),
    /// 64-bit integer header.
    Long(i64),
    /// Text header.
    String(String),
    /// Point-in-time header.
    Timestamp(Timestamp),
    /// Opaque binary header.
    Binary(Bytes),
    /// UUID header. Decoded only; the framer never produces one.
    Uuid(Uuid),
}

impl EventHeaderValue {
    /// Lift a frame header into the runtime value model.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            EventHeaderValue::Bool(b) => Value::Bool(*b),
            EventHeaderValue::Integer(n) => Value::Integer(i64::from(*n)),
            EventHeaderValue::Long(n) => Value::Integer(*n),
            EventHeaderValue::String(s) => Value::String(s.clone()),
            EventHeaderValue::Timestamp(ts) => Value::Timestamp(*ts),
            EventHeaderValue::Binary(b) => Value::Blob(b.clone()),
            EventHeaderValue::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

/// One wire frame: typed headers plus body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    /// Frame headers.
    pub headers: BTreeMap<String, EventHeaderValue>,
    /// Frame body.
    pub body: Bytes,
}

impl EventMessage {
    /// The `:event-type` header, when present and a string.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        match self.headers.get(EVENT_TYPE) {
            Some(EventHeaderValue::String(s)) => Some(s),
            _ => None,
        }
    }
}

/// An outgoing application event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A declared union variant: its name and struct value.
    Variant {
        /// Active variant name.
        name: String,
        /// The variant's struct value.
        value: Value,
    },
    /// A forward-compatible variant unknown to the schema; the literal tag
    /// still travels as `:event-type`.
    Unknown {
        /// Literal variant tag.
        name: String,
        /// Generic value, document-encoded as the body.
        value: Value,
    },
}

/// An incoming application event.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// A recognized union variant.
    Variant {
        /// Active variant name.
        name: String,
        /// The decoded struct value.
        value: Value,
    },
    /// An unrecognized variant, surfaced as the raw frame.
    Unknown(EventMessage),
}

/// Physical frame encoding and delivery boundary.
///
/// The marshaller owns the length-prefixed binary layout; the framer only
/// produces and consumes [`EventMessage`] values.
pub trait EventMarshaller: Send + Sync {
    /// Encode a frame sequence into a body stream.
    fn serialize(&self, frames: BoxStream<'static, Result<EventMessage>>) -> ByteStream;

    /// Decode a body stream into a frame sequence.
    fn deserialize(&self, body: ByteStream) -> BoxStream<'static, Result<EventMessage>>;
}

/// Maps application events to frames and back.
#[derive(Clone)]
pub struct EventStreamFramer {
    codec: Arc<dyn Codec>,
    content_type: String,
}

impl EventStreamFramer {
    /// Create a framer over a document codec.
    ///
    /// The default frame content type is the codec's media type.
    #[must_use]
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        let content_type = codec.media_type().to_string();
        EventStreamFramer {
            codec,
            content_type,
        }
    }

    /// Override the default frame content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Frame an outgoing event sequence.
    ///
    /// `request_schema` is the whole operation input struct; its streaming
    /// union member defines the variant set. When `initial_request` is
    /// supplied it is emitted first as a synthetic `initial-request` frame
    /// encoded against the whole input struct. Frames are produced lazily,
    /// one per pull, preserving input order.
    pub fn serialize_event_stream(
        &self,
        request_schema: &NormalizedSchema,
        events: BoxStream<'static, Result<Event>>,
        initial_request: Option<Value>,
    ) -> Result<BoxStream<'static, Result<EventMessage>>> {
        let stream_member = request_schema.event_stream_member().ok_or_else(|| {
            CodecError::SchemaMisuse(
                "input struct has no streaming union member".to_string(),
            )
        })?;
        let first = match initial_request {
            Some(value) => {
                let mut serializer = self.codec.serializer();
                serializer.write(request_schema, &value)?;
                Some(EventMessage {
                    headers: self.base_headers(INITIAL_REQUEST, &self.content_type),
                    body: serializer.flush()?,
                })
            }
            None => None,
        };
        let framer = self.clone();
        let frames = events
            .map(move |event| event.and_then(|event| framer.encode_event(&stream_member, event)));
        Ok(match first {
            Some(frame) => stream::iter(vec![Ok(frame)]).chain(frames).boxed(),
            None => frames.boxed(),
        })
    }

    /// Decode an incoming frame sequence.
    ///
    /// `response_schema` is the whole operation output struct. If the very
    /// first frame is tagged `initial-response`, its body is decoded
    /// against the output struct, the streaming member stripped, and the
    /// rest stored into `initial_response` (at most once); that frame is
    /// never forwarded. Unrecognized variants surface as
    /// [`DecodedEvent::Unknown`] rather than failing the stream.
    pub fn deserialize_event_stream(
        &self,
        response_schema: &NormalizedSchema,
        messages: BoxStream<'static, Result<EventMessage>>,
        initial_response: Option<Arc<Mutex<Option<Value>>>>,
    ) -> Result<BoxStream<'static, Result<DecodedEvent>>> {
        let stream_member = response_schema.event_stream_member().ok_or_else(|| {
            CodecError::SchemaMisuse(
                "output struct has no streaming union member".to_string(),
            )
        })?;
        let framer = self.clone();
        let response_schema = response_schema.clone();
        let stream = stream::unfold(
            (messages, true),
            move |(mut messages, first)| {
                let framer = framer.clone();
                let response_schema = response_schema.clone();
                let stream_member = stream_member.clone();
                let container = initial_response.clone();
                async move {
                    let mut first = first;
                    loop {
                        let frame = match messages.next().await {
                            None => return None,
                            Some(Err(err)) => return Some((Err(err), (messages, false))),
                            Some(Ok(frame)) => frame,
                        };
                        if first {
                            first = false;
                            if frame.event_type() == Some(INITIAL_RESPONSE) {
                                if let Err(err) = framer.capture_initial_response(
                                    &response_schema,
                                    &stream_member,
                                    &frame,
                                    container.as_ref(),
                                ) {
                                    return Some((Err(err), (messages, false)));
                                }
                                continue;
                            }
                        }
                        let decoded = framer.decode_event(&stream_member, frame);
                        return Some((decoded, (messages, first)));
                    }
                }
            },
        );
        Ok(stream.boxed())
    }

    fn base_headers(
        &self,
        event_type: &str,
        content_type: &str,
    ) -> BTreeMap<String, EventHeaderValue> {
        let mut headers = BTreeMap::new();
        headers.insert(
            EVENT_TYPE.to_string(),
            EventHeaderValue::String(event_type.to_string()),
        );
        headers.insert(
            MESSAGE_TYPE.to_string(),
            EventHeaderValue::String("event".to_string()),
        );
        headers.insert(
            CONTENT_TYPE.to_string(),
            EventHeaderValue::String(content_type.to_string()),
        );
        headers
    }

    fn encode_event(&self, stream_member: &NormalizedSchema, event: Event) -> Result<EventMessage> {
        let (name, value, variant) = match event {
            Event::Unknown { name, value } => (name, value, None),
            Event::Variant { name, value } => {
                let variant = stream_member.member(&name);
                (name, value, variant)
            }
        };
        let Some(variant) = variant else {
            // Unrecognized tag: document-encode the value generically.
            let schema = NormalizedSchema::of(crate::schema::Schema::document());
            let mut serializer = self.codec.serializer();
            serializer.write(&schema, &value)?;
            return Ok(EventMessage {
                headers: self.base_headers(&name, &self.content_type),
                body: serializer.flush()?,
            });
        };
        if !variant.is_struct() {
            return Err(CodecError::SchemaMisuse(format!(
                "event variant {name:?} must target a struct"
            )));
        }
        let fields = value.as_map().ok_or_else(|| {
            CodecError::SchemaMisuse(format!("event variant {name:?} value must be a struct"))
        })?;

        let mut payload: Option<(NormalizedSchema, Value)> = None;
        let mut rest: BTreeMap<String, Value> = BTreeMap::new();
        let mut headers = self.base_headers(&name, &self.content_type);
        for member in variant.struct_members() {
            let member_name = member.member_name().unwrap_or_default().to_string();
            let Some(member_value) = fields.get(&member_name) else {
                continue;
            };
            let traits = member.merged_traits();
            if traits.event_payload {
                payload = Some((member.clone(), member_value.clone()));
            } else if traits.event_header {
                headers.insert(member_name, frame_header_value(&member, member_value)?);
            } else {
                rest.insert(member_name, member_value.clone());
            }
        }

        let body = match payload {
            Some((member, Value::Blob(bytes))) if member.is_blob() => {
                headers.insert(
                    CONTENT_TYPE.to_string(),
                    EventHeaderValue::String("application/octet-stream".to_string()),
                );
                bytes
            }
            Some((member, Value::String(text))) if member.is_string() => {
                headers.insert(
                    CONTENT_TYPE.to_string(),
                    EventHeaderValue::String("text/plain".to_string()),
                );
                Bytes::from(text)
            }
            Some((member, member_value)) => {
                let mut serializer = self.codec.serializer();
                serializer.write(&member, &member_value)?;
                serializer.flush()?
            }
            None => {
                let mut serializer = self.codec.serializer();
                serializer.write(&variant, &Value::Map(rest))?;
                serializer.flush()?
            }
        };
        debug!(event_type = %name, body_len = body.len(), "framed event");
        Ok(EventMessage { headers, body })
    }

    fn decode_event(
        &self,
        stream_member: &NormalizedSchema,
        frame: EventMessage,
    ) -> Result<DecodedEvent> {
        let Some(name) = frame.event_type().map(str::to_string) else {
            return Err(CodecError::EventStream(
                "frame is missing the :event-type header".to_string(),
            ));
        };
        let Some(variant) = stream_member.member(&name) else {
            return Ok(DecodedEvent::Unknown(frame));
        };
        let payload_member = variant
            .struct_members()
            .find(|m| m.merged_traits().event_payload);

        let mut fields: BTreeMap<String, Value> = match &payload_member {
            Some(member) => {
                let member_name = member.member_name().unwrap_or_default().to_string();
                let value = if member.is_blob() {
                    Value::Blob(frame.body.clone())
                } else if member.is_string() {
                    Value::String(std::str::from_utf8(&frame.body)?.to_string())
                } else {
                    self.codec.deserializer().read(member, &frame.body)?
                };
                let mut fields = BTreeMap::new();
                fields.insert(member_name, value);
                fields
            }
            None if frame.body.is_empty() => BTreeMap::new(),
            None => {
                let decoded = self.codec.deserializer().read(&variant, &frame.body)?;
                match decoded {
                    Value::Map(map) => map,
                    other => {
                        return Err(CodecError::WireParse(format!(
                            "event {name:?} body decoded to a non-struct value: {other:?}"
                        )))
                    }
                }
            }
        };
        for member in variant.struct_members() {
            if !member.merged_traits().event_header {
                continue;
            }
            let member_name = member.member_name().unwrap_or_default();
            if let Some(header) = frame.headers.get(member_name) {
                fields.insert(member_name.to_string(), header.to_value());
            }
        }
        Ok(DecodedEvent::Variant {
            name,
            value: Value::Map(fields),
        })
    }

    fn capture_initial_response(
        &self,
        response_schema: &NormalizedSchema,
        stream_member: &NormalizedSchema,
        frame: &EventMessage,
        container: Option<&Arc<Mutex<Option<Value>>>>,
    ) -> Result<()> {
        let decoded = if frame.body.is_empty() {
            Value::Map(BTreeMap::new())
        } else {
            self.codec.deserializer().read(response_schema, &frame.body)?
        };
        let mut fields = match decoded {
            Value::Map(map) => map,
            other => {
                return Err(CodecError::WireParse(format!(
                    "initial-response body decoded to a non-struct value: {other:?}"
                )))
            }
        };
        if let Some(name) = stream_member.member_name() {
            fields.remove(name);
        }
        if let Some(container) = container {
            if let Ok(mut slot) = container.lock() {
                *slot = Some(Value::Map(fields));
            }
        }
        Ok(())
    }
}

// Convert a struct member value into a typed frame header.
fn frame_header_value(member: &NormalizedSchema, value: &Value) -> Result<EventHeaderValue> {
    match value {
        Value::Bool(b) if member.is_boolean() => Ok(EventHeaderValue::Bool(*b)),
        Value::Integer(n) if member.is_integer() => Ok(EventHeaderValue::Long(*n)),
        Value::String(s) if member.is_string() => Ok(EventHeaderValue::String(s.clone())),
        Value::Timestamp(ts) if member.is_timestamp() => Ok(EventHeaderValue::Timestamp(*ts)),
        Value::Blob(b) if member.is_blob() => Ok(EventHeaderValue::Binary(b.clone())),
        other => Err(CodecError::SchemaMisuse(format!(
            "member {:?} cannot travel as an event header: {other:?}",
            member.member_name().unwrap_or_default()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ShapeDeserializer, ShapeSerializer};
    use crate::schema::{Member, Schema, SchemaTraits};

    // JSON test double for the document codec boundary.
    struct JsonCodec;

    fn to_json(value: &Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(n) => serde_json::Value::from(*n),
            Value::BigInteger(n) => serde_json::Value::String(n.to_string()),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::BigDecimal(s) => serde_json::Value::String(s.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Blob(b) => serde_json::Value::String(format!("{} bytes", b.len())),
            Value::Timestamp(ts) => serde_json::Value::from(ts.as_secs_f64()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
            ),
        }
    }

    fn from_json(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, from_json(v))).collect(),
            ),
        }
    }

    struct JsonSerializer {
        staged: Option<Bytes>,
    }

    impl ShapeSerializer for JsonSerializer {
        fn write(&mut self, _schema: &NormalizedSchema, value: &Value) -> Result<()> {
            self.staged = Some(Bytes::from(serde_json::to_vec(&to_json(value))?));
            Ok(())
        }

        fn flush(&mut self) -> Result<Bytes> {
            Ok(self.staged.take().unwrap_or_default())
        }
    }

    struct JsonDeserializer;

    impl ShapeDeserializer for JsonDeserializer {
        fn read(&self, _schema: &NormalizedSchema, data: &[u8]) -> Result<Value> {
            Ok(from_json(serde_json::from_slice(data)?))
        }
    }

    impl Codec for JsonCodec {
        fn serializer(&self) -> Box<dyn ShapeSerializer> {
            Box::new(JsonSerializer { staged: None })
        }

        fn deserializer(&self) -> Box<dyn ShapeDeserializer> {
            Box::new(JsonDeserializer)
        }

        fn media_type(&self) -> &str {
            "application/json"
        }
    }

    fn framer() -> EventStreamFramer {
        EventStreamFramer::new(Arc::new(JsonCodec))
    }

    fn stream_schema() -> Schema {
        // Input/output struct with a streaming union of three variants.
        let union = Schema::union(vec![
            Member::new("A", Schema::structure(vec![Member::new("n", Schema::integer())])),
            Member::new(
                "B",
                Schema::structure(vec![
                    Member::new("data", Schema::blob())
                        .with_traits(SchemaTraits::new().event_payload()),
                    Member::new("seq", Schema::integer())
                        .with_traits(SchemaTraits::new().event_header()),
                ]),
            ),
            Member::new("C", Schema::structure(vec![Member::new("note", Schema::string())])),
        ]);
        Schema::structure(vec![
            Member::new("session", Schema::string()),
            Member::new("stream", union)
                .with_traits(SchemaTraits::new().streaming().http_payload()),
        ])
    }

    fn variant(name: &str, entries: Vec<(&str, Value)>) -> Event {
        Event::Variant {
            name: name.to_string(),
            value: Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
        }
    }

    #[tokio::test]
    async fn test_event_type_headers_follow_input_order() {
        let schema = NormalizedSchema::of(stream_schema());
        let events: Vec<Result<Event>> = vec![
            Ok(variant("A", vec![("n", Value::Integer(1))])),
            Ok(variant("B", vec![("data", Value::Blob(Bytes::from_static(b"x")))])),
            Ok(variant("C", vec![("note", Value::string("hi"))])),
            Ok(Event::Unknown {
                name: "D".to_string(),
                value: Value::Map(BTreeMap::new()),
            }),
        ];
        let frames: Vec<_> = framer()
            .serialize_event_stream(&schema, stream::iter(events).boxed(), None)
            .unwrap()
            .collect()
            .await;
        let tags: Vec<_> = frames
            .iter()
            .map(|f| f.as_ref().unwrap().event_type().unwrap().to_string())
            .collect();
        assert_eq!(tags, ["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_payload_member_sets_body_and_content_type() {
        let schema = NormalizedSchema::of(stream_schema());
        let events = vec![Ok(variant(
            "B",
            vec![
                ("data", Value::Blob(Bytes::from_static(b"raw-bytes"))),
                ("seq", Value::Integer(7)),
            ],
        ))];
        let frames: Vec<_> = framer()
            .serialize_event_stream(&schema, stream::iter(events).boxed(), None)
            .unwrap()
            .collect()
            .await;
        let frame = frames[0].as_ref().unwrap();
        assert_eq!(frame.body, Bytes::from_static(b"raw-bytes"));
        assert_eq!(
            frame.headers.get(CONTENT_TYPE),
            Some(&EventHeaderValue::String(
                "application/octet-stream".to_string()
            ))
        );
        assert_eq!(frame.headers.get("seq"), Some(&EventHeaderValue::Long(7)));
        assert_eq!(
            frame.headers.get(MESSAGE_TYPE),
            Some(&EventHeaderValue::String("event".to_string()))
        );
    }

    #[tokio::test]
    async fn test_initial_request_frame_is_first() {
        let schema = NormalizedSchema::of(stream_schema());
        let events = vec![Ok(variant("A", vec![("n", Value::Integer(1))]))];
        let mut initial = BTreeMap::new();
        initial.insert("session".to_string(), Value::string("s-1"));
        let frames: Vec<_> = framer()
            .serialize_event_stream(
                &schema,
                stream::iter(events).boxed(),
                Some(Value::Map(initial)),
            )
            .unwrap()
            .collect()
            .await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref().unwrap().event_type(), Some(INITIAL_REQUEST));
        assert_eq!(frames[1].as_ref().unwrap().event_type(), Some("A"));
    }

    #[tokio::test]
    async fn test_initial_response_captured_and_hidden() {
        let schema = NormalizedSchema::of(stream_schema());
        let frames = vec![
            Ok(EventMessage {
                headers: framer().base_headers(INITIAL_RESPONSE, "application/json"),
                body: Bytes::from_static(b"{\"session\":\"s-9\",\"stream\":{}}"),
            }),
            Ok(EventMessage {
                headers: framer().base_headers("C", "application/json"),
                body: Bytes::from_static(b"{\"note\":\"hi\"}"),
            }),
        ];
        let container = Arc::new(Mutex::new(None));
        let decoded: Vec<_> = framer()
            .deserialize_event_stream(
                &schema,
                stream::iter(frames).boxed(),
                Some(container.clone()),
            )
            .unwrap()
            .collect()
            .await;
        assert_eq!(decoded.len(), 1);
        assert!(matches!(
            decoded[0].as_ref().unwrap(),
            DecodedEvent::Variant { name, .. } if name == "C"
        ));
        let captured = container.lock().unwrap().clone().unwrap();
        let fields = captured.as_map().unwrap().clone();
        assert_eq!(fields.get("session"), Some(&Value::string("s-9")));
        // The streaming member never reaches the container.
        assert!(!fields.contains_key("stream"));
    }

    #[tokio::test]
    async fn test_initial_response_not_first_is_forwarded_unknown() {
        let schema = NormalizedSchema::of(stream_schema());
        let frames = vec![
            Ok(EventMessage {
                headers: framer().base_headers("C", "application/json"),
                body: Bytes::from_static(b"{\"note\":\"hi\"}"),
            }),
            Ok(EventMessage {
                headers: framer().base_headers(INITIAL_RESPONSE, "application/json"),
                body: Bytes::from_static(b"{}"),
            }),
        ];
        let container = Arc::new(Mutex::new(None));
        let decoded: Vec<_> = framer()
            .deserialize_event_stream(
                &schema,
                stream::iter(frames).boxed(),
                Some(container.clone()),
            )
            .unwrap()
            .collect()
            .await;
        // A late initial-response is not special: it has no matching union
        // member, so it surfaces as unknown.
        assert_eq!(decoded.len(), 2);
        assert!(matches!(
            decoded[1].as_ref().unwrap(),
            DecodedEvent::Unknown(_)
        ));
        assert!(container.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unrecognized_variant_surfaces_raw_frame() {
        let schema = NormalizedSchema::of(stream_schema());
        let frame = EventMessage {
            headers: framer().base_headers("Z", "application/json"),
            body: Bytes::from_static(b"{}"),
        };
        let decoded: Vec<_> = framer()
            .deserialize_event_stream(
                &schema,
                stream::iter(vec![Ok(frame.clone())]).boxed(),
                None,
            )
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            decoded[0].as_ref().unwrap(),
            &DecodedEvent::Unknown(frame)
        );
    }

    #[tokio::test]
    async fn test_event_header_members_rejoin_the_value() {
        let schema = NormalizedSchema::of(stream_schema());
        let mut headers = framer().base_headers("B", "application/octet-stream");
        headers.insert("seq".to_string(), EventHeaderValue::Long(41));
        let frame = EventMessage {
            headers,
            body: Bytes::from_static(b"chunk"),
        };
        let decoded: Vec<_> = framer()
            .deserialize_event_stream(&schema, stream::iter(vec![Ok(frame)]).boxed(), None)
            .unwrap()
            .collect()
            .await;
        let DecodedEvent::Variant { name, value } = decoded[0].as_ref().unwrap() else {
            panic!("expected a recognized variant");
        };
        assert_eq!(name, "B");
        let fields = value.as_map().unwrap();
        assert_eq!(fields.get("data"), Some(&Value::Blob(Bytes::from_static(b"chunk"))));
        assert_eq!(fields.get("seq"), Some(&Value::Integer(41)));
    }
}
