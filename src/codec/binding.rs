//! Binding router: string codec or document codec, decided per member.
//!
//! The protocols issue one structural body-write per request, but some of
//! a struct's members belong in headers, path labels or query parameters.
//! [`BindingSerializer`] and [`BindingDeserializer`] wrap the injected
//! document codec and intercept member-position schemas whose merged
//! traits carry one of those string-located bindings, delegating them to
//! the string codec instead. Everything else passes straight through, so
//! the protocol layer never needs per-member codec selection logic.

use crate::codec::string::{StringDeserializer, StringSerializer};
use crate::codec::{CodecSettings, ShapeDeserializer, ShapeSerializer, Value};
use crate::error::Result;
use crate::schema::{Binding, NormalizedSchema};
use bytes::Bytes;

fn routes_to_string(schema: &NormalizedSchema) -> bool {
    schema.is_member() && Binding::of(schema.merged_traits()).is_string_bound()
}

/// Serializer routing each write to the string codec or the document codec.
///
/// A string-bound write is held until `flush`; document writes stage inside
/// the wrapped codec. Like every serializer here, one staged value at a
/// time.
pub struct BindingSerializer {
    document: Box<dyn ShapeSerializer>,
    strings: StringSerializer,
    staged_string: Option<String>,
}

impl BindingSerializer {
    /// Wrap a document serializer.
    #[must_use]
    pub fn new(document: Box<dyn ShapeSerializer>, settings: CodecSettings) -> Self {
        BindingSerializer {
            document,
            strings: StringSerializer::new(settings),
            staged_string: None,
        }
    }
}

impl ShapeSerializer for BindingSerializer {
    fn write(&mut self, schema: &NormalizedSchema, value: &Value) -> Result<()> {
        if routes_to_string(schema) {
            self.strings.write(schema, value)?;
            self.staged_string = Some(self.strings.flush());
            Ok(())
        } else {
            self.document.write(schema, value)
        }
    }

    fn flush(&mut self) -> Result<Bytes> {
        if let Some(text) = self.staged_string.take() {
            return Ok(Bytes::from(text));
        }
        self.document.flush()
    }
}

/// Deserializer counterpart of [`BindingSerializer`].
pub struct BindingDeserializer {
    document: Box<dyn ShapeDeserializer>,
    strings: StringDeserializer,
}

impl BindingDeserializer {
    /// Wrap a document deserializer.
    #[must_use]
    pub fn new(document: Box<dyn ShapeDeserializer>, settings: CodecSettings) -> Self {
        BindingDeserializer {
            document,
            strings: StringDeserializer::new(settings),
        }
    }
}

impl ShapeDeserializer for BindingDeserializer {
    fn read(&self, schema: &NormalizedSchema, data: &[u8]) -> Result<Value> {
        if routes_to_string(schema) {
            let text = std::str::from_utf8(data)?;
            self.strings.read(schema, text)
        } else {
            self.document.read(schema, data)
        }
    }
}
