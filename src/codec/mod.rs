//! Codec boundary: runtime values, settings and the document-codec contract.
//!
//! The core never implements a concrete document wire format. It drives any
//! body encoder/decoder through the narrow [`ShapeSerializer`] /
//! [`ShapeDeserializer`] contract and only handles the string-located
//! members itself (see [`string`] and [`binding`]).
//!
//! # Value Model
//!
//! [`Value`] is the schemaless runtime tree both protocols read and build:
//! generated code lowers its typed structures into it before serialization
//! and lifts it back after deserialization.
//!
//! # Modules
//!
//! - [`string`] - string shape serializer/deserializer for header, label
//!   and query locations
//! - [`binding`] - the router dispatching member values to the string codec
//!   or the injected document codec

pub mod binding;
pub mod string;

use crate::error::Result;
use crate::schema::{Binding, NormalizedSchema};
use crate::timestamp::{Timestamp, TimestampFormat};
use bytes::Bytes;
use std::collections::BTreeMap;

/// A schemaless runtime value.
///
/// Struct and union values are maps from member name to value; a union
/// value has exactly one entry. Absence of a member is expressed by the key
/// missing from the map, distinct from an explicit [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integral number.
    Integer(i64),
    /// Arbitrary-precision integer.
    BigInteger(i128),
    /// Floating-point number.
    Float(f64),
    /// Arbitrary-precision decimal, kept as text.
    BigDecimal(String),
    /// UTF-8 text.
    String(String),
    /// Opaque bytes.
    Blob(Bytes),
    /// Point in time.
    Timestamp(Timestamp),
    /// Ordered collection.
    List(Vec<Value>),
    /// Struct, union, map or document object value.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Convenience constructor for string values.
    #[must_use]
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    /// Borrow the text of a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the entries of a map/struct value.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Whether this is the explicit null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

/// Settings shared by the string codec and the protocols.
///
/// Built with the usual chained setters:
///
/// ```
/// use shapewire::codec::CodecSettings;
/// use shapewire::timestamp::TimestampFormat;
///
/// let settings = CodecSettings::new()
///     .with_http_bindings(true)
///     .with_default_timestamp_format(TimestampFormat::EpochSeconds);
/// ```
#[derive(Debug, Clone)]
pub struct CodecSettings {
    /// Honor explicit timestamp-format sentinels on schemas.
    pub honor_timestamp_format_traits: bool,
    /// Infer timestamp formats from HTTP binding locations.
    pub http_bindings: bool,
    /// Fallback timestamp format when neither trait nor binding decides.
    pub default_timestamp_format: TimestampFormat,
}

impl Default for CodecSettings {
    fn default() -> Self {
        CodecSettings {
            honor_timestamp_format_traits: true,
            http_bindings: false,
            default_timestamp_format: TimestampFormat::EpochSeconds,
        }
    }
}

impl CodecSettings {
    /// Default settings: trait formats honored, no HTTP binding inference,
    /// epoch-seconds fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable HTTP-binding-driven timestamp format inference.
    #[must_use]
    pub fn with_http_bindings(mut self, enabled: bool) -> Self {
        self.http_bindings = enabled;
        self
    }

    /// Honor or ignore trait-declared timestamp formats.
    #[must_use]
    pub fn with_timestamp_format_traits(mut self, honored: bool) -> Self {
        self.honor_timestamp_format_traits = honored;
        self
    }

    /// Set the fallback timestamp format.
    #[must_use]
    pub fn with_default_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.default_timestamp_format = format;
        self
    }

    /// Resolve the timestamp format for a schema.
    ///
    /// Two-tier resolution: an explicit trait sentinel wins when honored;
    /// otherwise, in HTTP-binding mode, header locations imply `http-date`
    /// and query/label locations imply `date-time` (their historical
    /// conventions); everything else falls back to the configured default.
    #[must_use]
    pub fn timestamp_format_for(&self, schema: &NormalizedSchema) -> TimestampFormat {
        let traits = schema.merged_traits();
        if self.honor_timestamp_format_traits {
            if let Some(format) = traits.timestamp_format {
                return format;
            }
        }
        if self.http_bindings {
            return match Binding::of(traits) {
                Binding::Header(_) | Binding::PrefixHeaders(_) => TimestampFormat::HttpDate,
                Binding::Query(_) | Binding::Label => TimestampFormat::DateTime,
                _ => self.default_timestamp_format,
            };
        }
        self.default_timestamp_format
    }
}

/// One in-flight encode against a document codec.
///
/// `write` stages exactly one value; `flush` returns the encoded bytes and
/// clears the staged state. Instances are not reentrant and must not be
/// shared across concurrent encodes; parallel encoding requires separate
/// instances from [`Codec::serializer`].
pub trait ShapeSerializer: Send {
    /// Stage an encoding of `value` against `schema`.
    fn write(&mut self, schema: &NormalizedSchema, value: &Value) -> Result<()>;

    /// Return and clear the staged encoding.
    fn flush(&mut self) -> Result<Bytes>;
}

/// Decoding side of the document codec contract.
pub trait ShapeDeserializer: Send {
    /// Decode `data` against `schema`.
    fn read(&self, schema: &NormalizedSchema, data: &[u8]) -> Result<Value>;
}

/// A pluggable document codec (JSON/XML/CBOR live behind this).
///
/// The core only ever creates serializer/deserializer instances and asks
/// for the codec's media type; it never inspects codec internals.
pub trait Codec: Send + Sync {
    /// A fresh, single-use serializer instance.
    fn serializer(&self) -> Box<dyn ShapeSerializer>;

    /// A fresh deserializer instance.
    fn deserializer(&self) -> Box<dyn ShapeDeserializer>;

    /// The codec's content type, e.g. `application/json`.
    fn media_type(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Member, Schema, SchemaTraits};

    fn member_with(traits: SchemaTraits) -> NormalizedSchema {
        let schema = Schema::structure(vec![
            Member::new("ts", Schema::timestamp()).with_traits(traits)
        ]);
        NormalizedSchema::of(schema).member("ts").unwrap()
    }

    #[test]
    fn test_trait_sentinel_wins_when_honored() {
        let settings = CodecSettings::new().with_http_bindings(true);
        let schema = member_with(
            SchemaTraits::new()
                .http_header("x-date")
                .timestamp_format(TimestampFormat::EpochSeconds),
        );
        assert_eq!(
            settings.timestamp_format_for(&schema),
            TimestampFormat::EpochSeconds
        );
    }

    #[test]
    fn test_header_binding_implies_http_date() {
        let settings = CodecSettings::new().with_http_bindings(true);
        let schema = member_with(SchemaTraits::new().http_header("x-date"));
        assert_eq!(
            settings.timestamp_format_for(&schema),
            TimestampFormat::HttpDate
        );
    }

    #[test]
    fn test_query_and_label_imply_date_time() {
        let settings = CodecSettings::new().with_http_bindings(true);
        for traits in [
            SchemaTraits::new().http_query("since"),
            SchemaTraits::new().http_label(),
        ] {
            let schema = member_with(traits);
            assert_eq!(
                settings.timestamp_format_for(&schema),
                TimestampFormat::DateTime
            );
        }
    }

    #[test]
    fn test_fallback_to_default_format() {
        let settings = CodecSettings::new();
        let schema = member_with(SchemaTraits::new().http_header("x-date"));
        // Binding inference disabled: default applies even for headers.
        assert_eq!(
            settings.timestamp_format_for(&schema),
            TimestampFormat::EpochSeconds
        );
    }

    #[test]
    fn test_ignored_trait_sentinel() {
        let settings = CodecSettings::new().with_timestamp_format_traits(false);
        let schema = member_with(
            SchemaTraits::new().timestamp_format(TimestampFormat::DateTime),
        );
        assert_eq!(
            settings.timestamp_format_for(&schema),
            TimestampFormat::EpochSeconds
        );
    }
}
