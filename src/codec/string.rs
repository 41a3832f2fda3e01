//! String shape serializer/deserializer for non-body locations.
//!
//! Headers, path labels and query parameters carry single textual values;
//! this module converts one scalar or collection value to and from that
//! text. Lists are comma-joined with each element quoted unless the element
//! is a timestamp: timestamp formats carry unescaped commas of their own,
//! so they travel unquoted and are re-split on every second comma by the
//! reader.
//!
//! # Wire Rules (write side, in priority order)
//!
//! | Value | Encoding |
//! |-------|----------|
//! | explicit null | literal `null` |
//! | absent `idempotencyToken` member | freshly generated UUID |
//! | timestamp | format resolved per settings/binding |
//! | blob | base64 |
//! | list | elements serialized, quoted (except timestamps), `", "`-joined |
//! | JSON media-type string in a header | base64 of the JSON text |
//! | scalar | direct string conversion |
//!
//! # Examples
//!
//! ```
//! use shapewire::codec::{CodecSettings, Value};
//! use shapewire::codec::string::StringSerializer;
//! use shapewire::schema::{NormalizedSchema, Schema};
//!
//! let mut ser = StringSerializer::new(CodecSettings::new());
//! let schema = NormalizedSchema::of(Schema::list(Schema::string()));
//! ser.write(&schema, &Value::List(vec![
//!     Value::string("a"),
//!     Value::string("b,c"),
//! ])).unwrap();
//! assert_eq!(ser.flush(), r#"a, "b,c""#);
//! ```

use crate::codec::{CodecSettings, Value};
use crate::error::{CodecError, Result};
use crate::schema::NormalizedSchema;
use crate::timestamp::TimestampFormat;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;

/// Quote a header list element if it contains a comma or a quote.
///
/// Quotes inside the element are backslash-escaped.
#[must_use]
pub fn quote_header(part: &str) -> String {
    if part.contains(',') || part.contains('"') {
        format!("\"{}\"", part.replace('"', "\\\""))
    } else {
        part.to_string()
    }
}

/// Split header text on unescaped commas.
///
/// Commas inside quoted substrings are not separators; quotes are stripped
/// and escaped quotes unescaped in the returned elements. Empty input
/// yields no elements.
#[must_use]
pub fn split_header(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                out.push(current.trim().to_string());
                current.clear();
            }
            other => current.push(other),
        }
    }
    out.push(current.trim().to_string());
    out
}

/// Split header text on every second comma.
///
/// RFC 7231 dates embed one unescaped comma each, so a list of them is
/// reassembled by pairing comma-separated fragments.
#[must_use]
pub fn split_every_second_comma(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',')
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|pair| pair.join(",").trim().to_string())
        .collect()
}

/// Serializer producing the textual representation of one shape value.
///
/// `write` stages an encoding, `flush` returns and clears it. An instance
/// holds a single staged value and must not be shared across concurrent
/// encodes.
#[derive(Debug)]
pub struct StringSerializer {
    settings: CodecSettings,
    staged: Option<String>,
}

impl StringSerializer {
    /// Create a serializer with the given settings.
    #[must_use]
    pub fn new(settings: CodecSettings) -> Self {
        StringSerializer {
            settings,
            staged: None,
        }
    }

    /// Stage the textual encoding of `value`.
    pub fn write(&mut self, schema: &NormalizedSchema, value: &Value) -> Result<()> {
        self.staged = Some(self.format(schema, value)?);
        Ok(())
    }

    /// Return and clear the staged encoding.
    pub fn flush(&mut self) -> String {
        self.staged.take().unwrap_or_default()
    }

    /// One-shot conversion without staging.
    pub fn format(&self, schema: &NormalizedSchema, value: &Value) -> Result<String> {
        let traits = schema.merged_traits();
        match value {
            // An absent idempotency-token member raises token generation
            // instead of encoding emptiness.
            Value::Null if traits.idempotency_token => Ok(Uuid::new_v4().to_string()),
            Value::Null => Ok("null".to_string()),
            Value::Timestamp(ts) => {
                Ok(self.settings.timestamp_format_for(schema).format(*ts))
            }
            Value::Blob(bytes) => Ok(BASE64.encode(bytes)),
            Value::List(items) => {
                let element = schema.value_schema().ok_or_else(|| {
                    CodecError::SchemaMisuse(
                        "list value serialized against a non-list schema".to_string(),
                    )
                })?;
                // Timestamps are never quoted: their formats contain
                // unescaped commas the reader re-pairs.
                let quote_elements = !element.is_timestamp();
                let parts = items
                    .iter()
                    .map(|item| {
                        let text = self.format_element(schema, &element, item)?;
                        Ok(if quote_elements {
                            quote_header(&text)
                        } else {
                            text
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(parts.join(", "))
            }
            Value::String(text)
                if traits.media_type.is_some() && traits.http_header.is_some() =>
            {
                Ok(BASE64.encode(text.as_bytes()))
            }
            Value::String(text) => Ok(text.clone()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Integer(n) => Ok(n.to_string()),
            Value::BigInteger(n) => Ok(n.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::BigDecimal(text) => Ok(text.clone()),
            Value::Map(_) => Err(CodecError::SchemaMisuse(
                "map values have no single textual representation".to_string(),
            )),
        }
    }

    fn format_element(
        &self,
        list_schema: &NormalizedSchema,
        element: &NormalizedSchema,
        value: &Value,
    ) -> Result<String> {
        if let Value::Timestamp(ts) = value {
            return Ok(element_timestamp_format(&self.settings, list_schema, element).format(*ts));
        }
        self.format(element, value)
    }
}

/// Deserializer converting location text back into one shape value.
#[derive(Debug)]
pub struct StringDeserializer {
    settings: CodecSettings,
}

impl StringDeserializer {
    /// Create a deserializer with the given settings.
    #[must_use]
    pub fn new(settings: CodecSettings) -> Self {
        StringDeserializer { settings }
    }

    /// Parse location text against a schema.
    pub fn read(&self, schema: &NormalizedSchema, text: &str) -> Result<Value> {
        let traits = schema.merged_traits();
        if schema.is_list() {
            let element = schema.value_schema().ok_or_else(|| {
                CodecError::SchemaMisuse(
                    "list text deserialized against a non-list schema".to_string(),
                )
            })?;
            let format = element_timestamp_format(&self.settings, schema, &element);
            // RFC 7231 dates embed a comma; only that case pairs fragments.
            let parts = if element.is_timestamp() && format == TimestampFormat::HttpDate {
                split_every_second_comma(text)
            } else {
                split_header(text)
            };
            let items = parts
                .iter()
                .map(|part| {
                    if element.is_timestamp() {
                        Ok(Value::Timestamp(format.parse(part)?))
                    } else {
                        self.read(&element, part)
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Value::List(items));
        }
        if schema.is_timestamp() {
            let format = self.settings.timestamp_format_for(schema);
            return Ok(Value::Timestamp(format.parse(text)?));
        }
        if schema.is_blob() {
            return Ok(Value::Blob(BASE64.decode(text.trim())?.into()));
        }
        if schema.is_boolean() {
            return match text {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                other => Err(CodecError::WireParse(format!(
                    "expected boolean, got {other:?}"
                ))),
            };
        }
        if schema.is_integer() {
            return text
                .trim()
                .parse()
                .map(Value::Integer)
                .map_err(|_| CodecError::WireParse(format!("expected integer, got {text:?}")));
        }
        if schema.is_big_integer() {
            return text
                .trim()
                .parse()
                .map(Value::BigInteger)
                .map_err(|_| CodecError::WireParse(format!("expected integer, got {text:?}")));
        }
        if schema.is_float() {
            return text
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|_| CodecError::WireParse(format!("expected number, got {text:?}")));
        }
        if schema.is_big_decimal() {
            return Ok(Value::BigDecimal(text.trim().to_string()));
        }
        if traits.media_type.is_some() && traits.http_header.is_some() {
            let decoded = BASE64.decode(text.trim())?;
            return Ok(Value::String(
                std::str::from_utf8(&decoded)?.to_string(),
            ));
        }
        Ok(Value::String(text.to_string()))
    }
}

// Timestamp format for list elements: the element carries no binding of its
// own, so binding-driven resolution reads the list member's traits.
fn element_timestamp_format(
    settings: &CodecSettings,
    list_schema: &NormalizedSchema,
    element: &NormalizedSchema,
) -> TimestampFormat {
    if settings.honor_timestamp_format_traits {
        if let Some(format) = element.merged_traits().timestamp_format {
            return format;
        }
    }
    settings.timestamp_format_for(list_schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Member, Schema, SchemaTraits};
    use crate::timestamp::Timestamp;
    use bytes::Bytes;

    fn header_member(name: &str, target: Schema) -> NormalizedSchema {
        let schema = Schema::structure(vec![Member::new(name, target)
            .with_traits(SchemaTraits::new().http_header(format!("x-{name}")))]);
        NormalizedSchema::of(schema).member(name).unwrap()
    }

    fn settings() -> CodecSettings {
        CodecSettings::new().with_http_bindings(true)
    }

    #[test]
    fn test_null_serializes_to_literal() {
        let ser = StringSerializer::new(settings());
        let schema = NormalizedSchema::of(Schema::string());
        assert_eq!(ser.format(&schema, &Value::Null).unwrap(), "null");
    }

    #[test]
    fn test_idempotency_token_autofill() {
        let ser = StringSerializer::new(settings());
        let schema = header_member(
            "token",
            Schema::string().with_traits(SchemaTraits::new().idempotency_token()),
        );
        let first = ser.format(&schema, &Value::Null).unwrap();
        let second = ser.format(&schema, &Value::Null).unwrap();
        assert!(uuid::Uuid::parse_str(&first).is_ok());
        assert!(uuid::Uuid::parse_str(&second).is_ok());
        assert!(!first.is_empty());
    }

    #[test]
    fn test_blob_base64() {
        let ser = StringSerializer::new(settings());
        let de = StringDeserializer::new(settings());
        let schema = NormalizedSchema::of(Schema::blob());
        let text = ser
            .format(&schema, &Value::Blob(Bytes::from_static(b"hello")))
            .unwrap();
        assert_eq!(text, "aGVsbG8=");
        assert_eq!(
            de.read(&schema, &text).unwrap(),
            Value::Blob(Bytes::from_static(b"hello"))
        );
    }

    #[test]
    fn test_list_quoting_round_trip() {
        let ser = StringSerializer::new(settings());
        let de = StringDeserializer::new(settings());
        let schema = header_member("tags", Schema::list(Schema::string()));
        for items in [
            vec![],
            vec![Value::string("solo")],
            vec![
                Value::string("plain"),
                Value::string("with,comma"),
                Value::string("with\"quote"),
            ],
        ] {
            let text = ser.format(&schema, &Value::List(items.clone())).unwrap();
            assert_eq!(de.read(&schema, &text).unwrap(), Value::List(items));
        }
    }

    #[test]
    fn test_timestamp_list_not_quoted() {
        let ser = StringSerializer::new(settings());
        let schema = header_member("dates", Schema::list(Schema::timestamp()));
        let ts = crate::timestamp::parse_http_date("Mon, 16 Dec 2019 23:48:18 GMT").unwrap();
        let text = ser
            .format(&schema, &Value::List(vec![Value::Timestamp(ts), Value::Timestamp(ts)]))
            .unwrap();
        assert_eq!(
            text,
            "Mon, 16 Dec 2019 23:48:18 GMT, Mon, 16 Dec 2019 23:48:18 GMT"
        );
    }

    #[test]
    fn test_timestamp_list_split_on_every_second_comma() {
        let de = StringDeserializer::new(settings());
        let schema = header_member("dates", Schema::list(Schema::timestamp()));
        let value = de
            .read(
                &schema,
                "Mon, 16 Dec 2019 23:48:18 GMT, Mon, 16 Dec 2019 23:48:18 GMT",
            )
            .unwrap();
        let expected = Value::Timestamp(Timestamp::from_millis(1_576_540_098_000));
        assert_eq!(value, Value::List(vec![expected.clone(), expected]));
    }

    #[test]
    fn test_media_type_header_base64() {
        let ser = StringSerializer::new(settings());
        let de = StringDeserializer::new(settings());
        let schema = header_member(
            "doc",
            Schema::string().with_traits(SchemaTraits::new().media_type("application/json")),
        );
        let json = r#"{"a":1}"#;
        let text = ser.format(&schema, &Value::string(json)).unwrap();
        assert_eq!(text, BASE64.encode(json));
        assert_eq!(de.read(&schema, &text).unwrap(), Value::string(json));
    }

    #[test]
    fn test_scalar_conversions() {
        let de = StringDeserializer::new(settings());
        assert_eq!(
            de.read(&NormalizedSchema::of(Schema::integer()), "42").unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            de.read(&NormalizedSchema::of(Schema::boolean()), "true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            de.read(&NormalizedSchema::of(Schema::float()), "1.5").unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            de.read(&NormalizedSchema::of(Schema::big_integer()), "170141183460469231731687303715884105727")
                .unwrap(),
            Value::BigInteger(i128::MAX)
        );
        assert!(de
            .read(&NormalizedSchema::of(Schema::integer()), "forty-two")
            .is_err());
    }

    #[test]
    fn test_header_timestamp_uses_http_date() {
        let ser = StringSerializer::new(settings());
        let schema = header_member("when", Schema::timestamp());
        let ts = Timestamp::from_millis(1_576_540_098_000);
        assert_eq!(
            ser.format(&schema, &Value::Timestamp(ts)).unwrap(),
            "Mon, 16 Dec 2019 23:48:18 GMT"
        );
    }

    #[test]
    fn test_write_then_flush_clears_staged() {
        let mut ser = StringSerializer::new(settings());
        let schema = NormalizedSchema::of(Schema::string());
        ser.write(&schema, &Value::string("staged")).unwrap();
        assert_eq!(ser.flush(), "staged");
        assert_eq!(ser.flush(), "");
    }

    #[test]
    fn test_split_header_handles_escaped_quotes() {
        assert_eq!(
            split_header(r#"plain, "with,comma", "with\"quote""#),
            vec!["plain", "with,comma", "with\"quote"]
        );
        assert!(split_header("").is_empty());
    }
}
