//! Error types for schema-driven codec operations.
//!
//! This module defines all error types that can occur while serializing a
//! request or deserializing a response against an operation schema. The
//! [`Result`] type alias provides a convenient shorthand for operations that
//! may fail.
//!
//! # Error Categories
//!
//! | Category | Variants | Origin |
//! |----------|----------|--------|
//! | Schema misuse | `SchemaMisuse` | programming/generator defect, raised before any I/O |
//! | Malformed wire data | `TimestampParse`, `WireParse`, `Json`, `Base64`, `InvalidUtf8` | bytes/text received off the wire |
//! | Service responses | `UnraisedServiceError` | safety net when the error handler fails to raise |
//! | Event streams | `EventStream` | frame-level framing problems |
//! | Transport | `Io` | the underlying body stream failed |
//!
//! # Examples
//!
//! ```
//! use shapewire::CodecError;
//!
//! let err = CodecError::TimestampParse("not-a-date".into());
//! assert!(err.to_string().contains("not-a-date"));
//! assert!(!err.is_schema_defect());
//! ```

use std::io;
use thiserror::Error;

/// Result type for codec operations.
///
/// Provides a convenient shorthand for `Result<T, CodecError>`.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors that can occur while encoding or decoding against a schema.
///
/// Each variant represents a different failure mode. Use pattern matching to
/// handle specific errors appropriately; none of these are retried or
/// swallowed inside the codec itself.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    /// A schema was used in a way its shape does not support.
    ///
    /// Examples: a host-label substitution target that is not a string-typed
    /// member, an event-stream union member whose target is not a structure,
    /// or a missing path label. These are generator/programming defects and
    /// are raised synchronously, before any I/O.
    #[error("schema misuse: {0}")]
    SchemaMisuse(String),

    /// A timestamp value on the wire did not match its declared format.
    ///
    /// Carries the offending raw text.
    #[error("invalid timestamp: {0}")]
    TimestampParse(String),

    /// A non-timestamp wire value could not be converted to its shape kind.
    ///
    /// Covers numeric, boolean and similar scalar conversions from header,
    /// query or path text.
    #[error("malformed wire value: {0}")]
    WireParse(String),

    /// The document codec failed to parse a body.
    #[error("document parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A base64-encoded blob or media-type header failed to decode.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Header or body text was not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The response status was >= 300 and the error handler returned
    /// without raising.
    ///
    /// The handler is contractually required to produce the error for any
    /// protocol error response; this variant is the codec's safety net.
    #[error("service error response (status {status}) was not raised by the error handler")]
    UnraisedServiceError {
        /// HTTP status code of the offending response.
        status: u16,
    },

    /// An event-stream frame could not be produced or interpreted.
    #[error("event stream error: {0}")]
    EventStream(String),

    /// The underlying body stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Check whether this error is a schema/programming defect.
    ///
    /// Schema defects indicate generated code handed the codec an input it
    /// can never serialize; retrying or re-reading the wire cannot help.
    ///
    /// # Examples
    ///
    /// ```
    /// use shapewire::CodecError;
    ///
    /// assert!(CodecError::SchemaMisuse("label `id` is not a string".into()).is_schema_defect());
    /// assert!(!CodecError::TimestampParse("??".into()).is_schema_defect());
    /// ```
    #[inline]
    #[must_use]
    pub fn is_schema_defect(&self) -> bool {
        matches!(self, CodecError::SchemaMisuse(_))
    }

    /// Check whether this error came from malformed wire data.
    ///
    /// Returns `true` for parse failures over received bytes and text,
    /// `false` for schema defects and transport errors.
    #[inline]
    #[must_use]
    pub fn is_wire_parse(&self) -> bool {
        matches!(
            self,
            CodecError::TimestampParse(_)
                | CodecError::WireParse(_)
                | CodecError::Json(_)
                | CodecError::Base64(_)
                | CodecError::InvalidUtf8(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_misuse_is_defect() {
        let err = CodecError::SchemaMisuse("bad label".into());
        assert!(err.is_schema_defect());
        assert!(!err.is_wire_parse());
    }

    #[test]
    fn test_timestamp_parse_is_wire_parse() {
        let err = CodecError::TimestampParse("1985-13-01".into());
        assert!(err.is_wire_parse());
        assert!(!err.is_schema_defect());
    }

    #[test]
    fn test_error_display_carries_raw_text() {
        let err = CodecError::TimestampParse("85-04-12T23:20:50Z".into());
        assert!(err.to_string().contains("85-04-12T23:20:50Z"));
    }

    #[test]
    fn test_unraised_service_error_display() {
        let err = CodecError::UnraisedServiceError { status: 503 };
        assert!(err.to_string().contains("503"));
    }
}
