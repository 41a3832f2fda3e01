//! Read-only, normalized view over a schema reference.
//!
//! [`NormalizedSchema`] resolves lazy references once, layers member traits
//! over the target shape's traits, and exposes the query surface the codec
//! layers read: shape-kind predicates, merged traits, ordered member
//! iteration and element schemas. Two normalizations of the same underlying
//! schema are observationally equal, and normalization never mutates the
//! source.

use crate::schema::{Member, Schema, SchemaRef, SchemaTraits, SimpleType};
use std::sync::Arc;

/// A normalized, queryable view of a schema, possibly in member position.
#[derive(Debug, Clone)]
pub struct NormalizedSchema {
    target: Arc<Schema>,
    member_name: Option<Arc<str>>,
    merged: Arc<SchemaTraits>,
}

impl NormalizedSchema {
    /// Normalize a schema reference, resolving laziness.
    #[must_use]
    pub fn of(schema: impl Into<SchemaRef>) -> NormalizedSchema {
        let target = schema.into().resolve();
        let merged = Arc::new(target.traits().clone());
        NormalizedSchema {
            target,
            member_name: None,
            merged,
        }
    }

    /// Normalize a member: resolve its target and merge member traits over
    /// the target's traits.
    #[must_use]
    pub fn of_member(member: &Member) -> NormalizedSchema {
        let target = member.target.resolve();
        let merged = Arc::new(member.traits.merged_over(target.traits()));
        NormalizedSchema {
            target,
            member_name: Some(Arc::from(member.name.as_str())),
            merged,
        }
    }

    /// The resolved target shape.
    #[must_use]
    pub fn target(&self) -> &Schema {
        &self.target
    }

    /// Member name, if this view is in member position.
    #[must_use]
    pub fn member_name(&self) -> Option<&str> {
        self.member_name.as_deref()
    }

    /// Merged traits: member traits over target traits.
    #[must_use]
    pub fn merged_traits(&self) -> &SchemaTraits {
        &self.merged
    }

    /// Whether this view sits in member position.
    #[must_use]
    pub fn is_member(&self) -> bool {
        self.member_name.is_some()
    }

    fn simple_type(&self) -> Option<SimpleType> {
        match &*self.target {
            Schema::Simple { ty, .. } => Some(*ty),
            _ => None,
        }
    }

    /// Struct shape?
    #[must_use]
    pub fn is_struct(&self) -> bool {
        matches!(&*self.target, Schema::Struct { .. })
    }

    /// Union shape?
    #[must_use]
    pub fn is_union(&self) -> bool {
        matches!(&*self.target, Schema::Union { .. })
    }

    /// List shape?
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(&*self.target, Schema::List { .. })
    }

    /// Map shape?
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(&*self.target, Schema::Map { .. })
    }

    /// Operation shape?
    #[must_use]
    pub fn is_operation(&self) -> bool {
        matches!(&*self.target, Schema::Operation { .. })
    }

    /// String leaf?
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.simple_type() == Some(SimpleType::String)
    }

    /// Boolean leaf?
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.simple_type() == Some(SimpleType::Boolean)
    }

    /// Integral leaf?
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.simple_type() == Some(SimpleType::Integer)
    }

    /// Floating-point leaf?
    #[must_use]
    pub fn is_float(&self) -> bool {
        self.simple_type() == Some(SimpleType::Float)
    }

    /// Big-integer leaf?
    #[must_use]
    pub fn is_big_integer(&self) -> bool {
        self.simple_type() == Some(SimpleType::BigInteger)
    }

    /// Big-decimal leaf?
    #[must_use]
    pub fn is_big_decimal(&self) -> bool {
        self.simple_type() == Some(SimpleType::BigDecimal)
    }

    /// Blob leaf (buffered or streaming)?
    #[must_use]
    pub fn is_blob(&self) -> bool {
        matches!(
            self.simple_type(),
            Some(SimpleType::Blob | SimpleType::StreamingBlob)
        )
    }

    /// Schemaless document leaf?
    #[must_use]
    pub fn is_document(&self) -> bool {
        self.simple_type() == Some(SimpleType::Document)
    }

    /// Timestamp leaf?
    #[must_use]
    pub fn is_timestamp(&self) -> bool {
        self.simple_type() == Some(SimpleType::Timestamp)
    }

    /// Streaming shape (streaming blob or `streaming`-flagged member)?
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.merged.streaming || self.simple_type() == Some(SimpleType::StreamingBlob)
    }

    /// Ordered, stable iteration over struct/union members.
    ///
    /// Yields one normalized view per member, in declaration order, with
    /// member traits already merged. Empty for non-aggregate shapes.
    pub fn struct_members(&self) -> impl Iterator<Item = NormalizedSchema> + '_ {
        let members: &[Member] = match &*self.target {
            Schema::Struct { members, .. } | Schema::Union { members, .. } => members,
            _ => &[],
        };
        members.iter().map(NormalizedSchema::of_member)
    }

    /// Look up a struct/union member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<NormalizedSchema> {
        match &*self.target {
            Schema::Struct { members, .. } | Schema::Union { members, .. } => members
                .iter()
                .find(|m| m.name == name)
                .map(NormalizedSchema::of_member),
            _ => None,
        }
    }

    /// The element schema of a list or the value schema of a map.
    #[must_use]
    pub fn value_schema(&self) -> Option<NormalizedSchema> {
        match &*self.target {
            Schema::List { member, .. } => Some(NormalizedSchema::of(member.clone())),
            Schema::Map { value, .. } => Some(NormalizedSchema::of(value.clone())),
            _ => None,
        }
    }

    /// The key schema of a map.
    #[must_use]
    pub fn key_schema(&self) -> Option<NormalizedSchema> {
        match &*self.target {
            Schema::Map { key, .. } => Some(NormalizedSchema::of(key.clone())),
            _ => None,
        }
    }

    /// The input struct of an operation.
    #[must_use]
    pub fn input(&self) -> Option<NormalizedSchema> {
        match &*self.target {
            Schema::Operation { input, .. } => Some(NormalizedSchema::of(input.clone())),
            _ => None,
        }
    }

    /// The output struct of an operation.
    #[must_use]
    pub fn output(&self) -> Option<NormalizedSchema> {
        match &*self.target {
            Schema::Operation { output, .. } => Some(NormalizedSchema::of(output.clone())),
            _ => None,
        }
    }

    /// The single streaming-union member of this struct, if any.
    ///
    /// Called on an operation's input or output struct to find the event
    /// stream member.
    #[must_use]
    pub fn event_stream_member(&self) -> Option<NormalizedSchema> {
        self.struct_members()
            .find(|m| m.is_streaming() && m.is_union())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaTraits;

    fn sample_struct() -> Schema {
        Schema::structure(vec![
            Member::new("id", Schema::string())
                .with_traits(SchemaTraits::new().http_label()),
            Member::new("tags", Schema::list(Schema::string())),
            Member::new("stream", Schema::union(vec![Member::new("a", Schema::structure(vec![]))]))
                .with_traits(SchemaTraits::new().streaming().http_payload()),
        ])
    }

    #[test]
    fn test_member_iteration_preserves_declaration_order() {
        let schema = NormalizedSchema::of(sample_struct());
        let names: Vec<_> = schema
            .struct_members()
            .map(|m| m.member_name().unwrap_or("").to_string())
            .collect();
        assert_eq!(names, ["id", "tags", "stream"]);
    }

    #[test]
    fn test_normalization_is_observationally_equal() {
        let schema = std::sync::Arc::new(sample_struct());
        let a = NormalizedSchema::of(schema.clone());
        let b = NormalizedSchema::of(schema);
        assert_eq!(
            a.struct_members().count(),
            b.struct_members().count()
        );
        assert_eq!(a.merged_traits(), b.merged_traits());
    }

    #[test]
    fn test_event_stream_member_lookup() {
        let schema = NormalizedSchema::of(sample_struct());
        let member = schema.event_stream_member().expect("streaming union");
        assert_eq!(member.member_name(), Some("stream"));
        assert!(member.is_union());
    }

    #[test]
    fn test_merged_traits_layer_member_over_target() {
        let schema = NormalizedSchema::of(sample_struct());
        let id = schema.member("id").unwrap();
        assert!(id.merged_traits().http_label);
        assert!(id.is_string());
    }

    #[test]
    fn test_value_schema_of_list() {
        let schema = NormalizedSchema::of(sample_struct());
        let tags = schema.member("tags").unwrap();
        assert!(tags.is_list());
        assert!(tags.value_schema().unwrap().is_string());
    }
}
