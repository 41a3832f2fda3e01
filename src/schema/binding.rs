//! Wire-location binding derived from merged traits.
//!
//! Every member of an operation's input or output struct lands in exactly
//! one wire location. The decision is derived, never stored: it reads only
//! the member's merged traits. Members matching no explicit binding travel
//! in the document body.

use crate::schema::SchemaTraits;

/// The wire location assigned to a struct member.
///
/// A closed enum with one variant per binding kind, so dispatch over
/// bindings is exhaustiveness-checked at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Substituted into a URI template label.
    Label,
    /// Placed in the named header.
    Header(String),
    /// Spread over all headers sharing the prefix.
    PrefixHeaders(String),
    /// Placed in the named query parameter.
    Query(String),
    /// Spread over query parameters, one entry per map key.
    QueryParams,
    /// The sole explicit body payload.
    Payload,
    /// Written from / read into the literal HTTP status code.
    ResponseCode,
    /// Serialized with the other unbound members as the document body.
    Body,
}

impl Binding {
    /// Derive the binding for a member from its merged traits.
    ///
    /// At most one explicit binding matches per member; schema validity is
    /// guaranteed upstream by the generator and is not re-checked here.
    #[must_use]
    pub fn of(traits: &SchemaTraits) -> Binding {
        if traits.http_label {
            Binding::Label
        } else if let Some(name) = &traits.http_header {
            Binding::Header(name.clone())
        } else if let Some(prefix) = &traits.http_prefix_headers {
            Binding::PrefixHeaders(prefix.clone())
        } else if let Some(name) = &traits.http_query {
            Binding::Query(name.clone())
        } else if traits.http_query_params {
            Binding::QueryParams
        } else if traits.http_payload {
            Binding::Payload
        } else if traits.http_response_code {
            Binding::ResponseCode
        } else {
            Binding::Body
        }
    }

    /// Whether this binding routes through the string shape codec rather
    /// than the document codec.
    #[must_use]
    pub fn is_string_bound(&self) -> bool {
        matches!(
            self,
            Binding::Label | Binding::Header(_) | Binding::Query(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_binding_per_trait_set() {
        let cases: Vec<(SchemaTraits, Binding)> = vec![
            (SchemaTraits::new().http_label(), Binding::Label),
            (
                SchemaTraits::new().http_header("x-id"),
                Binding::Header("x-id".into()),
            ),
            (
                SchemaTraits::new().http_prefix_headers("x-meta-"),
                Binding::PrefixHeaders("x-meta-".into()),
            ),
            (
                SchemaTraits::new().http_query("page"),
                Binding::Query("page".into()),
            ),
            (SchemaTraits::new().http_query_params(), Binding::QueryParams),
            (SchemaTraits::new().http_payload(), Binding::Payload),
            (
                SchemaTraits::new().http_response_code(),
                Binding::ResponseCode,
            ),
            (SchemaTraits::new(), Binding::Body),
        ];
        for (traits, expected) in cases {
            assert_eq!(Binding::of(&traits), expected);
        }
    }

    #[test]
    fn test_string_bound_locations() {
        assert!(Binding::Label.is_string_bound());
        assert!(Binding::Header("h".into()).is_string_bound());
        assert!(Binding::Query("q".into()).is_string_bound());
        assert!(!Binding::Payload.is_string_bound());
        assert!(!Binding::Body.is_string_bound());
        assert!(!Binding::PrefixHeaders("p-".into()).is_string_bound());
    }
}
