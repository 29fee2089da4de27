use crate::error::ErrorKind;
use crate::named_node::NamedNode;
use oxiri::{Iri, IriParseError};
use std::fmt;

/// An absolute IRI used to resolve relative references following [RFC 3986](https://www.rfc-editor.org/rfc/rfc3986#section-5).
///
/// ```
/// use tessera_model::BaseIri;
///
/// let base = BaseIri::parse("http://example.com/a/b/c")?;
/// assert_eq!(base.resolve("../d")?.as_str(), "http://example.com/a/d");
/// assert_eq!(base.resolve("#f")?.as_str(), "http://example.com/a/b/c#f");
/// # Result::<_, tessera_model::IriResolveError>::Ok(())
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct BaseIri(Iri<String>);

impl BaseIri {
    /// Parses a base IRI. It must be absolute.
    pub fn parse(iri: impl Into<String>) -> Result<Self, IriResolveError> {
        let iri = iri.into();
        match Iri::parse(iri.as_str()) {
            Ok(_) => Ok(Self(Iri::parse_unchecked(iri))),
            Err(error) => Err(IriResolveError {
                kind: ErrorKind::InvalidBase,
                iri,
                error,
            }),
        }
    }

    /// Wraps an IRI already known to be absolute and valid.
    #[inline]
    pub fn parse_unchecked(iri: impl Into<String>) -> Self {
        Self(Iri::parse_unchecked(iri.into()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.0.into_inner()
    }

    /// Resolves a relative or absolute IRI reference against this base.
    ///
    /// References with control characters, spaces or any of `<>"{}|^\`` fail with [`ErrorKind::InvalidIri`].
    pub fn resolve(&self, reference: &str) -> Result<NamedNode, IriResolveError> {
        self.0
            .resolve(reference)
            .map(NamedNode::from)
            .map_err(|error| IriResolveError {
                kind: ErrorKind::InvalidIri,
                iri: reference.into(),
                error,
            })
    }

    /// Resolves a reference without validating it.
    #[inline]
    pub fn resolve_unchecked(&self, reference: &str) -> NamedNode {
        self.0.resolve_unchecked(reference).into()
    }

    /// Resolves a reference and uses the result as a new base.
    pub fn resolve_base(&self, reference: &str) -> Result<Self, IriResolveError> {
        self.0
            .resolve(reference)
            .map(Self)
            .map_err(|error| IriResolveError {
                kind: ErrorKind::InvalidBase,
                iri: reference.into(),
                error,
            })
    }
}

impl fmt::Display for BaseIri {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<NamedNode> for BaseIri {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::parse_unchecked(node.into_string())
    }
}

/// Resolves `reference` against the absolute IRI `base`.
///
/// Fails with [`ErrorKind::InvalidBase`] if `base` is not absolute
/// and with [`ErrorKind::InvalidIri`] if `reference` is not a valid IRI reference.
pub fn resolve(base: &str, reference: &str) -> Result<NamedNode, IriResolveError> {
    BaseIri::parse(base)?.resolve(reference)
}

/// An error raised when an IRI can't be parsed or resolved.
#[derive(Debug, thiserror::Error)]
#[error("{kind} '{iri}': {error}")]
pub struct IriResolveError {
    kind: ErrorKind,
    iri: String,
    #[source]
    error: IriParseError,
}

impl IriResolveError {
    /// Either [`ErrorKind::InvalidIri`] or [`ErrorKind::InvalidBase`].
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The IRI that failed.
    #[inline]
    pub fn iri(&self) -> &str {
        &self.iri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3986_normal_examples() {
        let base = BaseIri::parse("http://a/b/c/d;p?q").unwrap();
        for (reference, expected) in [
            ("g:h", "g:h"),
            ("g", "http://a/b/c/g"),
            ("./g", "http://a/b/c/g"),
            ("g/", "http://a/b/c/g/"),
            ("/g", "http://a/g"),
            ("//g", "http://g"),
            ("?y", "http://a/b/c/d;p?y"),
            ("g?y", "http://a/b/c/g?y"),
            ("#s", "http://a/b/c/d;p?q#s"),
            ("", "http://a/b/c/d;p?q"),
            (".", "http://a/b/c/"),
            ("..", "http://a/b/"),
            ("../..", "http://a/"),
            ("../../../g", "http://a/g"),
            ("g;x=1/../y", "http://a/b/c/y"),
        ] {
            assert_eq!(base.resolve(reference).unwrap().as_str(), expected);
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let base = BaseIri::parse("http://example.com/a/b").unwrap();
        for reference in ["c", "../d/./e", "#frag", "//other/x", "urn:x"] {
            let once = base.resolve(reference).unwrap();
            let twice = base.resolve(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn invalid_references() {
        let base = BaseIri::parse("http://example.com/").unwrap();
        for reference in ["a b", "a\u{1}", "a<b", "a{b", "a\\b"] {
            assert_eq!(base.resolve(reference).unwrap_err().kind(), ErrorKind::InvalidIri);
        }
    }

    #[test]
    fn relative_base_is_rejected() {
        assert_eq!(
            resolve("foo/bar", "baz").unwrap_err().kind(),
            ErrorKind::InvalidBase
        );
    }

    #[test]
    fn percent_encoding_is_preserved() {
        let base = BaseIri::parse("http://example.com/").unwrap();
        assert_eq!(
            base.resolve("a%2fb%C3%A9").unwrap().as_str(),
            "http://example.com/a%2fb%C3%A9"
        );
    }
}
