use crate::named_node::{NamedNode, NamedNodeRef};
use crate::vocab::{rdf, xsd};
use oxilangtag::{LanguageTag, LanguageTagParseError};
use std::fmt;
use std::fmt::Write;

/// An owned RDF [literal](https://www.w3.org/TR/rdf11-concepts/#dfn-literal).
///
/// A literal has a language tag if and only if its datatype is `rdf:langString`.
/// Language tags are stored lowercase so that equal literals compare equal.
///
/// ```
/// use tessera_model::Literal;
/// use tessera_model::vocab::xsd;
///
/// assert_eq!(
///     "\"foo\\nbar\"",
///     Literal::new_simple_literal("foo\nbar").to_string()
/// );
/// assert_eq!(
///     "\"1999-01-01\"^^<http://www.w3.org/2001/XMLSchema#date>",
///     Literal::new_typed_literal("1999-01-01", xsd::DATE).to_string()
/// );
/// assert_eq!(
///     "\"foo\"@en-us",
///     Literal::new_language_tagged_literal("foo", "en-US")?.to_string()
/// );
/// # Result::<_, tessera_model::LanguageTagParseError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct Literal(LiteralContent);

#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
enum LiteralContent {
    String(String),
    LanguageTaggedString { value: String, language: String },
    TypedLiteral { value: String, datatype: NamedNode },
}

impl Literal {
    /// Builds an RDF [simple literal](https://www.w3.org/TR/rdf11-concepts/#dfn-simple-literal).
    #[inline]
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Self(LiteralContent::String(value.into()))
    }

    /// Builds a literal with a datatype. `xsd:string` yields a simple literal.
    #[inline]
    pub fn new_typed_literal(value: impl Into<String>, datatype: impl Into<NamedNode>) -> Self {
        let value = value.into();
        let datatype = datatype.into();
        Self(if datatype == xsd::STRING {
            LiteralContent::String(value)
        } else {
            LiteralContent::TypedLiteral { value, datatype }
        })
    }

    /// Builds a [language-tagged string](https://www.w3.org/TR/rdf11-concepts/#dfn-language-tagged-string),
    /// validating the tag against BCP 47 and lowercasing it.
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, LanguageTagParseError> {
        let mut language = language.into();
        language.make_ascii_lowercase();
        Ok(Self::new_language_tagged_literal_unchecked(
            value,
            LanguageTag::parse(language)?.into_inner(),
        ))
    }

    /// Builds a language-tagged string without validating the tag.
    ///
    /// The caller must ensure the tag is a lowercase BCP 47 tag.
    #[inline]
    pub fn new_language_tagged_literal_unchecked(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self(LiteralContent::LanguageTaggedString {
            value: value.into(),
            language: language.into(),
        })
    }

    /// The [lexical form](https://www.w3.org/TR/rdf11-concepts/#dfn-lexical-form).
    #[inline]
    pub fn value(&self) -> &str {
        match &self.0 {
            LiteralContent::String(value)
            | LiteralContent::LanguageTaggedString { value, .. }
            | LiteralContent::TypedLiteral { value, .. } => value,
        }
    }

    #[inline]
    pub fn language(&self) -> Option<&str> {
        match &self.0 {
            LiteralContent::LanguageTaggedString { language, .. } => Some(language),
            _ => None,
        }
    }

    /// The [datatype](https://www.w3.org/TR/rdf11-concepts/#dfn-datatype-iri).
    ///
    /// It is `rdf:langString` for language-tagged strings and `xsd:string` for simple literals.
    #[inline]
    pub fn datatype(&self) -> NamedNodeRef<'_> {
        match &self.0 {
            LiteralContent::String(_) => xsd::STRING,
            LiteralContent::LanguageTaggedString { .. } => rdf::LANG_STRING,
            LiteralContent::TypedLiteral { datatype, .. } => datatype.as_ref(),
        }
    }

    /// Checks if the literal is a simple literal or a language-tagged string.
    #[inline]
    pub fn is_plain(&self) -> bool {
        matches!(
            self.0,
            LiteralContent::String(_) | LiteralContent::LanguageTaggedString { .. }
        )
    }

    /// Extracts the lexical form, the datatype if it is not implied, and the language tag.
    #[inline]
    pub fn destruct(self) -> (String, Option<NamedNode>, Option<String>) {
        match self.0 {
            LiteralContent::String(s) => (s, None, None),
            LiteralContent::LanguageTaggedString { value, language } => {
                (value, None, Some(language))
            }
            LiteralContent::TypedLiteral { value, datatype } => (value, Some(datatype), None),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            LiteralContent::String(value) => print_quoted_str(value, f),
            LiteralContent::LanguageTaggedString { value, language } => {
                print_quoted_str(value, f)?;
                write!(f, "@{language}")
            }
            LiteralContent::TypedLiteral { value, datatype } => {
                print_quoted_str(value, f)?;
                write!(f, "^^{datatype}")
            }
        }
    }
}

impl From<&str> for Literal {
    #[inline]
    fn from(value: &str) -> Self {
        Self::new_simple_literal(value)
    }
}

impl From<String> for Literal {
    #[inline]
    fn from(value: String) -> Self {
        Self::new_simple_literal(value)
    }
}

impl From<bool> for Literal {
    #[inline]
    fn from(value: bool) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::BOOLEAN)
    }
}

impl From<i64> for Literal {
    #[inline]
    fn from(value: i64) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::INTEGER)
    }
}

/// Writes a string between double quotes with the escapes shared by N-Triples and Turtle.
#[inline]
pub fn print_quoted_str(string: &str, f: &mut impl Write) -> fmt::Result {
    f.write_char('"')?;
    for c in string.chars() {
        match c {
            '\u{08}' => f.write_str("\\b"),
            '\t' => f.write_str("\\t"),
            '\n' => f.write_str("\\n"),
            '\u{0c}' => f.write_str("\\f"),
            '\r' => f.write_str("\\r"),
            '"' => f.write_str("\\\""),
            '\\' => f.write_str("\\\\"),
            '\0'..='\u{1f}' | '\u{7f}' => write!(f, "\\u{:04X}", u32::from(c)),
            c => f.write_char(c),
        }?;
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xsd_string_is_simple() {
        assert_eq!(
            Literal::new_simple_literal("foo"),
            Literal::new_typed_literal("foo", xsd::STRING)
        );
        assert!(Literal::new_simple_literal("foo").is_plain());
    }

    #[test]
    fn language_tags_are_lowercased() {
        let literal = Literal::new_language_tagged_literal("foo", "EN-GB").unwrap();
        assert_eq!(literal.language(), Some("en-gb"));
        assert_eq!(literal.datatype(), rdf::LANG_STRING);
        assert_eq!(
            literal,
            Literal::new_language_tagged_literal("foo", "en-gb").unwrap()
        );
        Literal::new_language_tagged_literal("foo", "e n").unwrap_err();
    }

    #[test]
    fn control_chars_are_escaped() {
        assert_eq!(
            Literal::new_simple_literal("a\u{0}b\u{7f}").to_string(),
            "\"a\\u0000b\\u007F\""
        );
    }
}
