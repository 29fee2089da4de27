use json_event_parser::{JsonParseError, JsonSyntaxError};
use std::error::Error;
use std::{fmt, io};
use tessera_model::{ErrorKind, IriResolveError};

/// Error returned during JSON-LD parsing.
///
/// It is the union of [`JsonLdSyntaxError`] and [`io::Error`].
#[derive(Debug, thiserror::Error)]
pub enum JsonLdParseError {
    /// I/O error during parsing (file not found...).
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An error in the file syntax.
    #[error(transparent)]
    Syntax(#[from] JsonLdSyntaxError),
}

impl JsonLdParseError {
    /// The kind of failure, [`ErrorKind::ReadFailure`] for I/O errors.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::ReadFailure,
            Self::Syntax(e) => e.kind(),
        }
    }
}

impl From<JsonLdParseError> for io::Error {
    #[inline]
    fn from(error: JsonLdParseError) -> Self {
        match error {
            JsonLdParseError::Io(error) => error,
            JsonLdParseError::Syntax(error) => error.into(),
        }
    }
}

impl From<JsonParseError> for JsonLdParseError {
    #[inline]
    fn from(error: JsonParseError) -> Self {
        match error {
            JsonParseError::Io(error) => Self::Io(error),
            JsonParseError::Syntax(error) => Self::Syntax(error.into()),
        }
    }
}

/// An error in the syntax of the parsed file.
///
/// It carries the [JSON pointer](https://www.rfc-editor.org/rfc/rfc6901) of the value that triggered it
/// and, when there is one, the matching [JSON-LD error code](https://www.w3.org/TR/json-ld-api/#jsonlderrorcode).
#[derive(Debug)]
pub struct JsonLdSyntaxError {
    kind: ErrorKind,
    code: Option<JsonLdErrorCode>,
    message: String,
    pointer: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl JsonLdSyntaxError {
    pub(crate) fn new(code: JsonLdErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind: code.kind(),
            code: Some(code),
            message: message.into(),
            pointer: String::new(),
            source: None,
        }
    }

    pub(crate) fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub(crate) fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Sets the pointer if no more precise one has been set before.
    pub(crate) fn at(mut self, pointer: &str) -> Self {
        if self.pointer.is_empty() {
            self.pointer = pointer.into();
        }
        self
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UnsupportedFeature,
            code: None,
            message: message.into(),
            pointer: String::new(),
            source: None,
        }
    }

    /// The kind of failure.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The JSON-LD error code, if the failure has one.
    #[inline]
    pub fn code(&self) -> Option<JsonLdErrorCode> {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The JSON pointer to the faulty value, empty for the document root.
    #[inline]
    pub fn pointer(&self) -> &str {
        &self.pointer
    }
}

impl fmt::Display for JsonLdSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pointer.is_empty() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(f, "{} at {}: {}", self.kind, self.pointer, self.message)
        }
    }
}

impl Error for JsonLdSyntaxError {
    #[inline]
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref()),
            None => None,
        }
    }
}

impl From<JsonSyntaxError> for JsonLdSyntaxError {
    #[inline]
    fn from(error: JsonSyntaxError) -> Self {
        Self::new(JsonLdErrorCode::LoadingDocumentFailed, error.to_string())
            .with_kind(ErrorKind::Syntax)
            .with_source(error)
    }
}

impl From<IriResolveError> for JsonLdSyntaxError {
    #[inline]
    fn from(error: IriResolveError) -> Self {
        let kind = error.kind();
        Self::new(JsonLdErrorCode::InvalidBaseIri, error.to_string())
            .with_kind(kind)
            .with_source(error)
    }
}

impl From<JsonLdSyntaxError> for io::Error {
    #[inline]
    fn from(error: JsonLdSyntaxError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}

/// A [JSON-LD error code](https://www.w3.org/TR/json-ld-api/#jsonlderrorcode).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum JsonLdErrorCode {
    /// Two properties which expand to the same keyword have been detected.
    CollidingKeywords,
    /// Maximum number of `@context` URLs exceeded.
    ContextOverflow,
    /// A cycle in IRI mappings has been detected.
    CyclicIriMapping,
    /// An invalid base direction has been detected.
    InvalidBaseDirection,
    /// An invalid base IRI has been detected.
    InvalidBaseIri,
    /// An `@container` entry was encountered whose value was not valid.
    InvalidContainerMapping,
    /// An entry in a context is invalid due to processing mode incompatibility.
    InvalidContextEntry,
    /// An attempt was made to nullify a context containing protected term definitions.
    InvalidContextNullification,
    /// The value of the default language is not a string or `null`.
    InvalidDefaultLanguage,
    /// The value of `@id` is not a string.
    InvalidIdValue,
    /// An invalid value for `@import` has been found.
    InvalidImportValue,
    /// An included block contains an invalid value.
    InvalidIncludedValue,
    /// The value of `@index` is not a string.
    InvalidIndexValue,
    /// A local context contains a term that has an invalid or missing IRI mapping.
    InvalidIriMapping,
    /// An invalid keyword alias definition has been encountered.
    InvalidKeywordAlias,
    /// An invalid value in a language map has been detected.
    InvalidLanguageMapValue,
    /// An `@language` entry in a term definition is not a string or `null`.
    InvalidLanguageMapping,
    /// A language-tagged string with an invalid language value was detected.
    InvalidLanguageTaggedString,
    /// A number, `true`, or `false` with an associated language tag was detected.
    InvalidLanguageTaggedValue,
    /// In invalid local context was detected.
    InvalidLocalContext,
    /// An invalid value for `@nest` has been found.
    InvalidNestValue,
    /// An invalid value for `@prefix` has been found.
    InvalidPrefixValue,
    /// An invalid value for `@propagate` has been found.
    InvalidPropagateValue,
    /// An invalid value for `@protected` has been found.
    InvalidProtectedValue,
    /// No valid context document has been found for a referenced remote context.
    InvalidRemoteContext,
    /// An invalid reverse property definition has been detected.
    InvalidReverseProperty,
    /// An invalid reverse property map has been detected.
    InvalidReversePropertyMap,
    /// An invalid value for a reverse property has been detected.
    InvalidReversePropertyValue,
    /// An invalid value for `@reverse` has been detected.
    InvalidReverseValue,
    /// The local context defined within a term definition is invalid.
    InvalidScopedContext,
    /// A set object or list object with disallowed entries has been detected.
    InvalidSetOrListObject,
    /// An invalid term definition has been detected.
    InvalidTermDefinition,
    /// An `@type` entry in a term definition is not valid.
    InvalidTypeMapping,
    /// An invalid value for an `@type` entry has been detected.
    InvalidTypeValue,
    /// A typed value with an invalid type was detected.
    InvalidTypedValue,
    /// A value object with disallowed entries has been detected.
    InvalidValueObject,
    /// An invalid value for the `@value` entry of a value object has been detected.
    InvalidValueObjectValue,
    /// The `@version` entry was used in a context with an out of range value.
    InvalidVersionValue,
    /// An invalid vocabulary mapping has been detected.
    InvalidVocabMapping,
    /// A keyword redefinition has been detected.
    KeywordRedefinition,
    /// The document could not be loaded or parsed as JSON.
    LoadingDocumentFailed,
    /// There was a problem encountered loading a remote context.
    LoadingRemoteContextFailed,
    /// An attempt was made to redefine a protected term.
    ProtectedTermRedefinition,
}

impl JsonLdErrorCode {
    /// The code as written in the JSON-LD API specification, like `invalid @id value`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CollidingKeywords => "colliding keywords",
            Self::ContextOverflow => "context overflow",
            Self::CyclicIriMapping => "cyclic IRI mapping",
            Self::InvalidBaseDirection => "invalid base direction",
            Self::InvalidBaseIri => "invalid base IRI",
            Self::InvalidContainerMapping => "invalid container mapping",
            Self::InvalidContextEntry => "invalid context entry",
            Self::InvalidContextNullification => "invalid context nullification",
            Self::InvalidDefaultLanguage => "invalid default language",
            Self::InvalidIdValue => "invalid @id value",
            Self::InvalidImportValue => "invalid @import value",
            Self::InvalidIncludedValue => "invalid @included value",
            Self::InvalidIndexValue => "invalid @index value",
            Self::InvalidIriMapping => "invalid IRI mapping",
            Self::InvalidKeywordAlias => "invalid keyword alias",
            Self::InvalidLanguageMapValue => "invalid language map value",
            Self::InvalidLanguageMapping => "invalid language mapping",
            Self::InvalidLanguageTaggedString => "invalid language-tagged string",
            Self::InvalidLanguageTaggedValue => "invalid language-tagged value",
            Self::InvalidLocalContext => "invalid local context",
            Self::InvalidNestValue => "invalid @nest value",
            Self::InvalidPrefixValue => "invalid @prefix value",
            Self::InvalidPropagateValue => "invalid @propagate value",
            Self::InvalidProtectedValue => "invalid @protected value",
            Self::InvalidRemoteContext => "invalid remote context",
            Self::InvalidReverseProperty => "invalid reverse property",
            Self::InvalidReversePropertyMap => "invalid reverse property map",
            Self::InvalidReversePropertyValue => "invalid reverse property value",
            Self::InvalidReverseValue => "invalid @reverse value",
            Self::InvalidScopedContext => "invalid scoped context",
            Self::InvalidSetOrListObject => "invalid set or list object",
            Self::InvalidTermDefinition => "invalid term definition",
            Self::InvalidTypeMapping => "invalid type mapping",
            Self::InvalidTypeValue => "invalid type value",
            Self::InvalidTypedValue => "invalid typed value",
            Self::InvalidValueObject => "invalid value object",
            Self::InvalidValueObjectValue => "invalid value object value",
            Self::InvalidVersionValue => "invalid @version value",
            Self::InvalidVocabMapping => "invalid vocab mapping",
            Self::KeywordRedefinition => "keyword redefinition",
            Self::LoadingDocumentFailed => "loading document failed",
            Self::LoadingRemoteContextFailed => "loading remote context failed",
            Self::ProtectedTermRedefinition => "protected term redefinition",
        }
    }

    fn kind(self) -> ErrorKind {
        match self {
            Self::InvalidBaseIri => ErrorKind::InvalidBase,
            Self::InvalidLanguageTaggedString => ErrorKind::InvalidLanguageTag,
            Self::LoadingRemoteContextFailed | Self::InvalidRemoteContext => {
                ErrorKind::RemoteContextFailed
            }
            _ => ErrorKind::Syntax,
        }
    }
}

impl fmt::Display for JsonLdErrorCode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_pointer() {
        let error = JsonLdSyntaxError::new(
            JsonLdErrorCode::InvalidIdValue,
            "@id value must be a string",
        )
        .at("/@graph/1/@id")
        .at("/@graph/1");
        assert_eq!(error.pointer(), "/@graph/1/@id");
        assert_eq!(error.code(), Some(JsonLdErrorCode::InvalidIdValue));
        assert_eq!(
            error.to_string(),
            "SyntaxError at /@graph/1/@id: @id value must be a string"
        );
        assert_eq!(io::Error::from(error).kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn remote_context_kinds() {
        assert_eq!(
            JsonLdSyntaxError::new(JsonLdErrorCode::LoadingRemoteContextFailed, "boom").kind(),
            ErrorKind::RemoteContextFailed
        );
        assert_eq!(
            JsonLdSyntaxError::new(JsonLdErrorCode::LoadingRemoteContextFailed, "no loader")
                .with_kind(ErrorKind::ContextLoaderUnavailable)
                .kind(),
            ErrorKind::ContextLoaderUnavailable
        );
    }
}
