use std::sync::Arc;
use std::{fmt, io};

/// The kinds of failures reported by the decoders and encoders.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input could not be split into tokens.
    Lexical,
    /// The tokens do not follow the format grammar.
    Syntax,
    /// An IRI is not valid or could not be resolved.
    InvalidIri,
    /// The base IRI is not an absolute IRI.
    InvalidBase,
    /// A prefixed name uses a prefix that has not been declared.
    UndefinedPrefix,
    /// A string escape sequence is not valid.
    InvalidEscape,
    /// A language tag is not a well-formed BCP 47 tag.
    InvalidLanguageTag,
    /// The same `rdf:ID` has been used twice with the same base IRI.
    DuplicateRdfId,
    /// The input uses a feature that is disabled or not supported.
    UnsupportedFeature,
    /// A remote JSON-LD context is referenced but no loader has been provided.
    ContextLoaderUnavailable,
    /// The remote JSON-LD context loader failed.
    RemoteContextFailed,
    /// A term given to an encoder is not valid.
    InvalidTerm,
    /// A statement can't be written in the target format.
    UnrepresentableInTargetFormat,
    /// Writing to the output failed.
    WriteFailure,
    /// Reading the input failed.
    ReadFailure,
}

impl ErrorKind {
    /// The name of the kind, as used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lexical => "LexicalError",
            Self::Syntax => "SyntaxError",
            Self::InvalidIri => "InvalidIRI",
            Self::InvalidBase => "InvalidBase",
            Self::UndefinedPrefix => "UndefinedPrefix",
            Self::InvalidEscape => "InvalidEscape",
            Self::InvalidLanguageTag => "InvalidLanguageTag",
            Self::DuplicateRdfId => "DuplicateRDFId",
            Self::UnsupportedFeature => "UnsupportedFeature",
            Self::ContextLoaderUnavailable => "ContextLoaderUnavailable",
            Self::RemoteContextFailed => "RemoteContextFailed",
            Self::InvalidTerm => "InvalidTerm",
            Self::UnrepresentableInTargetFormat => "UnrepresentableInTargetFormat",
            Self::WriteFailure => "WriteFailure",
            Self::ReadFailure => "ReadFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error raised by an encoder.
///
/// Encoder errors are fatal: once an encoder returned one, it returns a clone of it on every
/// following call, including `finish`. The error is hence cheap to clone.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SerializerError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Arc<io::Error>>,
}

impl SerializerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_term(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTerm, message)
    }

    pub fn unrepresentable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnrepresentableInTargetFormat, message)
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for SerializerError {
    #[inline]
    fn from(error: io::Error) -> Self {
        Self {
            kind: ErrorKind::WriteFailure,
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }
}

impl From<SerializerError> for io::Error {
    #[inline]
    fn from(error: SerializerError) -> Self {
        match error.kind {
            ErrorKind::WriteFailure => {
                let kind = error
                    .source
                    .as_deref()
                    .map_or(io::ErrorKind::Other, io::Error::kind);
                Self::new(kind, error)
            }
            _ => Self::new(io::ErrorKind::InvalidInput, error),
        }
    }
}
