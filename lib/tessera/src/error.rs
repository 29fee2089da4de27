use std::error::Error;
use std::io;
use std::ops::Range;
use tessera_jsonld::{JsonLdParseError, JsonLdSyntaxError};
use tessera_model::{ErrorKind, IriParseError, IriResolveError, SerializerError};
use tessera_turtle::{TextPosition, TurtleParseError, TurtleSyntaxError};
use tessera_xml::{RdfXmlParseError, RdfXmlSyntaxError};

/// Error returned during RDF format parsing.
#[derive(Debug, thiserror::Error)]
pub enum RdfParseError {
    /// I/O error during parsing (file not found...).
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An error in the file syntax.
    #[error(transparent)]
    Syntax(#[from] RdfSyntaxError),
}

impl RdfParseError {
    /// The kind of failure, [`ErrorKind::ReadFailure`] for I/O errors.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::ReadFailure,
            Self::Syntax(e) => e.kind(),
        }
    }
}

impl From<TurtleParseError> for RdfParseError {
    #[inline]
    fn from(error: TurtleParseError) -> Self {
        match error {
            TurtleParseError::Syntax(e) => Self::Syntax(e.into()),
            TurtleParseError::Io(e) => Self::Io(e),
        }
    }
}

impl From<RdfXmlParseError> for RdfParseError {
    #[inline]
    fn from(error: RdfXmlParseError) -> Self {
        match error {
            RdfXmlParseError::Syntax(e) => Self::Syntax(e.into()),
            RdfXmlParseError::Io(e) => Self::Io(e),
        }
    }
}

impl From<JsonLdParseError> for RdfParseError {
    #[inline]
    fn from(error: JsonLdParseError) -> Self {
        match error {
            JsonLdParseError::Syntax(e) => Self::Syntax(e.into()),
            JsonLdParseError::Io(e) => Self::Io(e),
        }
    }
}

impl From<CodecOptionsError> for RdfParseError {
    #[inline]
    fn from(error: CodecOptionsError) -> Self {
        Self::Syntax(error.into())
    }
}

impl From<RdfParseError> for io::Error {
    #[inline]
    fn from(error: RdfParseError) -> Self {
        match error {
            RdfParseError::Io(error) => error,
            RdfParseError::Syntax(error) => error.into(),
        }
    }
}

/// An error in the syntax of the parsed file.
///
/// The position of the error depends on the format: a [`TextPosition`] range for the Turtle family,
/// an element path for RDF/XML and a JSON pointer for JSON-LD.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct RdfSyntaxError(SyntaxErrorKind);

/// An error in the syntax of the parsed file.
#[derive(Debug, thiserror::Error)]
enum SyntaxErrorKind {
    #[error(transparent)]
    Turtle(#[from] TurtleSyntaxError),
    #[error(transparent)]
    RdfXml(#[from] RdfXmlSyntaxError),
    #[error(transparent)]
    JsonLd(#[from] JsonLdSyntaxError),
    #[error(transparent)]
    Options(#[from] CodecOptionsError),
}

impl RdfSyntaxError {
    /// The kind of failure.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            SyntaxErrorKind::Turtle(e) => e.kind(),
            SyntaxErrorKind::RdfXml(e) => e.kind(),
            SyntaxErrorKind::JsonLd(e) => e.kind(),
            SyntaxErrorKind::Options(e) => e.kind(),
        }
    }

    /// The location of the error inside of the file, for N-Triples, N-Quads, Turtle and TriG.
    #[inline]
    pub fn location(&self) -> Option<Range<TextPosition>> {
        match &self.0 {
            SyntaxErrorKind::Turtle(e) => Some(e.location()),
            _ => None,
        }
    }

    /// The path of the faulty element, like `/rdf:RDF[1]/rdf:Description[2]`, for RDF/XML.
    #[inline]
    pub fn element_path(&self) -> Option<&str> {
        match &self.0 {
            SyntaxErrorKind::RdfXml(e) => Some(e.path()),
            _ => None,
        }
    }

    /// The [JSON pointer](https://www.rfc-editor.org/rfc/rfc6901) to the faulty value, for JSON-LD.
    #[inline]
    pub fn json_pointer(&self) -> Option<&str> {
        match &self.0 {
            SyntaxErrorKind::JsonLd(e) => Some(e.pointer()),
            _ => None,
        }
    }
}

impl From<TurtleSyntaxError> for RdfSyntaxError {
    #[inline]
    fn from(error: TurtleSyntaxError) -> Self {
        Self(error.into())
    }
}

impl From<RdfXmlSyntaxError> for RdfSyntaxError {
    #[inline]
    fn from(error: RdfXmlSyntaxError) -> Self {
        Self(error.into())
    }
}

impl From<JsonLdSyntaxError> for RdfSyntaxError {
    #[inline]
    fn from(error: JsonLdSyntaxError) -> Self {
        Self(error.into())
    }
}

impl From<CodecOptionsError> for RdfSyntaxError {
    #[inline]
    fn from(error: CodecOptionsError) -> Self {
        Self(error.into())
    }
}

impl From<RdfSyntaxError> for io::Error {
    #[inline]
    fn from(error: RdfSyntaxError) -> Self {
        match error.0 {
            SyntaxErrorKind::Turtle(e) => e.into(),
            SyntaxErrorKind::RdfXml(e) => e.into(),
            SyntaxErrorKind::JsonLd(e) => e.into(),
            SyntaxErrorKind::Options(e) => Self::new(io::ErrorKind::InvalidInput, e),
        }
    }
}

/// An invalid value given to [`CodecOptions`](crate::CodecOptions).
#[derive(Debug, thiserror::Error)]
pub enum CodecOptionsError {
    /// The base IRI is not an absolute IRI.
    #[error("Invalid base IRI '{iri}': {error}")]
    InvalidBase {
        iri: String,
        #[source]
        error: Box<dyn Error + Send + Sync + 'static>,
    },
    /// A prefix is bound to an invalid IRI.
    #[error("Invalid IRI '{iri}' for the prefix '{prefix}': {error}")]
    InvalidPrefix {
        prefix: String,
        iri: String,
        #[source]
        error: IriParseError,
    },
}

impl CodecOptionsError {
    /// [`ErrorKind::InvalidBase`] or [`ErrorKind::InvalidIri`].
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBase { .. } => ErrorKind::InvalidBase,
            Self::InvalidPrefix { .. } => ErrorKind::InvalidIri,
        }
    }
}

impl From<IriResolveError> for CodecOptionsError {
    #[inline]
    fn from(error: IriResolveError) -> Self {
        Self::InvalidBase {
            iri: error.iri().into(),
            error: Box::new(error),
        }
    }
}

impl From<CodecOptionsError> for SerializerError {
    #[inline]
    fn from(error: CodecOptionsError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}
