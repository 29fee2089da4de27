use oxilangtag::LanguageTagParseError;
use std::error::Error;
use std::sync::Arc;
use std::{fmt, io};
use tessera_model::{ErrorKind, IriParseError, IriResolveError};

/// Error returned during RDF/XML parsing.
///
/// It is the union of [`RdfXmlSyntaxError`] and [`io::Error`].
#[derive(Debug, thiserror::Error)]
pub enum RdfXmlParseError {
    /// I/O error during parsing (file not found...).
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An error in the file syntax.
    #[error(transparent)]
    Syntax(#[from] RdfXmlSyntaxError),
}

impl RdfXmlParseError {
    /// The kind of failure, [`ErrorKind::ReadFailure`] for I/O errors.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::ReadFailure,
            Self::Syntax(e) => e.kind(),
        }
    }
}

impl From<RdfXmlParseError> for io::Error {
    #[inline]
    fn from(error: RdfXmlParseError) -> Self {
        match error {
            RdfXmlParseError::Io(error) => error,
            RdfXmlParseError::Syntax(error) => error.into(),
        }
    }
}

impl From<quick_xml::Error> for RdfXmlParseError {
    #[inline]
    fn from(error: quick_xml::Error) -> Self {
        match error {
            quick_xml::Error::Io(error) => {
                Self::Io(Arc::try_unwrap(error).unwrap_or_else(|e| io::Error::new(e.kind(), e)))
            }
            _ => Self::Syntax(RdfXmlSyntaxError::xml(error)),
        }
    }
}

impl From<IriResolveError> for RdfXmlParseError {
    #[inline]
    fn from(error: IriResolveError) -> Self {
        Self::Syntax(error.into())
    }
}

/// An error in the syntax of the parsed file.
///
/// Besides its [`ErrorKind`] and message it carries the path of the XML element being read
/// (for example `/rdf:RDF[1]/rdf:Description[2]/ex:name[1]`) and the byte offset the reader had reached.
#[derive(Debug)]
pub struct RdfXmlSyntaxError {
    kind: ErrorKind,
    message: String,
    path: String,
    offset: u64,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl RdfXmlSyntaxError {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: String::new(),
            offset: 0,
            source: None,
        }
    }

    /// Builds a [`ErrorKind::Syntax`] error from a printable error message.
    #[inline]
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub(crate) fn xml(error: quick_xml::Error) -> Self {
        Self::msg(error.to_string()).with_source(error)
    }

    pub(crate) fn invalid_iri(iri: &str, error: IriParseError) -> Self {
        Self::new(
            ErrorKind::InvalidIri,
            format!("error while parsing IRI '{iri}': {error}"),
        )
        .with_source(error)
    }

    pub(crate) fn invalid_language_tag(tag: &str, error: LanguageTagParseError) -> Self {
        Self::new(
            ErrorKind::InvalidLanguageTag,
            format!("error while parsing language tag '{tag}': {error}"),
        )
        .with_source(error)
    }

    fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attaches the position of the parser to the error.
    pub(crate) fn located(mut self, path: String, offset: u64) -> Self {
        self.path = path;
        self.offset = offset;
        self
    }

    /// The kind of failure.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The path of the XML element in which the error occurred, empty if it is outside of any element.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The byte offset of the parser when the error has been found.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl From<IriResolveError> for RdfXmlSyntaxError {
    #[inline]
    fn from(error: IriResolveError) -> Self {
        Self::new(error.kind(), error.to_string()).with_source(error)
    }
}

impl fmt::Display for RdfXmlSyntaxError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} at byte {}: {}", self.kind, self.offset, self.message)
        } else {
            write!(
                f,
                "{} in {} (byte {}): {}",
                self.kind, self.path, self.offset, self.message
            )
        }
    }
}

impl Error for RdfXmlSyntaxError {
    #[inline]
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref()),
            None => None,
        }
    }
}

impl From<RdfXmlSyntaxError> for io::Error {
    #[inline]
    fn from(error: RdfXmlSyntaxError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_path() {
        let error = RdfXmlSyntaxError::new(ErrorKind::DuplicateRdfId, "http://e/#a has already been used as rdf:ID value")
            .located("/rdf:RDF[1]/rdf:Description[2]".into(), 120);
        assert_eq!(
            error.to_string(),
            "DuplicateRDFId in /rdf:RDF[1]/rdf:Description[2] (byte 120): http://e/#a has already been used as rdf:ID value"
        );
        assert_eq!(io::Error::from(error).kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn io_errors_are_unwrapped() {
        let error = RdfXmlParseError::from(quick_xml::Error::Io(Arc::new(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        ))));
        assert_eq!(error.kind(), ErrorKind::ReadFailure);
        assert_eq!(io::Error::from(error).kind(), io::ErrorKind::ConnectionReset);
    }
}
