//! Utilities to read RDF graphs and datasets.

use crate::error::{RdfParseError, RdfSyntaxError};
use crate::format::RdfFormat;
use std::error::Error;
use std::io::Read;
use std::sync::Arc;
use tessera_jsonld::{
    JsonLdParser, JsonLdRemoteDocument, LoadDocumentCallback, ReaderJsonLdParser,
    SliceJsonLdParser,
};
use tessera_model::{IriParseError, IriResolveError, Quad};
use tessera_turtle::nquads::{ReaderNQuadsParser, SliceNQuadsParser};
use tessera_turtle::ntriples::{ReaderNTriplesParser, SliceNTriplesParser};
use tessera_turtle::trig::{ReaderTriGParser, SliceTriGParser};
use tessera_turtle::turtle::{ReaderTurtleParser, SliceTurtleParser};
use tessera_turtle::{NQuadsParser, NTriplesParser, TriGParser, TurtleParser};
use tessera_xml::{RdfXmlParser, ReaderRdfXmlParser, SliceRdfXmlParser};

/// Parsers for RDF serialization formats.
///
/// It currently supports the following formats:
/// * [JSON-LD](https://www.w3.org/TR/json-ld/) ([`RdfFormat::JsonLd`])
/// * [N-Quads](https://www.w3.org/TR/n-quads/) ([`RdfFormat::NQuads`])
/// * [N-Triples](https://www.w3.org/TR/n-triples/) ([`RdfFormat::NTriples`])
/// * [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) ([`RdfFormat::RdfXml`])
/// * [TriG](https://www.w3.org/TR/trig/) ([`RdfFormat::TriG`])
/// * [Turtle](https://www.w3.org/TR/turtle/) ([`RdfFormat::Turtle`])
///
/// Triples read from formats without named graphs are put in the default graph.
///
/// Note the useful options:
/// - [`with_base_iri`](Self::with_base_iri) to resolve the relative IRIs.
/// - [`lenient`](Self::lenient) to skip some validations if the file is already known to be valid.
///
/// ```
/// use tessera::{RdfFormat, RdfParser};
///
/// let file = "<http://example.com/s> <http://example.com/p> <http://example.com/o> .";
///
/// let parser = RdfParser::from_format(RdfFormat::NTriples);
/// let quads = parser.for_reader(file.as_bytes()).collect::<Result<Vec<_>,_>>()?;
///
/// assert_eq!(quads.len(), 1);
/// assert_eq!(quads[0].subject.to_string(), "<http://example.com/s>");
/// # std::io::Result::Ok(())
/// ```
#[must_use]
#[derive(Clone)]
pub struct RdfParser {
    inner: RdfParserKind,
}

#[derive(Clone)]
enum RdfParserKind {
    JsonLd(JsonLdParser),
    NQuads(NQuadsParser),
    NTriples(NTriplesParser),
    RdfXml(RdfXmlParser),
    TriG(TriGParser),
    Turtle(TurtleParser),
}

impl RdfParser {
    /// Builds a parser for the given format.
    #[inline]
    pub fn from_format(format: RdfFormat) -> Self {
        Self {
            inner: match format {
                RdfFormat::JsonLd => RdfParserKind::JsonLd(JsonLdParser::new()),
                RdfFormat::NQuads => RdfParserKind::NQuads(NQuadsParser::new()),
                RdfFormat::NTriples => RdfParserKind::NTriples(NTriplesParser::new()),
                RdfFormat::RdfXml => RdfParserKind::RdfXml(RdfXmlParser::new()),
                RdfFormat::TriG => RdfParserKind::TriG(TriGParser::new()),
                RdfFormat::Turtle => RdfParserKind::Turtle(TurtleParser::new()),
            },
        }
    }

    /// The format the parser uses.
    ///
    /// ```
    /// use tessera::{RdfParser, RdfFormat};
    ///
    /// assert_eq!(RdfParser::from_format(RdfFormat::Turtle).format(), RdfFormat::Turtle);
    /// ```
    pub fn format(&self) -> RdfFormat {
        match &self.inner {
            RdfParserKind::JsonLd(_) => RdfFormat::JsonLd,
            RdfParserKind::NQuads(_) => RdfFormat::NQuads,
            RdfParserKind::NTriples(_) => RdfFormat::NTriples,
            RdfParserKind::RdfXml(_) => RdfFormat::RdfXml,
            RdfParserKind::TriG(_) => RdfFormat::TriG,
            RdfParserKind::Turtle(_) => RdfFormat::Turtle,
        }
    }

    /// Provides an IRI that could be used to resolve the file relative IRIs.
    ///
    /// N-Triples and N-Quads only contain absolute IRIs and ignore it.
    ///
    /// ```
    /// use tessera::{RdfFormat, RdfParser};
    ///
    /// let file = "</s> </p> </o> .";
    ///
    /// let parser = RdfParser::from_format(RdfFormat::Turtle).with_base_iri("http://example.com")?;
    /// let quads = parser.for_reader(file.as_bytes()).collect::<Result<Vec<_>,_>>()?;
    ///
    /// assert_eq!(quads.len(), 1);
    /// assert_eq!(quads[0].subject.to_string(), "<http://example.com/s>");
    /// # Result::<_,Box<dyn std::error::Error>>::Ok(())
    /// ```
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriResolveError> {
        self.inner = match self.inner {
            RdfParserKind::JsonLd(p) => RdfParserKind::JsonLd(p.with_base_iri(base_iri)?),
            RdfParserKind::NTriples(p) => RdfParserKind::NTriples(p),
            RdfParserKind::NQuads(p) => RdfParserKind::NQuads(p),
            RdfParserKind::RdfXml(p) => RdfParserKind::RdfXml(p.with_base_iri(base_iri)?),
            RdfParserKind::TriG(p) => RdfParserKind::TriG(p.with_base_iri(base_iri)?),
            RdfParserKind::Turtle(p) => RdfParserKind::Turtle(p.with_base_iri(base_iri)?),
        };
        Ok(self)
    }

    /// Declares a prefix as if it was declared at the start of the file.
    ///
    /// Only Turtle and TriG use it.
    #[inline]
    pub fn with_prefix(
        mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<Self, IriParseError> {
        self.inner = match self.inner {
            RdfParserKind::TriG(p) => RdfParserKind::TriG(p.with_prefix(prefix_name, prefix_iri)?),
            RdfParserKind::Turtle(p) => {
                RdfParserKind::Turtle(p.with_prefix(prefix_name, prefix_iri)?)
            }
            inner => inner,
        };
        Ok(self)
    }

    /// Skips IRI and language tag validation.
    ///
    /// Note that if the file is actually not valid, then broken RDF might be emitted by the parser.
    #[inline]
    pub fn lenient(mut self) -> Self {
        self.inner = match self.inner {
            RdfParserKind::JsonLd(p) => RdfParserKind::JsonLd(p.lenient()),
            RdfParserKind::NTriples(p) => RdfParserKind::NTriples(p.lenient()),
            RdfParserKind::NQuads(p) => RdfParserKind::NQuads(p.lenient()),
            RdfParserKind::RdfXml(p) => RdfParserKind::RdfXml(p.lenient()),
            RdfParserKind::TriG(p) => RdfParserKind::TriG(p.lenient()),
            RdfParserKind::Turtle(p) => RdfParserKind::Turtle(p.lenient()),
        };
        self
    }

    /// Rejects RDF-star embedded triples with [`ErrorKind::UnsupportedFeature`](tessera_model::ErrorKind::UnsupportedFeature).
    ///
    /// Formats without RDF-star syntax are not affected.
    #[inline]
    pub fn without_rdf_star(mut self) -> Self {
        self.inner = match self.inner {
            RdfParserKind::NTriples(p) => RdfParserKind::NTriples(p.without_rdf_star()),
            RdfParserKind::NQuads(p) => RdfParserKind::NQuads(p.without_rdf_star()),
            RdfParserKind::TriG(p) => RdfParserKind::TriG(p.without_rdf_star()),
            RdfParserKind::Turtle(p) => RdfParserKind::Turtle(p.without_rdf_star()),
            inner => inner,
        };
        self
    }

    /// Allows blank nodes in predicate position in N-Triples, N-Quads, Turtle and TriG.
    #[inline]
    pub fn with_generalized_rdf(mut self) -> Self {
        self.inner = match self.inner {
            RdfParserKind::NTriples(p) => RdfParserKind::NTriples(p.with_generalized_rdf()),
            RdfParserKind::NQuads(p) => RdfParserKind::NQuads(p.with_generalized_rdf()),
            RdfParserKind::TriG(p) => RdfParserKind::TriG(p.with_generalized_rdf()),
            RdfParserKind::Turtle(p) => RdfParserKind::Turtle(p.with_generalized_rdf()),
            inner => inner,
        };
        self
    }

    /// Sets the function loading the remote JSON-LD contexts.
    ///
    /// Only JSON-LD uses it.
    #[inline]
    pub fn with_load_document_callback(
        self,
        callback: impl Fn(&str) -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.with_shared_load_document_callback(Arc::new(callback))
    }

    pub(crate) fn with_shared_load_document_callback(
        mut self,
        callback: Arc<LoadDocumentCallback>,
    ) -> Self {
        if let RdfParserKind::JsonLd(p) = self.inner {
            self.inner = RdfParserKind::JsonLd(p.with_load_document_callback(
                move |url: &str| -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>> {
                    callback(url)
                },
            ));
        }
        self
    }

    /// Parses from a [`Read`] implementation and returns an iterator of quads.
    ///
    /// Reads are buffered.
    ///
    /// ```
    /// use tessera::{RdfFormat, RdfParser};
    ///
    /// let file = "<http://example.com/s> <http://example.com/p> <http://example.com/o> .";
    ///
    /// let parser = RdfParser::from_format(RdfFormat::NTriples);
    /// let quads = parser.for_reader(file.as_bytes()).collect::<Result<Vec<_>,_>>()?;
    ///
    /// assert_eq!(quads.len(), 1);
    /// assert_eq!(quads[0].subject.to_string(), "<http://example.com/s>");
    /// # std::io::Result::Ok(())
    /// ```
    pub fn for_reader<R: Read>(self, reader: R) -> ReaderQuadParser<R> {
        ReaderQuadParser {
            inner: match self.inner {
                RdfParserKind::JsonLd(p) => ReaderQuadParserKind::JsonLd(p.for_reader(reader)),
                RdfParserKind::NQuads(p) => ReaderQuadParserKind::NQuads(p.for_reader(reader)),
                RdfParserKind::NTriples(p) => {
                    ReaderQuadParserKind::NTriples(p.for_reader(reader))
                }
                RdfParserKind::RdfXml(p) => ReaderQuadParserKind::RdfXml(p.for_reader(reader)),
                RdfParserKind::TriG(p) => ReaderQuadParserKind::TriG(p.for_reader(reader)),
                RdfParserKind::Turtle(p) => ReaderQuadParserKind::Turtle(p.for_reader(reader)),
            },
        }
    }

    /// Parses from a byte slice and returns an iterator of quads.
    ///
    /// ```
    /// use tessera::{RdfFormat, RdfParser};
    ///
    /// let file = "<http://example.com/s> <http://example.com/p> <http://example.com/o> <http://example.com/g> .";
    ///
    /// let quads = RdfParser::from_format(RdfFormat::NQuads)
    ///     .for_slice(file)
    ///     .collect::<Result<Vec<_>,_>>()?;
    ///
    /// assert_eq!(quads.len(), 1);
    /// assert_eq!(quads[0].graph_name.to_string(), "<http://example.com/g>");
    /// # Result::<_,Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn for_slice(self, slice: &(impl AsRef<[u8]> + ?Sized)) -> SliceQuadParser<'_> {
        let slice = slice.as_ref();
        SliceQuadParser {
            inner: match self.inner {
                RdfParserKind::JsonLd(p) => SliceQuadParserKind::JsonLd(p.for_slice(slice)),
                RdfParserKind::NQuads(p) => SliceQuadParserKind::NQuads(p.for_slice(slice)),
                RdfParserKind::NTriples(p) => SliceQuadParserKind::NTriples(p.for_slice(slice)),
                RdfParserKind::RdfXml(p) => SliceQuadParserKind::RdfXml(p.for_slice(slice)),
                RdfParserKind::TriG(p) => SliceQuadParserKind::TriG(p.for_slice(slice)),
                RdfParserKind::Turtle(p) => SliceQuadParserKind::Turtle(p.for_slice(slice)),
            },
        }
    }
}

impl From<RdfFormat> for RdfParser {
    fn from(format: RdfFormat) -> Self {
        Self::from_format(format)
    }
}

/// Parses a RDF file from a [`Read`] implementation.
///
/// Can be built using [`RdfParser::for_reader`].
#[must_use]
pub struct ReaderQuadParser<R: Read> {
    inner: ReaderQuadParserKind<R>,
}

enum ReaderQuadParserKind<R: Read> {
    JsonLd(ReaderJsonLdParser<R>),
    NQuads(ReaderNQuadsParser<R>),
    NTriples(ReaderNTriplesParser<R>),
    RdfXml(ReaderRdfXmlParser<R>),
    TriG(ReaderTriGParser<R>),
    Turtle(ReaderTurtleParser<R>),
}

impl<R: Read> ReaderQuadParser<R> {
    /// The prefixes declared so far, for the formats that have them.
    pub fn prefixes(&self) -> Vec<(&str, &str)> {
        match &self.inner {
            ReaderQuadParserKind::JsonLd(p) => p.prefixes().collect(),
            ReaderQuadParserKind::RdfXml(p) => p.prefixes().collect(),
            ReaderQuadParserKind::TriG(p) => p.prefixes().collect(),
            ReaderQuadParserKind::Turtle(p) => p.prefixes().collect(),
            ReaderQuadParserKind::NQuads(_) | ReaderQuadParserKind::NTriples(_) => Vec::new(),
        }
    }

    /// The base IRI in use, for the formats that have one.
    pub fn base_iri(&self) -> Option<&str> {
        match &self.inner {
            ReaderQuadParserKind::JsonLd(p) => p.base_iri(),
            ReaderQuadParserKind::RdfXml(p) => p.base_iri(),
            ReaderQuadParserKind::TriG(p) => p.base_iri(),
            ReaderQuadParserKind::Turtle(p) => p.base_iri(),
            ReaderQuadParserKind::NQuads(_) | ReaderQuadParserKind::NTriples(_) => None,
        }
    }
}

impl<R: Read> Iterator for ReaderQuadParser<R> {
    type Item = Result<Quad, RdfParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match &mut self.inner {
            ReaderQuadParserKind::JsonLd(parser) => parser.next()?.map_err(Into::into),
            ReaderQuadParserKind::NQuads(parser) => parser.next()?.map_err(Into::into),
            ReaderQuadParserKind::NTriples(parser) => match parser.next()? {
                Ok(triple) => Ok(triple.into()),
                Err(e) => Err(e.into()),
            },
            ReaderQuadParserKind::RdfXml(parser) => match parser.next()? {
                Ok(triple) => Ok(triple.into()),
                Err(e) => Err(e.into()),
            },
            ReaderQuadParserKind::TriG(parser) => parser.next()?.map_err(Into::into),
            ReaderQuadParserKind::Turtle(parser) => match parser.next()? {
                Ok(triple) => Ok(triple.into()),
                Err(e) => Err(e.into()),
            },
        })
    }
}

/// Parses a RDF file from a byte slice.
///
/// Can be built using [`RdfParser::for_slice`].
#[must_use]
pub struct SliceQuadParser<'a> {
    inner: SliceQuadParserKind<'a>,
}

enum SliceQuadParserKind<'a> {
    JsonLd(SliceJsonLdParser<'a>),
    NQuads(SliceNQuadsParser<'a>),
    NTriples(SliceNTriplesParser<'a>),
    RdfXml(SliceRdfXmlParser<'a>),
    TriG(SliceTriGParser<'a>),
    Turtle(SliceTurtleParser<'a>),
}

impl Iterator for SliceQuadParser<'_> {
    type Item = Result<Quad, RdfSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match &mut self.inner {
            SliceQuadParserKind::JsonLd(parser) => parser.next()?.map_err(Into::into),
            SliceQuadParserKind::NQuads(parser) => parser.next()?.map_err(Into::into),
            SliceQuadParserKind::NTriples(parser) => match parser.next()? {
                Ok(triple) => Ok(triple.into()),
                Err(e) => Err(e.into()),
            },
            SliceQuadParserKind::RdfXml(parser) => match parser.next()? {
                Ok(triple) => Ok(triple.into()),
                Err(e) => Err(e.into()),
            },
            SliceQuadParserKind::TriG(parser) => parser.next()?.map_err(Into::into),
            SliceQuadParserKind::Turtle(parser) => match parser.next()? {
                Ok(triple) => Ok(triple.into()),
                Err(e) => Err(e.into()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::{ErrorKind, GraphName, NamedNode};

    #[test]
    fn triples_land_in_the_default_graph() -> Result<(), Box<dyn Error>> {
        for (format, file) in [
            (RdfFormat::Turtle, "<http://e/s> <http://e/p> <http://e/o> ."),
            (RdfFormat::NTriples, "<http://e/s> <http://e/p> <http://e/o> ."),
            (
                RdfFormat::RdfXml,
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description rdf:about="http://e/s"><p xmlns="http://e/" rdf:resource="http://e/o"/></rdf:Description></rdf:RDF>"#,
            ),
        ] {
            let quads = RdfParser::from_format(format)
                .for_slice(file)
                .collect::<Result<Vec<_>, _>>()?;
            assert_eq!(quads.len(), 1, "{format}");
            assert_eq!(quads[0].graph_name, GraphName::DefaultGraph);
            assert_eq!(quads[0].object, NamedNode::new("http://e/o")?.into());
        }
        Ok(())
    }

    #[test]
    fn reader_reports_prefixes() -> Result<(), Box<dyn Error>> {
        let mut parser = RdfParser::from_format(RdfFormat::Turtle)
            .for_reader("@prefix ex: <http://e/> . ex:s ex:p ex:o .".as_bytes());
        assert!(parser.next().transpose()?.is_some());
        assert_eq!(parser.prefixes(), [("ex", "http://e/")]);
        assert_eq!(parser.base_iri(), None);
        Ok(())
    }

    #[test]
    fn syntax_errors_carry_positions() {
        let error = RdfParser::from_format(RdfFormat::NTriples)
            .for_slice("<http://e/s> <http://e/p> .")
            .next()
            .and_then(Result::err);
        let Some(error) = error else {
            panic!("a syntax error is expected");
        };
        assert_eq!(error.kind(), ErrorKind::Syntax);
        assert!(error.location().is_some());
        assert_eq!(error.json_pointer(), None);
    }
}
