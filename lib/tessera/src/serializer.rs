//! Utilities to write RDF graphs and datasets.

use crate::format::RdfFormat;
use std::io::Write;
use tessera_jsonld::{JsonLdSerializer, WriterJsonLdSerializer};
use tessera_model::{IriParseError, Quad, SerializerError, Triple};
use tessera_turtle::nquads::WriterNQuadsSerializer;
use tessera_turtle::ntriples::WriterNTriplesSerializer;
use tessera_turtle::trig::WriterTriGSerializer;
use tessera_turtle::turtle::WriterTurtleSerializer;
use tessera_turtle::{NQuadsSerializer, NTriplesSerializer, TriGSerializer, TurtleSerializer};
use tessera_xml::{RdfXmlSerializer, WriterRdfXmlSerializer};

/// A serializer for RDF serialization formats.
///
/// It currently supports the following formats:
/// * [JSON-LD](https://www.w3.org/TR/json-ld/) ([`RdfFormat::JsonLd`])
/// * [N-Quads](https://www.w3.org/TR/n-quads/) ([`RdfFormat::NQuads`])
/// * [N-Triples](https://www.w3.org/TR/n-triples/) ([`RdfFormat::NTriples`])
/// * [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) ([`RdfFormat::RdfXml`])
/// * [TriG](https://www.w3.org/TR/trig/) ([`RdfFormat::TriG`])
/// * [Turtle](https://www.w3.org/TR/turtle/) ([`RdfFormat::Turtle`])
///
/// Quads in a named graph given to a serializer of a format without named graphs
/// fail with [`ErrorKind::UnrepresentableInTargetFormat`](tessera_model::ErrorKind::UnrepresentableInTargetFormat).
///
/// ```
/// use tessera::{RdfFormat, RdfSerializer};
/// use tessera::model::{NamedNode, Quad};
///
/// let mut serializer = RdfSerializer::from_format(RdfFormat::NQuads).for_writer(Vec::new());
/// serializer.serialize_quad(&Quad::new(
///     NamedNode::new("http://example.com/s")?,
///     NamedNode::new("http://example.com/p")?,
///     NamedNode::new("http://example.com/o")?,
///     NamedNode::new("http://example.com/g")?,
/// ))?;
/// assert_eq!(
///     serializer.finish()?,
///     b"<http://example.com/s> <http://example.com/p> <http://example.com/o> <http://example.com/g> .\n"
/// );
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[must_use]
#[derive(Clone)]
pub struct RdfSerializer {
    inner: RdfSerializerKind,
}

#[derive(Clone)]
enum RdfSerializerKind {
    JsonLd(JsonLdSerializer),
    NQuads(NQuadsSerializer),
    NTriples(NTriplesSerializer),
    RdfXml(RdfXmlSerializer),
    TriG(TriGSerializer),
    Turtle(TurtleSerializer),
}

impl RdfSerializer {
    /// Builds a serializer for the given format.
    #[inline]
    pub fn from_format(format: RdfFormat) -> Self {
        Self {
            inner: match format {
                RdfFormat::JsonLd => RdfSerializerKind::JsonLd(JsonLdSerializer::new()),
                RdfFormat::NQuads => RdfSerializerKind::NQuads(NQuadsSerializer::new()),
                RdfFormat::NTriples => RdfSerializerKind::NTriples(NTriplesSerializer::new()),
                RdfFormat::RdfXml => RdfSerializerKind::RdfXml(RdfXmlSerializer::new()),
                RdfFormat::TriG => RdfSerializerKind::TriG(TriGSerializer::new()),
                RdfFormat::Turtle => RdfSerializerKind::Turtle(TurtleSerializer::new()),
            },
        }
    }

    /// The format the serializer serializes to.
    ///
    /// ```
    /// use tessera::{RdfFormat, RdfSerializer};
    ///
    /// assert_eq!(
    ///     RdfSerializer::from_format(RdfFormat::Turtle).format(),
    ///     RdfFormat::Turtle
    /// )
    /// ```
    pub fn format(&self) -> RdfFormat {
        match &self.inner {
            RdfSerializerKind::JsonLd(_) => RdfFormat::JsonLd,
            RdfSerializerKind::NQuads(_) => RdfFormat::NQuads,
            RdfSerializerKind::NTriples(_) => RdfFormat::NTriples,
            RdfSerializerKind::RdfXml(_) => RdfFormat::RdfXml,
            RdfSerializerKind::TriG(_) => RdfFormat::TriG,
            RdfSerializerKind::Turtle(_) => RdfFormat::Turtle,
        }
    }

    /// If the format supports it, sets a prefix.
    ///
    /// ```
    /// use tessera::model::vocab::rdf;
    /// use tessera::model::{NamedNodeRef, Triple};
    /// use tessera::{RdfFormat, RdfSerializer};
    ///
    /// let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle)
    ///     .with_prefix("schema", "http://schema.org/")?
    ///     .for_writer(Vec::new());
    /// serializer.serialize_triple(&Triple::new(
    ///     NamedNodeRef::new("http://example.com/s")?,
    ///     rdf::TYPE,
    ///     NamedNodeRef::new("http://schema.org/Person")?,
    /// ))?;
    /// assert_eq!(
    ///     serializer.finish()?,
    ///     b"@prefix schema: <http://schema.org/> .\n<http://example.com/s> a schema:Person .\n"
    /// );
    /// # Result::<_,Box<dyn std::error::Error>>::Ok(())
    /// ```
    #[inline]
    pub fn with_prefix(
        mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<Self, IriParseError> {
        self.inner = match self.inner {
            RdfSerializerKind::JsonLd(s) => {
                RdfSerializerKind::JsonLd(s.with_prefix(prefix_name, prefix_iri)?)
            }
            RdfSerializerKind::NQuads(s) => RdfSerializerKind::NQuads(s),
            RdfSerializerKind::NTriples(s) => RdfSerializerKind::NTriples(s),
            RdfSerializerKind::RdfXml(s) => {
                RdfSerializerKind::RdfXml(s.with_prefix(prefix_name, prefix_iri)?)
            }
            RdfSerializerKind::TriG(s) => {
                RdfSerializerKind::TriG(s.with_prefix(prefix_name, prefix_iri)?)
            }
            RdfSerializerKind::Turtle(s) => {
                RdfSerializerKind::Turtle(s.with_prefix(prefix_name, prefix_iri)?)
            }
        };
        Ok(self)
    }

    /// If the format supports it, writes the base IRI declaration.
    ///
    /// IRIs are always written absolute.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.inner = match self.inner {
            RdfSerializerKind::JsonLd(s) => RdfSerializerKind::JsonLd(s.with_base_iri(base_iri)?),
            RdfSerializerKind::NQuads(s) => RdfSerializerKind::NQuads(s),
            RdfSerializerKind::NTriples(s) => RdfSerializerKind::NTriples(s),
            RdfSerializerKind::RdfXml(s) => RdfSerializerKind::RdfXml(s.with_base_iri(base_iri)?),
            RdfSerializerKind::TriG(s) => RdfSerializerKind::TriG(s.with_base_iri(base_iri)?),
            RdfSerializerKind::Turtle(s) => RdfSerializerKind::Turtle(s.with_base_iri(base_iri)?),
        };
        Ok(self)
    }

    /// Allows blank nodes in predicate position in N-Triples, N-Quads, Turtle and TriG.
    #[inline]
    pub fn with_generalized_rdf(mut self) -> Self {
        self.inner = match self.inner {
            RdfSerializerKind::NQuads(s) => RdfSerializerKind::NQuads(s.with_generalized_rdf()),
            RdfSerializerKind::NTriples(s) => {
                RdfSerializerKind::NTriples(s.with_generalized_rdf())
            }
            RdfSerializerKind::TriG(s) => RdfSerializerKind::TriG(s.with_generalized_rdf()),
            RdfSerializerKind::Turtle(s) => RdfSerializerKind::Turtle(s.with_generalized_rdf()),
            inner => inner,
        };
        self
    }

    /// Serializes to a [`Write`] implementation.
    ///
    /// <div class="warning">
    ///
    /// Do not forget to run the [`finish`](WriterQuadSerializer::finish()) method to properly write the last bytes of the file.</div>
    ///
    /// <div class="warning">
    ///
    /// This writer does unbuffered writes. You might want to use [`BufWriter`](std::io::BufWriter) to avoid that.</div>
    pub fn for_writer<W: Write>(self, writer: W) -> WriterQuadSerializer<W> {
        WriterQuadSerializer {
            inner: match self.inner {
                RdfSerializerKind::JsonLd(s) => WriterQuadSerializerKind::JsonLd(s.for_writer(writer)),
                RdfSerializerKind::NQuads(s) => WriterQuadSerializerKind::NQuads(s.for_writer(writer)),
                RdfSerializerKind::NTriples(s) => {
                    WriterQuadSerializerKind::NTriples(s.for_writer(writer))
                }
                RdfSerializerKind::RdfXml(s) => WriterQuadSerializerKind::RdfXml(s.for_writer(writer)),
                RdfSerializerKind::TriG(s) => WriterQuadSerializerKind::TriG(s.for_writer(writer)),
                RdfSerializerKind::Turtle(s) => WriterQuadSerializerKind::Turtle(s.for_writer(writer)),
            },
        }
    }
}

impl From<RdfFormat> for RdfSerializer {
    fn from(format: RdfFormat) -> Self {
        Self::from_format(format)
    }
}

/// Serializes quads or triples to a [`Write`] implementation.
///
/// Can be built using [`RdfSerializer::for_writer`].
///
/// <div class="warning">
///
/// Do not forget to run the [`finish`](WriterQuadSerializer::finish()) method to properly write the last bytes of the file.</div>
#[must_use]
pub struct WriterQuadSerializer<W: Write> {
    inner: WriterQuadSerializerKind<W>,
}

enum WriterQuadSerializerKind<W: Write> {
    JsonLd(WriterJsonLdSerializer<W>),
    NQuads(WriterNQuadsSerializer<W>),
    NTriples(WriterNTriplesSerializer<W>),
    RdfXml(WriterRdfXmlSerializer<W>),
    TriG(WriterTriGSerializer<W>),
    Turtle(WriterTurtleSerializer<W>),
}

impl<W: Write> WriterQuadSerializer<W> {
    /// Writes a [`Quad`].
    ///
    /// Formats without named graphs fail on quads outside of the default graph.
    pub fn serialize_quad(&mut self, quad: &Quad) -> Result<(), SerializerError> {
        match &mut self.inner {
            WriterQuadSerializerKind::JsonLd(s) => s.serialize_quad(quad),
            WriterQuadSerializerKind::NQuads(s) => s.serialize_quad(quad),
            WriterQuadSerializerKind::NTriples(s) => s.serialize_quad(quad),
            WriterQuadSerializerKind::RdfXml(s) => s.serialize_quad(quad),
            WriterQuadSerializerKind::TriG(s) => s.serialize_quad(quad),
            WriterQuadSerializerKind::Turtle(s) => s.serialize_quad(quad),
        }
    }

    /// Writes a [`Triple`] in the default graph.
    pub fn serialize_triple(&mut self, triple: &Triple) -> Result<(), SerializerError> {
        match &mut self.inner {
            WriterQuadSerializerKind::JsonLd(s) => s.serialize_triple(triple),
            WriterQuadSerializerKind::NQuads(s) => s.serialize_triple(triple),
            WriterQuadSerializerKind::NTriples(s) => s.serialize_triple(triple),
            WriterQuadSerializerKind::RdfXml(s) => s.serialize_triple(triple),
            WriterQuadSerializerKind::TriG(s) => s.serialize_triple(triple),
            WriterQuadSerializerKind::Turtle(s) => s.serialize_triple(triple),
        }
    }

    /// Writes the last bytes of the file and returns the underlying writer.
    ///
    /// Note that this function does not flush the writer. You need to do that if you are using a [`BufWriter`](std::io::BufWriter).
    pub fn finish(self) -> Result<W, SerializerError> {
        match self.inner {
            WriterQuadSerializerKind::JsonLd(s) => s.finish(),
            WriterQuadSerializerKind::NQuads(s) => s.finish(),
            WriterQuadSerializerKind::NTriples(s) => s.finish(),
            WriterQuadSerializerKind::RdfXml(s) => s.finish(),
            WriterQuadSerializerKind::TriG(s) => s.finish(),
            WriterQuadSerializerKind::Turtle(s) => s.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::{ErrorKind, NamedNode};

    fn quad_in_named_graph() -> Quad {
        let e = |name: &str| NamedNode::new_unchecked(format!("http://e/{name}"));
        Quad::new(e("s"), e("p"), e("o"), e("g"))
    }

    #[test]
    fn named_graphs_are_unrepresentable_in_triple_formats() {
        for format in RdfFormat::ALL {
            let mut serializer = RdfSerializer::from_format(format).for_writer(Vec::new());
            let result = serializer.serialize_quad(&quad_in_named_graph());
            if format.supports_datasets() {
                assert!(result.is_ok(), "{format}");
            } else {
                assert_eq!(
                    result.err().map(|e| e.kind()),
                    Some(ErrorKind::UnrepresentableInTargetFormat),
                    "{format}"
                );
            }
        }
    }

    #[test]
    fn line_formats_ignore_prefixes_and_base() -> Result<(), Box<dyn std::error::Error>> {
        let serializer = RdfSerializer::from_format(RdfFormat::NTriples)
            .with_prefix("ex", "http://e/")?
            .with_base_iri("http://e/")?;
        assert_eq!(serializer.format(), RdfFormat::NTriples);
        let mut writer = serializer.for_writer(Vec::new());
        writer.serialize_quad(&Quad::from(tessera_model::Triple::new(
            NamedNode::new("http://e/s")?,
            NamedNode::new("http://e/p")?,
            NamedNode::new("http://e/o")?,
        )))?;
        assert_eq!(writer.finish()?, b"<http://e/s> <http://e/p> <http://e/o> .\n");
        Ok(())
    }
}
