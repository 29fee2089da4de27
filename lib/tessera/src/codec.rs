//! One function per format and direction, configured by [`CodecOptions`].

use crate::error::{CodecOptionsError, RdfParseError};
use crate::format::RdfFormat;
use crate::options::CodecOptions;
use crate::parser::{RdfParser, ReaderQuadParser};
use crate::serializer::{RdfSerializer, WriterQuadSerializer};
use std::io::{Read, Write};
use tessera_model::{Dataset, SerializerError};
use tracing::debug;

/// Builds a parser for `format` reading from `input`.
pub fn read<R: Read>(
    format: RdfFormat,
    input: R,
    options: &CodecOptions,
) -> Result<ReaderQuadParser<R>, CodecOptionsError> {
    Ok(options
        .apply_to_parser(RdfParser::from_format(format))?
        .for_reader(input))
}

/// Builds a serializer for `format` writing to `output`.
pub fn write<W: Write>(
    format: RdfFormat,
    output: W,
    options: &CodecOptions,
) -> Result<WriterQuadSerializer<W>, CodecOptionsError> {
    Ok(options
        .apply_to_serializer(RdfSerializer::from_format(format))?
        .for_writer(output))
}

/// Reads a [Turtle](https://www.w3.org/TR/turtle/) document. Triples are put in the default graph.
///
/// ```
/// use tessera::{CodecOptions, read_turtle};
///
/// let quads = read_turtle(
///     "@prefix ex: <http://example.com/> . ex:s ex:p 1 .".as_bytes(),
///     &CodecOptions::new(),
/// )?
/// .collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(quads[0].object.to_string(), "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>");
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
pub fn read_turtle<R: Read>(
    input: R,
    options: &CodecOptions,
) -> Result<ReaderQuadParser<R>, CodecOptionsError> {
    read(RdfFormat::Turtle, input, options)
}

/// Reads a [N-Triples](https://www.w3.org/TR/n-triples/) document. Triples are put in the default graph.
pub fn read_ntriples<R: Read>(
    input: R,
    options: &CodecOptions,
) -> Result<ReaderQuadParser<R>, CodecOptionsError> {
    read(RdfFormat::NTriples, input, options)
}

/// Reads a [TriG](https://www.w3.org/TR/trig/) document.
pub fn read_trig<R: Read>(
    input: R,
    options: &CodecOptions,
) -> Result<ReaderQuadParser<R>, CodecOptionsError> {
    read(RdfFormat::TriG, input, options)
}

/// Reads a [N-Quads](https://www.w3.org/TR/n-quads/) document.
pub fn read_nquads<R: Read>(
    input: R,
    options: &CodecOptions,
) -> Result<ReaderQuadParser<R>, CodecOptionsError> {
    read(RdfFormat::NQuads, input, options)
}

/// Reads a [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) document. Triples are put in the default graph.
pub fn read_rdfxml<R: Read>(
    input: R,
    options: &CodecOptions,
) -> Result<ReaderQuadParser<R>, CodecOptionsError> {
    read(RdfFormat::RdfXml, input, options)
}

/// Reads a [JSON-LD](https://www.w3.org/TR/json-ld/) document.
///
/// Remote contexts are only resolved if a loader is set with
/// [`CodecOptions::with_remote_context_loader`].
pub fn read_jsonld<R: Read>(
    input: R,
    options: &CodecOptions,
) -> Result<ReaderQuadParser<R>, CodecOptionsError> {
    read(RdfFormat::JsonLd, input, options)
}

/// Writes a [Turtle](https://www.w3.org/TR/turtle/) document.
///
/// ```
/// use tessera::model::{NamedNode, Triple};
/// use tessera::{CodecOptions, write_turtle};
///
/// let options = CodecOptions::new().with_prefix("ex", "http://example.com/")?;
/// let mut serializer = write_turtle(Vec::new(), &options)?;
/// serializer.serialize_triple(&Triple::new(
///     NamedNode::new("http://example.com/s")?,
///     NamedNode::new("http://example.com/p")?,
///     NamedNode::new("http://example.com/o")?,
/// ))?;
/// assert_eq!(
///     String::from_utf8(serializer.finish()?)?,
///     "@prefix ex: <http://example.com/> .\nex:s ex:p ex:o .\n"
/// );
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
pub fn write_turtle<W: Write>(
    output: W,
    options: &CodecOptions,
) -> Result<WriterQuadSerializer<W>, CodecOptionsError> {
    write(RdfFormat::Turtle, output, options)
}

/// Writes a [N-Triples](https://www.w3.org/TR/n-triples/) document.
pub fn write_ntriples<W: Write>(
    output: W,
    options: &CodecOptions,
) -> Result<WriterQuadSerializer<W>, CodecOptionsError> {
    write(RdfFormat::NTriples, output, options)
}

/// Writes a [TriG](https://www.w3.org/TR/trig/) document.
pub fn write_trig<W: Write>(
    output: W,
    options: &CodecOptions,
) -> Result<WriterQuadSerializer<W>, CodecOptionsError> {
    write(RdfFormat::TriG, output, options)
}

/// Writes a [N-Quads](https://www.w3.org/TR/n-quads/) document.
pub fn write_nquads<W: Write>(
    output: W,
    options: &CodecOptions,
) -> Result<WriterQuadSerializer<W>, CodecOptionsError> {
    write(RdfFormat::NQuads, output, options)
}

/// Writes a [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) document.
pub fn write_rdfxml<W: Write>(
    output: W,
    options: &CodecOptions,
) -> Result<WriterQuadSerializer<W>, CodecOptionsError> {
    write(RdfFormat::RdfXml, output, options)
}

/// Writes a [JSON-LD](https://www.w3.org/TR/json-ld/) document in expanded form.
pub fn write_jsonld<W: Write>(
    output: W,
    options: &CodecOptions,
) -> Result<WriterQuadSerializer<W>, CodecOptionsError> {
    write(RdfFormat::JsonLd, output, options)
}

/// Reads a whole document into a [`Dataset`].
///
/// Duplicated quads are only kept once.
pub fn load_dataset(
    format: RdfFormat,
    input: impl Read,
    options: &CodecOptions,
) -> Result<Dataset, RdfParseError> {
    let dataset = read(format, input, options)?.collect::<Result<Dataset, _>>()?;
    debug!(format = format.name(), quads = dataset.len(), "Dataset loaded");
    Ok(dataset)
}

/// Writes all the quads of a [`Dataset`] and returns the writer.
///
/// ```
/// use tessera::model::{Dataset, GraphName, NamedNode, Quad};
/// use tessera::{CodecOptions, RdfFormat, dump_dataset, load_dataset};
///
/// let mut dataset = Dataset::new();
/// dataset.add(Quad::new(
///     NamedNode::new("http://example.com/s")?,
///     NamedNode::new("http://example.com/p")?,
///     NamedNode::new("http://example.com/o")?,
///     GraphName::DefaultGraph,
/// ));
/// let output = dump_dataset(RdfFormat::TriG, &dataset, Vec::new(), &CodecOptions::new())?;
/// let loaded = load_dataset(RdfFormat::TriG, output.as_slice(), &CodecOptions::new())?;
/// assert_eq!(dataset, loaded);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
pub fn dump_dataset<W: Write>(
    format: RdfFormat,
    dataset: &Dataset,
    output: W,
    options: &CodecOptions,
) -> Result<W, SerializerError> {
    let mut serializer = write(format, output, options)?;
    for quad in dataset.quads() {
        serializer.serialize_quad(&quad)?;
    }
    serializer.finish()
}
