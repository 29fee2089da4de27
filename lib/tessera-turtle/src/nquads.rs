//! A [N-Quads](https://www.w3.org/TR/n-quads/) streaming parser implemented by [`NQuadsParser`]
//! and a serializer implemented by [`NQuadsSerializer`].

use crate::line_formats::NQuadsRecognizer;
use crate::ntriples::{NTriplesGraphName, NTriplesPredicate, NTriplesSubject, NTriplesTerm};
use crate::options::ParserOptions;
use crate::toolkit::{Parser, ReaderIterator, SliceIterator, TurtleParseError, TurtleSyntaxError};
use crate::writer::FailableWriter;
use std::io::{Read, Write};
use tessera_model::{Quad, SerializerError, Triple};

/// A [N-Quads](https://www.w3.org/TR/n-quads/) streaming parser.
///
/// ```
/// use tessera_model::{NamedNode, Term};
/// use tessera_model::vocab::rdf;
/// use tessera_turtle::NQuadsParser;
///
/// let file = br#"<http://example.com/foo> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person> <http://example.com/g> .
/// <http://example.com/foo> <http://schema.org/name> "Foo" .
/// <http://example.com/bar> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person> ."#;
///
/// let schema_person = Term::from(NamedNode::new("http://schema.org/Person")?);
/// let mut count = 0;
/// for quad in NQuadsParser::new().for_reader(file.as_ref()) {
///     let quad = quad?;
///     if quad.predicate == rdf::TYPE && quad.object == schema_person {
///         count += 1;
///     }
/// }
/// assert_eq!(2, count);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct NQuadsParser {
    options: ParserOptions,
}

impl NQuadsParser {
    /// Builds a new [`NQuadsParser`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips IRI and language tag validation.
    ///
    /// Broken RDF might be emitted if the file is not valid.
    #[inline]
    pub fn lenient(mut self) -> Self {
        self.options.lenient = true;
        self
    }

    /// Rejects `<<` quoted triples.
    #[inline]
    pub fn without_rdf_star(mut self) -> Self {
        self.options.rdf_star = false;
        self
    }

    /// Allows blank nodes in predicate position.
    #[inline]
    pub fn with_generalized_rdf(mut self) -> Self {
        self.options.generalized_rdf = true;
        self
    }

    /// Parses a N-Quads file from a [`Read`] implementation.
    pub fn for_reader<R: Read>(self, reader: R) -> ReaderNQuadsParser<R> {
        ReaderNQuadsParser {
            inner: self.low_level().parser.for_reader(reader),
        }
    }

    /// Parses a N-Quads file from a byte slice.
    pub fn for_slice(self, slice: &[u8]) -> SliceNQuadsParser<'_> {
        self.options.log_non_default("N-Quads");
        SliceNQuadsParser {
            inner: NQuadsRecognizer::new_parser(slice, true, true, &self.options).into_iter(),
        }
    }

    /// Allows to parse a N-Quads file by using a low-level API.
    ///
    /// ```
    /// use tessera_turtle::NQuadsParser;
    ///
    /// let file: [&[u8]; 3] = [
    ///     b"<http://example.com/s> <http://example.com/p> ",
    ///     b"<http://example.com/o> <http://example.com/g> .\n",
    ///     b"<http://example.com/s> <http://example.com/p> <http://example.com/o> .\n",
    /// ];
    /// let mut graphs = Vec::new();
    /// let mut parser = NQuadsParser::new().low_level();
    /// let mut file_chunks = file.iter();
    /// while !parser.is_end() {
    ///     if let Some(chunk) = file_chunks.next() {
    ///         parser.extend_from_slice(chunk);
    ///     } else {
    ///         parser.end();
    ///     }
    ///     while let Some(quad) = parser.parse_next() {
    ///         graphs.push(quad?.graph_name.to_string());
    ///     }
    /// }
    /// assert_eq!(graphs, ["<http://example.com/g>", "DEFAULT"]);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn low_level(self) -> LowLevelNQuadsParser {
        self.options.log_non_default("N-Quads");
        LowLevelNQuadsParser {
            parser: NQuadsRecognizer::new_parser(Vec::new(), false, true, &self.options),
        }
    }
}

/// Parses a N-Quads file from a [`Read`] implementation.
///
/// Can be built using [`NQuadsParser::for_reader`].
#[must_use]
pub struct ReaderNQuadsParser<R: Read> {
    inner: ReaderIterator<R, NQuadsRecognizer>,
}

impl<R: Read> Iterator for ReaderNQuadsParser<R> {
    type Item = Result<Quad, TurtleParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Parses a N-Quads file from a byte slice.
///
/// Can be built using [`NQuadsParser::for_slice`].
#[must_use]
pub struct SliceNQuadsParser<'a> {
    inner: SliceIterator<'a, NQuadsRecognizer>,
}

impl Iterator for SliceNQuadsParser<'_> {
    type Item = Result<Quad, TurtleSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Parses a N-Quads file by using a low-level API.
///
/// Can be built using [`NQuadsParser::low_level`].
pub struct LowLevelNQuadsParser {
    parser: Parser<Vec<u8>, NQuadsRecognizer>,
}

impl LowLevelNQuadsParser {
    /// Adds some extra bytes to the parser.
    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.parser.extend_from_slice(other)
    }

    /// Tell the parser that the file is finished.
    pub fn end(&mut self) {
        self.parser.end()
    }

    /// Returns if the parsing is finished.
    pub fn is_end(&self) -> bool {
        self.parser.is_end()
    }

    /// Attempt to parse a new quad from the already provided data.
    ///
    /// Returns [`None`] if the parsing is finished or more data is required.
    pub fn parse_next(&mut self) -> Option<Result<Quad, TurtleSyntaxError>> {
        self.parser.parse_next()
    }
}

/// A [canonical](https://www.w3.org/TR/n-triples/#canonical-ntriples) [N-Quads](https://www.w3.org/TR/n-quads/) serializer.
///
/// ```
/// use tessera_model::{NamedNode, Quad};
/// use tessera_turtle::NQuadsSerializer;
///
/// let mut serializer = NQuadsSerializer::new().for_writer(Vec::new());
/// serializer.serialize_quad(&Quad::new(
///     NamedNode::new("http://example.com#me")?,
///     NamedNode::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type")?,
///     NamedNode::new("http://schema.org/Person")?,
///     NamedNode::new("http://example.com")?,
/// ))?;
/// assert_eq!(
///     b"<http://example.com#me> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person> <http://example.com> .\n",
///     serializer.finish()?.as_slice()
/// );
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct NQuadsSerializer {
    generalized_rdf: bool,
}

impl NQuadsSerializer {
    /// Builds a new [`NQuadsSerializer`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows blank nodes in predicate position.
    #[inline]
    pub fn with_generalized_rdf(mut self) -> Self {
        self.generalized_rdf = true;
        self
    }

    /// Writes a N-Quads file to a [`Write`] implementation.
    pub fn for_writer<W: Write>(self, writer: W) -> WriterNQuadsSerializer<W> {
        WriterNQuadsSerializer {
            writer: FailableWriter::new(writer),
            generalized_rdf: self.generalized_rdf,
        }
    }
}

/// Writes a N-Quads file to a [`Write`] implementation.
///
/// Can be built using [`NQuadsSerializer::for_writer`].
#[must_use]
pub struct WriterNQuadsSerializer<W: Write> {
    writer: FailableWriter<W>,
    generalized_rdf: bool,
}

impl<W: Write> WriterNQuadsSerializer<W> {
    /// Writes an extra quad.
    pub fn serialize_quad(&mut self, quad: &Quad) -> Result<(), SerializerError> {
        let generalized_rdf = self.generalized_rdf;
        self.writer.run(|writer| {
            quad.validate(generalized_rdf)?;
            write!(
                writer,
                "{} {} {}",
                NTriplesSubject(&quad.subject),
                NTriplesPredicate(&quad.predicate),
                NTriplesTerm(&quad.object)
            )?;
            if !quad.graph_name.is_default_graph() {
                write!(writer, " {}", NTriplesGraphName(&quad.graph_name))?;
            }
            writeln!(writer, " .")?;
            Ok(())
        })
    }

    /// Writes a triple in the default graph.
    pub fn serialize_triple(&mut self, triple: &Triple) -> Result<(), SerializerError> {
        self.serialize_quad(&triple.clone().into())
    }

    /// Ends the write process and returns the underlying [`Write`].
    pub fn finish(self) -> Result<W, SerializerError> {
        self.writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::{BlankNode, ErrorKind, GraphName, Literal, NamedNode};

    #[test]
    fn graph_names() {
        let quads = NQuadsParser::new()
            .for_slice(b"_:s <http://e/p> \"o\"^^<http://e/dt> _:g .\n<http://e/s> <http://e/p> <http://e/o> <http://e/g> .")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(quads.len(), 2);
        assert!(matches!(quads[0].graph_name, GraphName::BlankNode(_)));
        assert_eq!(
            quads[1].graph_name,
            GraphName::NamedNode(NamedNode::new_unchecked("http://e/g"))
        );
    }

    #[test]
    fn literal_graph_name_is_an_error() {
        let error = NQuadsParser::new()
            .for_slice(b"<http://e/s> <http://e/p> <http://e/o> \"g\" .")
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn malformed_statements_emit_nothing() {
        for file in [
            "<http://e/s> <http://e/p> <http://e/o> \"g\" .",
            "<http://e/s> <http://e/p> <http://e/o> <http://e/g> <http://e/h> .",
            "<http://e/s> <http://e/p> \"o\"",
            "<http://e/s> <http://e/p> <http://e/o> <http://e/g>",
        ] {
            let results = NQuadsParser::new()
                .for_slice(file.as_bytes())
                .collect::<Vec<_>>();
            assert_eq!(results.len(), 1, "{file}");
            assert!(results[0].is_err(), "{file}");
        }
    }

    #[test]
    fn serialize_default_and_named_graphs() -> Result<(), SerializerError> {
        let mut serializer = NQuadsSerializer::new().for_writer(Vec::new());
        let blank = BlankNode::new_unchecked("b0");
        serializer.serialize_triple(&Triple::new(
            blank.clone(),
            NamedNode::new_unchecked("http://e/p"),
            Literal::new_language_tagged_literal_unchecked("chat", "fr"),
        ))?;
        serializer.serialize_quad(&Quad::new(
            NamedNode::new_unchecked("http://e/s"),
            NamedNode::new_unchecked("http://e/p"),
            Literal::new_typed_literal("1", NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer")),
            blank,
        ))?;
        assert_eq!(
            String::from_utf8(serializer.finish()?).unwrap(),
            "_:b0 <http://e/p> \"chat\"@fr .\n<http://e/s> <http://e/p> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> _:b0 .\n"
        );
        Ok(())
    }
}
