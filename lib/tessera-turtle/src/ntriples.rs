//! A [N-Triples](https://www.w3.org/TR/n-triples/) streaming parser implemented by [`NTriplesParser`]
//! and a serializer implemented by [`NTriplesSerializer`].

use crate::line_formats::NQuadsRecognizer;
use crate::options::ParserOptions;
use crate::toolkit::{Parser, ReaderIterator, SliceIterator, TurtleParseError, TurtleSyntaxError};
use crate::writer::FailableWriter;
use std::fmt;
use std::io::{Read, Write};
use tessera_model::{
    GraphName, Literal, NamedNode, Predicate, Quad, SerializerError, Subject, Term, Triple,
};

/// A [N-Triples](https://www.w3.org/TR/n-triples/) streaming parser.
///
/// Quoted triples of [RDF-star](https://w3c.github.io/rdf-star/cg-spec/2021-12-17.html#n-triples-star) are supported
/// unless [`without_rdf_star`](Self::without_rdf_star) is called.
///
/// Count the number of people:
/// ```
/// use tessera_model::{NamedNode, Term};
/// use tessera_model::vocab::rdf;
/// use tessera_turtle::NTriplesParser;
///
/// let file = br#"<http://example.com/foo> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person> .
/// <http://example.com/foo> <http://schema.org/name> "Foo" .
/// <http://example.com/bar> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person> .
/// <http://example.com/bar> <http://schema.org/name> "Bar" ."#;
///
/// let schema_person = Term::from(NamedNode::new("http://schema.org/Person")?);
/// let mut count = 0;
/// for triple in NTriplesParser::new().for_reader(file.as_ref()) {
///     let triple = triple?;
///     if triple.predicate == rdf::TYPE && triple.object == schema_person {
///         count += 1;
///     }
/// }
/// assert_eq!(2, count);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct NTriplesParser {
    options: ParserOptions,
}

impl NTriplesParser {
    /// Builds a new [`NTriplesParser`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips IRI and language tag validation and tolerates `rdf:langString` datatypes
    /// and lone surrogate escapes.
    ///
    /// Broken RDF might be emitted if the file is not valid.
    #[inline]
    pub fn lenient(mut self) -> Self {
        self.options.lenient = true;
        self
    }

    /// Rejects `<<` quoted triples with an [`UnsupportedFeature`](tessera_model::ErrorKind::UnsupportedFeature) error.
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

    /// Parses a N-Triples file from a [`Read`] implementation.
    pub fn for_reader<R: Read>(self, reader: R) -> ReaderNTriplesParser<R> {
        ReaderNTriplesParser {
            inner: self.low_level().parser.for_reader(reader),
        }
    }

    /// Parses a N-Triples file from a byte slice.
    ///
    /// ```
    /// use tessera_turtle::NTriplesParser;
    ///
    /// let file = br#"<http://example.com/s> <http://example.com/p> "o"@en ."#;
    /// let triples = NTriplesParser::new()
    ///     .for_slice(file)
    ///     .collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(triples.len(), 1);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn for_slice(self, slice: &[u8]) -> SliceNTriplesParser<'_> {
        self.options.log_non_default("N-Triples");
        SliceNTriplesParser {
            inner: NQuadsRecognizer::new_parser(slice, true, false, &self.options).into_iter(),
        }
    }

    /// Allows to parse a N-Triples file by using a low-level API.
    ///
    /// ```
    /// use tessera_turtle::NTriplesParser;
    ///
    /// let file: [&[u8]; 2] = [b"<http://example.com/s> <http://example.com/p> ", b"<http://example.com/o> .\n"];
    /// let mut count = 0;
    /// let mut parser = NTriplesParser::new().low_level();
    /// let mut file_chunks = file.iter();
    /// while !parser.is_end() {
    ///     // We feed more data to the parser
    ///     if let Some(chunk) = file_chunks.next() {
    ///         parser.extend_from_slice(chunk);
    ///     } else {
    ///         parser.end(); // It's finished
    ///     }
    ///     // We read as many triples from the parser as possible
    ///     while let Some(triple) = parser.parse_next() {
    ///         triple?;
    ///         count += 1;
    ///     }
    /// }
    /// assert_eq!(1, count);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn low_level(self) -> LowLevelNTriplesParser {
        self.options.log_non_default("N-Triples");
        LowLevelNTriplesParser {
            parser: NQuadsRecognizer::new_parser(Vec::new(), false, false, &self.options),
        }
    }
}

/// Parses a N-Triples file from a [`Read`] implementation.
///
/// Can be built using [`NTriplesParser::for_reader`].
#[must_use]
pub struct ReaderNTriplesParser<R: Read> {
    inner: ReaderIterator<R, NQuadsRecognizer>,
}

impl<R: Read> Iterator for ReaderNTriplesParser<R> {
    type Item = Result<Triple, TurtleParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.map(|quad| quad.into_parts().0))
    }
}

/// Parses a N-Triples file from a byte slice.
///
/// Can be built using [`NTriplesParser::for_slice`].
#[must_use]
pub struct SliceNTriplesParser<'a> {
    inner: SliceIterator<'a, NQuadsRecognizer>,
}

impl Iterator for SliceNTriplesParser<'_> {
    type Item = Result<Triple, TurtleSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.map(|quad| quad.into_parts().0))
    }
}

/// Parses a N-Triples file by using a low-level API.
///
/// Can be built using [`NTriplesParser::low_level`].
pub struct LowLevelNTriplesParser {
    parser: Parser<Vec<u8>, NQuadsRecognizer>,
}

impl LowLevelNTriplesParser {
    /// Adds some extra bytes to the parser. Should be called when [`parse_next`](Self::parse_next) returns [`None`] and there is still unread data.
    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.parser.extend_from_slice(other)
    }

    /// Tell the parser that the file is finished.
    ///
    /// This triggers the parsing of the final bytes and might lead [`parse_next`](Self::parse_next) to return some extra values.
    pub fn end(&mut self) {
        self.parser.end()
    }

    /// Returns if the parsing is finished i.e. [`end`](Self::end) has been called and [`parse_next`](Self::parse_next) is always going to return `None`.
    pub fn is_end(&self) -> bool {
        self.parser.is_end()
    }

    /// Attempt to parse a new triple from the already provided data.
    ///
    /// Returns [`None`] if the parsing is finished or more data is required.
    /// If it is the case more data should be fed using [`extend_from_slice`](Self::extend_from_slice).
    pub fn parse_next(&mut self) -> Option<Result<Triple, TurtleSyntaxError>> {
        Some(self.parser.parse_next()?.map(|quad| quad.into_parts().0))
    }
}

/// A [canonical](https://www.w3.org/TR/n-triples/#canonical-ntriples) [N-Triples](https://www.w3.org/TR/n-triples/) serializer.
///
/// Characters outside of ASCII are written with `\u` and `\U` escapes.
///
/// ```
/// use tessera_model::{NamedNode, Triple};
/// use tessera_turtle::NTriplesSerializer;
///
/// let mut serializer = NTriplesSerializer::new().for_writer(Vec::new());
/// serializer.serialize_triple(&Triple::new(
///     NamedNode::new("http://example.com#me")?,
///     NamedNode::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type")?,
///     NamedNode::new("http://schema.org/Person")?,
/// ))?;
/// assert_eq!(
///     b"<http://example.com#me> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://schema.org/Person> .\n",
///     serializer.finish()?.as_slice()
/// );
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct NTriplesSerializer {
    generalized_rdf: bool,
}

impl NTriplesSerializer {
    /// Builds a new [`NTriplesSerializer`].
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

    /// Writes a N-Triples file to a [`Write`] implementation.
    pub fn for_writer<W: Write>(self, writer: W) -> WriterNTriplesSerializer<W> {
        WriterNTriplesSerializer {
            writer: FailableWriter::new(writer),
            generalized_rdf: self.generalized_rdf,
        }
    }
}

/// Writes a N-Triples file to a [`Write`] implementation.
///
/// Can be built using [`NTriplesSerializer::for_writer`].
#[must_use]
pub struct WriterNTriplesSerializer<W: Write> {
    writer: FailableWriter<W>,
    generalized_rdf: bool,
}

impl<W: Write> WriterNTriplesSerializer<W> {
    /// Writes an extra triple.
    pub fn serialize_triple(&mut self, triple: &Triple) -> Result<(), SerializerError> {
        let generalized_rdf = self.generalized_rdf;
        self.writer.run(|writer| {
            triple.validate(generalized_rdf)?;
            writeln!(
                writer,
                "{} {} {} .",
                NTriplesSubject(&triple.subject),
                NTriplesPredicate(&triple.predicate),
                NTriplesTerm(&triple.object)
            )?;
            Ok(())
        })
    }

    /// Writes a quad of the default graph.
    ///
    /// Quads of named graphs are not representable in N-Triples.
    pub fn serialize_quad(&mut self, quad: &Quad) -> Result<(), SerializerError> {
        if !quad.graph_name.is_default_graph() {
            return self.writer.fail(SerializerError::unrepresentable(format!(
                "N-Triples cannot store the named graph {}",
                quad.graph_name
            )));
        }
        self.serialize_triple(&Triple::new(
            quad.subject.clone(),
            quad.predicate.clone(),
            quad.object.clone(),
        ))
    }

    /// Ends the write process and returns the underlying [`Write`].
    pub fn finish(self) -> Result<W, SerializerError> {
        self.writer.finish()
    }
}

pub(crate) struct NTriplesSubject<'a>(pub &'a Subject);

impl fmt::Display for NTriplesSubject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Subject::NamedNode(node) => write_iri(node, f),
            Subject::BlankNode(node) => write!(f, "{node}"),
            Subject::Triple(triple) => write_quoted_triple(triple, f),
        }
    }
}

pub(crate) struct NTriplesPredicate<'a>(pub &'a Predicate);

impl fmt::Display for NTriplesPredicate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Predicate::NamedNode(node) => write_iri(node, f),
            Predicate::BlankNode(node) => write!(f, "{node}"),
        }
    }
}

pub(crate) struct NTriplesTerm<'a>(pub &'a Term);

impl fmt::Display for NTriplesTerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Term::NamedNode(node) => write_iri(node, f),
            Term::BlankNode(node) => write!(f, "{node}"),
            Term::Literal(literal) => write_literal(literal, f),
            Term::Triple(triple) => write_quoted_triple(triple, f),
        }
    }
}

pub(crate) struct NTriplesGraphName<'a>(pub &'a GraphName);

impl fmt::Display for NTriplesGraphName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            GraphName::NamedNode(node) => write_iri(node, f),
            GraphName::BlankNode(node) => write!(f, "{node}"),
            GraphName::DefaultGraph => Ok(()),
        }
    }
}

fn write_quoted_triple(triple: &Triple, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "<< {} {} {} >>",
        NTriplesSubject(&triple.subject),
        NTriplesPredicate(&triple.predicate),
        NTriplesTerm(&triple.object)
    )
}

fn write_iri(iri: &NamedNode, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("<")?;
    for c in iri.as_str().chars() {
        if c.is_ascii() {
            write!(f, "{c}")?;
        } else {
            write_unicode_escape(c, f)?;
        }
    }
    f.write_str(">")
}

fn write_literal(literal: &Literal, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("\"")?;
    for c in literal.value().chars() {
        match c {
            '\u{08}' => f.write_str("\\b"),
            '\t' => f.write_str("\\t"),
            '\n' => f.write_str("\\n"),
            '\u{0c}' => f.write_str("\\f"),
            '\r' => f.write_str("\\r"),
            '"' => f.write_str("\\\""),
            '\\' => f.write_str("\\\\"),
            '\0'..='\u{1f}' | '\u{7f}' => write_unicode_escape(c, f),
            c if c.is_ascii() => write!(f, "{c}"),
            c => write_unicode_escape(c, f),
        }?;
    }
    f.write_str("\"")?;
    if let Some(language) = literal.language() {
        write!(f, "@{language}")
    } else if literal.is_plain() {
        Ok(())
    } else {
        f.write_str("^^")?;
        write_iri(&literal.datatype().into_owned(), f)
    }
}

fn write_unicode_escape(c: char, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let code_point = u32::from(c);
    if code_point <= 0xFFFF {
        write!(f, "\\u{code_point:04X}")
    } else {
        write!(f, "\\U{code_point:08X}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::{BlankNode, ErrorKind};

    #[test]
    fn lenient_parsing() {
        let triples = NTriplesParser::new()
            .lenient()
            .for_reader(r#"<foo> <bar> "baz"@toolonglangtag ."#.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            triples,
            [Triple::new(
                NamedNode::new_unchecked("foo"),
                NamedNode::new_unchecked("bar"),
                Literal::new_language_tagged_literal_unchecked("baz", "toolonglangtag"),
            )]
        );
    }

    #[test]
    fn stops_at_first_error() {
        let results = NTriplesParser::new()
            .for_slice(b"<http://e/s> <http://e/p> <http://e/o> .\n<http://e/s> <http://e/p> .\n<http://e/s> <http://e/p> <http://e/o2> .\n")
            .collect::<Vec<_>>();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        let error = results[1].as_ref().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Syntax);
        assert_eq!(error.location().start.line, 1);
    }

    #[test]
    fn blank_node_labels_are_document_scoped() {
        let file = b"_:a <http://e/p> _:a .\n_:A <http://e/p> _:b .\n";
        let first = NTriplesParser::new()
            .for_slice(file)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(first[0].subject, first[0].object.clone().into_subject().unwrap());
        assert_ne!(first[0].subject, first[1].subject);
        let second = NTriplesParser::new()
            .for_slice(file)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_ne!(first[0].subject, second[0].subject);
    }

    #[test]
    fn quoted_triples() {
        let file = b"<< <http://e/s> <http://e/p> <http://e/o> >> <http://e/q> <http://e/r> .\n";
        let triples = NTriplesParser::new()
            .for_slice(file)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let quoted = Triple::new(
            NamedNode::new_unchecked("http://e/s"),
            NamedNode::new_unchecked("http://e/p"),
            NamedNode::new_unchecked("http://e/o"),
        );
        assert_eq!(triples[0].subject, quoted.into());

        let error = NTriplesParser::new()
            .without_rdf_star()
            .for_slice(file)
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn blank_node_predicates() {
        let file = b"<http://e/s> _:p <http://e/o> .\n";
        let error = NTriplesParser::new()
            .for_slice(file)
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Syntax);
        let triple = NTriplesParser::new()
            .with_generalized_rdf()
            .for_slice(file)
            .next()
            .unwrap()
            .unwrap();
        assert!(triple.predicate.is_blank_node());
    }

    #[test]
    fn escapes_non_ascii() -> Result<(), SerializerError> {
        let mut serializer = NTriplesSerializer::new().for_writer(Vec::new());
        serializer.serialize_triple(&Triple::new(
            NamedNode::new_unchecked("http://e/\u{e9}"),
            NamedNode::new_unchecked("http://e/p"),
            Literal::new_simple_literal("a\u{e9}\u{1F600}\n"),
        ))?;
        assert_eq!(
            String::from_utf8(serializer.finish()?).unwrap(),
            "<http://e/\\u00E9> <http://e/p> \"a\\u00E9\\U0001F600\\n\" .\n"
        );
        Ok(())
    }

    #[test]
    fn rejects_named_graphs() {
        let mut serializer = NTriplesSerializer::new().for_writer(Vec::new());
        let quad = Quad::new(
            NamedNode::new_unchecked("http://e/s"),
            NamedNode::new_unchecked("http://e/p"),
            NamedNode::new_unchecked("http://e/o"),
            NamedNode::new_unchecked("http://e/g"),
        );
        let error = serializer.serialize_quad(&quad).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnrepresentableInTargetFormat);
        // The serializer stays failed
        let again = serializer
            .serialize_triple(&quad.into_parts().0)
            .unwrap_err();
        assert_eq!(again.kind(), ErrorKind::UnrepresentableInTargetFormat);
        assert_eq!(
            serializer.finish().unwrap_err().kind(),
            ErrorKind::UnrepresentableInTargetFormat
        );
    }

    #[test]
    fn rejects_blank_node_predicates() {
        let triple = Triple::new(
            NamedNode::new_unchecked("http://e/s"),
            BlankNode::default(),
            NamedNode::new_unchecked("http://e/o"),
        );
        let mut serializer = NTriplesSerializer::new().for_writer(Vec::new());
        assert_eq!(
            serializer.serialize_triple(&triple).unwrap_err().kind(),
            ErrorKind::UnrepresentableInTargetFormat
        );
        let mut serializer = NTriplesSerializer::new()
            .with_generalized_rdf()
            .for_writer(Vec::new());
        serializer.serialize_triple(&triple).unwrap();
    }
}
