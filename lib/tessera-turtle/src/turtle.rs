//! A [Turtle](https://www.w3.org/TR/turtle/) streaming parser implemented by [`TurtleParser`]
//! and a serializer implemented by [`TurtleSerializer`].

use crate::options::{ParserOptions, SerializerOptions};
use crate::terse::TriGRecognizer;
use crate::toolkit::{Parser, ReaderIterator, SliceIterator, TurtleParseError, TurtleSyntaxError};
use crate::trig::LowLevelTriGSerializer;
use crate::writer::FailableWriter;
use std::io::{Read, Write};
use tessera_model::{
    BaseIri, IriParseError, IriResolveError, Quad, SerializerError, Triple,
};

/// A [Turtle](https://www.w3.org/TR/turtle/) streaming parser.
///
/// Quoted triples and annotations of [Turtle-star](https://w3c.github.io/rdf-star/cg-spec/2021-12-17.html#turtle-star)
/// are supported unless [`without_rdf_star`](Self::without_rdf_star) is called.
///
/// Count the number of people:
/// ```
/// use tessera_model::{NamedNode, Term};
/// use tessera_model::vocab::rdf;
/// use tessera_turtle::TurtleParser;
///
/// let file = br#"@base <http://example.com/> .
/// @prefix schema: <http://schema.org/> .
/// <foo> a schema:Person ;
///     schema:name "Foo" .
/// <bar> a schema:Person ;
///     schema:name "Bar" ."#;
///
/// let schema_person = Term::from(NamedNode::new("http://schema.org/Person")?);
/// let mut count = 0;
/// for triple in TurtleParser::new().for_reader(file.as_ref()) {
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
pub struct TurtleParser {
    options: ParserOptions,
}

impl TurtleParser {
    /// Builds a new [`TurtleParser`].
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

    /// Sets the base IRI used to resolve the relative IRIs of the document.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriResolveError> {
        self.options.set_base_iri(base_iri)?;
        Ok(self)
    }

    /// Binds a prefix before the document starts.
    ///
    /// ```
    /// use tessera_turtle::TurtleParser;
    ///
    /// let triples = TurtleParser::new()
    ///     .with_prefix("schema", "http://schema.org/")?
    ///     .for_slice(b"schema:a schema:b schema:c .")
    ///     .collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(triples[0].subject.to_string(), "<http://schema.org/a>");
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    #[inline]
    pub fn with_prefix(
        mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<Self, IriParseError> {
        self.options.add_prefix(prefix_name, prefix_iri)?;
        Ok(self)
    }

    /// Rejects `<<` quoted triples and `{|` annotations.
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

    /// Parses a Turtle file from a [`Read`] implementation.
    pub fn for_reader<R: Read>(self, reader: R) -> ReaderTurtleParser<R> {
        ReaderTurtleParser {
            inner: self.low_level().parser.for_reader(reader),
        }
    }

    /// Parses a Turtle file from a byte slice.
    pub fn for_slice(self, slice: &[u8]) -> SliceTurtleParser<'_> {
        self.options.log_non_default("Turtle");
        SliceTurtleParser {
            inner: TriGRecognizer::new_parser(slice, true, false, &self.options).into_iter(),
        }
    }

    /// Allows to parse a Turtle file by using a low-level API.
    ///
    /// ```
    /// use tessera_turtle::TurtleParser;
    ///
    /// let file: [&[u8]; 4] = [
    ///     b"@base <http://example.com/>",
    ///     b". @prefix schema: <http://schema.org/> .\n<foo> a schema:Person",
    ///     b" ; schema:name \"Foo\" . <bar>",
    ///     b" a schema:Person ; schema:name \"Bar\" .",
    /// ];
    /// let mut count = 0;
    /// let mut parser = TurtleParser::new().low_level();
    /// let mut file_chunks = file.iter();
    /// while !parser.is_end() {
    ///     if let Some(chunk) = file_chunks.next() {
    ///         parser.extend_from_slice(chunk);
    ///     } else {
    ///         parser.end();
    ///     }
    ///     while let Some(triple) = parser.parse_next() {
    ///         triple?;
    ///         count += 1;
    ///     }
    /// }
    /// assert_eq!(4, count);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn low_level(self) -> LowLevelTurtleParser {
        self.options.log_non_default("Turtle");
        LowLevelTurtleParser {
            parser: TriGRecognizer::new_parser(Vec::new(), false, false, &self.options),
        }
    }
}

/// Parses a Turtle file from a [`Read`] implementation.
///
/// Can be built using [`TurtleParser::for_reader`].
#[must_use]
pub struct ReaderTurtleParser<R: Read> {
    inner: ReaderIterator<R, TriGRecognizer>,
}

impl<R: Read> ReaderTurtleParser<R> {
    /// The prefixes bound at the current state of the parsing, sorted by name.
    ///
    /// ```
    /// use tessera_turtle::TurtleParser;
    ///
    /// let file = br#"@base <http://example.com/> .
    /// @prefix schema: <http://schema.org/> .
    /// <foo> a schema:Person ;
    ///     schema:name "Foo" ."#;
    ///
    /// let mut parser = TurtleParser::new().for_reader(file.as_ref());
    /// assert_eq!(parser.prefixes().count(), 0); // No prefix at the beginning
    ///
    /// parser.next().unwrap()?; // We read the first triple
    /// assert_eq!(
    ///     parser.prefixes().collect::<Vec<_>>(),
    ///     [("schema", "http://schema.org/")]
    /// ); // There are now prefixes
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.parser.context.env.iter()
    }

    /// The base IRI at the current state of the parsing.
    pub fn base_iri(&self) -> Option<&str> {
        self.inner.parser.context.env.base().map(BaseIri::as_str)
    }
}

impl<R: Read> Iterator for ReaderTurtleParser<R> {
    type Item = Result<Triple, TurtleParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.map(|quad| quad.into_parts().0))
    }
}

/// Parses a Turtle file from a byte slice.
///
/// Can be built using [`TurtleParser::for_slice`].
#[must_use]
pub struct SliceTurtleParser<'a> {
    inner: SliceIterator<'a, TriGRecognizer>,
}

impl SliceTurtleParser<'_> {
    /// The prefixes bound at the current state of the parsing, sorted by name.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.parser.context.env.iter()
    }

    /// The base IRI at the current state of the parsing.
    pub fn base_iri(&self) -> Option<&str> {
        self.inner.parser.context.env.base().map(BaseIri::as_str)
    }
}

impl Iterator for SliceTurtleParser<'_> {
    type Item = Result<Triple, TurtleSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.map(|quad| quad.into_parts().0))
    }
}

/// Parses a Turtle file by using a low-level API.
///
/// Can be built using [`TurtleParser::low_level`].
pub struct LowLevelTurtleParser {
    parser: Parser<Vec<u8>, TriGRecognizer>,
}

impl LowLevelTurtleParser {
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

    /// Attempt to parse a new triple from the already provided data.
    ///
    /// Returns [`None`] if the parsing is finished or more data is required.
    pub fn parse_next(&mut self) -> Option<Result<Triple, TurtleSyntaxError>> {
        Some(self.parser.parse_next()?.map(|quad| quad.into_parts().0))
    }

    /// The prefixes bound at the current state of the parsing, sorted by name.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parser.context.env.iter()
    }

    /// The base IRI at the current state of the parsing.
    pub fn base_iri(&self) -> Option<&str> {
        self.parser.context.env.base().map(BaseIri::as_str)
    }
}

/// A [Turtle](https://www.w3.org/TR/turtle/) serializer.
///
/// ```
/// use tessera_model::{NamedNode, Triple};
/// use tessera_turtle::TurtleSerializer;
///
/// let mut serializer = TurtleSerializer::new()
///     .with_prefix("schema", "http://schema.org/")?
///     .for_writer(Vec::new());
/// serializer.serialize_triple(&Triple::new(
///     NamedNode::new("http://example.com#me")?,
///     NamedNode::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type")?,
///     NamedNode::new("http://schema.org/Person")?,
/// ))?;
/// assert_eq!(
///     "@prefix schema: <http://schema.org/> .\n<http://example.com#me> a schema:Person .\n",
///     String::from_utf8(serializer.finish()?)?
/// );
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct TurtleSerializer {
    options: SerializerOptions,
}

impl TurtleSerializer {
    /// Builds a new [`TurtleSerializer`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a prefix used to abbreviate the IRIs of the output.
    #[inline]
    pub fn with_prefix(
        mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<Self, IriParseError> {
        self.options.add_prefix(prefix_name, prefix_iri)?;
        Ok(self)
    }

    /// Writes a `@base` directive. IRIs are still written absolute.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.options.set_base_iri(base_iri)?;
        Ok(self)
    }

    /// Allows blank nodes in predicate position.
    #[inline]
    pub fn with_generalized_rdf(mut self) -> Self {
        self.options.generalized_rdf = true;
        self
    }

    /// Writes a Turtle file to a [`Write`] implementation.
    pub fn for_writer<W: Write>(self, writer: W) -> WriterTurtleSerializer<W> {
        WriterTurtleSerializer {
            writer: FailableWriter::new(writer),
            generalized_rdf: self.options.generalized_rdf,
            inner: LowLevelTriGSerializer::new(self.options),
        }
    }
}

/// Writes a Turtle file to a [`Write`] implementation.
///
/// Can be built using [`TurtleSerializer::for_writer`].
#[must_use]
pub struct WriterTurtleSerializer<W: Write> {
    writer: FailableWriter<W>,
    generalized_rdf: bool,
    inner: LowLevelTriGSerializer,
}

impl<W: Write> WriterTurtleSerializer<W> {
    /// Writes an extra triple.
    pub fn serialize_triple(&mut self, triple: &Triple) -> Result<(), SerializerError> {
        let generalized_rdf = self.generalized_rdf;
        let inner = &mut self.inner;
        self.writer.run(|writer| {
            triple.validate(generalized_rdf)?;
            Ok(inner.serialize_quad(&triple.clone().into(), writer)?)
        })
    }

    /// Writes a quad of the default graph.
    ///
    /// Quads of named graphs are not representable in Turtle.
    pub fn serialize_quad(&mut self, quad: &Quad) -> Result<(), SerializerError> {
        if !quad.graph_name.is_default_graph() {
            return self.writer.fail(SerializerError::unrepresentable(format!(
                "Turtle cannot store the named graph {}",
                quad.graph_name
            )));
        }
        let generalized_rdf = self.generalized_rdf;
        let inner = &mut self.inner;
        self.writer.run(|writer| {
            quad.validate(generalized_rdf)?;
            Ok(inner.serialize_quad(quad, writer)?)
        })
    }

    /// Writes the held statements and returns the underlying [`Write`].
    pub fn finish(mut self) -> Result<W, SerializerError> {
        let inner = &mut self.inner;
        self.writer.run(|writer| Ok(inner.finish(writer)?))?;
        self.writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::vocab::{rdf, xsd};
    use tessera_model::{BlankNode, Dataset, ErrorKind, Literal, NamedNode, Subject, Term};

    fn parse(file: &str) -> Result<Vec<Triple>, TurtleSyntaxError> {
        TurtleParser::new()
            .with_base_iri("http://e/")
            .unwrap()
            .for_slice(file.as_bytes())
            .collect()
    }

    fn e(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://e/{name}"))
    }

    #[test]
    fn object_lists_keep_document_order() {
        let triples = parse(r#"@prefix ex: <http://e/> . ex:a ex:p "x"@en, "y" ."#).unwrap();
        assert_eq!(
            triples,
            [
                Triple::new(e("a"), e("p"), Literal::new_language_tagged_literal_unchecked("x", "en")),
                Triple::new(e("a"), e("p"), Literal::new_simple_literal("y")),
            ]
        );
    }

    #[test]
    fn collections_follow_the_referencing_statement() {
        let triples = parse("<a> <p> ( 1 2 ) .").unwrap();
        assert_eq!(triples.len(), 5);
        let Term::BlankNode(b1) = triples[0].object.clone() else {
            panic!("expected a blank node");
        };
        assert_eq!(triples[0].subject, Subject::from(e("a")));
        assert_eq!(triples[1].subject, Subject::from(b1.clone()));
        assert_eq!(triples[1].predicate, rdf::FIRST);
        assert_eq!(triples[1].object, Term::from(Literal::new_typed_literal("1", xsd::INTEGER)));
        assert_eq!(triples[2].subject, Subject::from(b1));
        assert_eq!(triples[2].predicate, rdf::REST);
        let Term::BlankNode(b2) = triples[2].object.clone() else {
            panic!("expected a blank node");
        };
        assert_eq!(triples[3].subject, Subject::from(b2.clone()));
        assert_eq!(triples[3].object, Term::from(Literal::new_typed_literal("2", xsd::INTEGER)));
        assert_eq!(triples[4].subject, Subject::from(b2));
        assert_eq!(triples[4].object, Term::from(rdf::NIL));
    }

    #[test]
    fn empty_collection_is_nil() {
        let triples = parse("<a> <p> () .").unwrap();
        assert_eq!(triples, [Triple::new(e("a"), e("p"), rdf::NIL)]);
    }

    #[test]
    fn blank_node_property_lists() {
        let triples = parse("<a> <p> [ <q> <o> ; <r> <o2> ] . [ <q> <o> ] <r> <o> .").unwrap();
        assert_eq!(triples.len(), 5);
        assert_eq!(triples[0].subject, Subject::from(e("a")));
        let b = triples[0].object.clone().into_subject().unwrap();
        assert_eq!(triples[1].subject, b);
        assert_eq!(triples[2].subject, b);
        assert_eq!(triples[3].subject, triples[4].subject);
    }

    #[test]
    fn quoted_triple_subject() {
        let triples = parse("<< <s> <p> <o> >> <q> <r> .").unwrap();
        assert_eq!(
            triples,
            [Triple::new(
                Triple::new(e("s"), e("p"), e("o")),
                e("q"),
                e("r")
            )]
        );
    }

    #[test]
    fn undefined_prefix() {
        let error = parse("ex:a ex:b ex:c .").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UndefinedPrefix);
    }

    #[test]
    fn case_insensitive_directives() {
        let triples = parse("PrEfIx ex: <http://e/> bAsE <http://f/> ex:a <b> ex:c .").unwrap();
        assert_eq!(
            triples,
            [Triple::new(
                e("a"),
                NamedNode::new_unchecked("http://f/b"),
                e("c")
            )]
        );
    }

    #[test]
    fn boundary_escapes() {
        assert_eq!(
            parse(r#"<a> <p> "\UFFFFFFFF" ."#).unwrap_err().kind(),
            ErrorKind::InvalidEscape
        );
        assert_eq!(
            parse(r#"<a> <p> "\uD800" ."#).unwrap_err().kind(),
            ErrorKind::InvalidEscape
        );
    }

    #[test]
    fn empty_document() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn rejects_named_graphs() {
        let mut serializer = TurtleSerializer::new().for_writer(Vec::new());
        let error = serializer
            .serialize_quad(&Quad::new(e("s"), e("p"), e("o"), e("g")))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnrepresentableInTargetFormat);
        assert_eq!(
            serializer.finish().unwrap_err().kind(),
            ErrorKind::UnrepresentableInTargetFormat
        );
    }

    #[test]
    fn round_trip() {
        let file = r#"@prefix ex: <http://e/> .
ex:a a ex:C ;
    ex:list ( 1 2.5 "three"@en [ ex:p ex:o ] ) ;
    ex:nested [ ex:q [ ex:r true ] ] ;
    ex:shared _:x .
ex:b ex:shared _:x .
<< ex:a ex:p _:x >> ex:q 1e3 .
_:x ex:value "\t\u00E9" .
"#;
        let triples = parse(file).unwrap();
        let mut serializer = TurtleSerializer::new()
            .with_prefix("ex", "http://e/")
            .unwrap()
            .for_writer(Vec::new());
        for triple in &triples {
            serializer.serialize_triple(triple).unwrap();
        }
        let output = String::from_utf8(serializer.finish().unwrap()).unwrap();
        let reparsed = parse(&output).unwrap();
        let expected = triples.into_iter().map(Quad::from).collect::<Dataset>();
        let actual = reparsed.into_iter().map(Quad::from).collect::<Dataset>();
        assert!(expected.is_isomorphic(&actual), "{output}");
        assert!(output.contains("ex:list ( 1 2.5 \"three\"@en [ ex:p ex:o ] )"));
    }

    #[test]
    fn blank_node_predicates_need_generalized_rdf() {
        let triple = Triple::new(e("s"), BlankNode::default(), e("o"));
        let mut serializer = TurtleSerializer::new().for_writer(Vec::new());
        assert!(serializer.serialize_triple(&triple).is_err());
        let mut serializer = TurtleSerializer::new()
            .with_generalized_rdf()
            .for_writer(Vec::new());
        serializer.serialize_triple(&triple).unwrap();
        let output = String::from_utf8(serializer.finish().unwrap()).unwrap();
        let reparsed = TurtleParser::new()
            .with_generalized_rdf()
            .for_slice(output.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(reparsed.len(), 1);
    }
}
