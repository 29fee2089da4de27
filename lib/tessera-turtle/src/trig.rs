//! A [TriG](https://www.w3.org/TR/trig/) streaming parser implemented by [`TriGParser`]
//! and a serializer implemented by [`TriGSerializer`].

use crate::lexer::{is_possible_pn_chars, is_possible_pn_chars_base, is_possible_pn_chars_u};
use crate::options::{ParserOptions, SerializerOptions};
use crate::terse::TriGRecognizer;
use crate::toolkit::{Parser, ReaderIterator, SliceIterator, TurtleParseError, TurtleSyntaxError};
use crate::writer::FailableWriter;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Read, Write};
use tessera_model::vocab::{rdf, xsd};
use tessera_model::{
    BaseIri, BlankNode, GraphName, IriParseError, IriResolveError, Literal, NamedNode,
    Predicate, PrefixEnvironment, Quad, SerializerError, Subject, Term, Triple,
};
use tracing::{debug, warn};

/// A [TriG](https://www.w3.org/TR/trig/) streaming parser.
///
/// Quoted triples and annotations of [TriG-star](https://w3c.github.io/rdf-star/cg-spec/2021-12-17.html#trig-star)
/// are supported unless [`without_rdf_star`](Self::without_rdf_star) is called.
///
/// Count the number of people:
/// ```
/// use tessera_model::{NamedNode, Term};
/// use tessera_model::vocab::rdf;
/// use tessera_turtle::TriGParser;
///
/// let file = br#"@base <http://example.com/> .
/// @prefix schema: <http://schema.org/> .
/// <foo> a schema:Person ;
///     schema:name "Foo" .
/// <g> {
///     <bar> a schema:Person ;
///         schema:name "Bar" .
/// }"#;
///
/// let schema_person = Term::from(NamedNode::new("http://schema.org/Person")?);
/// let mut count = 0;
/// for quad in TriGParser::new().for_reader(file.as_ref()) {
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
pub struct TriGParser {
    options: ParserOptions,
}

impl TriGParser {
    /// Builds a new [`TriGParser`].
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
    ///
    /// Fails with an [`InvalidBase`](tessera_model::ErrorKind::InvalidBase) error if `base_iri` is not absolute.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriResolveError> {
        self.options.set_base_iri(base_iri)?;
        Ok(self)
    }

    /// Binds a prefix before the document starts.
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

    /// Parses a TriG file from a [`Read`] implementation.
    pub fn for_reader<R: Read>(self, reader: R) -> ReaderTriGParser<R> {
        ReaderTriGParser {
            inner: self.low_level().parser.for_reader(reader),
        }
    }

    /// Parses a TriG file from a byte slice.
    ///
    /// ```
    /// use tessera_model::{GraphName, NamedNode};
    /// use tessera_turtle::TriGParser;
    ///
    /// let quads = TriGParser::new()
    ///     .with_base_iri("http://example.com/")?
    ///     .for_slice(b"<g> { <s> <p> <o> }")
    ///     .collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(quads[0].graph_name, GraphName::from(NamedNode::new("http://example.com/g")?));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn for_slice(self, slice: &[u8]) -> SliceTriGParser<'_> {
        self.options.log_non_default("TriG");
        SliceTriGParser {
            inner: TriGRecognizer::new_parser(slice, true, true, &self.options).into_iter(),
        }
    }

    /// Allows to parse a TriG file by using a low-level API.
    ///
    /// ```
    /// use tessera_turtle::TriGParser;
    ///
    /// let file: [&[u8]; 3] = [
    ///     b"@prefix ex: <http://example.com/> .\n",
    ///     b"ex:g { ex:s ex:p ",
    ///     b"ex:o , ex:o2 . }",
    /// ];
    /// let mut count = 0;
    /// let mut parser = TriGParser::new().low_level();
    /// let mut file_chunks = file.iter();
    /// while !parser.is_end() {
    ///     if let Some(chunk) = file_chunks.next() {
    ///         parser.extend_from_slice(chunk);
    ///     } else {
    ///         parser.end();
    ///     }
    ///     while let Some(quad) = parser.parse_next() {
    ///         quad?;
    ///         count += 1;
    ///     }
    /// }
    /// assert_eq!(2, count);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn low_level(self) -> LowLevelTriGParser {
        self.options.log_non_default("TriG");
        LowLevelTriGParser {
            parser: TriGRecognizer::new_parser(Vec::new(), false, true, &self.options),
        }
    }
}

/// Parses a TriG file from a [`Read`] implementation.
///
/// Can be built using [`TriGParser::for_reader`].
#[must_use]
pub struct ReaderTriGParser<R: Read> {
    inner: ReaderIterator<R, TriGRecognizer>,
}

impl<R: Read> ReaderTriGParser<R> {
    /// The prefixes bound at the current state of the parsing, sorted by name.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.parser.context.env.iter()
    }

    /// The base IRI at the current state of the parsing.
    pub fn base_iri(&self) -> Option<&str> {
        self.inner.parser.context.env.base().map(BaseIri::as_str)
    }
}

impl<R: Read> Iterator for ReaderTriGParser<R> {
    type Item = Result<Quad, TurtleParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Parses a TriG file from a byte slice.
///
/// Can be built using [`TriGParser::for_slice`].
#[must_use]
pub struct SliceTriGParser<'a> {
    inner: SliceIterator<'a, TriGRecognizer>,
}

impl SliceTriGParser<'_> {
    /// The prefixes bound at the current state of the parsing, sorted by name.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.parser.context.env.iter()
    }

    /// The base IRI at the current state of the parsing.
    pub fn base_iri(&self) -> Option<&str> {
        self.inner.parser.context.env.base().map(BaseIri::as_str)
    }
}

impl Iterator for SliceTriGParser<'_> {
    type Item = Result<Quad, TurtleSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Parses a TriG file by using a low-level API.
///
/// Can be built using [`TriGParser::low_level`].
pub struct LowLevelTriGParser {
    parser: Parser<Vec<u8>, TriGRecognizer>,
}

impl LowLevelTriGParser {
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

    /// The prefixes bound at the current state of the parsing, sorted by name.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parser.context.env.iter()
    }

    /// The base IRI at the current state of the parsing.
    pub fn base_iri(&self) -> Option<&str> {
        self.parser.context.env.base().map(BaseIri::as_str)
    }
}

/// A [TriG](https://www.w3.org/TR/trig/) serializer.
///
/// Statements without blank nodes are written as they come, grouped with `;` and `,` when
/// consecutive statements share their subject and predicate.
/// Statements mentioning blank nodes are held until [`finish`](WriterTriGSerializer::finish) so that
/// RDF lists can be written as `( ... )` and blank nodes used once as `[ ... ]`.
///
/// ```
/// use tessera_model::{NamedNode, Quad};
/// use tessera_turtle::TriGSerializer;
///
/// let mut serializer = TriGSerializer::new()
///     .with_prefix("schema", "http://schema.org/")?
///     .for_writer(Vec::new());
/// serializer.serialize_quad(&Quad::new(
///     NamedNode::new("http://example.com#me")?,
///     NamedNode::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type")?,
///     NamedNode::new("http://schema.org/Person")?,
///     NamedNode::new("http://example.com")?,
/// ))?;
/// assert_eq!(
///     "@prefix schema: <http://schema.org/> .\n<http://example.com> {\n\t<http://example.com#me> a schema:Person .\n}\n",
///     String::from_utf8(serializer.finish()?)?
/// );
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct TriGSerializer {
    options: SerializerOptions,
}

impl TriGSerializer {
    /// Builds a new [`TriGSerializer`].
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

    /// Writes a TriG file to a [`Write`] implementation.
    pub fn for_writer<W: Write>(self, writer: W) -> WriterTriGSerializer<W> {
        WriterTriGSerializer {
            writer: FailableWriter::new(writer),
            generalized_rdf: self.options.generalized_rdf,
            inner: LowLevelTriGSerializer::new(self.options),
        }
    }
}

/// Writes a TriG file to a [`Write`] implementation.
///
/// Can be built using [`TriGSerializer::for_writer`].
#[must_use]
pub struct WriterTriGSerializer<W: Write> {
    writer: FailableWriter<W>,
    generalized_rdf: bool,
    inner: LowLevelTriGSerializer,
}

impl<W: Write> WriterTriGSerializer<W> {
    /// Writes an extra quad.
    pub fn serialize_quad(&mut self, quad: &Quad) -> Result<(), SerializerError> {
        let generalized_rdf = self.generalized_rdf;
        let inner = &mut self.inner;
        self.writer.run(|writer| {
            quad.validate(generalized_rdf)?;
            Ok(inner.serialize_quad(quad, writer)?)
        })
    }

    /// Writes a triple in the default graph.
    pub fn serialize_triple(&mut self, triple: &Triple) -> Result<(), SerializerError> {
        self.serialize_quad(&triple.clone().into())
    }

    /// Writes the held statements and returns the underlying [`Write`].
    pub fn finish(mut self) -> Result<W, SerializerError> {
        let inner = &mut self.inner;
        self.writer.run(|writer| Ok(inner.finish(writer)?))?;
        self.writer.finish()
    }
}

/// Writes Turtle and TriG statements.
///
/// Named graphs are written as TriG blocks: the Turtle serializer never gives it any.
pub(crate) struct LowLevelTriGSerializer {
    env: PrefixEnvironment,
    base_iri: Option<String>,
    prelude_written: bool,
    current_graph_name: GraphName,
    current_subject_predicate: Option<(Subject, Predicate)>,
    held: Vec<Quad>,
}

impl LowLevelTriGSerializer {
    pub fn new(options: SerializerOptions) -> Self {
        let mut env = PrefixEnvironment::default();
        for (name, iri) in options.prefixes {
            if is_valid_pn_prefix(&name) {
                env.bind(name, iri);
            } else {
                warn!(prefix = name, "Ignoring a prefix that is not a valid Turtle prefix name");
            }
        }
        if options.base_iri.is_some() || options.generalized_rdf || env.iter().next().is_some() {
            debug!(
                base_iri = options.base_iri,
                prefixes = env.iter().count(),
                generalized_rdf = options.generalized_rdf,
                "Creating a Turtle serializer with non-default options"
            );
        }
        Self {
            env,
            base_iri: options.base_iri,
            prelude_written: false,
            current_graph_name: GraphName::DefaultGraph,
            current_subject_predicate: None,
            held: Vec::new(),
        }
    }

    pub fn serialize_quad(&mut self, quad: &Quad, mut write: impl Write) -> io::Result<()> {
        self.write_prelude(&mut write)?;
        if mentions_blank_node(quad) {
            self.held.push(quad.clone());
            return Ok(());
        }
        let env = &self.env;
        if quad.graph_name == self.current_graph_name {
            if let Some((current_subject, current_predicate)) =
                self.current_subject_predicate.take()
            {
                if quad.subject == current_subject {
                    if quad.predicate == current_predicate {
                        self.current_subject_predicate = Some((current_subject, current_predicate));
                        return write!(write, " , {}", TurtleTerm::new(env, &quad.object));
                    }
                    self.current_subject_predicate =
                        Some((current_subject, quad.predicate.clone()));
                    writeln!(write, " ;")?;
                    if !self.current_graph_name.is_default_graph() {
                        write!(write, "\t")?;
                    }
                    return write!(
                        write,
                        "\t{} {}",
                        TurtleTerm::new(env, &quad.predicate),
                        TurtleTerm::new(env, &quad.object)
                    );
                }
                writeln!(write, " .")?;
            }
        } else {
            if self.current_subject_predicate.take().is_some() {
                writeln!(write, " .")?;
            }
            if !self.current_graph_name.is_default_graph() {
                writeln!(write, "}}")?;
            }
            self.current_graph_name = quad.graph_name.clone();
            if !self.current_graph_name.is_default_graph() {
                writeln!(write, "{} {{", TurtleTerm::new(env, &quad.graph_name))?;
            }
        }
        self.current_subject_predicate = Some((quad.subject.clone(), quad.predicate.clone()));
        if !self.current_graph_name.is_default_graph() {
            write!(write, "\t")?;
        }
        write!(
            write,
            "{} {} {}",
            TurtleTerm::new(env, &quad.subject),
            TurtleTerm::new(env, &quad.predicate),
            TurtleTerm::new(env, &quad.object)
        )
    }

    /// Closes the current statement and graph then writes the held statements.
    pub fn finish(&mut self, mut write: impl Write) -> io::Result<()> {
        self.write_prelude(&mut write)?;
        if self.current_subject_predicate.take().is_some() {
            writeln!(write, " .")?;
        }
        if !self.current_graph_name.is_default_graph() {
            writeln!(write, "}}")?;
        }
        self.current_graph_name = GraphName::DefaultGraph;
        let held = std::mem::take(&mut self.held);
        let usage = BlankNodeUsage::new(&held);
        let mut graph_names = Vec::new();
        let mut by_graph = HashMap::<&GraphName, Vec<&Quad>>::new();
        for quad in &held {
            by_graph
                .entry(&quad.graph_name)
                .or_insert_with(|| {
                    graph_names.push(&quad.graph_name);
                    Vec::new()
                })
                .push(quad);
        }
        for graph_name in graph_names {
            let quads = by_graph.remove(graph_name).unwrap_or_default();
            let layout = GraphLayout::new(&quads, &usage);
            self.write_graph(graph_name, &layout, &mut write)?;
        }
        Ok(())
    }

    fn write_prelude(&mut self, mut write: impl Write) -> io::Result<()> {
        if self.prelude_written {
            return Ok(());
        }
        self.prelude_written = true;
        if let Some(base_iri) = &self.base_iri {
            writeln!(write, "@base <{base_iri}> .")?;
        }
        for (name, iri) in self.env.iter() {
            writeln!(write, "@prefix {name}: <{iri}> .")?;
        }
        Ok(())
    }

    fn write_graph(
        &self,
        graph_name: &GraphName,
        layout: &GraphLayout<'_>,
        write: &mut dyn Write,
    ) -> io::Result<()> {
        let indent = if graph_name.is_default_graph() {
            ""
        } else {
            writeln!(write, "{} {{", TurtleTerm::new(&self.env, graph_name))?;
            "\t"
        };
        for subject in &layout.roots {
            let properties = layout.properties_of(subject);
            match subject {
                Subject::BlankNode(node) if layout.anonymous.contains(node) => {
                    write!(write, "{indent}[ ")?;
                    self.write_properties(layout, properties, " ; ", write)?;
                    writeln!(write, " ] .")?;
                }
                _ => {
                    write!(write, "{indent}{} ", TurtleTerm::new(&self.env, *subject))?;
                    self.write_properties(
                        layout,
                        properties,
                        &format!(" ;\n{indent}\t"),
                        write,
                    )?;
                    writeln!(write, " .")?;
                }
            }
        }
        if !graph_name.is_default_graph() {
            writeln!(write, "}}")?;
        }
        Ok(())
    }

    fn write_properties(
        &self,
        layout: &GraphLayout<'_>,
        properties: &[(&Predicate, &Term)],
        separator: &str,
        write: &mut dyn Write,
    ) -> io::Result<()> {
        let mut groups = Vec::<(&Predicate, Vec<&Term>)>::new();
        for (predicate, object) in properties {
            if let Some((_, objects)) = groups.iter_mut().find(|(p, _)| p == predicate) {
                objects.push(object);
            } else {
                groups.push((predicate, vec![object]));
            }
        }
        for (i, (predicate, objects)) in groups.into_iter().enumerate() {
            if i > 0 {
                write.write_all(separator.as_bytes())?;
            }
            write!(write, "{} ", TurtleTerm::new(&self.env, predicate))?;
            for (j, object) in objects.into_iter().enumerate() {
                if j > 0 {
                    write!(write, " , ")?;
                }
                self.write_object(layout, object, write)?;
            }
        }
        Ok(())
    }

    fn write_object(
        &self,
        layout: &GraphLayout<'_>,
        object: &Term,
        write: &mut dyn Write,
    ) -> io::Result<()> {
        let Term::BlankNode(node) = object else {
            return write!(write, "{}", TurtleTerm::new(&self.env, object));
        };
        if !layout.inlined.contains(node) {
            return write!(write, "{node}");
        }
        if let Some(items) = layout.list_items(node) {
            write!(write, "(")?;
            for item in items {
                write!(write, " ")?;
                self.write_object(layout, item, write)?;
            }
            return write!(write, " )");
        }
        let properties = layout.properties_of(&Subject::BlankNode(node.clone()));
        if properties.is_empty() {
            return write!(write, "[]");
        }
        write!(write, "[ ")?;
        self.write_properties(layout, properties, " ; ", write)?;
        write!(write, " ]")
    }
}

/// How the blank nodes of the held statements are used across all graphs.
struct BlankNodeUsage {
    /// Used exactly once as an object and nowhere else outside of its graph.
    inlinable: HashSet<BlankNode>,
    /// Only used as a subject of a single graph.
    anonymous: HashSet<BlankNode>,
}

impl BlankNodeUsage {
    fn new(quads: &[Quad]) -> Self {
        let mut references = HashMap::<&BlankNode, usize>::new();
        let mut graphs = HashMap::<&BlankNode, &GraphName>::new();
        let mut pinned = HashSet::<&BlankNode>::new();
        for quad in quads {
            match &quad.subject {
                Subject::BlankNode(node) => {
                    note_graph(node, &quad.graph_name, &mut graphs, &mut pinned);
                }
                Subject::Triple(triple) => pin_blank_nodes(triple, &mut pinned),
                Subject::NamedNode(_) => (),
            }
            if let Predicate::BlankNode(node) = &quad.predicate {
                pinned.insert(node);
            }
            match &quad.object {
                Term::BlankNode(node) => {
                    note_graph(node, &quad.graph_name, &mut graphs, &mut pinned);
                    *references.entry(node).or_default() += 1;
                }
                Term::Triple(triple) => pin_blank_nodes(triple, &mut pinned),
                Term::NamedNode(_) | Term::Literal(_) => (),
            }
            if let GraphName::BlankNode(node) = &quad.graph_name {
                pinned.insert(node);
            }
        }
        let inlinable = references
            .iter()
            .filter(|(node, count)| **count == 1 && !pinned.contains(*node))
            .map(|(node, _)| (*node).clone())
            .collect();
        let anonymous = graphs
            .keys()
            .filter(|node| !references.contains_key(*node) && !pinned.contains(*node))
            .map(|node| (*node).clone())
            .collect();
        Self {
            inlinable,
            anonymous,
        }
    }
}

fn note_graph<'a>(
    node: &'a BlankNode,
    graph_name: &'a GraphName,
    graphs: &mut HashMap<&'a BlankNode, &'a GraphName>,
    pinned: &mut HashSet<&'a BlankNode>,
) {
    if *graphs.entry(node).or_insert(graph_name) != graph_name {
        pinned.insert(node);
    }
}

fn pin_blank_nodes<'a>(triple: &'a Triple, pinned: &mut HashSet<&'a BlankNode>) {
    match &triple.subject {
        Subject::BlankNode(node) => {
            pinned.insert(node);
        }
        Subject::Triple(triple) => pin_blank_nodes(triple, pinned),
        Subject::NamedNode(_) => (),
    }
    if let Predicate::BlankNode(node) = &triple.predicate {
        pinned.insert(node);
    }
    match &triple.object {
        Term::BlankNode(node) => {
            pinned.insert(node);
        }
        Term::Triple(triple) => pin_blank_nodes(triple, pinned),
        Term::NamedNode(_) | Term::Literal(_) => (),
    }
}

/// The statements of one graph arranged as top-level subject blocks.
struct GraphLayout<'a> {
    roots: Vec<&'a Subject>,
    properties: HashMap<&'a Subject, Vec<(&'a Predicate, &'a Term)>>,
    inlined: HashSet<&'a BlankNode>,
    anonymous: &'a HashSet<BlankNode>,
}

impl<'a> GraphLayout<'a> {
    fn new(quads: &[&'a Quad], usage: &'a BlankNodeUsage) -> Self {
        let mut subjects = Vec::new();
        let mut properties = HashMap::<&Subject, Vec<_>>::new();
        let mut inlined = HashSet::new();
        for &quad in quads {
            properties
                .entry(&quad.subject)
                .or_insert_with(|| {
                    subjects.push(&quad.subject);
                    Vec::new()
                })
                .push((&quad.predicate, &quad.object));
            if let Term::BlankNode(node) = &quad.object {
                if usage.inlinable.contains(node) {
                    inlined.insert(node);
                }
            }
        }
        let mut layout = Self {
            roots: Vec::new(),
            properties,
            inlined,
            anonymous: &usage.anonymous,
        };
        let mut reached = HashSet::new();
        for &subject in &subjects {
            if !layout.is_inlined(subject) {
                layout.roots.push(subject);
                layout.reach_from(subject, &mut reached);
            }
        }
        // Inlined nodes that can't be reached from a root form cycles: they get a label
        for &subject in &subjects {
            if let Subject::BlankNode(node) = subject {
                if layout.inlined.contains(node) && !reached.contains(node) {
                    layout.inlined.remove(node);
                    layout.roots.push(subject);
                    layout.reach_from(subject, &mut reached);
                }
            }
        }
        layout
    }

    fn is_inlined(&self, subject: &Subject) -> bool {
        matches!(subject, Subject::BlankNode(node) if self.inlined.contains(node))
    }

    fn reach_from(&self, start: &'a Subject, reached: &mut HashSet<&'a BlankNode>) {
        let mut stack = vec![start];
        while let Some(subject) = stack.pop() {
            for &(_, object) in self.properties.get(subject).into_iter().flatten() {
                if let Term::BlankNode(node) = object {
                    if self.inlined.contains(node) && reached.insert(node) {
                        if let Some((key, _)) = self
                            .properties
                            .get_key_value(&Subject::BlankNode(node.clone()))
                        {
                            stack.push(*key);
                        }
                    }
                }
            }
        }
    }

    fn properties_of(&self, subject: &Subject) -> &[(&'a Predicate, &'a Term)] {
        self.properties.get(subject).map_or(&[], Vec::as_slice)
    }

    /// The items of the RDF list starting at `head` if all its nodes can be written inline.
    fn list_items(&self, head: &'a BlankNode) -> Option<Vec<&'a Term>> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut current = head;
        loop {
            if !self.inlined.contains(current) || !visited.insert(current) {
                return None;
            }
            let [(p1, o1), (p2, o2)] = self.properties_of(&Subject::BlankNode(current.clone()))
            else {
                return None;
            };
            let (first, rest) = if **p1 == rdf::FIRST && **p2 == rdf::REST {
                (*o1, *o2)
            } else if **p1 == rdf::REST && **p2 == rdf::FIRST {
                (*o2, *o1)
            } else {
                return None;
            };
            items.push(first);
            match rest {
                Term::NamedNode(node) if *node == rdf::NIL => return Some(items),
                Term::BlankNode(node) => current = node,
                _ => return None,
            }
        }
    }
}

fn mentions_blank_node(quad: &Quad) -> bool {
    subject_mentions_blank_node(&quad.subject)
        || quad.predicate.is_blank_node()
        || term_mentions_blank_node(&quad.object)
        || matches!(quad.graph_name, GraphName::BlankNode(_))
}

fn subject_mentions_blank_node(subject: &Subject) -> bool {
    match subject {
        Subject::NamedNode(_) => false,
        Subject::BlankNode(_) => true,
        Subject::Triple(triple) => triple_mentions_blank_node(triple),
    }
}

fn term_mentions_blank_node(term: &Term) -> bool {
    match term {
        Term::NamedNode(_) | Term::Literal(_) => false,
        Term::BlankNode(_) => true,
        Term::Triple(triple) => triple_mentions_blank_node(triple),
    }
}

fn triple_mentions_blank_node(triple: &Triple) -> bool {
    subject_mentions_blank_node(&triple.subject)
        || triple.predicate.is_blank_node()
        || term_mentions_blank_node(&triple.object)
}

/// Writes a term in Turtle syntax, abbreviating IRIs with the bound prefixes.
struct TurtleTerm<'a, T> {
    env: &'a PrefixEnvironment,
    term: &'a T,
}

impl<'a, T> TurtleTerm<'a, T> {
    fn new(env: &'a PrefixEnvironment, term: &'a T) -> Self {
        Self { env, term }
    }

    fn with<U>(&self, term: &'a U) -> TurtleTerm<'a, U> {
        TurtleTerm::new(self.env, term)
    }
}

impl fmt::Display for TurtleTerm<'_, NamedNode> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let iri = self.term.as_str();
        if let Some((prefix, local)) = self.env.abbreviate(iri, is_valid_pn_local) {
            write!(f, "{prefix}:{local}")
        } else {
            write!(f, "<{iri}>")
        }
    }
}

impl fmt::Display for TurtleTerm<'_, Subject> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            Subject::NamedNode(node) => self.with(node).fmt(f),
            Subject::BlankNode(node) => node.fmt(f),
            Subject::Triple(triple) => self.with(&**triple).fmt(f),
        }
    }
}

impl fmt::Display for TurtleTerm<'_, Predicate> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            Predicate::NamedNode(node) if *node == rdf::TYPE => f.write_str("a"),
            Predicate::NamedNode(node) => self.with(node).fmt(f),
            Predicate::BlankNode(node) => node.fmt(f),
        }
    }
}

impl fmt::Display for TurtleTerm<'_, Term> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            Term::NamedNode(node) if *node == rdf::NIL => f.write_str("()"),
            Term::NamedNode(node) => self.with(node).fmt(f),
            Term::BlankNode(node) => node.fmt(f),
            Term::Literal(literal) => self.with(literal).fmt(f),
            Term::Triple(triple) => self.with(&**triple).fmt(f),
        }
    }
}

impl fmt::Display for TurtleTerm<'_, GraphName> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            GraphName::NamedNode(node) => self.with(node).fmt(f),
            GraphName::BlankNode(node) => node.fmt(f),
            GraphName::DefaultGraph => Ok(()),
        }
    }
}

impl fmt::Display for TurtleTerm<'_, Triple> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<< {} {} ", self.with(&self.term.subject), self.with(&self.term.predicate))?;
        // Collections are not allowed inside of quoted triples
        match &self.term.object {
            Term::NamedNode(node) => self.with(node).fmt(f)?,
            object => self.with(object).fmt(f)?,
        }
        f.write_str(" >>")
    }
}

impl fmt::Display for TurtleTerm<'_, Literal> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.term.value();
        let datatype = self.term.datatype();
        let inline = if datatype == xsd::BOOLEAN {
            is_turtle_boolean(value)
        } else if datatype == xsd::INTEGER {
            is_turtle_integer(value)
        } else if datatype == xsd::DECIMAL {
            is_turtle_decimal(value)
        } else if datatype == xsd::DOUBLE {
            is_turtle_double(value)
        } else {
            false
        };
        if inline {
            return f.write_str(value);
        }
        tessera_model::print_quoted_str(value, f)?;
        if let Some(language) = self.term.language() {
            write!(f, "@{language}")
        } else if self.term.is_plain() {
            Ok(())
        } else {
            write!(f, "^^{}", self.with(&datatype.into_owned()))
        }
    }
}

fn is_turtle_boolean(value: &str) -> bool {
    matches!(value, "true" | "false")
}

fn strip_sign(value: &[u8]) -> &[u8] {
    value
        .strip_prefix(b"+")
        .or_else(|| value.strip_prefix(b"-"))
        .unwrap_or(value)
}

fn strip_digits(value: &[u8]) -> (&[u8], bool) {
    let count = value.iter().take_while(|b| b.is_ascii_digit()).count();
    (&value[count..], count > 0)
}

fn is_turtle_integer(value: &str) -> bool {
    // INTEGER ::= [+-]? [0-9]+
    let (rest, with_digits) = strip_digits(strip_sign(value.as_bytes()));
    with_digits && rest.is_empty()
}

fn is_turtle_decimal(value: &str) -> bool {
    // DECIMAL ::= [+-]? [0-9]* '.' [0-9]+
    let (value, _) = strip_digits(strip_sign(value.as_bytes()));
    let Some(value) = value.strip_prefix(b".") else {
        return false;
    };
    let (rest, with_digits) = strip_digits(value);
    with_digits && rest.is_empty()
}

fn is_turtle_double(value: &str) -> bool {
    // DOUBLE ::= [+-]? ([0-9]+ '.' [0-9]* EXPONENT | '.' [0-9]+ EXPONENT | [0-9]+ EXPONENT)
    // EXPONENT ::= [eE] [+-]? [0-9]+
    let (mut value, with_before) = strip_digits(strip_sign(value.as_bytes()));
    let mut with_after = false;
    if let Some(v) = value.strip_prefix(b".") {
        (value, with_after) = strip_digits(v);
    }
    let Some(value) = value
        .strip_prefix(b"e")
        .or_else(|| value.strip_prefix(b"E"))
    else {
        return false;
    };
    let (rest, with_exponent) = strip_digits(strip_sign(value));
    (with_before || with_after) && with_exponent && rest.is_empty()
}

// PN_PREFIX ::= PN_CHARS_BASE ((PN_CHARS | '.')* PN_CHARS)?
fn is_valid_pn_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    is_possible_pn_chars_base(first)
        && chars.all(|c| is_possible_pn_chars(c) || c == '.')
        && !prefix.ends_with('.')
}

// PN_LOCAL ::= (PN_CHARS_U | ':' | [0-9]) ((PN_CHARS | '.' | ':')* (PN_CHARS | ':'))?
// without the PLX escapes
fn is_valid_pn_local(local: &str) -> bool {
    let mut chars = local.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    (is_possible_pn_chars_u(first) || first == ':' || first.is_ascii_digit())
        && chars.all(|c| is_possible_pn_chars(c) || matches!(c, '.' | ':'))
        && !local.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::{Dataset, ErrorKind};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{name}"))
    }

    fn serialize(serializer: TriGSerializer, quads: &[Quad]) -> String {
        let mut serializer = serializer.for_writer(Vec::new());
        for quad in quads {
            serializer.serialize_quad(quad).unwrap();
        }
        String::from_utf8(serializer.finish().unwrap()).unwrap()
    }

    #[test]
    fn groups_consecutive_statements() {
        let output = serialize(
            TriGSerializer::new(),
            &[
                Quad::new(ex("s"), ex("p"), ex("o"), ex("g")),
                Quad::new(ex("s"), ex("p"), Literal::new_simple_literal("foo"), ex("g")),
                Quad::new(ex("s"), ex("p2"), Literal::new_language_tagged_literal_unchecked("foo", "en"), ex("g")),
                Quad::new(ex("s2"), ex("p"), Literal::new_typed_literal("1", xsd::INTEGER), GraphName::DefaultGraph),
            ],
        );
        assert_eq!(
            output,
            "<http://example.com/g> {\n\t<http://example.com/s> <http://example.com/p> <http://example.com/o> , \"foo\" ;\n\t\t<http://example.com/p2> \"foo\"@en .\n}\n<http://example.com/s2> <http://example.com/p> 1 .\n"
        );
    }

    #[test]
    fn abbreviates_with_prefixes() {
        let output = serialize(
            TriGSerializer::new()
                .with_prefix("ex", "http://example.com/")
                .unwrap()
                .with_base_iri("http://example.com/")
                .unwrap(),
            &[
                Quad::new(ex("a"), rdf::TYPE, ex("C"), GraphName::DefaultGraph),
                Quad::new(ex("a"), ex("p"), ex("b/c"), GraphName::DefaultGraph),
                Quad::new(ex("a"), ex("p"), Literal::new_typed_literal("x", ex("dt")), GraphName::DefaultGraph),
            ],
        );
        assert_eq!(
            output,
            "@base <http://example.com/> .\n@prefix ex: <http://example.com/> .\nex:a a ex:C ;\n\tex:p <http://example.com/b/c> , \"x\"^^ex:dt .\n"
        );
    }

    #[test]
    fn writes_lists_and_anonymous_nodes() {
        let b1 = BlankNode::default();
        let b2 = BlankNode::default();
        let anon = BlankNode::default();
        let root = BlankNode::default();
        let output = serialize(
            TriGSerializer::new(),
            &[
                Quad::new(ex("a"), ex("p"), b1.clone(), GraphName::DefaultGraph),
                Quad::new(b1.clone(), rdf::FIRST, Literal::from(1_i64), GraphName::DefaultGraph),
                Quad::new(b1, rdf::REST, b2.clone(), GraphName::DefaultGraph),
                Quad::new(b2.clone(), rdf::FIRST, Literal::from(2_i64), GraphName::DefaultGraph),
                Quad::new(b2, rdf::REST, rdf::NIL, GraphName::DefaultGraph),
                Quad::new(ex("a"), ex("q"), anon.clone(), GraphName::DefaultGraph),
                Quad::new(anon, ex("r"), Literal::from(true), GraphName::DefaultGraph),
                Quad::new(root, ex("r"), ex("o"), GraphName::DefaultGraph),
            ],
        );
        assert_eq!(
            output,
            "<http://example.com/a> <http://example.com/p> ( 1 2 ) ;\n\t<http://example.com/q> [ <http://example.com/r> true ] .\n[ <http://example.com/r> <http://example.com/o> ] .\n"
        );
    }

    #[test]
    fn writes_empty_lists() {
        let output = serialize(
            TriGSerializer::new(),
            &[
                Quad::new(ex("s"), ex("p"), rdf::NIL, GraphName::DefaultGraph),
                Quad::new(ex("s"), ex("q"), Triple::new(ex("a"), ex("b"), rdf::NIL), GraphName::DefaultGraph),
            ],
        );
        assert_eq!(
            output,
            "<http://example.com/s> <http://example.com/p> () ;\n\t<http://example.com/q> << <http://example.com/a> <http://example.com/b> <http://www.w3.org/1999/02/22-rdf-syntax-ns#nil> >> .\n"
        );
        let parsed = TriGParser::new()
            .for_slice(output.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(parsed[0].object, Term::from(rdf::NIL));
    }

    #[test]
    fn labels_shared_and_cyclic_blank_nodes() {
        let shared = BlankNode::new_unchecked("shared");
        let a = BlankNode::new_unchecked("a");
        let b = BlankNode::new_unchecked("b");
        let quads = [
            Quad::new(ex("s"), ex("p"), shared.clone(), GraphName::DefaultGraph),
            Quad::new(ex("s2"), ex("p"), shared.clone(), GraphName::DefaultGraph),
            Quad::new(a.clone(), ex("p"), b.clone(), GraphName::DefaultGraph),
            Quad::new(b.clone(), ex("p"), a.clone(), GraphName::DefaultGraph),
            Quad::new(ex("s"), ex("p"), shared, ex("g")),
        ];
        let output = serialize(TriGSerializer::new(), &quads);
        assert!(output.contains("_:shared"));
        let parsed = TriGParser::new()
            .for_slice(output.as_bytes())
            .collect::<Result<Dataset, _>>()
            .unwrap();
        assert!(parsed.is_isomorphic(&quads.into_iter().collect()));
    }

    #[test]
    fn round_trip_quoted_triples() {
        let quoted = Triple::new(ex("s"), ex("p"), BlankNode::default());
        let quads = [Quad::new(quoted, ex("q"), ex("o"), GraphName::DefaultGraph)];
        let output = serialize(TriGSerializer::new(), &quads);
        let parsed = TriGParser::new()
            .for_slice(output.as_bytes())
            .collect::<Result<Dataset, _>>()
            .unwrap();
        assert!(parsed.is_isomorphic(&quads.into_iter().collect()));
    }

    #[test]
    fn stays_failed() {
        let mut serializer = TriGSerializer::new().for_writer(Vec::new());
        let error = serializer
            .serialize_quad(&Quad::new(
                ex("s"),
                BlankNode::default(),
                ex("o"),
                GraphName::DefaultGraph,
            ))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnrepresentableInTargetFormat);
        assert!(
            serializer
                .serialize_quad(&Quad::new(ex("s"), ex("p"), ex("o"), GraphName::DefaultGraph))
                .is_err()
        );
        assert_eq!(
            serializer.finish().unwrap_err().kind(),
            ErrorKind::UnrepresentableInTargetFormat
        );
    }

    #[test]
    fn named_graph_block() {
        let quads = TriGParser::new()
            .with_base_iri("http://e/")
            .unwrap()
            .for_slice(b"<g> { <s> <p> <o> }")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            quads,
            [Quad::new(
                NamedNode::new_unchecked("http://e/s"),
                NamedNode::new_unchecked("http://e/p"),
                NamedNode::new_unchecked("http://e/o"),
                NamedNode::new_unchecked("http://e/g"),
            )]
        );
    }

    #[test]
    fn exposes_prefixes_and_base() {
        let mut parser = TriGParser::new()
            .for_slice(b"@base <http://e/> . @prefix ex: <http://example.com/> . PREFIX a: <http://a/> ex:s ex:p ex:o .");
        parser.next().unwrap().unwrap();
        assert_eq!(
            parser.prefixes().collect::<Vec<_>>(),
            [("a", "http://a/"), ("ex", "http://example.com/")]
        );
        assert_eq!(parser.base_iri(), Some("http://e/"));
    }

    #[test]
    fn numeric_lexical_forms() {
        assert!(is_turtle_integer("-12"));
        assert!(!is_turtle_integer("1.0"));
        assert!(is_turtle_decimal("+.5"));
        assert!(!is_turtle_decimal("5."));
        assert!(is_turtle_double("1e10"));
        assert!(is_turtle_double("-1.5E-3"));
        assert!(!is_turtle_double("1.5"));
        assert!(!is_turtle_double("e1"));
    }

    #[test]
    fn local_names() {
        assert!(is_valid_pn_local("foo"));
        assert!(is_valid_pn_local("1a"));
        assert!(is_valid_pn_local(""));
        assert!(!is_valid_pn_local("a."));
        assert!(!is_valid_pn_local("a/b"));
        assert!(!is_valid_pn_local("-a"));
        assert!(is_valid_pn_prefix(""));
        assert!(!is_valid_pn_prefix("1a"));
    }
}
