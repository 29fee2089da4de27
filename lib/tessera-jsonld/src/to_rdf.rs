use crate::context::{
    JsonLdContext, JsonLdContextProcessor, JsonLdRemoteDocument, LoadDocumentCallback, is_keyword,
};
use crate::error::{JsonLdParseError, JsonLdSyntaxError};
use crate::expansion::{JsonLdExpander, is_list_object, is_node_object, is_value_object};
use crate::json::{JsonNode, JsonTreeBuilder, to_canonical_json};
use json_event_parser::{JsonEvent, ReaderJsonParser, SliceJsonParser};
use oxiri::Iri;
use std::collections::{BTreeMap, VecDeque, hash_map};
use std::error::Error;
use std::fmt::Write;
use std::io::Read;
use std::sync::Arc;
use tessera_model::vocab::{rdf, xsd};
use tessera_model::{
    BaseIri, BlankNodeScope, GraphName, IriResolveError, Literal, NamedNode, NamedOrBlankNode,
    Quad, Term,
};
use tracing::{debug, trace, warn};

/// A [JSON-LD](https://www.w3.org/TR/json-ld/) parser.
///
/// The document is loaded in memory, then [expanded](https://www.w3.org/TR/json-ld-api/#expansion-algorithm)
/// and converted to RDF following the [Deserialize JSON-LD to RDF Algorithm](https://www.w3.org/TR/json-ld-api/#deserialize-json-ld-to-rdf-algorithm).
///
/// Count the number of people:
/// ```
/// use tessera_jsonld::JsonLdParser;
/// use tessera_model::NamedNode;
/// use tessera_model::vocab::rdf;
///
/// let file = r#"{
///     "@context": {"schema": "http://schema.org/"},
///     "@graph": [
///         {
///             "@type": "schema:Person",
///             "@id": "http://example.com/foo",
///             "schema:name": "Foo"
///         },
///         {
///             "@type": "schema:Person",
///             "schema:name": "Bar"
///         }
///     ]
/// }"#;
///
/// let schema_person = NamedNode::new("http://schema.org/Person")?;
/// let mut count = 0;
/// for quad in JsonLdParser::new().for_reader(file.as_bytes()) {
///     let quad = quad?;
///     if quad.predicate == rdf::TYPE && quad.object == schema_person.clone().into() {
///         count += 1;
///     }
/// }
/// assert_eq!(2, count);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct JsonLdParser {
    lenient: bool,
    base: Option<BaseIri>,
    load_document_callback: Option<Arc<LoadDocumentCallback>>,
}

impl JsonLdParser {
    /// Builds a new [`JsonLdParser`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips IRI and language tag validation.
    ///
    /// Note that if the file is actually not valid, the parser might emit broken RDF.
    #[inline]
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Base IRI to use when expanding the document.
    ///
    /// It corresponds to the [`base` option from the algorithm specification](https://www.w3.org/TR/json-ld-api/#dom-jsonldoptions-base).
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriResolveError> {
        self.base = Some(BaseIri::parse(base_iri)?);
        Ok(self)
    }

    /// Allows setting a callback to load remote contexts.
    ///
    /// The argument is the absolute URL of the context.
    /// Without a callback, documents referencing remote contexts fail with
    /// [`ErrorKind::ContextLoaderUnavailable`](tessera_model::ErrorKind::ContextLoaderUnavailable).
    ///
    /// It corresponds to the [`documentLoader` option from the algorithm specification](https://www.w3.org/TR/json-ld11-api/#dom-jsonldoptions-documentloader).
    ///
    /// ```
    /// use tessera_jsonld::{JsonLdParser, JsonLdRemoteDocument};
    /// use tessera_model::NamedNode;
    /// use tessera_model::vocab::rdf;
    ///
    /// let file = r#"{
    ///     "@context": "file://context.jsonld",
    ///     "@type": "schema:Person",
    ///     "@id": "http://example.com/foo",
    ///     "schema:name": "Foo"
    /// }"#;
    ///
    /// let schema_person = NamedNode::new("http://schema.org/Person")?;
    /// let mut count = 0;
    /// for quad in JsonLdParser::new()
    ///     .with_load_document_callback(|url| {
    ///         assert_eq!(url, "file://context.jsonld");
    ///         Ok(JsonLdRemoteDocument {
    ///             document: br#"{"@context":{"schema": "http://schema.org/"}}"#.to_vec(),
    ///             document_url: "file://context.jsonld".into(),
    ///         })
    ///     })
    ///     .for_slice(file.as_bytes())
    /// {
    ///     let quad = quad?;
    ///     if quad.predicate == rdf::TYPE && quad.object == schema_person.clone().into() {
    ///         count += 1;
    ///     }
    /// }
    /// assert_eq!(1, count);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    #[inline]
    pub fn with_load_document_callback(
        mut self,
        callback: impl Fn(&str) -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.load_document_callback = Some(Arc::new(callback));
        self
    }

    /// Parses a JSON-LD file from a [`Read`] implementation.
    pub fn for_reader<R: Read>(self, reader: R) -> ReaderJsonLdParser<R> {
        ReaderJsonLdParser {
            results: VecDeque::new(),
            inner: self.into_inner(),
            json_parser: ReaderJsonParser::new(reader),
        }
    }

    /// Parses a JSON-LD file from a byte slice.
    ///
    /// ```
    /// use tessera_jsonld::JsonLdParser;
    ///
    /// let file = br#"{"@id": "http://example.com/s", "http://example.com/p": [1, 2.5, true]}"#;
    ///
    /// let objects = JsonLdParser::new()
    ///     .for_slice(file)
    ///     .map(|q| Ok(q?.object.to_string()))
    ///     .collect::<Result<Vec<_>, tessera_jsonld::JsonLdSyntaxError>>()?;
    /// assert_eq!(
    ///     objects,
    ///     [
    ///         "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>",
    ///         "\"2.5E0\"^^<http://www.w3.org/2001/XMLSchema#double>",
    ///         "\"true\"^^<http://www.w3.org/2001/XMLSchema#boolean>"
    ///     ]
    /// );
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn for_slice(self, slice: &(impl AsRef<[u8]> + ?Sized)) -> SliceJsonLdParser<'_> {
        SliceJsonLdParser {
            results: VecDeque::new(),
            inner: self.into_inner(),
            json_parser: SliceJsonParser::new(slice.as_ref()),
        }
    }

    fn into_inner(self) -> InternalJsonLdParser {
        if self.lenient || self.base.is_some() || self.load_document_callback.is_some() {
            debug!(
                format = "JSON-LD",
                lenient = self.lenient,
                base_iri = self.base.as_ref().map(BaseIri::as_str),
                remote_contexts = self.load_document_callback.is_some(),
                "Creating a parser with non-default options"
            );
        }
        let base_url = self
            .base
            .map(|base| Iri::parse_unchecked(base.into_string()));
        InternalJsonLdParser {
            builder: JsonTreeBuilder::default(),
            expander: JsonLdExpander {
                processor: JsonLdContextProcessor {
                    lenient: self.lenient,
                    remote_context_cache: Default::default(),
                    load_document_callback: self.load_document_callback,
                },
                base_url: base_url.clone(),
            },
            to_rdf: JsonLdToRdfConverter {
                lenient: self.lenient,
                blank_nodes: BlankNodeScope::default(),
            },
            root_context: JsonLdContext::new_empty(base_url),
            is_end: false,
        }
    }
}

/// Parses a JSON-LD file from a [`Read`] implementation.
///
/// Can be built using [`JsonLdParser::for_reader`].
///
/// The whole document is read on the first call to [`next`](Iterator::next).
/// Parsing stops at the first error.
#[must_use]
pub struct ReaderJsonLdParser<R: Read> {
    results: VecDeque<Quad>,
    inner: InternalJsonLdParser,
    json_parser: ReaderJsonParser<R>,
}

impl<R: Read> Iterator for ReaderJsonLdParser<R> {
    type Item = Result<Quad, JsonLdParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(quad) = self.results.pop_front() {
                return Some(Ok(quad));
            } else if self.inner.is_end {
                return None;
            }
            if let Err(e) = self.parse_step() {
                self.inner.is_end = true;
                return Some(Err(e));
            }
        }
    }
}

impl<R: Read> ReaderJsonLdParser<R> {
    /// The list of IRI prefixes defined at the root of the document.
    ///
    /// This method returns (prefix name, prefix value) tuples.
    /// It is empty before the document has been read.
    ///
    /// ```
    /// use tessera_jsonld::JsonLdParser;
    ///
    /// let file = r#"{
    ///     "@context": {"schema": "http://schema.org/", "@base": "http://example.com/"},
    ///     "@type": "schema:Person",
    ///     "@id": "foo",
    ///     "schema:name": "Foo"
    /// }"#;
    ///
    /// let mut parser = JsonLdParser::new().for_reader(file.as_bytes());
    /// assert_eq!(parser.prefixes().collect::<Vec<_>>(), []); // No prefix at the beginning
    ///
    /// parser.next().unwrap()?; // We read the first quad
    /// assert_eq!(
    ///     parser.prefixes().collect::<Vec<_>>(),
    ///     [("schema", "http://schema.org/")]
    /// ); // There are now prefixes
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn prefixes(&self) -> JsonLdPrefixesIter<'_> {
        self.inner.prefixes()
    }

    /// The base IRI defined at the root of the document.
    ///
    /// ```
    /// use tessera_jsonld::JsonLdParser;
    ///
    /// let file = r#"{
    ///     "@context": {"schema": "http://schema.org/", "@base": "http://example.com/"},
    ///     "@type": "schema:Person",
    ///     "@id": "foo",
    ///     "schema:name": "Foo"
    /// }"#;
    ///
    /// let mut parser = JsonLdParser::new().for_reader(file.as_bytes());
    /// assert!(parser.base_iri().is_none()); // No base at the beginning because none has been given to the parser.
    ///
    /// parser.next().unwrap()?; // We read the first quad
    /// assert_eq!(parser.base_iri(), Some("http://example.com/")); // There is now a base IRI.
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn base_iri(&self) -> Option<&str> {
        self.inner.base_iri()
    }

    fn parse_step(&mut self) -> Result<(), JsonLdParseError> {
        let event = self.json_parser.parse_next()?;
        self.inner.parse_event(event, &mut self.results)?;
        Ok(())
    }
}

/// Parses a JSON-LD file from a byte slice.
///
/// Can be built using [`JsonLdParser::for_slice`].
#[must_use]
pub struct SliceJsonLdParser<'a> {
    results: VecDeque<Quad>,
    inner: InternalJsonLdParser,
    json_parser: SliceJsonParser<'a>,
}

impl Iterator for SliceJsonLdParser<'_> {
    type Item = Result<Quad, JsonLdSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(quad) = self.results.pop_front() {
                return Some(Ok(quad));
            } else if self.inner.is_end {
                return None;
            }
            if let Err(e) = self.parse_step() {
                self.inner.is_end = true;
                return Some(Err(e));
            }
        }
    }
}

impl SliceJsonLdParser<'_> {
    /// The list of IRI prefixes defined at the root of the document.
    ///
    /// This method returns (prefix name, prefix value) tuples.
    /// It is empty before the document has been read.
    pub fn prefixes(&self) -> JsonLdPrefixesIter<'_> {
        self.inner.prefixes()
    }

    /// The base IRI defined at the root of the document.
    pub fn base_iri(&self) -> Option<&str> {
        self.inner.base_iri()
    }

    fn parse_step(&mut self) -> Result<(), JsonLdSyntaxError> {
        let event = self.json_parser.parse_next()?;
        self.inner.parse_event(event, &mut self.results)
    }
}

/// Iterator on the file prefixes.
///
/// See [`ReaderJsonLdParser::prefixes`].
pub struct JsonLdPrefixesIter<'a> {
    term_definitions: hash_map::Iter<'a, String, crate::context::JsonLdTermDefinition>,
}

impl<'a> Iterator for JsonLdPrefixesIter<'a> {
    type Item = (&'a str, &'a str);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, definition) = self.term_definitions.next()?;
            if !definition.prefix_flag {
                continue;
            }
            if let Some(mapping) = &definition.iri_mapping {
                if !is_keyword(mapping) && Iri::parse(mapping.as_str()).is_ok() {
                    return Some((prefix, mapping));
                }
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.term_definitions.size_hint().1)
    }
}

struct InternalJsonLdParser {
    builder: JsonTreeBuilder,
    expander: JsonLdExpander,
    to_rdf: JsonLdToRdfConverter,
    root_context: JsonLdContext,
    is_end: bool,
}

impl InternalJsonLdParser {
    fn parse_event(
        &mut self,
        event: JsonEvent<'_>,
        results: &mut VecDeque<Quad>,
    ) -> Result<(), JsonLdSyntaxError> {
        let is_eof = matches!(event, JsonEvent::Eof);
        if let Some(document) = self.builder.push_event(event) {
            self.is_end = true;
            return self.convert_document(&document, results);
        }
        if is_eof {
            self.is_end = true;
        }
        Ok(())
    }

    fn convert_document(
        &mut self,
        document: &JsonNode,
        results: &mut VecDeque<Quad>,
    ) -> Result<(), JsonLdSyntaxError> {
        self.root_context = self.expander.root_context(document)?;
        let expanded = self.expander.expand_document(document)?;
        let start = results.len();
        self.to_rdf.convert_document(&expanded, results);
        trace!(
            quads = results.len() - start,
            remote_contexts = self.expander.processor.remote_context_cache.borrow().len(),
            "Converted a JSON-LD document to RDF"
        );
        Ok(())
    }

    fn prefixes(&self) -> JsonLdPrefixesIter<'_> {
        JsonLdPrefixesIter {
            term_definitions: self.root_context.term_definitions.iter(),
        }
    }

    fn base_iri(&self) -> Option<&str> {
        self.root_context.base_iri.as_ref().map(Iri::as_str)
    }
}

/// Converts expanded JSON-LD objects to quads.
struct JsonLdToRdfConverter {
    lenient: bool,
    blank_nodes: BlankNodeScope,
}

type JsonMap = BTreeMap<String, JsonNode>;

impl JsonLdToRdfConverter {
    fn convert_document(&mut self, items: &[JsonNode], results: &mut VecDeque<Quad>) {
        for item in items {
            if let (true, JsonNode::Object(node)) = (is_node_object(item), item) {
                let subject = self.node_id(node);
                self.convert_node(node, subject.as_ref(), &GraphName::DefaultGraph, results);
            }
        }
    }

    fn convert_node(
        &mut self,
        node: &JsonMap,
        subject: Option<&NamedOrBlankNode>,
        graph_name: &GraphName,
        results: &mut VecDeque<Quad>,
    ) {
        for (key, value) in node {
            match key.as_str() {
                "@type" => {
                    for r#type in value.as_slice() {
                        let JsonNode::String(r#type) = r#type else {
                            continue;
                        };
                        let r#type = self.convert_id(r#type);
                        push_quad(
                            results,
                            subject,
                            Some(&rdf::TYPE.into()),
                            r#type.map(Term::from),
                            graph_name,
                        );
                    }
                }
                "@graph" => {
                    // Triples of a graph with an invalid name are dropped
                    let Some(inner_graph_name) = subject.cloned().map(GraphName::from) else {
                        continue;
                    };
                    for item in value.as_slice() {
                        if let (true, JsonNode::Object(item)) = (is_node_object(item), item) {
                            let id = self.node_id(item);
                            self.convert_node(item, id.as_ref(), &inner_graph_name, results);
                        }
                    }
                }
                "@included" => {
                    for item in value.as_slice() {
                        if let JsonNode::Object(item) = item {
                            let id = self.node_id(item);
                            self.convert_node(item, id.as_ref(), graph_name, results);
                        }
                    }
                }
                "@reverse" => {
                    let JsonNode::Object(reverse) = value else {
                        continue;
                    };
                    for (property, items) in reverse {
                        let predicate = self.convert_predicate(property);
                        for item in items.as_slice() {
                            let JsonNode::Object(item) = item else {
                                continue;
                            };
                            let id = self.node_id(item);
                            push_quad(
                                results,
                                id.as_ref(),
                                predicate.as_ref(),
                                subject.cloned().map(Term::from),
                                graph_name,
                            );
                            self.convert_node(item, id.as_ref(), graph_name, results);
                        }
                    }
                }
                key if key.starts_with('@') => (),
                property => {
                    let predicate = self.convert_predicate(property);
                    for item in value.as_slice() {
                        if let (true, JsonNode::Object(item)) = (is_node_object(item), item) {
                            // The linking triple comes before the triples of the nested node
                            let id = self.node_id(item);
                            push_quad(
                                results,
                                subject,
                                predicate.as_ref(),
                                id.clone().map(Term::from),
                                graph_name,
                            );
                            self.convert_node(item, id.as_ref(), graph_name, results);
                        } else {
                            let object = self.convert_object(item, graph_name, results);
                            push_quad(results, subject, predicate.as_ref(), object, graph_name);
                        }
                    }
                }
            }
        }
    }

    /// [Object to RDF Conversion](https://www.w3.org/TR/json-ld-api/#object-to-rdf-conversion)
    fn convert_object(
        &mut self,
        item: &JsonNode,
        graph_name: &GraphName,
        results: &mut VecDeque<Quad>,
    ) -> Option<Term> {
        let JsonNode::Object(object) = item else {
            return None;
        };
        if is_value_object(item) {
            self.convert_literal(object).map(Term::from)
        } else if is_list_object(item) {
            let items = object.get("@list").map_or(&[][..], JsonNode::as_slice);
            Some(self.convert_list(items, graph_name, results))
        } else {
            let id = self.node_id(object);
            self.convert_node(object, id.as_ref(), graph_name, results);
            id.map(Term::from)
        }
    }

    /// [List to RDF Conversion](https://www.w3.org/TR/json-ld-api/#list-to-rdf-conversion)
    fn convert_list(
        &mut self,
        items: &[JsonNode],
        graph_name: &GraphName,
        results: &mut VecDeque<Quad>,
    ) -> Term {
        let nodes = items
            .iter()
            .map(|_| NamedOrBlankNode::from(self.blank_nodes.fresh()))
            .collect::<Vec<_>>();
        for (i, (item, node)) in items.iter().zip(&nodes).enumerate() {
            let object = self.convert_object(item, graph_name, results);
            push_quad(
                results,
                Some(node),
                Some(&rdf::FIRST.into()),
                object,
                graph_name,
            );
            let rest = nodes
                .get(i + 1)
                .map_or_else(|| rdf::NIL.into(), |next| next.clone().into());
            push_quad(
                results,
                Some(node),
                Some(&rdf::REST.into()),
                Some(rest),
                graph_name,
            );
        }
        nodes
            .into_iter()
            .next()
            .map_or_else(|| rdf::NIL.into(), Term::from)
    }

    fn convert_literal(&self, object: &JsonMap) -> Option<Literal> {
        let value = object.get("@value")?;
        let r#type = match object.get("@type") {
            Some(JsonNode::String(r#type)) => Some(r#type.as_str()),
            Some(_) => return None,
            None => None,
        };
        if r#type == Some("@json") {
            return match to_canonical_json(value) {
                Ok(json) => Some(Literal::new_typed_literal(json, rdf::JSON)),
                Err(e) => {
                    warn!(error = %e, "Dropping a JSON literal that can't be canonicalized");
                    None
                }
            };
        }
        let datatype = match r#type {
            Some(r#type) => Some(self.convert_iri(r#type)?),
            None => None,
        };
        if object.contains_key("@direction") {
            warn!("The @direction of JSON-LD literals is not supported, it is ignored");
        }
        Some(match value {
            JsonNode::String(value) => {
                if let Some(datatype) = datatype {
                    Literal::new_typed_literal(value, datatype)
                } else if let Some(JsonNode::String(language)) = object.get("@language") {
                    if self.lenient {
                        Literal::new_language_tagged_literal_unchecked(
                            value,
                            language.to_ascii_lowercase(),
                        )
                    } else {
                        match Literal::new_language_tagged_literal(value, language) {
                            Ok(literal) => literal,
                            Err(e) => {
                                warn!(
                                    language,
                                    error = %e,
                                    "Dropping a literal with an invalid language tag"
                                );
                                return None;
                            }
                        }
                    }
                } else {
                    Literal::new_simple_literal(value)
                }
            }
            JsonNode::Number(value) => {
                let is_double = datatype.as_ref().is_some_and(|t| *t == xsd::DOUBLE);
                match canonicalize_xsd_number(value, is_double)
                    .unwrap_or_else(|| RdfJsonNumber::Double(value.clone()))
                {
                    RdfJsonNumber::Integer(value) => Literal::new_typed_literal(
                        value,
                        datatype.unwrap_or_else(|| xsd::INTEGER.into()),
                    ),
                    RdfJsonNumber::Double(value) => Literal::new_typed_literal(
                        value,
                        datatype.unwrap_or_else(|| xsd::DOUBLE.into()),
                    ),
                }
            }
            JsonNode::Boolean(value) => Literal::new_typed_literal(
                if *value { "true" } else { "false" },
                datatype.unwrap_or_else(|| xsd::BOOLEAN.into()),
            ),
            JsonNode::Null | JsonNode::Array(_) | JsonNode::Object(_) => return None,
        })
    }

    /// The subject of a node object, a fresh blank node if it has no `@id`.
    ///
    /// Returns `None` if the `@id` is not a valid IRI or blank node identifier.
    fn node_id(&mut self, node: &JsonMap) -> Option<NamedOrBlankNode> {
        match node.get("@id") {
            Some(JsonNode::String(id)) => self.convert_id(id),
            Some(_) => None,
            None => Some(self.blank_nodes.fresh().into()),
        }
    }

    fn convert_id(&mut self, id: &str) -> Option<NamedOrBlankNode> {
        if let Some(label) = id.strip_prefix("_:") {
            return Some(self.blank_nodes.intern(label).into());
        }
        self.convert_iri(id).map(Into::into)
    }

    /// Blank node predicates are not valid RDF and are skipped.
    fn convert_predicate(&self, property: &str) -> Option<NamedNode> {
        if property.starts_with("_:") {
            return None;
        }
        self.convert_iri(property)
    }

    fn convert_iri(&self, iri: &str) -> Option<NamedNode> {
        if self.lenient {
            Some(NamedNode::new_unchecked(iri))
        } else {
            NamedNode::new(iri).ok()
        }
    }
}

fn push_quad(
    results: &mut VecDeque<Quad>,
    subject: Option<&NamedOrBlankNode>,
    predicate: Option<&NamedNode>,
    object: Option<Term>,
    graph_name: &GraphName,
) {
    if let (Some(subject), Some(predicate), Some(object)) = (subject, predicate, object) {
        results.push_back(Quad::new(
            subject.clone(),
            predicate.clone(),
            object,
            graph_name.clone(),
        ));
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum RdfJsonNumber {
    Integer(String),
    Double(String),
}

/// Canonicalizes the JSON number to a xsd:integer or xsd:double.
fn canonicalize_xsd_number(value: &str, always_double: bool) -> Option<RdfJsonNumber> {
    let (value, is_negative) = if let Some(value) = value.strip_prefix('-') {
        (value, true)
    } else if let Some(value) = value.strip_prefix('+') {
        (value, false)
    } else {
        (value, false)
    };
    let (value, exp) = value.split_once(['e', 'E']).unwrap_or((value, "0"));
    let (mut integer_part, mut decimal_part) = value.split_once('.').unwrap_or((value, ""));
    let mut exp = exp.parse::<i64>().ok()?;

    // Leading and trailing zeros are not significant
    while let Some(c) = integer_part.strip_prefix('0') {
        integer_part = c;
    }
    while let Some(c) = decimal_part.strip_suffix('0') {
        decimal_part = c;
    }
    if decimal_part.is_empty() {
        while let Some(c) = integer_part.strip_suffix('0') {
            integer_part = c;
            exp = exp.checked_add(1)?;
        }
    }
    if integer_part.is_empty() {
        while let Some(c) = decimal_part.strip_prefix('0') {
            decimal_part = c;
            exp = exp.checked_sub(1)?;
        }
    }

    // The value is now 0.{integer_part}{decimal_part}E{exp}
    exp = exp.checked_add(i64::try_from(integer_part.len()).ok()?)?;

    if integer_part.is_empty() && decimal_part.is_empty() {
        integer_part = "0";
        exp = 1;
    }

    let mut buffer = String::with_capacity(value.len());
    if is_negative && !(decimal_part.is_empty() && integer_part == "0") {
        buffer.push('-');
    }
    let digits_count = i64::try_from(integer_part.len() + decimal_part.len()).ok()?;
    Some(if !always_double && exp >= digits_count && exp < 21 {
        buffer.push_str(integer_part);
        buffer.push_str(decimal_part);
        buffer.extend((0..(exp - digits_count)).map(|_| '0'));
        RdfJsonNumber::Integer(buffer)
    } else {
        let mut all_digits = integer_part.chars().chain(decimal_part.chars());
        buffer.push(all_digits.next()?);
        buffer.push('.');
        if digits_count == 1 {
            buffer.push('0');
        } else {
            buffer.extend(all_digits);
        }
        write!(&mut buffer, "E{}", exp.checked_sub(1)?).ok()?;
        RdfJsonNumber::Double(buffer)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::Predicate;

    fn parse(document: &str) -> Result<Vec<Quad>, JsonLdSyntaxError> {
        JsonLdParser::new()
            .with_base_iri("http://example.com/")
            .map_err(JsonLdSyntaxError::from)?
            .for_slice(document)
            .collect()
    }

    #[test]
    fn test_canonicalize_xsd_number() {
        assert_eq!(
            canonicalize_xsd_number("12", false),
            Some(RdfJsonNumber::Integer("12".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("-12", false),
            Some(RdfJsonNumber::Integer("-12".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("1", true),
            Some(RdfJsonNumber::Double("1.0E0".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("+1", true),
            Some(RdfJsonNumber::Double("1.0E0".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("-12", true),
            Some(RdfJsonNumber::Double("-1.2E1".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("12.3456E3", false),
            Some(RdfJsonNumber::Double("1.23456E4".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("12.340E-3", false),
            Some(RdfJsonNumber::Double("1.234E-2".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("0.01234E-1", false),
            Some(RdfJsonNumber::Double("1.234E-3".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("1.0", false),
            Some(RdfJsonNumber::Integer("1".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("0.01E2", false),
            Some(RdfJsonNumber::Integer("1".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("1E2", false),
            Some(RdfJsonNumber::Integer("100".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("1E21", false),
            Some(RdfJsonNumber::Double("1.0E21".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("0", false),
            Some(RdfJsonNumber::Integer("0".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("-0", true),
            Some(RdfJsonNumber::Double("0.0E0".into()))
        );
        assert_eq!(
            canonicalize_xsd_number("0E-10", true),
            Some(RdfJsonNumber::Double("0.0E0".into()))
        );
    }

    #[test]
    fn lists() -> Result<(), JsonLdSyntaxError> {
        let quads = parse(
            r#"{"@id": "http://e/s", "http://e/p": {"@list": ["a", "b"]}, "http://e/q": {"@list": []}}"#,
        )?;
        assert_eq!(quads.len(), 6);
        assert!(quads.iter().any(|q| q.predicate == rdf::FIRST));
        assert!(quads.iter().any(|q| {
            q.predicate == Predicate::from(NamedNode::new_unchecked("http://e/q"))
                && q.object == Term::from(rdf::NIL)
        }));
        Ok(())
    }

    #[test]
    fn named_graphs_and_reverse() -> Result<(), JsonLdSyntaxError> {
        let quads = parse(
            r#"{"@id": "http://e/g", "@graph": [{"@id": "http://e/s", "http://e/p": "o"}], "@reverse": {"http://e/r": {"@id": "http://e/x"}}}"#,
        )?;
        assert_eq!(
            quads,
            [
                Quad::new(
                    NamedNode::new_unchecked("http://e/s"),
                    NamedNode::new_unchecked("http://e/p"),
                    Literal::new_simple_literal("o"),
                    NamedNode::new_unchecked("http://e/g"),
                ),
                Quad::new(
                    NamedNode::new_unchecked("http://e/x"),
                    NamedNode::new_unchecked("http://e/r"),
                    NamedNode::new_unchecked("http://e/g"),
                    GraphName::DefaultGraph,
                ),
            ]
        );
        Ok(())
    }

    #[test]
    fn invalid_terms_are_dropped() -> Result<(), JsonLdSyntaxError> {
        let quads = parse(
            r#"{"@id": "http://e/s", "_:p": "blank predicate", "http://e/p": [{"@value": "x", "@language": "not a tag"}, {"@id": "http://e/o"}]}"#,
        )?;
        assert_eq!(quads.len(), 1);
        Ok(())
    }

    #[test]
    fn json_literals() -> Result<(), JsonLdSyntaxError> {
        let quads = parse(
            r#"{"@context": {"data": {"@id": "http://e/data", "@type": "@json"}}, "@id": "http://e/s", "data": {"b": [1.0, null], "a": true}}"#,
        )?;
        assert_eq!(
            quads[0].object,
            Term::from(Literal::new_typed_literal(r#"{"a":true,"b":[1,null]}"#, rdf::JSON))
        );
        Ok(())
    }

    #[test]
    fn blank_node_labels_are_scoped() -> Result<(), JsonLdSyntaxError> {
        let quads = parse(
            r#"[{"@id": "_:a", "http://e/p": {"@id": "_:a"}}, {"@id": "_:b", "http://e/p": "x"}]"#,
        )?;
        assert_eq!(quads[0].subject, quads[0].object.clone().into_subject().unwrap());
        assert_ne!(quads[0].subject, quads[1].subject);
        Ok(())
    }

    #[test]
    fn root_context_is_reported() {
        let mut parser = JsonLdParser::new().for_slice(
            r#"{"@context": {"@base": "http://example.com/", "ex": "http://e/", "name": "ex:name"}, "@id": "a", "name": "b"}"#,
        );
        assert!(parser.next().is_some());
        assert_eq!(parser.prefixes().collect::<Vec<_>>(), [("ex", "http://e/")]);
        assert_eq!(parser.base_iri(), Some("http://example.com/"));
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(JsonLdParser::new().for_slice("").next().is_some_and(|r| r.is_err()));
        assert!(JsonLdParser::new().for_slice("{}").next().is_none());
    }
}
