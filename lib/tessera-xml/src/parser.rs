use crate::error::{RdfXmlParseError, RdfXmlSyntaxError};
use crate::utils::{is_nc_name, is_whitespace};
use oxilangtag::LanguageTag;
use oxiri::Iri;
use quick_xml::escape::{resolve_xml_entity, unescape_with};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{LocalName, PrefixDeclaration, PrefixIter, QName, ResolveResult};
use quick_xml::{NsReader, Writer};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::io::{BufReader, Read};
use std::str;
use tessera_model::vocab::rdf;
use tessera_model::{
    BaseIri, BlankNode, BlankNodeScope, ErrorKind, IriResolveError, Literal, NamedNode,
    NamedOrBlankNode, Predicate, Term, Triple,
};
use tracing::{debug, trace, warn};

/// A [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) streaming parser.
///
/// It reads the file in streaming.
/// It does not keep data in memory except a stack for handling nested XML tags, the `rdf:nodeID` labels
/// and a set of all seen `rdf:ID`s to detect duplicate ids.
///
/// Errors carry the path of the element being read and the byte offset of the reader.
///
/// Count the number of people:
/// ```
/// use tessera_model::{NamedNode, Term};
/// use tessera_model::vocab::rdf;
/// use tessera_xml::RdfXmlParser;
///
/// let file = br#"<?xml version="1.0"?>
/// <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:schema="http://schema.org/">
///  <rdf:Description rdf:about="http://example.com/foo">
///    <rdf:type rdf:resource="http://schema.org/Person" />
///    <schema:name>Foo</schema:name>
///  </rdf:Description>
///  <schema:Person rdf:about="http://example.com/bar" schema:name="Bar" />
/// </rdf:RDF>"#;
///
/// let schema_person = Term::from(NamedNode::new("http://schema.org/Person")?);
/// let mut count = 0;
/// for triple in RdfXmlParser::new().for_reader(file.as_ref()) {
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
pub struct RdfXmlParser {
    lenient: bool,
    base: Option<BaseIri>,
}

impl RdfXmlParser {
    /// Builds a new [`RdfXmlParser`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips IRI and language tag validation and accepts duplicated `rdf:ID`s.
    ///
    /// Broken RDF might be emitted if the file is not valid.
    #[inline]
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Sets the base IRI used to resolve relative IRIs not covered by a `xml:base` attribute.
    ///
    /// Fails with [`ErrorKind::InvalidBase`] if the IRI is not absolute.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriResolveError> {
        self.base = Some(BaseIri::parse(base_iri)?);
        Ok(self)
    }

    /// Parses a RDF/XML file from a [`Read`] implementation.
    pub fn for_reader<R: Read>(self, reader: R) -> ReaderRdfXmlParser<R> {
        ReaderRdfXmlParser {
            results: VecDeque::new(),
            parser: self.into_internal(BufReader::new(reader)),
            reader_buffer: Vec::default(),
        }
    }

    /// Parses a RDF/XML file from a byte slice.
    ///
    /// ```
    /// use tessera_xml::RdfXmlParser;
    ///
    /// let file = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xml:base="http://example.com/">
    ///  <rdf:Seq rdf:about="list">
    ///    <rdf:li>first</rdf:li>
    ///    <rdf:li>second</rdf:li>
    ///  </rdf:Seq>
    /// </rdf:RDF>"#;
    ///
    /// let predicates = RdfXmlParser::new()
    ///     .for_slice(file)
    ///     .map(|t| Ok(t?.predicate.to_string()))
    ///     .collect::<Result<Vec<_>, tessera_xml::RdfXmlSyntaxError>>()?;
    /// assert_eq!(
    ///     predicates,
    ///     [
    ///         "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>",
    ///         "<http://www.w3.org/1999/02/22-rdf-syntax-ns#_1>",
    ///         "<http://www.w3.org/1999/02/22-rdf-syntax-ns#_2>"
    ///     ]
    /// );
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn for_slice(self, slice: &[u8]) -> SliceRdfXmlParser<'_> {
        SliceRdfXmlParser {
            results: VecDeque::new(),
            parser: self.into_internal(slice),
        }
    }

    fn into_internal<T>(self, reader: T) -> InternalRdfXmlParser<T> {
        if self.lenient || self.base.is_some() {
            debug!(
                format = "RDF/XML",
                base_iri = self.base.as_ref().map(BaseIri::as_str),
                lenient = self.lenient,
                "Creating a parser with non-default options"
            );
        }
        let mut reader = NsReader::from_reader(reader);
        reader.config_mut().expand_empty_elements = true;
        InternalRdfXmlParser {
            reader,
            state: vec![RdfXmlState::Document {
                base_iri: self.base,
            }],
            path: ElementPath::default(),
            custom_entities: HashMap::new(),
            literal_namespaces: Vec::new(),
            known_rdf_id: HashSet::default(),
            blank_nodes: BlankNodeScope::default(),
            is_end: false,
            lenient: self.lenient,
        }
    }
}

/// Parses a RDF/XML file from a [`Read`] implementation.
///
/// Can be built using [`RdfXmlParser::for_reader`].
#[must_use]
pub struct ReaderRdfXmlParser<R: Read> {
    results: VecDeque<Triple>,
    parser: InternalRdfXmlParser<BufReader<R>>,
    reader_buffer: Vec<u8>,
}

impl<R: Read> Iterator for ReaderRdfXmlParser<R> {
    type Item = Result<Triple, RdfXmlParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(triple) = self.results.pop_front() {
                return Some(Ok(triple));
            } else if self.parser.is_end {
                return None;
            }
            if let Err(e) = self.parse_step() {
                return Some(Err(e));
            }
        }
    }
}

impl<R: Read> ReaderRdfXmlParser<R> {
    /// The list of IRI prefixes considered at the current step of the parsing.
    ///
    /// This method returns (prefix name, prefix value) tuples.
    /// It is empty at the beginning of the parsing and gets updated when prefixes are encountered.
    /// Prefixes declared on elements that are already closed are not returned anymore.
    ///
    /// ```
    /// use tessera_xml::RdfXmlParser;
    ///
    /// let file = br#"<?xml version="1.0"?>
    /// <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:schema="http://schema.org/">
    ///  <rdf:Description rdf:about="http://example.com/foo">
    ///    <schema:name>Foo</schema:name>
    ///  </rdf:Description>
    /// </rdf:RDF>"#;
    ///
    /// let mut parser = RdfXmlParser::new().for_reader(file.as_ref());
    /// assert_eq!(parser.prefixes().collect::<Vec<_>>(), []); // No prefix at the beginning
    ///
    /// parser.next().unwrap()?; // We read the first triple
    /// assert_eq!(
    ///     parser.prefixes().collect::<Vec<_>>(),
    ///     [
    ///         ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ///         ("schema", "http://schema.org/")
    ///     ]
    /// );
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn prefixes(&self) -> RdfXmlPrefixesIter<'_> {
        self.parser.prefixes()
    }

    /// The base IRI considered at the current step of the parsing.
    ///
    /// ```
    /// use tessera_xml::RdfXmlParser;
    ///
    /// let file = br#"<?xml version="1.0"?>
    /// <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xml:base="http://example.com/">
    ///  <rdf:Description rdf:about="foo">
    ///    <rdf:type rdf:resource="http://schema.org/Person" />
    ///  </rdf:Description>
    /// </rdf:RDF>"#;
    ///
    /// let mut parser = RdfXmlParser::new().for_reader(file.as_ref());
    /// assert!(parser.base_iri().is_none()); // No base at the beginning because none has been given to the parser.
    ///
    /// parser.next().unwrap()?; // We read the first triple
    /// assert_eq!(parser.base_iri(), Some("http://example.com/")); // There is now a base IRI.
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn base_iri(&self) -> Option<&str> {
        Some(self.parser.current_base_iri()?.as_str())
    }

    /// The current byte position in the input data.
    pub fn buffer_position(&self) -> u64 {
        self.parser.reader.buffer_position()
    }

    fn parse_step(&mut self) -> Result<(), RdfXmlParseError> {
        self.reader_buffer.clear();
        let event = self
            .parser
            .reader
            .read_event_into(&mut self.reader_buffer);
        self.parser.handle(event, &mut self.results)
    }
}

/// Parses a RDF/XML file from a byte slice.
///
/// Can be built using [`RdfXmlParser::for_slice`].
#[must_use]
pub struct SliceRdfXmlParser<'a> {
    results: VecDeque<Triple>,
    parser: InternalRdfXmlParser<&'a [u8]>,
}

impl Iterator for SliceRdfXmlParser<'_> {
    type Item = Result<Triple, RdfXmlSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(triple) = self.results.pop_front() {
                return Some(Ok(triple));
            } else if self.parser.is_end {
                return None;
            }
            match self.parse_step() {
                Ok(()) => (),
                Err(RdfXmlParseError::Syntax(e)) => return Some(Err(e)),
                Err(RdfXmlParseError::Io(e)) => {
                    // Reading from a slice does not do any I/O
                    return Some(Err(RdfXmlSyntaxError::new(
                        ErrorKind::ReadFailure,
                        e.to_string(),
                    )));
                }
            }
        }
    }
}

impl SliceRdfXmlParser<'_> {
    /// The list of IRI prefixes considered at the current step of the parsing.
    ///
    /// See [`ReaderRdfXmlParser::prefixes`].
    pub fn prefixes(&self) -> RdfXmlPrefixesIter<'_> {
        self.parser.prefixes()
    }

    /// The base IRI considered at the current step of the parsing.
    ///
    /// See [`ReaderRdfXmlParser::base_iri`].
    pub fn base_iri(&self) -> Option<&str> {
        Some(self.parser.current_base_iri()?.as_str())
    }

    /// The current byte position in the input data.
    pub fn buffer_position(&self) -> u64 {
        self.parser.reader.buffer_position()
    }

    fn parse_step(&mut self) -> Result<(), RdfXmlParseError> {
        let event = self.parser.reader.read_event();
        self.parser.handle(event, &mut self.results)
    }
}

/// Iterator on the file prefixes.
///
/// See [`ReaderRdfXmlParser::prefixes`].
pub struct RdfXmlPrefixesIter<'a> {
    inner: PrefixIter<'a>,
    lenient: bool,
}

impl<'a> Iterator for RdfXmlPrefixesIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        for (prefix, namespace) in self.inner.by_ref() {
            let prefix = match prefix {
                PrefixDeclaration::Default => "",
                PrefixDeclaration::Named(name) => {
                    let Ok(name) = str::from_utf8(name) else {
                        continue;
                    };
                    name
                }
            };
            let Ok(namespace) = str::from_utf8(namespace.into_inner()) else {
                continue;
            };
            if !self.lenient
                && ((!prefix.is_empty() && !is_nc_name(prefix)) || Iri::parse(namespace).is_err())
            {
                continue; // We don't return invalid prefixes
            }
            return Some((prefix, namespace));
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

const RDF_ABOUT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#about";
const RDF_ABOUT_EACH: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#aboutEach";
const RDF_ABOUT_EACH_PREFIX: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#aboutEachPrefix";
const RDF_BAG_ID: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#bagID";
const RDF_DATATYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#datatype";
const RDF_DESCRIPTION: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Description";
const RDF_ID: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#ID";
const RDF_LI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#li";
const RDF_NODE_ID: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nodeID";
const RDF_PARSE_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#parseType";
const RDF_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#RDF";
const RDF_RESOURCE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#resource";

/// Names that are never node or property elements (`rdf:li` is handled on its own).
const RESERVED_RDF_ELEMENTS: [&str; 11] = [
    RDF_ABOUT,
    RDF_ABOUT_EACH,
    RDF_ABOUT_EACH_PREFIX,
    RDF_BAG_ID,
    RDF_DATATYPE,
    RDF_ID,
    RDF_LI,
    RDF_NODE_ID,
    RDF_PARSE_TYPE,
    RDF_RDF,
    RDF_RESOURCE,
];

/// Names that are never property attributes.
const RESERVED_RDF_ATTRIBUTES: [&str; 5] = [
    RDF_ABOUT_EACH,
    RDF_ABOUT_EACH_PREFIX,
    RDF_DESCRIPTION,
    RDF_LI,
    RDF_RDF,
];

#[derive(Clone, Debug)]
enum NodeOrText {
    Node(NamedOrBlankNode),
    Text(String),
}

enum RdfXmlState {
    Document {
        base_iri: Option<BaseIri>,
    },
    Rdf {
        base_iri: Option<BaseIri>,
        language: Option<String>,
    },
    NodeElt {
        base_iri: Option<BaseIri>,
        language: Option<String>,
        subject: NamedOrBlankNode,
        li_counter: u64,
    },
    /// Resource, literal or empty property element
    PropertyElt {
        iri: NamedNode,
        base_iri: Option<BaseIri>,
        language: Option<String>,
        subject: NamedOrBlankNode,
        object: Option<NodeOrText>,
        id_attr: Option<NamedNode>,
        datatype_attr: Option<NamedNode>,
    },
    ParseTypeCollectionPropertyElt {
        iri: NamedNode,
        base_iri: Option<BaseIri>,
        language: Option<String>,
        subject: NamedOrBlankNode,
        objects: Vec<NamedOrBlankNode>,
        id_attr: Option<NamedNode>,
    },
    ParseTypeLiteralPropertyElt {
        iri: NamedNode,
        base_iri: Option<BaseIri>,
        language: Option<String>,
        subject: NamedOrBlankNode,
        writer: Writer<Vec<u8>>,
        id_attr: Option<NamedNode>,
        /// `false` for unknown `rdf:parseType` values: the content is read but not emitted
        emit: bool,
    },
}

impl RdfXmlState {
    fn base_iri(&self) -> Option<&BaseIri> {
        match self {
            Self::Document { base_iri }
            | Self::Rdf { base_iri, .. }
            | Self::NodeElt { base_iri, .. }
            | Self::PropertyElt { base_iri, .. }
            | Self::ParseTypeCollectionPropertyElt { base_iri, .. }
            | Self::ParseTypeLiteralPropertyElt { base_iri, .. } => base_iri.as_ref(),
        }
    }

    fn language(&self) -> Option<&String> {
        match self {
            Self::Document { .. } => None,
            Self::Rdf { language, .. }
            | Self::NodeElt { language, .. }
            | Self::PropertyElt { language, .. }
            | Self::ParseTypeCollectionPropertyElt { language, .. }
            | Self::ParseTypeLiteralPropertyElt { language, .. } => language.as_ref(),
        }
    }
}

/// XPath-like path of the currently open elements, e.g. `/rdf:RDF[1]/ex:Person[3]`.
struct ElementPath {
    elements: Vec<(String, usize)>,
    /// For each open element and the document itself, the number of children seen per name.
    sibling_counts: Vec<HashMap<String, usize>>,
}

impl Default for ElementPath {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            sibling_counts: vec![HashMap::new()],
        }
    }
}

impl ElementPath {
    fn push(&mut self, name: String) {
        let index = self.sibling_counts.last_mut().map_or(1, |counts| {
            let count = counts.entry(name.clone()).or_insert(0);
            *count += 1;
            *count
        });
        self.elements.push((name, index));
        self.sibling_counts.push(HashMap::new());
    }

    fn pop(&mut self) {
        if self.elements.pop().is_some() {
            self.sibling_counts.pop();
        }
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, index) in &self.elements {
            write!(f, "/{name}[{index}]")?;
        }
        Ok(())
    }
}

struct InternalRdfXmlParser<R> {
    reader: NsReader<R>,
    state: Vec<RdfXmlState>,
    path: ElementPath,
    custom_entities: HashMap<String, String>,
    /// Namespace declarations written for each open element of a XML literal
    literal_namespaces: Vec<Vec<(Vec<u8>, Vec<u8>)>>,
    known_rdf_id: HashSet<String>,
    blank_nodes: BlankNodeScope,
    is_end: bool,
    lenient: bool,
}

impl<R> InternalRdfXmlParser<R> {
    /// Processes one event from the XML reader and stops the parser on the first error.
    fn handle(
        &mut self,
        event: Result<Event<'_>, quick_xml::Error>,
        results: &mut VecDeque<Triple>,
    ) -> Result<(), RdfXmlParseError> {
        let result = match event {
            Ok(event) => self.parse_event(event, results),
            Err(error) => Err(error.into()),
        };
        result.map_err(|error| {
            self.is_end = true;
            match error {
                RdfXmlParseError::Syntax(error) => error
                    .located(self.path.to_string(), self.reader.buffer_position())
                    .into(),
                RdfXmlParseError::Io(error) => error.into(),
            }
        })
    }

    fn parse_event(
        &mut self,
        event: Event<'_>,
        results: &mut VecDeque<Triple>,
    ) -> Result<(), RdfXmlParseError> {
        match event {
            Event::Start(event) => {
                self.path
                    .push(String::from_utf8_lossy(event.name().as_ref()).into_owned());
                self.parse_start_event(&event, results)
            }
            Event::End(event) => {
                self.parse_end_event(&event, results)?;
                self.path.pop();
                Ok(())
            }
            Event::Empty(_) => Err(RdfXmlSyntaxError::msg(
                "The expand_empty_elements option must be enabled",
            )
            .into()),
            Event::Text(event) => {
                let text = event
                    .unescape_with(|e| self.resolve_entity(e))?
                    .into_owned();
                self.parse_text(text)
            }
            Event::CData(event) => {
                let text = self.decode(&event)?.into_owned();
                self.parse_text(text)
            }
            Event::Comment(_) | Event::PI(_) => Ok(()),
            Event::Decl(decl) => Self::check_declaration(&decl),
            Event::DocType(dt) => self.parse_doctype(&dt),
            Event::Eof => {
                if self.state.len() > 1 {
                    return Err(RdfXmlSyntaxError::msg(
                        "Unexpected end of file, some XML elements are not closed",
                    )
                    .into());
                }
                self.is_end = true;
                trace!(
                    blank_node_labels = self.blank_nodes.len(),
                    rdf_ids = self.known_rdf_id.len(),
                    "End of RDF/XML document"
                );
                Ok(())
            }
        }
    }

    fn check_declaration(decl: &BytesDecl<'_>) -> Result<(), RdfXmlParseError> {
        if let Some(encoding) = decl.encoding() {
            let encoding = encoding.map_err(quick_xml::Error::from)?;
            if !is_utf8(&encoding) {
                return Err(RdfXmlSyntaxError::new(
                    ErrorKind::UnsupportedFeature,
                    format!(
                        "Only UTF-8 is supported by the RDF/XML parser, found {}",
                        String::from_utf8_lossy(&encoding)
                    ),
                )
                .into());
            }
        }
        Ok(())
    }

    /// Extracts the internal entity declarations of the DOCTYPE.
    fn parse_doctype(&mut self, dt: &BytesText<'_>) -> Result<(), RdfXmlParseError> {
        let doctype = self.decode(dt)?.into_owned();
        for input in doctype.split('<').skip(1) {
            let Some(input) = input.strip_prefix("!ENTITY") else {
                continue;
            };
            let input = input.trim_start();
            let input = input.strip_prefix('%').unwrap_or(input);
            let (entity_name, input) = input
                .trim_start()
                .split_once(|c: char| c.is_ascii_whitespace())
                .ok_or_else(|| {
                    RdfXmlSyntaxError::msg(
                        "<!ENTITY declarations should contain both an entity name and an entity value",
                    )
                })?;
            let input = input.trim_start();
            let (quote, input) = if let Some(input) = input.strip_prefix('"') {
                ('"', input)
            } else if let Some(input) = input.strip_prefix('\'') {
                ('\'', input)
            } else {
                return Err(RdfXmlSyntaxError::msg(
                    "<!ENTITY values should be enclosed in quotes",
                )
                .into());
            };
            let (entity_value, input) = input.split_once(quote).ok_or_else(|| {
                RdfXmlSyntaxError::msg("<!ENTITY values should be enclosed in quotes")
            })?;
            if !input.trim_start().starts_with('>') {
                return Err(
                    RdfXmlSyntaxError::msg("<!ENTITY declarations should end with >").into(),
                );
            }
            // Entities might reference the ones declared before
            let entity_value = unescape_with(entity_value, |e| self.resolve_entity(e))
                .map_err(quick_xml::Error::from)?
                .into_owned();
            self.custom_entities
                .insert(entity_name.to_owned(), entity_value);
        }
        Ok(())
    }

    fn parse_start_event(
        &mut self,
        event: &BytesStart<'_>,
        results: &mut VecDeque<Triple>,
    ) -> Result<(), RdfXmlParseError> {
        #[derive(PartialEq, Eq)]
        enum RdfXmlParseType {
            Default,
            Collection,
            Literal,
            Resource,
            Other,
        }

        enum RdfXmlNextProduction {
            Rdf,
            NodeElt,
            PropertyElt { subject: NamedOrBlankNode },
        }

        // Inside of a rdf:parseType="Literal" we only copy the XML
        if let Some(RdfXmlState::ParseTypeLiteralPropertyElt { writer, .. }) = self.state.last_mut()
        {
            let name = event.name();
            let mut clean_event = BytesStart::new(
                String::from_utf8(name.as_ref().to_vec())
                    .map_err(|_| RdfXmlSyntaxError::msg("XML element names must be valid UTF-8"))?,
            );
            // Only the namespaces visibly used by the element and its attributes are declared
            let mut used_namespaces = vec![(
                name.prefix()
                    .map(|p| p.as_ref().to_vec())
                    .unwrap_or_default(),
                namespace_bytes(self.reader.resolve_element(name).0)?,
            )];
            let mut attributes = Vec::new();
            for attribute in event.attributes() {
                let attribute = attribute.map_err(quick_xml::Error::from)?;
                if attribute.key.as_namespace_binding().is_some() {
                    continue;
                }
                let namespace = match attribute.key.prefix() {
                    Some(prefix) if prefix.as_ref() == b"xml" => {
                        b"http://www.w3.org/XML/1998/namespace".to_vec()
                    }
                    Some(prefix) => {
                        let namespace =
                            namespace_bytes(self.reader.resolve_attribute(attribute.key).0)?;
                        used_namespaces.push((prefix.as_ref().to_vec(), namespace.clone()));
                        namespace
                    }
                    None => Vec::new(),
                };
                attributes.push((namespace, attribute));
            }
            // Exclusive canonical XML orders attributes by namespace URI then local name
            attributes.sort_by(|(n1, a1), (n2, a2)| {
                (n1, a1.key.local_name().as_ref()).cmp(&(n2, a2.key.local_name().as_ref()))
            });
            let mut declarations = Vec::<(Vec<u8>, Vec<u8>)>::new();
            for (prefix, namespace) in used_namespaces {
                let in_scope = declarations
                    .iter()
                    .chain(self.literal_namespaces.iter().rev().flatten())
                    .find(|(p, _)| *p == prefix)
                    .map(|(_, n)| n.as_slice())
                    .unwrap_or_default();
                if in_scope != namespace.as_slice() {
                    declarations.push((prefix, namespace));
                }
            }
            declarations.sort();
            for (prefix, namespace) in &declarations {
                let mut key = b"xmlns".to_vec();
                if !prefix.is_empty() {
                    key.push(b':');
                    key.extend_from_slice(prefix);
                }
                clean_event.push_attribute((key.as_slice(), namespace.as_slice()));
            }
            for (_, attribute) in attributes {
                clean_event.push_attribute(attribute);
            }
            writer.write_event(Event::Start(clean_event))?;
            self.literal_namespaces.push(declarations);
            return Ok(());
        }

        let tag_name = self.resolve_tag_name(event.name())?;

        let mut language = None;
        let mut base_iri = None;
        let mut id_attr = None;
        let mut node_id_attr = None;
        let mut about_attr = None;
        let mut property_attrs = Vec::default();
        let mut resource_attr = None;
        let mut datatype_attr = None;
        let mut parse_type = RdfXmlParseType::Default;
        let mut type_attr = None;

        for attribute in event.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            if attribute.key.as_ref().starts_with(b"xml") {
                if attribute.key.as_ref() == b"xml:lang" {
                    let tag = self.convert_attribute(&attribute)?.to_ascii_lowercase();
                    if !self.lenient && !tag.is_empty() {
                        LanguageTag::parse(tag.as_str())
                            .map_err(|error| RdfXmlSyntaxError::invalid_language_tag(&tag, error))?;
                    }
                    language = Some(tag);
                } else if attribute.key.as_ref() == b"xml:base" {
                    let iri = self.convert_attribute(&attribute)?;
                    base_iri = Some(self.resolve_base(&iri)?);
                }
                // Other xml attributes, including namespace declarations, carry no triple
            } else {
                let attribute_url = self.resolve_attribute_name(attribute.key)?;
                match attribute_url.as_str() {
                    RDF_ID => {
                        let id = self.convert_attribute(&attribute)?;
                        if !is_nc_name(&id) {
                            return Err(RdfXmlSyntaxError::msg(format!(
                                "{id} is not a valid rdf:ID value"
                            ))
                            .into());
                        }
                        id_attr = Some(format!("#{id}"));
                    }
                    RDF_NODE_ID => {
                        let id = self.convert_attribute(&attribute)?;
                        if !is_nc_name(&id) {
                            return Err(RdfXmlSyntaxError::msg(format!(
                                "{id} is not a valid rdf:nodeID value"
                            ))
                            .into());
                        }
                        node_id_attr = Some(self.blank_nodes.intern(&id));
                    }
                    RDF_ABOUT => about_attr = Some(attribute),
                    RDF_RESOURCE => resource_attr = Some(attribute),
                    RDF_DATATYPE => datatype_attr = Some(attribute),
                    RDF_PARSE_TYPE => {
                        parse_type = match attribute.value.as_ref() {
                            b"Collection" => RdfXmlParseType::Collection,
                            b"Literal" => RdfXmlParseType::Literal,
                            b"Resource" => RdfXmlParseType::Resource,
                            _ => RdfXmlParseType::Other,
                        };
                    }
                    RDF_BAG_ID => {
                        return Err(RdfXmlSyntaxError::msg(
                            "rdf:bagID has been removed from RDF/XML and is not supported",
                        )
                        .into());
                    }
                    url if url == rdf::TYPE.as_str() => type_attr = Some(attribute),
                    url if RESERVED_RDF_ATTRIBUTES.contains(&url) => {
                        return Err(RdfXmlSyntaxError::msg(format!(
                            "{url} is not a valid attribute"
                        ))
                        .into());
                    }
                    _ => {
                        let value = self.convert_attribute(&attribute)?;
                        property_attrs.push((self.parse_iri(attribute_url)?, value));
                    }
                }
            }
        }

        // Relative IRIs of the attributes use the base of the element itself
        let id_attr = match id_attr {
            Some(id) => {
                let iri = self.resolve_iri(base_iri.as_ref(), &id)?;
                if !self.known_rdf_id.insert(iri.as_str().into()) {
                    if self.lenient {
                        warn!(id = iri.as_str(), "Accepting a duplicated rdf:ID");
                    } else {
                        return Err(RdfXmlSyntaxError::new(
                            ErrorKind::DuplicateRdfId,
                            format!("{iri} has already been used as rdf:ID value"),
                        )
                        .into());
                    }
                }
                Some(iri)
            }
            None => None,
        };
        let about_attr = self.convert_iri_attribute(base_iri.as_ref(), about_attr.as_ref())?;
        let resource_attr =
            self.convert_iri_attribute(base_iri.as_ref(), resource_attr.as_ref())?;
        let datatype_attr =
            self.convert_iri_attribute(base_iri.as_ref(), datatype_attr.as_ref())?;
        let type_attr = self.convert_iri_attribute(base_iri.as_ref(), type_attr.as_ref())?;

        let expected_production = match self.state.last() {
            Some(RdfXmlState::Document { .. }) => RdfXmlNextProduction::Rdf,
            Some(
                RdfXmlState::Rdf { .. }
                | RdfXmlState::PropertyElt { .. }
                | RdfXmlState::ParseTypeCollectionPropertyElt { .. },
            ) => RdfXmlNextProduction::NodeElt,
            Some(RdfXmlState::NodeElt { subject, .. }) => RdfXmlNextProduction::PropertyElt {
                subject: subject.clone(),
            },
            Some(RdfXmlState::ParseTypeLiteralPropertyElt { .. }) => {
                return Err(RdfXmlSyntaxError::msg(
                    "The content of a rdf:parseType=\"Literal\" element is not RDF/XML",
                )
                .into());
            }
            None => {
                return Err(RdfXmlSyntaxError::msg(
                    "No state in the stack: the XML is not balanced",
                )
                .into());
            }
        };

        let node_attributes = NodeAttributes {
            id_attr,
            node_id_attr,
            about_attr,
            type_attr,
            property_attrs,
        };
        let new_state = match expected_production {
            RdfXmlNextProduction::Rdf => {
                if tag_name == RDF_RDF {
                    RdfXmlState::Rdf { base_iri, language }
                } else if RESERVED_RDF_ELEMENTS.contains(&tag_name.as_str()) {
                    return Err(RdfXmlSyntaxError::msg(format!(
                        "Invalid node element tag name: {tag_name}"
                    ))
                    .into());
                } else {
                    let iri = self.parse_iri(tag_name)?;
                    self.build_node_elt(iri, base_iri, language, node_attributes, results)?
                }
            }
            RdfXmlNextProduction::NodeElt => {
                if RESERVED_RDF_ELEMENTS.contains(&tag_name.as_str()) {
                    return Err(RdfXmlSyntaxError::msg(format!(
                        "Invalid node element tag name: {tag_name}"
                    ))
                    .into());
                }
                let iri = self.parse_iri(tag_name)?;
                self.build_node_elt(iri, base_iri, language, node_attributes, results)?
            }
            RdfXmlNextProduction::PropertyElt { subject } => {
                let NodeAttributes {
                    id_attr,
                    node_id_attr,
                    about_attr,
                    type_attr,
                    property_attrs,
                } = node_attributes;
                if about_attr.is_some() {
                    return Err(RdfXmlSyntaxError::msg(
                        "rdf:about is not allowed on property elements",
                    )
                    .into());
                }
                let iri = if tag_name == RDF_LI {
                    let Some(RdfXmlState::NodeElt { li_counter, .. }) = self.state.last_mut()
                    else {
                        return Err(RdfXmlSyntaxError::msg(format!(
                            "Invalid property element tag name: {tag_name}"
                        ))
                        .into());
                    };
                    *li_counter += 1;
                    NamedNode::new_unchecked(format!("{}_{li_counter}", rdf::NAMESPACE))
                } else if RESERVED_RDF_ELEMENTS.contains(&tag_name.as_str())
                    || tag_name == RDF_DESCRIPTION
                {
                    return Err(RdfXmlSyntaxError::msg(format!(
                        "Invalid property element tag name: {tag_name}"
                    ))
                    .into());
                } else {
                    self.parse_iri(tag_name)?
                };
                if parse_type != RdfXmlParseType::Default
                    && (resource_attr.is_some()
                        || node_id_attr.is_some()
                        || datatype_attr.is_some()
                        || !property_attrs.is_empty())
                {
                    return Err(RdfXmlSyntaxError::msg(
                        "rdf:parseType can't be combined with rdf:resource, rdf:nodeID, rdf:datatype or property attributes",
                    )
                    .into());
                }
                match parse_type {
                    RdfXmlParseType::Default => {
                        if resource_attr.is_some()
                            || node_id_attr.is_some()
                            || !property_attrs.is_empty()
                        {
                            if datatype_attr.is_some() {
                                return Err(RdfXmlSyntaxError::msg(
                                    "rdf:datatype can't be used on a property element with a resource value",
                                )
                                .into());
                            }
                            let object = match (resource_attr, node_id_attr) {
                                (Some(resource_attr), None) => {
                                    NamedOrBlankNode::from(resource_attr)
                                }
                                (None, Some(node_id_attr)) => node_id_attr.into(),
                                (None, None) => BlankNode::default().into(),
                                (Some(_), Some(_)) => {
                                    return Err(RdfXmlSyntaxError::msg(
                                        "Not both rdf:resource and rdf:nodeID could be set at the same time",
                                    )
                                    .into());
                                }
                            };
                            self.emit_property_attrs(
                                &object,
                                property_attrs,
                                language.as_deref(),
                                results,
                            );
                            if let Some(type_attr) = type_attr {
                                results.push_back(Triple::new(
                                    object.clone(),
                                    rdf::TYPE,
                                    type_attr,
                                ));
                            }
                            RdfXmlState::PropertyElt {
                                iri,
                                base_iri,
                                language,
                                subject,
                                object: Some(NodeOrText::Node(object)),
                                id_attr,
                                datatype_attr,
                            }
                        } else {
                            if type_attr.is_some() {
                                return Err(RdfXmlSyntaxError::msg(
                                    "rdf:type can't be used as attribute of a property element without rdf:resource or rdf:nodeID",
                                )
                                .into());
                            }
                            RdfXmlState::PropertyElt {
                                iri,
                                base_iri,
                                language,
                                subject,
                                object: None,
                                id_attr,
                                datatype_attr,
                            }
                        }
                    }
                    RdfXmlParseType::Literal | RdfXmlParseType::Other => {
                        RdfXmlState::ParseTypeLiteralPropertyElt {
                            iri,
                            base_iri,
                            language,
                            subject,
                            writer: Writer::new(Vec::default()),
                            id_attr,
                            emit: parse_type == RdfXmlParseType::Literal,
                        }
                    }
                    RdfXmlParseType::Resource => Self::build_parse_type_resource_property_elt(
                        iri, base_iri, language, subject, id_attr, results,
                    ),
                    RdfXmlParseType::Collection => RdfXmlState::ParseTypeCollectionPropertyElt {
                        iri,
                        base_iri,
                        language,
                        subject,
                        objects: Vec::default(),
                        id_attr,
                    },
                }
            }
        };
        self.state.push(new_state);
        Ok(())
    }

    fn parse_end_event(
        &mut self,
        event: &BytesEnd<'_>,
        results: &mut VecDeque<Triple>,
    ) -> Result<(), RdfXmlParseError> {
        if !self.literal_namespaces.is_empty() {
            if let Some(RdfXmlState::ParseTypeLiteralPropertyElt { writer, .. }) =
                self.state.last_mut()
            {
                writer.write_event(Event::End(BytesEnd::new(
                    String::from_utf8_lossy(event.name().as_ref()).into_owned(),
                )))?;
                self.literal_namespaces.pop();
                return Ok(());
            }
        }

        if let Some(current_state) = self.state.pop() {
            self.end_state(current_state, results)?;
        }
        Ok(())
    }

    fn parse_text(&mut self, text: String) -> Result<(), RdfXmlParseError> {
        match self.state.last_mut() {
            Some(RdfXmlState::PropertyElt { object, .. }) => {
                if is_object_defined(object.as_ref()) {
                    if text.bytes().all(is_whitespace) {
                        Ok(())
                    } else {
                        Err(
                            RdfXmlSyntaxError::msg(format!("Unexpected text event: '{text}'"))
                                .into(),
                        )
                    }
                } else {
                    match object {
                        Some(NodeOrText::Text(previous)) => previous.push_str(&text),
                        _ => *object = Some(NodeOrText::Text(text)),
                    }
                    Ok(())
                }
            }
            Some(RdfXmlState::ParseTypeLiteralPropertyElt { writer, .. }) => {
                writer.write_event(Event::Text(BytesText::new(&text)))?;
                Ok(())
            }
            _ => {
                if text.bytes().all(is_whitespace) {
                    Ok(())
                } else {
                    Err(RdfXmlSyntaxError::msg(format!("Unexpected text event: '{text}'")).into())
                }
            }
        }
    }

    fn resolve_tag_name(&self, qname: QName<'_>) -> Result<String, RdfXmlParseError> {
        let (namespace, local_name) = self.reader.resolve_element(qname);
        self.resolve_ns_name(namespace, local_name)
    }

    fn resolve_attribute_name(&self, qname: QName<'_>) -> Result<String, RdfXmlParseError> {
        let (namespace, local_name) = self.reader.resolve_attribute(qname);
        self.resolve_ns_name(namespace, local_name)
    }

    fn resolve_ns_name(
        &self,
        namespace: ResolveResult<'_>,
        local_name: LocalName<'_>,
    ) -> Result<String, RdfXmlParseError> {
        match namespace {
            ResolveResult::Bound(ns) => {
                let mut value = Vec::with_capacity(ns.as_ref().len() + local_name.as_ref().len());
                value.extend_from_slice(ns.as_ref());
                value.extend_from_slice(local_name.as_ref());
                let value = self.decode(&value)?;
                Ok(unescape_with(&value, |e| self.resolve_entity(e))
                    .map_err(quick_xml::Error::from)?
                    .into_owned())
            }
            ResolveResult::Unbound => Err(RdfXmlSyntaxError::msg(format!(
                "XML namespaces are required in RDF/XML, {} has none",
                String::from_utf8_lossy(local_name.as_ref())
            ))
            .into()),
            ResolveResult::Unknown(v) => Err(RdfXmlSyntaxError::msg(format!(
                "Unknown prefix {}:",
                String::from_utf8_lossy(&v)
            ))
            .into()),
        }
    }

    fn build_node_elt(
        &self,
        iri: NamedNode,
        base_iri: Option<BaseIri>,
        language: Option<String>,
        attributes: NodeAttributes,
        results: &mut VecDeque<Triple>,
    ) -> Result<RdfXmlState, RdfXmlSyntaxError> {
        let subject = match (
            attributes.id_attr,
            attributes.node_id_attr,
            attributes.about_attr,
        ) {
            (Some(id_attr), None, None) => NamedOrBlankNode::from(id_attr),
            (None, Some(node_id_attr), None) => node_id_attr.into(),
            (None, None, Some(about_attr)) => about_attr.into(),
            (None, None, None) => BlankNode::default().into(),
            (Some(_), Some(_), _) => {
                return Err(RdfXmlSyntaxError::msg(
                    "Not both rdf:ID and rdf:nodeID could be set at the same time",
                ));
            }
            (_, Some(_), Some(_)) => {
                return Err(RdfXmlSyntaxError::msg(
                    "Not both rdf:nodeID and rdf:about could be set at the same time",
                ));
            }
            (Some(_), _, Some(_)) => {
                return Err(RdfXmlSyntaxError::msg(
                    "Not both rdf:ID and rdf:about could be set at the same time",
                ));
            }
        };

        if iri != RDF_DESCRIPTION {
            results.push_back(Triple::new(subject.clone(), rdf::TYPE, iri));
        }
        if let Some(type_attr) = attributes.type_attr {
            results.push_back(Triple::new(subject.clone(), rdf::TYPE, type_attr));
        }
        self.emit_property_attrs(
            &subject,
            attributes.property_attrs,
            language.as_deref(),
            results,
        );
        Ok(RdfXmlState::NodeElt {
            base_iri,
            language,
            subject,
            li_counter: 0,
        })
    }

    fn build_parse_type_resource_property_elt(
        iri: NamedNode,
        base_iri: Option<BaseIri>,
        language: Option<String>,
        subject: NamedOrBlankNode,
        id_attr: Option<NamedNode>,
        results: &mut VecDeque<Triple>,
    ) -> RdfXmlState {
        let object = BlankNode::default();
        let triple = Triple::new(subject, iri, object.clone());
        if let Some(id_attr) = id_attr {
            Self::reify(&triple, id_attr, results);
        }
        results.push_back(triple);
        RdfXmlState::NodeElt {
            base_iri,
            language,
            subject: object.into(),
            li_counter: 0,
        }
    }

    fn end_state(
        &mut self,
        state: RdfXmlState,
        results: &mut VecDeque<Triple>,
    ) -> Result<(), RdfXmlSyntaxError> {
        match state {
            RdfXmlState::PropertyElt {
                iri,
                language,
                subject,
                id_attr,
                datatype_attr,
                object,
                ..
            } => {
                let object = match object {
                    Some(NodeOrText::Node(node)) => Term::from(node),
                    Some(NodeOrText::Text(text)) => {
                        self.new_literal(text, language, datatype_attr).into()
                    }
                    None => self
                        .new_literal(String::new(), language, datatype_attr)
                        .into(),
                };
                let triple = Triple::new(subject, iri, object);
                if let Some(id_attr) = id_attr {
                    Self::reify(&triple, id_attr, results);
                }
                results.push_back(triple);
            }
            RdfXmlState::ParseTypeCollectionPropertyElt {
                iri,
                subject,
                id_attr,
                objects,
                ..
            } => {
                // Cells are minted in document order, the chain is built from its end
                let cells = objects
                    .iter()
                    .map(|_| BlankNode::default())
                    .collect::<Vec<_>>();
                let head = cells
                    .first()
                    .map_or_else(|| NamedOrBlankNode::from(rdf::NIL), |c| c.clone().into());
                let triple = Triple::new(subject, iri, head);
                if let Some(id_attr) = id_attr {
                    Self::reify(&triple, id_attr, results);
                }
                results.push_back(triple);
                for (i, (cell, object)) in cells.iter().zip(objects).enumerate() {
                    results.push_back(Triple::new(cell.clone(), rdf::FIRST, object));
                    results.push_back(Triple::new(
                        cell.clone(),
                        rdf::REST,
                        cells
                            .get(i + 1)
                            .map_or_else(|| NamedOrBlankNode::from(rdf::NIL), |c| c.clone().into()),
                    ));
                }
            }
            RdfXmlState::ParseTypeLiteralPropertyElt {
                iri,
                subject,
                id_attr,
                writer,
                emit,
                ..
            } => {
                if emit {
                    let value = String::from_utf8(writer.into_inner()).map_err(|_| {
                        RdfXmlSyntaxError::msg("The XML literal is not in valid UTF-8")
                    })?;
                    let triple = Triple::new(
                        subject,
                        iri,
                        Literal::new_typed_literal(value, rdf::XML_LITERAL),
                    );
                    if let Some(id_attr) = id_attr {
                        Self::reify(&triple, id_attr, results);
                    }
                    results.push_back(triple);
                } else {
                    warn!(
                        property = iri.as_str(),
                        "Ignoring the content of an element with an unknown rdf:parseType"
                    );
                }
            }
            RdfXmlState::NodeElt { subject, .. } => match self.state.last_mut() {
                Some(RdfXmlState::PropertyElt { object, .. }) => {
                    if is_object_defined(object.as_ref()) {
                        return Err(RdfXmlSyntaxError::msg(
                            "Unexpected node, a value is already present",
                        ));
                    }
                    *object = Some(NodeOrText::Node(subject))
                }
                Some(RdfXmlState::ParseTypeCollectionPropertyElt { objects, .. }) => {
                    objects.push(subject)
                }
                _ => (),
            },
            RdfXmlState::Document { .. } | RdfXmlState::Rdf { .. } => (),
        }
        Ok(())
    }

    fn new_literal(
        &self,
        value: String,
        language: Option<String>,
        datatype: Option<NamedNode>,
    ) -> Literal {
        if let Some(datatype) = datatype {
            Literal::new_typed_literal(value, datatype)
        } else if let Some(language) = language
            .as_deref()
            .map_or_else(|| self.current_language(), non_empty)
        {
            Literal::new_language_tagged_literal_unchecked(value, language)
        } else {
            Literal::new_simple_literal(value)
        }
    }

    fn reify(triple: &Triple, statement_id: NamedNode, results: &mut VecDeque<Triple>) {
        results.push_back(Triple::new(statement_id.clone(), rdf::TYPE, rdf::STATEMENT));
        results.push_back(Triple::new(
            statement_id.clone(),
            rdf::SUBJECT,
            Term::from(triple.subject.clone()),
        ));
        let predicate = match &triple.predicate {
            Predicate::NamedNode(node) => Term::from(node.clone()),
            Predicate::BlankNode(node) => Term::from(node.clone()),
        };
        results.push_back(Triple::new(statement_id.clone(), rdf::PREDICATE, predicate));
        results.push_back(Triple::new(statement_id, rdf::OBJECT, triple.object.clone()));
    }

    fn emit_property_attrs(
        &self,
        subject: &NamedOrBlankNode,
        literal_attributes: Vec<(NamedNode, String)>,
        language: Option<&str>,
        results: &mut VecDeque<Triple>,
    ) {
        let language = language.map_or_else(|| self.current_language(), non_empty);
        for (literal_predicate, literal_value) in literal_attributes {
            results.push_back(Triple::new(
                subject.clone(),
                literal_predicate,
                if let Some(language) = language {
                    Literal::new_language_tagged_literal_unchecked(literal_value, language)
                } else {
                    Literal::new_simple_literal(literal_value)
                },
            ));
        }
    }

    fn convert_attribute(&self, attribute: &Attribute<'_>) -> Result<String, RdfXmlParseError> {
        Ok(attribute
            .decode_and_unescape_value_with(self.reader.decoder(), |e| self.resolve_entity(e))?
            .into_owned())
    }

    fn convert_iri_attribute(
        &self,
        base_iri: Option<&BaseIri>,
        attribute: Option<&Attribute<'_>>,
    ) -> Result<Option<NamedNode>, RdfXmlParseError> {
        let Some(attribute) = attribute else {
            return Ok(None);
        };
        let value = self.convert_attribute(attribute)?;
        Ok(Some(self.resolve_iri(base_iri, &value)?))
    }

    fn resolve_iri(
        &self,
        base_iri: Option<&BaseIri>,
        relative_iri: &str,
    ) -> Result<NamedNode, RdfXmlSyntaxError> {
        if let Some(base_iri) = base_iri.or_else(|| self.current_base_iri()) {
            if self.lenient {
                Ok(base_iri.resolve_unchecked(relative_iri))
            } else {
                Ok(base_iri.resolve(relative_iri)?)
            }
        } else {
            self.parse_iri(relative_iri.into())
        }
    }

    /// Computes the base IRI set by a `xml:base` attribute.
    fn resolve_base(&self, iri: &str) -> Result<BaseIri, RdfXmlSyntaxError> {
        Ok(match self.current_base_iri() {
            Some(base) if self.lenient => base.resolve_unchecked(iri).into(),
            Some(base) => base.resolve_base(iri)?,
            None if self.lenient => BaseIri::parse_unchecked(iri),
            None => BaseIri::parse(iri)?,
        })
    }

    fn parse_iri(&self, iri: String) -> Result<NamedNode, RdfXmlSyntaxError> {
        if self.lenient {
            Ok(NamedNode::new_unchecked(iri))
        } else {
            NamedNode::new(iri.as_str()).map_err(|error| RdfXmlSyntaxError::invalid_iri(&iri, error))
        }
    }

    fn current_language(&self) -> Option<&str> {
        // An empty xml:lang removes the inherited language
        let language = self.state.iter().rev().find_map(RdfXmlState::language)?;
        non_empty(language)
    }

    fn current_base_iri(&self) -> Option<&BaseIri> {
        self.state.iter().rev().find_map(RdfXmlState::base_iri)
    }

    fn prefixes(&self) -> RdfXmlPrefixesIter<'_> {
        RdfXmlPrefixesIter {
            inner: self.reader.prefixes(),
            lenient: self.lenient,
        }
    }

    fn decode<'b>(&self, bytes: &'b [u8]) -> Result<Cow<'b, str>, RdfXmlParseError> {
        Ok(self
            .reader
            .decoder()
            .decode(bytes)
            .map_err(quick_xml::Error::from)?)
    }

    fn resolve_entity(&self, e: &str) -> Option<&str> {
        resolve_xml_entity(e).or_else(|| self.custom_entities.get(e).map(String::as_str))
    }
}

/// The attributes of an element that may describe a node.
struct NodeAttributes {
    id_attr: Option<NamedNode>,
    node_id_attr: Option<BlankNode>,
    about_attr: Option<NamedNode>,
    type_attr: Option<NamedNode>,
    property_attrs: Vec<(NamedNode, String)>,
}

fn namespace_bytes(namespace: ResolveResult<'_>) -> Result<Vec<u8>, RdfXmlSyntaxError> {
    match namespace {
        ResolveResult::Bound(namespace) => Ok(namespace.as_ref().to_vec()),
        ResolveResult::Unbound => Ok(Vec::new()),
        ResolveResult::Unknown(prefix) => Err(RdfXmlSyntaxError::msg(format!(
            "Unknown prefix {}:",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn is_object_defined(object: Option<&NodeOrText>) -> bool {
    match object {
        Some(NodeOrText::Node(_)) => true,
        Some(NodeOrText::Text(t)) => !t.bytes().all(is_whitespace),
        None => false,
    }
}

fn is_utf8(encoding: &[u8]) -> bool {
    matches!(
        encoding.to_ascii_lowercase().as_slice(),
        b"unicode-1-1-utf-8"
            | b"unicode11utf8"
            | b"unicode20utf8"
            | b"utf-8"
            | b"utf8"
            | b"x-unicode20utf8"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::vocab::xsd;
    use tessera_model::{Dataset, Quad};

    fn parse(file: &str) -> Result<Vec<Triple>, RdfXmlSyntaxError> {
        RdfXmlParser::new().for_slice(file.as_bytes()).collect()
    }

    fn e(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://e/{name}"))
    }

    const RDF: &str = r#"xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:ex="http://e/""#;

    #[test]
    fn base_inheritance() {
        let triples = parse(r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xml:base="http://e/"><rdf:Description rdf:about="a"><p:q xmlns:p="http://e/" rdf:resource="b"/></rdf:Description></rdf:RDF>"#).unwrap();
        assert_eq!(triples, [Triple::new(e("a"), e("q"), e("b"))]);
    }

    #[test]
    fn nested_base_is_relative() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF} xml:base="http://e/a/"><rdf:Description rdf:about="s" xml:base="b/"><ex:p rdf:resource="o"/></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        assert_eq!(
            triples,
            [Triple::new(e("a/b/s"), e("p"), e("a/b/o"))]
        );
    }

    #[test]
    fn typed_nodes_and_property_attributes() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF} xml:lang="EN"><ex:Person rdf:about="http://e/s" ex:name="Bob" rdf:type="http://e/Agent"/></rdf:RDF>"#
        ))
        .unwrap();
        assert_eq!(
            triples,
            [
                Triple::new(e("s"), rdf::TYPE, e("Person")),
                Triple::new(e("s"), rdf::TYPE, e("Agent")),
                Triple::new(
                    e("s"),
                    e("name"),
                    Literal::new_language_tagged_literal_unchecked("Bob", "en")
                ),
            ]
        );
    }

    #[test]
    fn empty_language_resets_inheritance() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF} xml:lang="fr"><rdf:Description rdf:about="http://e/s"><ex:p xml:lang="">a</ex:p><ex:p>b</ex:p></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        assert_eq!(triples[0].object, Term::from(Literal::new_simple_literal("a")));
        assert_eq!(
            triples[1].object,
            Term::from(Literal::new_language_tagged_literal_unchecked("b", "fr"))
        );
    }

    #[test]
    fn li_numbering() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF}><rdf:Bag rdf:about="http://e/b"><rdf:li>x</rdf:li><rdf:li rdf:resource="http://e/y"/><rdf:_7>z</rdf:_7><rdf:li>w</rdf:li></rdf:Bag></rdf:RDF>"#
        ))
        .unwrap();
        let predicates = triples
            .iter()
            .map(|t| t.predicate.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            predicates,
            [
                "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>",
                "<http://www.w3.org/1999/02/22-rdf-syntax-ns#_1>",
                "<http://www.w3.org/1999/02/22-rdf-syntax-ns#_2>",
                "<http://www.w3.org/1999/02/22-rdf-syntax-ns#_7>",
                "<http://www.w3.org/1999/02/22-rdf-syntax-ns#_3>",
            ]
        );
    }

    #[test]
    fn reification() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF} xml:base="http://e/doc"><rdf:Description rdf:about="http://e/s"><ex:p rdf:ID="st">o</ex:p></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        let statement = NamedNode::new_unchecked("http://e/doc#st");
        assert_eq!(
            triples,
            [
                Triple::new(statement.clone(), rdf::TYPE, rdf::STATEMENT),
                Triple::new(statement.clone(), rdf::SUBJECT, e("s")),
                Triple::new(statement.clone(), rdf::PREDICATE, e("p")),
                Triple::new(statement, rdf::OBJECT, Literal::new_simple_literal("o")),
                Triple::new(e("s"), e("p"), Literal::new_simple_literal("o")),
            ]
        );
    }

    #[test]
    fn duplicate_rdf_id() {
        let file = format!(
            r#"<rdf:RDF {RDF} xml:base="http://e/"><rdf:Description rdf:ID="x"/><rdf:Description rdf:ID="x"/></rdf:RDF>"#
        );
        let error = parse(&file).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DuplicateRdfId);
        assert_eq!(error.path(), "/rdf:RDF[1]/rdf:Description[2]");
        assert!(error.offset() > 0);
        assert_eq!(
            RdfXmlParser::new()
                .lenient()
                .for_slice(file.as_bytes())
                .count(),
            0
        );
    }

    #[test]
    fn same_id_with_other_base() {
        assert!(
            parse(&format!(
                r#"<rdf:RDF {RDF}><rdf:Description xml:base="http://e/a" rdf:ID="x" ex:p="1"/><rdf:Description xml:base="http://e/b" rdf:ID="x" ex:p="2"/></rdf:RDF>"#
            ))
            .is_ok()
        );
    }

    #[test]
    fn parse_type_collection() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF}><rdf:Description rdf:about="http://e/s"><ex:p rdf:parseType="Collection"><rdf:Description rdf:about="http://e/a"/><rdf:Description rdf:about="http://e/b"/></ex:p></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        assert_eq!(triples.len(), 5);
        let b1 = triples[0].object.clone().into_subject().unwrap();
        let b2 = triples[2].object.clone().into_subject().unwrap();
        assert_eq!(
            triples,
            [
                Triple::new(e("s"), e("p"), Term::from(b1.clone())),
                Triple::new(b1.clone(), rdf::FIRST, e("a")),
                Triple::new(b1, rdf::REST, Term::from(b2.clone())),
                Triple::new(b2.clone(), rdf::FIRST, e("b")),
                Triple::new(b2, rdf::REST, rdf::NIL),
            ]
        );
    }

    #[test]
    fn empty_collection() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF}><rdf:Description rdf:about="http://e/s"><ex:p rdf:parseType="Collection"/></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        assert_eq!(triples, [Triple::new(e("s"), e("p"), rdf::NIL)]);
    }

    #[test]
    fn parse_type_literal_and_resource() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF}><rdf:Description rdf:about="http://e/s"><ex:lit rdf:parseType="Literal"><b>bold</b> text</ex:lit><ex:res rdf:parseType="Resource"><ex:q>v</ex:q></ex:res><ex:other rdf:parseType="Unknown"><ex:x>y</ex:x></ex:other></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        assert_eq!(triples.len(), 3);
        let Term::Literal(literal) = &triples[0].object else {
            panic!("a literal was expected")
        };
        assert_eq!(literal.datatype(), rdf::XML_LITERAL);
        assert_eq!(literal.value(), "<b>bold</b> text");
        assert_eq!(triples[1].predicate, Predicate::from(e("res")));
        assert_eq!(triples[2].predicate, Predicate::from(e("q")));
        assert_eq!(
            Term::from(triples[2].subject.clone()),
            triples[1].object
        );
    }

    #[test]
    fn literal_namespaces() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF} xmlns:o="http://o/"><rdf:Description rdf:about="http://e/s"><ex:lit rdf:parseType="Literal"><ex:b o:a="1" xmlns:unused="http://u/"><ex:i>x</ex:i><c xmlns="http://d/"/></ex:b></ex:lit></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        let Term::Literal(literal) = &triples[0].object else {
            panic!("a literal was expected")
        };
        assert_eq!(
            literal.value(),
            r#"<ex:b xmlns:ex="http://e/" xmlns:o="http://o/" o:a="1"><ex:i>x</ex:i><c xmlns="http://d/"></c></ex:b>"#
        );
    }

    #[test]
    fn literal_attributes_are_in_canonical_order() {
        let triples = parse(&format!(
            r#"<rdf:RDF {RDF} xmlns:o="http://o/"><rdf:Description rdf:about="http://e/s"><ex:p rdf:parseType="Literal"><b xmlns="http://h/" z="1" o:y="3" xml:lang="en" a="2">x</b></ex:p></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        let Term::Literal(literal) = &triples[0].object else {
            panic!("a literal was expected")
        };
        assert_eq!(
            literal.value(),
            r#"<b xmlns="http://h/" xmlns:o="http://o/" a="2" z="1" o:y="3" xml:lang="en">x</b>"#
        );
    }

    #[test]
    fn node_ids_are_document_scoped() {
        let file = format!(
            r#"<rdf:RDF {RDF}><rdf:Description rdf:nodeID="n"><ex:p rdf:nodeID="n"/></rdf:Description></rdf:RDF>"#
        );
        let first = parse(&file).unwrap();
        let second = parse(&file).unwrap();
        assert_eq!(Term::from(first[0].subject.clone()), first[0].object);
        assert_ne!(first[0].subject, second[0].subject);
        assert_ne!(first[0].subject.to_string(), "_:n");
    }

    #[test]
    fn datatypes_and_entities() {
        let triples = parse(&format!(
            r#"<!DOCTYPE rdf:RDF [<!ENTITY xsd "http://www.w3.org/2001/XMLSchema#">]>
<rdf:RDF {RDF}><rdf:Description rdf:about="http://e/s"><ex:p rdf:datatype="&xsd;integer">42</ex:p></rdf:Description></rdf:RDF>"#
        ))
        .unwrap();
        assert_eq!(
            triples,
            [Triple::new(
                e("s"),
                e("p"),
                Literal::new_typed_literal("42", xsd::INTEGER)
            )]
        );
    }

    #[test]
    fn document_element_without_rdf_root() {
        let triples = parse(
            r#"<ex:Thing xmlns:ex="http://e/" xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" rdf:about="http://e/s"><ex:p>o</ex:p></ex:Thing>"#,
        )
        .unwrap();
        assert_eq!(triples.len(), 2);
    }

    #[test]
    fn deprecated_names() {
        for file in [
            format!(r#"<rdf:RDF {RDF}><rdf:Description rdf:aboutEach="http://e/s"/></rdf:RDF>"#),
            format!(r#"<rdf:RDF {RDF}><rdf:Description rdf:bagID="b"/></rdf:RDF>"#),
            format!(r#"<rdf:RDF {RDF}><rdf:li rdf:about="http://e/s"/></rdf:RDF>"#),
            format!(r#"<rdf:RDF {RDF}><rdf:Description rdf:about="http://e/s"><rdf:Description/></rdf:Description></rdf:RDF>"#),
        ] {
            assert_eq!(parse(&file).unwrap_err().kind(), ErrorKind::Syntax, "{file}");
        }
    }

    #[test]
    fn only_utf8() {
        let error = parse(&format!(
            r#"<?xml version="1.0" encoding="ISO-8859-1"?><rdf:RDF {RDF}/>"#
        ))
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn invalid_terms() {
        let error = parse(&format!(
            r#"<rdf:RDF {RDF}><rdf:Description rdf:about="http://e/s" xml:lang="a_b"/></rdf:RDF>"#
        ))
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidLanguageTag);
        let error = parse(&format!(
            r#"<rdf:RDF {RDF}><rdf:Description rdf:about="s"/></rdf:RDF>"#
        ))
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidIri);
        let error = parse(&format!(
            r#"<rdf:RDF {RDF} xml:base="relative/"><rdf:Description rdf:about="s"/></rdf:RDF>"#
        ))
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidBase);
    }

    #[test]
    fn stops_at_first_error() {
        let mut parser = RdfXmlParser::new().for_slice(
            br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description rdf:about="http://e/a" rdf:bagID="x"/><rdf:Description rdf:about="http://e/b"><rdf:value>1</rdf:value></rdf:Description></rdf:RDF>"#,
        );
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn unclosed_elements() {
        let error = parse(&format!(r#"<rdf:RDF {RDF}><rdf:Description rdf:about="http://e/s">"#))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn empty_document() {
        assert_eq!(parse(&format!("<rdf:RDF {RDF}/>")).unwrap(), []);
        assert_eq!(parse("").unwrap(), []);
    }

    #[test]
    fn reader_and_slice_agree() {
        let file = format!(
            r#"<rdf:RDF {RDF}><rdf:Description><ex:p><rdf:Description ex:q="v"/></ex:p></rdf:Description></rdf:RDF>"#
        );
        let from_slice = parse(&file)
            .unwrap()
            .into_iter()
            .map(Quad::from)
            .collect::<Dataset>();
        let from_reader = RdfXmlParser::new()
            .for_reader(file.as_bytes())
            .map(|t| t.map(Quad::from))
            .collect::<Result<Dataset, _>>()
            .unwrap();
        assert!(from_slice.is_isomorphic(&from_reader));
    }
}
